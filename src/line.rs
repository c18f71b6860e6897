//! Line framing on top of the session's byte primitives.
//!
//! A response line ends at LF or CR; CR LF counts as one terminator even when
//! the LF only shows up in the next chunk. Every read attempt gets the full
//! response timeout, so a slow but steady peer is never cut off mid-line.

use crate::port::{PortError, SerialPortSession, TtyDevice, WaitOutcome};
use memchr::memchr2;
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Longest partial line kept while waiting for its terminator.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Buffer handed to each `read(2)`.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;

/// One received line, terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    bytes: Vec<u8>,
}

impl Line {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content as text, invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&str> for Line {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Why received bytes could not be framed into a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedFrame {
    /// Data stopped arriving before a terminator did.
    Unterminated { bytes: usize },
    /// The partial line outgrew the framing buffer.
    Overlong { limit: usize },
}

impl fmt::Display for MalformedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedFrame::Unterminated { bytes } => {
                write!(f, "{bytes} bytes received without a line terminator")
            }
            MalformedFrame::Overlong { limit } => {
                write!(f, "line exceeds {limit} bytes without a terminator")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum LineError {
    #[error("malformed frame: {0}")]
    MalformedFrame(MalformedFrame),

    #[error(transparent)]
    Io(#[from] PortError),
}

/// Result of one [`LineTransceiver::receive_line`] call.
#[derive(Debug)]
pub enum LineOutcome {
    Line(Line),
    /// Nothing arrived within the timeout. This is how a response ends.
    TimedOut,
    Error(LineError),
}

impl LineOutcome {
    pub fn into_line(self) -> Option<Line> {
        match self {
            LineOutcome::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, LineOutcome::TimedOut)
    }
}

/// Splits a byte stream into lines.
#[derive(Debug, Clone, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
    /// The last line ended in a bare CR at the end of a chunk.
    skip_lf: bool,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mut bytes: &[u8]) {
        if self.skip_lf && !bytes.is_empty() {
            if bytes[0] == b'\n' {
                bytes = &bytes[1..];
            }
            self.skip_lf = false;
        }
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete line, if a terminator has been seen.
    pub fn next_line(&mut self) -> Option<Line> {
        let pos = memchr2(b'\r', b'\n', &self.pending)?;
        let mut consumed = pos + 1;
        if self.pending[pos] == b'\r' {
            match self.pending.get(pos + 1) {
                Some(b'\n') => consumed += 1,
                Some(_) => {}
                None => self.skip_lf = true,
            }
        }
        let line = Line::new(&self.pending[..pos]);
        self.pending.drain(..consumed);
        Some(line)
    }

    /// Bytes buffered after the last terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.skip_lf = false;
    }
}

/// Framing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingOptions {
    pub max_line_length: usize,
    pub read_chunk_size: usize,
}

impl Default for FramingOptions {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

/// Line protocol over a borrowed session.
#[derive(Debug)]
pub struct LineTransceiver<'s, D: TtyDevice> {
    session: &'s mut SerialPortSession<D>,
    splitter: LineSplitter,
    chunk: Vec<u8>,
    max_line_length: usize,
}

impl<'s, D: TtyDevice> LineTransceiver<'s, D> {
    pub fn new(session: &'s mut SerialPortSession<D>, options: FramingOptions) -> Self {
        Self {
            session,
            splitter: LineSplitter::new(),
            chunk: vec![0; options.read_chunk_size.max(1)],
            max_line_length: options.max_line_length.max(1),
        }
    }

    /// Transmit one command. The session appends the terminator.
    ///
    /// Response bytes the previous command left unread are discarded.
    pub fn send_command(&mut self, text: &str) -> Result<usize, PortError> {
        let dropped = self.splitter.pending_len();
        if dropped > 0 {
            debug!(dropped, "discarding unread response bytes");
            self.splitter.clear();
        }
        let text = text.trim_end_matches(['\r', '\n']);
        self.session.write_all(text.as_bytes())
    }

    /// Receive the next response line, waiting at most `timeout` per read.
    pub fn receive_line(&mut self, timeout: Duration) -> LineOutcome {
        loop {
            if let Some(line) = self.splitter.next_line() {
                return LineOutcome::Line(line);
            }
            if self.splitter.pending_len() > self.max_line_length {
                self.splitter.clear();
                return LineOutcome::Error(LineError::MalformedFrame(MalformedFrame::Overlong {
                    limit: self.max_line_length,
                }));
            }

            match self.session.wait_readable(timeout) {
                WaitOutcome::Ready => {}
                WaitOutcome::TimedOut => {
                    let bytes = self.splitter.pending_len();
                    if bytes == 0 {
                        return LineOutcome::TimedOut;
                    }
                    self.splitter.clear();
                    return LineOutcome::Error(LineError::MalformedFrame(
                        MalformedFrame::Unterminated { bytes },
                    ));
                }
                WaitOutcome::Error(e) => {
                    self.splitter.clear();
                    return LineOutcome::Error(LineError::Io(PortError::Io(e)));
                }
            }

            match self.session.read_chunk(&mut self.chunk) {
                Ok(n) => self.splitter.push(&self.chunk[..n]),
                Err(e) => {
                    self.splitter.clear();
                    return LineOutcome::Error(LineError::Io(e));
                }
            }
        }
    }

    /// Bytes of an incomplete line still buffered.
    pub fn pending_len(&self) -> usize {
        self.splitter.pending_len()
    }
}
