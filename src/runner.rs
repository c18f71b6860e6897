//! One command out, up to N response lines back.
//!
//! ```text
//! Sending -> ReceivingLine -+-> ReceivingLine (next line)
//!                           +-> Done     (line limit, timeout, bad frame, I/O error)
//!                           +-> Aborted  (cancellation seen between lines)
//! ```

use crate::cancel::CancellationToken;
use crate::line::{FramingOptions, Line, LineError, LineOutcome, LineTransceiver};
use crate::port::{LineLimit, PortConfiguration, PortError, SerialPortSession, TtyDevice};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// The output sink refused a write. This is the one failure that stops a batch.
#[derive(Debug, Error)]
#[error("failed to write response: {0}")]
pub struct SinkError(#[from] pub io::Error);

/// Receives what a command exchange produces.
pub trait LineSink {
    /// A command is about to be sent.
    fn command(&mut self, _command: &str) -> io::Result<()> {
        Ok(())
    }

    fn line(&mut self, line: &Line) -> io::Result<()>;

    /// The exchange is over.
    fn finished(&mut self, _report: &CommandReport) -> io::Result<()> {
        Ok(())
    }
}

impl LineSink for Vec<Line> {
    fn line(&mut self, line: &Line) -> io::Result<()> {
        self.push(line.clone());
        Ok(())
    }
}

/// Why the receive loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// `max_lines` lines were read.
    LimitReached,
    /// The peer went quiet.
    TimedOut,
    /// Bytes arrived that could not be framed.
    Malformed,
    ReadFailed,
    /// Nothing was received because the command could not be sent.
    SendFailed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortWrite {
    pub written: usize,
    pub expected: usize,
}

/// Summary of one command exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub command: String,
    pub lines: u32,
    pub end: EndReason,
    pub short_write: Option<ShortWrite>,
}

impl CommandReport {
    /// `true` when the exchange ended through cancellation.
    pub fn aborted(&self) -> bool {
        self.end == EndReason::Cancelled
    }
}

/// Reports of a command batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub reports: Vec<CommandReport>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn total_lines(&self) -> u32 {
        self.reports.iter().map(|r| r.lines).sum()
    }
}

/// Drives command exchanges over one borrowed session.
#[derive(Debug)]
pub struct CommandRunner<'s, D: TtyDevice> {
    transceiver: LineTransceiver<'s, D>,
    response_timeout: Duration,
    max_lines: LineLimit,
    cancel: CancellationToken,
}

impl<'s, D: TtyDevice> CommandRunner<'s, D> {
    pub fn new(
        session: &'s mut SerialPortSession<D>,
        config: &PortConfiguration,
        framing: FramingOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transceiver: LineTransceiver::new(session, framing),
            response_timeout: config.response_timeout(),
            max_lines: config.max_lines(),
            cancel,
        }
    }

    /// Send `command` and pass each response line to `sink`.
    ///
    /// Per-command failures end up in the report. Only a sink failure is
    /// returned as an error.
    pub fn run(
        &mut self,
        command: &str,
        sink: &mut dyn LineSink,
    ) -> Result<CommandReport, SinkError> {
        sink.command(command)?;

        let mut report = CommandReport {
            command: command.to_string(),
            lines: 0,
            end: EndReason::TimedOut,
            short_write: None,
        };

        match self.transceiver.send_command(command) {
            Ok(written) => debug!(command, written, "command sent"),
            Err(PortError::ShortWrite { written, expected }) => {
                warn!(command, written, expected, "sent only {written} bytes out of {expected}");
                report.short_write = Some(ShortWrite { written, expected });
            }
            Err(e) => {
                warn!(command, error = %e, "failed to send command");
                report.end = EndReason::SendFailed;
                sink.finished(&report)?;
                return Ok(report);
            }
        }

        report.end = loop {
            if self.cancel.is_cancelled() {
                break EndReason::Cancelled;
            }
            if !self.max_lines.allows(report.lines) {
                break EndReason::LimitReached;
            }

            match self.transceiver.receive_line(self.response_timeout) {
                LineOutcome::Line(line) => {
                    sink.line(&line)?;
                    report.lines += 1;
                }
                LineOutcome::TimedOut => break EndReason::TimedOut,
                LineOutcome::Error(LineError::MalformedFrame(frame)) => {
                    warn!(command, %frame, "discarding malformed response");
                    break EndReason::Malformed;
                }
                LineOutcome::Error(LineError::Io(e)) => {
                    warn!(command, error = %e, "error reading port");
                    break EndReason::ReadFailed;
                }
            }
        };

        debug!(command, lines = report.lines, end = ?report.end, "command finished");
        sink.finished(&report)?;
        Ok(report)
    }

    /// Run `commands` in order until they run out or cancellation is seen.
    pub fn run_batch<I, S>(
        &mut self,
        commands: I,
        sink: &mut dyn LineSink,
    ) -> Result<BatchReport, SinkError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = BatchReport::default();
        for command in commands {
            if self.cancel.is_cancelled() {
                batch.cancelled = true;
                break;
            }
            let report = self.run(command.as_ref(), sink)?;
            let aborted = report.aborted();
            batch.reports.push(report);
            if aborted {
                batch.cancelled = true;
                break;
            }
        }
        Ok(batch)
    }
}
