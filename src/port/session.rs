//! Ownership and lifecycle of one configured tty.
//!
//! ```text
//! Closed --open--> Open --configure--> Configured
//!    ^               |                      |
//!    +----close------+----------------------+   (any syscall error -> Failed)
//! ```

use super::error::{ConfigureError, OpenError, PortError};
use super::traits::{BaudRate, DeviceOpener, LineSettings, TtyDevice, WaitOutcome};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Terminator appended to every transmitted command.
pub const TX_TERMINATOR: u8 = b'\r';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    Configured,
    /// A syscall failed. Only `close()` is accepted from here.
    Failed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Closed => "closed",
            SessionState::Open => "open",
            SessionState::Configured => "configured",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exclusive owner of one device handle and its terminal settings.
pub struct SerialPortSession<D: TtyDevice> {
    path: PathBuf,
    device: Option<D>,
    original_settings: Option<D::Snapshot>,
    applied_settings: Option<LineSettings>,
    state: SessionState,
}

impl<D: TtyDevice> SerialPortSession<D> {
    /// A closed session for the device at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            device: None,
            original_settings: None,
            applied_settings: None,
            state: SessionState::Closed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Settings written by the last successful `configure()`.
    pub fn applied_settings(&self) -> Option<&LineSettings> {
        self.applied_settings.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn open<O>(&mut self, opener: &O) -> Result<(), OpenError>
    where
        O: DeviceOpener<Device = D>,
    {
        if self.state != SessionState::Closed {
            return Err(OpenError::InvalidState(self.state.as_str()));
        }
        let device = opener.open(&self.path)?;
        self.device = Some(device);
        self.transition(SessionState::Open);
        Ok(())
    }

    /// Put the line into 8N1 canonical mode at `baud_rate`.
    ///
    /// The device's attributes are snapshotted on the first call only, so a
    /// reconfigure still restores what the device had before we touched it.
    pub fn configure(&mut self, baud_rate: BaudRate) -> Result<(), ConfigureError> {
        if !matches!(self.state, SessionState::Open | SessionState::Configured) {
            return Err(ConfigureError::InvalidState(self.state.as_str()));
        }
        let device = self
            .device
            .as_mut()
            .ok_or(ConfigureError::InvalidState(self.state.as_str()))?;

        let settings = LineSettings::line_mode(baud_rate);
        match apply_line_settings(device, &mut self.original_settings, &settings) {
            Ok(()) => {
                self.applied_settings = Some(settings);
                self.transition(SessionState::Configured);
                Ok(())
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    /// Wait up to `timeout` for the device to become readable.
    pub fn wait_readable(&mut self, timeout: Duration) -> WaitOutcome {
        let device = match self.io_device() {
            Ok(device) => device,
            Err(e) => return WaitOutcome::Error(std::io::Error::other(e)),
        };
        match device.wait_readable(timeout) {
            Ok(true) => WaitOutcome::Ready,
            Ok(false) => WaitOutcome::TimedOut,
            Err(e) => {
                self.transition(SessionState::Failed);
                WaitOutcome::Error(e)
            }
        }
    }

    /// Write `bytes` plus the line terminator, then wait for the output to drain.
    ///
    /// The payload goes out in a single write call. If the OS takes fewer
    /// bytes than offered this returns [`PortError::ShortWrite`]; the
    /// terminator is still sent and the line drained, so the peer sees a
    /// complete (if truncated) command.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<usize, PortError> {
        let result = self.transmit(bytes);
        if matches!(result, Err(PortError::Io(_))) {
            self.transition(SessionState::Failed);
        }
        result
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<usize, PortError> {
        let device = self.io_device()?;
        let written = device.write(bytes)?;
        device.write(&[TX_TERMINATOR])?;
        device.drain()?;

        if written != bytes.len() {
            return Err(PortError::ShortWrite {
                written,
                expected: bytes.len(),
            });
        }
        Ok(written)
    }

    /// One read call. Zero bytes is reported as [`PortError::UnexpectedEof`].
    pub fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let device = self.io_device()?;
        match device.read(buffer) {
            Ok(0) => Err(PortError::UnexpectedEof),
            Ok(n) => Ok(n),
            Err(e) => {
                self.transition(SessionState::Failed);
                Err(PortError::Io(e))
            }
        }
    }

    /// Write the attributes found at first configure back to the device.
    ///
    /// The snapshot is consumed: a second call is a no-op.
    pub fn restore(&mut self) -> Result<(), PortError> {
        let Some(device) = self.device.as_mut() else {
            return Err(PortError::NotOpen);
        };
        match self.original_settings.take() {
            Some(snapshot) => device.restore(&snapshot).map_err(PortError::Io),
            None => Ok(()),
        }
    }

    /// Restore the device's settings and release the handle.
    ///
    /// Always ends in `Closed` with the handle dropped. A restore failure is
    /// logged and returned, but never keeps the descriptor alive.
    pub fn close(&mut self) -> Result<(), PortError> {
        if self.device.is_none() {
            self.transition(SessionState::Closed);
            return Ok(());
        }

        let restored = self.restore();
        if let Err(e) = &restored {
            warn!(path = %self.path.display(), error = %e, "error resetting serial port settings");
        }

        self.device = None;
        self.original_settings = None;
        self.applied_settings = None;
        self.transition(SessionState::Closed);
        restored
    }

    fn io_device(&mut self) -> Result<&mut D, PortError> {
        match self.state {
            SessionState::Failed => Err(PortError::Failed),
            _ => self.device.as_mut().ok_or(PortError::NotOpen),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(path = %self.path.display(), from = %self.state, to = %next, "session state");
            self.state = next;
        }
    }
}

fn apply_line_settings<D: TtyDevice>(
    device: &mut D,
    original: &mut Option<D::Snapshot>,
    settings: &LineSettings,
) -> Result<(), ConfigureError> {
    if original.is_none() {
        *original = Some(device.snapshot().map_err(|e| ConfigureError::io("read", e))?);
    }
    device
        .apply(settings)
        .map_err(|e| ConfigureError::io("set", e))
}

impl<D: TtyDevice> Drop for SerialPortSession<D> {
    fn drop(&mut self) {
        if self.device.is_some() {
            let _ = self.close();
        }
    }
}

impl<D: TtyDevice> fmt::Debug for SerialPortSession<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPortSession")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("applied_settings", &self.applied_settings)
            .finish()
    }
}
