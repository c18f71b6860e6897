//! Port-specific error types.
//!
//! Startup failures (`OpenError`, `ConfigureError`) are kept apart from the
//! per-command I/O failures in `PortError`, so callers can tell "the device is
//! unusable" from "this exchange went wrong".

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while opening the device file.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The device path does not exist.
    #[error("Serial port not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The device exists but this process may not open it.
    #[error("Permission denied opening {}", .0.display())]
    PermissionDenied(PathBuf),

    /// The device is held by someone else.
    #[error("Serial port is busy: {}", .0.display())]
    Busy(PathBuf),

    /// `open()` was called on a session that already holds a handle.
    #[error("Session is {0}, expected closed")]
    InvalidState(&'static str),

    /// Any other OS failure.
    #[error("Failed to open {}: {source}", path.display())]
    Other {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OpenError {
    /// Map an OS error from `open(2)` onto the open error taxonomy.
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => match err.raw_os_error() {
                #[cfg(unix)]
                Some(libc::EBUSY) => Self::Busy(path),
                _ => Self::Other { path, source: err },
            },
        }
    }
}

/// Errors raised while reading or writing terminal attributes.
#[derive(Debug, Error)]
pub enum ConfigureError {
    /// An attribute syscall failed.
    #[error("Failed to {operation} terminal attributes: {source}")]
    IoFailure {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// `configure()` was called on a session that is not open.
    #[error("Session is {0}, expected open")]
    InvalidState(&'static str),
}

impl ConfigureError {
    pub fn io(operation: &'static str, source: io::Error) -> Self {
        Self::IoFailure { operation, source }
    }
}

/// Errors that can occur during serial port I/O.
#[derive(Debug, Error)]
pub enum PortError {
    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The OS accepted fewer bytes than were handed to it.
    #[error("Sent only {written} bytes out of {expected}")]
    ShortWrite { written: usize, expected: usize },

    /// A canonical-mode read returned zero bytes.
    #[error("read() returned 0 bytes on a canonical tty")]
    UnexpectedEof,

    /// Attempted to use a port that's not open.
    #[error("Port is not open")]
    NotOpen,

    /// The session hit an earlier syscall failure and refuses further I/O.
    #[error("Session has failed and must be closed")]
    Failed,
}

impl PortError {
    /// Whether this is the non-fatal short-write condition.
    pub fn is_short_write(&self) -> bool {
        matches!(self, Self::ShortWrite { .. })
    }
}
