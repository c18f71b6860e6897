//! Core types and traits for the serial port abstraction.
//!
//! `TtyDevice` is the seam between the session state machine and the
//! operating system: the termios backend implements it for real devices and
//! `MockSerialPort` implements it for tests.

use super::error::OpenError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Baud rates the tool knows how to program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
    B230400,
}

impl BaudRate {
    /// Every supported rate, slowest first.
    pub const ALL: [BaudRate; 9] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
        BaudRate::B230400,
    ];

    /// Bits per second.
    pub fn bps(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
            BaudRate::B230400 => 230400,
        }
    }

    pub fn from_bps(bps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.bps() == bps)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bps())
    }
}

/// Rejected baud rate value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported baud rate: {0}")]
pub struct UnsupportedBaudRate(pub String);

impl TryFrom<u32> for BaudRate {
    type Error = UnsupportedBaudRate;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Self::from_bps(bps).ok_or_else(|| UnsupportedBaudRate(bps.to_string()))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.bps()
    }
}

impl FromStr for BaudRate {
    type Err = UnsupportedBaudRate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_bps)
            .ok_or_else(|| UnsupportedBaudRate(s.to_string()))
    }
}

/// How many response lines to read per command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineLimit {
    Bounded(NonZeroU32),
    #[default]
    Unbounded,
}

impl LineLimit {
    /// `true` while another line may be read after `received` lines.
    pub fn allows(self, received: u32) -> bool {
        match self {
            LineLimit::Bounded(max) => received < max.get(),
            LineLimit::Unbounded => true,
        }
    }
}

impl fmt::Display for LineLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineLimit::Bounded(n) => write!(f, "{n}"),
            LineLimit::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Rejected line count value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid count: {0} (expected a positive number, -1 or \"unbounded\")")]
pub struct InvalidLineLimit(pub String);

impl FromStr for LineLimit {
    type Err = InvalidLineLimit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "-1" || s.eq_ignore_ascii_case("unbounded") {
            return Ok(LineLimit::Unbounded);
        }
        s.parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .map(LineLimit::Bounded)
            .ok_or_else(|| InvalidLineLimit(s.to_string()))
    }
}

/// Rejected response timeout value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timeout: {0} (expected a positive number of seconds)")]
pub struct InvalidTimeout(pub String);

/// Parse a positive, finite, possibly fractional number of seconds.
pub fn parse_timeout(s: &str) -> Result<Duration, InvalidTimeout> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| InvalidTimeout(s.to_string()))?;
    timeout_from_secs(secs).ok_or_else(|| InvalidTimeout(s.to_string()))
}

/// `None` unless `secs` is positive and finite.
pub fn timeout_from_secs(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// Validated description of how to open and drive one device.
///
/// Construction goes through [`PortConfiguration::new`], so a value of this
/// type always names a device and a supported baud rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    device_path: PathBuf,
    baud_rate: BaudRate,
    response_timeout: Duration,
    max_lines: LineLimit,
}

impl PortConfiguration {
    pub fn new(
        device_path: impl Into<PathBuf>,
        baud_rate: BaudRate,
        response_timeout: Duration,
        max_lines: LineLimit,
    ) -> Self {
        Self {
            device_path: device_path.into(),
            baud_rate,
            response_timeout,
            max_lines,
        }
    }

    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    pub fn baud_rate(&self) -> BaudRate {
        self.baud_rate
    }

    /// Maximum wait for the next chunk of a response line.
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn max_lines(&self) -> LineLimit {
        self.max_lines
    }
}

/// Terminal settings written by the session.
///
/// Framing is always 8N1 without flow control and input is always
/// canonical; only the speed and the EOF character vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: BaudRate,
    /// End-of-file control character.
    pub eof_char: u8,
}

impl LineSettings {
    /// 8N1, no flow control, canonical input, EOF = ^D.
    pub fn line_mode(baud_rate: BaudRate) -> Self {
        Self {
            baud_rate,
            eof_char: 0x04,
        }
    }
}

/// Result of a readiness wait.
#[derive(Debug)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
    Error(io::Error),
}

/// Byte and attribute primitives of one open tty.
///
/// Implementations release their descriptor on drop.
pub trait TtyDevice: fmt::Debug {
    /// Opaque copy of the attributes found on the device.
    type Snapshot: fmt::Debug;

    /// Read the current terminal attributes.
    fn snapshot(&mut self) -> io::Result<Self::Snapshot>;

    /// Merge `settings` into the current attributes and write them back.
    fn apply(&mut self, settings: &LineSettings) -> io::Result<()>;

    /// Write a snapshot back verbatim.
    fn restore(&mut self, snapshot: &Self::Snapshot) -> io::Result<()>;

    /// Block until readable or until `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// One `write(2)`; may accept fewer bytes than offered.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Block until everything written has left the output queue.
    fn drain(&mut self) -> io::Result<()>;

    /// One `read(2)`.
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
}

/// Something that can open a device path into a [`TtyDevice`].
pub trait DeviceOpener {
    type Device: TtyDevice;

    fn open(&self, path: &Path) -> Result<Self::Device, OpenError>;
}
