//! trx library
//!
//! Sends text commands to a device on a serial tty and collects its
//! line-oriented responses.
//!
//! # Modules
//!
//! - `port`: tty session, termios backend and mock device
//! - `line`: response line framing over a session
//! - `runner`: one command out, up to N lines back
//! - `cancel`: cooperative cancellation and signal handling
//! - `config`: `trx.toml`, device profiles and file discovery
//! - `script`: command files
//! - `output`: stdout/file response sink
//! - `cli`, `app`, `logging`: the `trx` binary's plumbing
//! - `error`: unified error handling and exit codes

pub mod app;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod line;
pub mod logging;
pub mod output;
pub mod port;
pub mod runner;
pub mod script;

// Re-export commonly used types for convenience
pub use cancel::CancellationToken;
pub use error::{AppError, AppResult};
pub use line::{Line, LineError, LineOutcome, LineTransceiver, MalformedFrame};
pub use port::{
    BaudRate, LineLimit, MockSerialPort, PortConfiguration, PortError, SerialPortSession,
    SessionState, TtyDevice,
};
pub use runner::{BatchReport, CommandReport, CommandRunner, EndReason, LineSink};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
