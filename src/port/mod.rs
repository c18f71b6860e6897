//! Port abstraction layer for serial communication.
//!
//! [`SerialPortSession`] drives any [`TtyDevice`]; the termios backend opens
//! real devices and [`MockSerialPort`] stands in for them in tests.

pub mod error;
pub mod mock;
pub mod session;
pub mod traits;

#[cfg(unix)]
pub mod termios;

pub use error::{ConfigureError, OpenError, PortError};
pub use mock::{MockAttrs, MockDevice, MockFault, MockSerialPort};
pub use session::{SerialPortSession, SessionState, TX_TERMINATOR};
pub use traits::*;

#[cfg(unix)]
pub use termios::{TermiosOpener, TermiosPort};

/// Names of serial ports the OS reports, for `--list-ports`.
pub fn available_port_names() -> Result<Vec<String>, serialport::Error> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|info| info.port_name)
        .collect())
}
