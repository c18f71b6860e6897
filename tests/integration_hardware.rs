//! Tests requiring actual serial hardware.
//!
//! Compiled only with the `hardware-tests` feature and skipped unless
//! `TEST_PORT` is set.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=/dev/ttyUSB0          # device under test
//! export TEST_BAUD=9600                  # optional, default: 9600
//! export TEST_COMMAND='*IDN?'            # optional, command that gets a reply
//! cargo test --features hardware-tests --test integration_hardware
//! ```

#![cfg(all(unix, feature = "hardware-tests"))]

use std::env;
use std::time::Duration;
use trx::line::FramingOptions;
use trx::port::{BaudRate, LineLimit, PortConfiguration, SerialPortSession, SessionState, TermiosOpener};
use trx::runner::CommandRunner;
use trx::{CancellationToken, Line};

/// Test port configuration from environment.
struct TestPortConfig {
    port_name: String,
    baud_rate: BaudRate,
    command: Option<String>,
}

impl TestPortConfig {
    fn from_env() -> Option<Self> {
        let Ok(port_name) = env::var("TEST_PORT") else {
            println!("Skipping hardware test: TEST_PORT not set");
            return None;
        };
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(BaudRate::B9600);
        Some(Self {
            port_name,
            baud_rate,
            command: env::var("TEST_COMMAND").ok(),
        })
    }

    fn to_port_config(&self) -> PortConfiguration {
        PortConfiguration::new(
            &self.port_name,
            self.baud_rate,
            Duration::from_millis(1000),
            LineLimit::Unbounded,
        )
    }
}

#[test]
fn test_real_port_open_configure_close() {
    let Some(test) = TestPortConfig::from_env() else {
        return;
    };

    let mut session = SerialPortSession::new(&test.port_name);
    session.open(&TermiosOpener).expect("open TEST_PORT");
    session.configure(test.baud_rate).expect("configure TEST_PORT");
    assert_eq!(session.state(), SessionState::Configured);

    session.close().expect("close TEST_PORT");
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_real_port_command_exchange() {
    let Some(test) = TestPortConfig::from_env() else {
        return;
    };
    let Some(command) = test.command.clone() else {
        println!("Skipping exchange test: TEST_COMMAND not set");
        return;
    };

    let config = test.to_port_config();
    let mut session = SerialPortSession::new(config.device_path());
    session.open(&TermiosOpener).expect("open TEST_PORT");
    session.configure(config.baud_rate()).expect("configure TEST_PORT");

    let mut lines: Vec<Line> = Vec::new();
    let report = CommandRunner::new(
        &mut session,
        &config,
        FramingOptions::default(),
        CancellationToken::new(),
    )
    .run(&command, &mut lines)
    .expect("sink");

    println!("{command} -> {} line(s), ended by {:?}", report.lines, report.end);
    for line in &lines {
        println!("  {line}");
    }
    assert!(!lines.is_empty(), "device sent no response to {command}");
}
