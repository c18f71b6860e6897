//! Shared test utilities for trx integration tests.
//!
//! This module provides common test infrastructure including:
//! - Mock peers with pre-programmed replies
//! - Sessions already opened and configured against a mock
//! - Port configuration builders

#![allow(dead_code)]

use std::num::NonZeroU32;
use std::time::Duration;
use trx::port::{BaudRate, LineLimit, MockDevice, MockSerialPort, PortConfiguration, SerialPortSession};

pub const MOCK_PATH: &str = "/dev/mock0";

/// Create a mock peer that answers each `(command, replies)` pair.
///
/// # Example
/// ```ignore
/// let peer = mock_peer(&[("*IDN?", &[b"ACME,42\r\n"])]);
/// ```
pub fn mock_peer(script: &[(&str, &[&[u8]])]) -> MockSerialPort {
    let peer = MockSerialPort::new();
    for (command, replies) in script {
        peer.respond_to(command, replies);
    }
    peer
}

/// A session opened and configured at 9600 baud against `peer`.
pub fn ready_session(peer: &MockSerialPort) -> SerialPortSession<MockDevice> {
    let mut session = SerialPortSession::new(MOCK_PATH);
    session.open(peer).expect("mock open");
    session.configure(BaudRate::B9600).expect("mock configure");
    session
}

pub fn bounded(n: u32) -> LineLimit {
    LineLimit::Bounded(NonZeroU32::new(n).expect("non-zero line count"))
}

/// Port configuration for the mock path with a short timeout.
pub fn mock_config(max_lines: LineLimit) -> PortConfiguration {
    PortConfiguration::new(MOCK_PATH, BaudRate::B9600, Duration::from_millis(50), max_lines)
}
