//! Mock serial port implementation for testing.
//!
//! `MockSerialPort` plays the part of whatever is attached to the tty: it
//! hands out `MockDevice` handles through [`DeviceOpener`], queues response
//! chunks, records what was written, and can be told to fail any syscall.
//! All clones share one state, so a test keeps a clone to inspect the peer
//! after handing another to the session.

use super::error::OpenError;
use super::traits::{DeviceOpener, LineSettings, TtyDevice};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Syscalls a test can make fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFault {
    Snapshot,
    Apply,
    Restore,
    Wait,
    Write,
    Drain,
    Read,
}

/// Terminal attributes held by the mock device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockAttrs {
    /// Whatever the device had before anyone configured it.
    Factory,
    Applied(LineSettings),
}

/// Snapshot handed out by [`MockDevice::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSnapshot(pub MockAttrs);

#[derive(Debug)]
struct MockPortState {
    /// Chunks returned one per read.
    read_queue: VecDeque<Vec<u8>>,
    /// Chunk served whenever the queue is empty.
    endless_reply: Option<Vec<u8>>,
    /// Replies queued when a matching command line is written.
    responses: Vec<(Vec<u8>, Vec<Vec<u8>>)>,
    /// Bytes written since the last terminator.
    pending_command: Vec<u8>,
    /// Log of every write call.
    write_log: Vec<Vec<u8>>,
    /// Complete command lines seen, terminator stripped.
    commands: Vec<Vec<u8>>,
    /// Accept at most this many bytes on the next write.
    write_limit: Option<usize>,
    attrs: MockAttrs,
    applied: Vec<LineSettings>,
    faults: Vec<MockFault>,
    open_error: Option<io::ErrorKind>,
    open_handles: usize,
    opens: usize,
    restores: usize,
    drains: usize,
    waits: Vec<Duration>,
}

impl Default for MockPortState {
    fn default() -> Self {
        Self {
            read_queue: VecDeque::new(),
            endless_reply: None,
            responses: Vec::new(),
            pending_command: Vec::new(),
            write_log: Vec::new(),
            commands: Vec::new(),
            write_limit: None,
            attrs: MockAttrs::Factory,
            applied: Vec::new(),
            faults: Vec::new(),
            open_error: None,
            open_handles: 0,
            opens: 0,
            restores: 0,
            drains: 0,
            waits: Vec::new(),
        }
    }
}

impl MockPortState {
    fn check(&self, fault: MockFault) -> io::Result<()> {
        if self.faults.contains(&fault) {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("injected {fault:?} failure"),
            ))
        } else {
            Ok(())
        }
    }

    fn has_data(&self) -> bool {
        !self.read_queue.is_empty() || self.endless_reply.is_some()
    }

    fn record_written(&mut self, data: &[u8]) {
        for &byte in data {
            if byte == b'\r' || byte == b'\n' {
                let command = std::mem::take(&mut self.pending_command);
                if let Some((_, replies)) = self.responses.iter().find(|(cmd, _)| *cmd == command) {
                    let replies = replies.clone();
                    self.read_queue.extend(replies);
                }
                self.commands.push(command);
            } else {
                self.pending_command.push(byte);
            }
        }
    }
}

/// Simulated peer and device factory.
///
/// # Example
/// ```
/// use trx::port::{MockSerialPort, SerialPortSession, BaudRate};
///
/// let peer = MockSerialPort::new();
/// peer.respond_to("PING", &[b"PONG\r\n"]);
///
/// let mut session = SerialPortSession::new("/dev/mock0");
/// session.open(&peer).unwrap();
/// session.configure(BaudRate::B9600).unwrap();
/// session.write_all(b"PING").unwrap();
///
/// assert_eq!(peer.commands(), vec![b"PING".to_vec()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSerialPort {
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one chunk, returned whole by a single read.
    pub fn enqueue_read(&self, chunk: &[u8]) {
        self.state.lock().read_queue.push_back(chunk.to_vec());
    }

    /// Queue several chunks in order.
    pub fn enqueue_lines(&self, chunks: &[&[u8]]) {
        let mut state = self.state.lock();
        state.read_queue.extend(chunks.iter().map(|c| c.to_vec()));
    }

    /// Serve `chunk` on every read once the queue runs dry.
    pub fn reply_forever(&self, chunk: &[u8]) {
        self.state.lock().endless_reply = Some(chunk.to_vec());
    }

    /// Queue `replies` whenever the line `command` is written.
    pub fn respond_to(&self, command: &str, replies: &[&[u8]]) {
        self.state.lock().responses.push((
            command.as_bytes().to_vec(),
            replies.iter().map(|r| r.to_vec()).collect(),
        ));
    }

    /// Accept at most `limit` bytes on the next write call.
    pub fn limit_next_write(&self, limit: usize) {
        self.state.lock().write_limit = Some(limit);
    }

    pub fn inject_fault(&self, fault: MockFault) {
        self.state.lock().faults.push(fault);
    }

    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Make the next `open()` fail with `kind`.
    pub fn fail_open(&self, kind: io::ErrorKind) {
        self.state.lock().open_error = Some(kind);
    }

    /// Every write call, in order.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Terminated command lines received, terminator stripped.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.state.lock().commands.clone()
    }

    pub fn attrs(&self) -> MockAttrs {
        self.state.lock().attrs
    }

    /// Every settings block the session wrote.
    pub fn applied_settings(&self) -> Vec<LineSettings> {
        self.state.lock().applied.clone()
    }

    /// Handles currently held open.
    pub fn open_handles(&self) -> usize {
        self.state.lock().open_handles
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    pub fn restore_count(&self) -> usize {
        self.state.lock().restores
    }

    pub fn drain_count(&self) -> usize {
        self.state.lock().drains
    }

    /// Timeout passed to each readiness wait.
    pub fn wait_timeouts(&self) -> Vec<Duration> {
        self.state.lock().waits.clone()
    }

    pub fn available_chunks(&self) -> usize {
        self.state.lock().read_queue.len()
    }
}

impl DeviceOpener for MockSerialPort {
    type Device = MockDevice;

    fn open(&self, path: &Path) -> Result<MockDevice, OpenError> {
        let mut state = self.state.lock();
        if let Some(kind) = state.open_error.take() {
            return Err(OpenError::from_io(path, io::Error::from(kind)));
        }
        state.open_handles += 1;
        state.opens += 1;
        Ok(MockDevice {
            state: Arc::clone(&self.state),
        })
    }
}

/// Open handle on a [`MockSerialPort`].
#[derive(Debug)]
pub struct MockDevice {
    state: Arc<Mutex<MockPortState>>,
}

impl TtyDevice for MockDevice {
    type Snapshot = MockSnapshot;

    fn snapshot(&mut self) -> io::Result<MockSnapshot> {
        let state = self.state.lock();
        state.check(MockFault::Snapshot)?;
        Ok(MockSnapshot(state.attrs))
    }

    fn apply(&mut self, settings: &LineSettings) -> io::Result<()> {
        let mut state = self.state.lock();
        state.check(MockFault::Apply)?;
        state.attrs = MockAttrs::Applied(*settings);
        state.applied.push(*settings);
        Ok(())
    }

    fn restore(&mut self, snapshot: &MockSnapshot) -> io::Result<()> {
        let mut state = self.state.lock();
        state.restores += 1;
        state.check(MockFault::Restore)?;
        state.attrs = snapshot.0;
        Ok(())
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut state = self.state.lock();
        state.waits.push(timeout);
        state.check(MockFault::Wait)?;
        Ok(state.has_data())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.check(MockFault::Write)?;
        let accepted = match state.write_limit.take() {
            Some(limit) => limit.min(data.len()),
            None => data.len(),
        };
        state.write_log.push(data[..accepted].to_vec());
        state.record_written(&data[..accepted]);
        Ok(accepted)
    }

    fn drain(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.drains += 1;
        state.check(MockFault::Drain)
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.check(MockFault::Read)?;

        let mut chunk = match state.read_queue.pop_front() {
            Some(chunk) => chunk,
            None => match &state.endless_reply {
                Some(reply) => reply.clone(),
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::WouldBlock,
                        "No data available",
                    ))
                }
            },
        };

        let n = chunk.len().min(buffer.len());
        buffer[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            // Canonical reads hand out the rest of a line on the next call.
            state.read_queue.push_front(chunk.split_off(n));
        }
        Ok(n)
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}
