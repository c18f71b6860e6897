//! Session, transceiver and runner behaviour against a simulated peer.

mod common;

use common::{bounded, mock_config, mock_peer, ready_session, MOCK_PATH};
use pretty_assertions::assert_eq;
use std::time::Duration;
use trx::line::{FramingOptions, LineTransceiver, MalformedFrame};
use trx::port::{BaudRate, LineLimit, MockAttrs, MockSerialPort, SerialPortSession, SessionState};
use trx::runner::{CommandRunner, EndReason, LineSink};
use trx::{CancellationToken, Line, LineError, LineOutcome};

#[test]
fn test_batch_keeps_command_order() {
    let peer = mock_peer(&[
        ("A", &[b"a1\r\n", b"a2\r\n"]),
        ("B", &[b"b1\r\n"]),
        ("C", &[]),
    ]);
    let mut session = ready_session(&peer);
    let mut runner = CommandRunner::new(
        &mut session,
        &mock_config(LineLimit::Unbounded),
        FramingOptions::default(),
        CancellationToken::new(),
    );

    let mut lines: Vec<Line> = Vec::new();
    let batch = runner.run_batch(["A", "B", "C"], &mut lines).unwrap();

    assert_eq!(
        lines,
        vec![Line::from("a1"), Line::from("a2"), Line::from("b1")]
    );
    assert_eq!(
        batch.reports.iter().map(|r| r.lines).collect::<Vec<_>>(),
        vec![2, 1, 0]
    );
    assert_eq!(batch.total_lines(), 3);
    assert_eq!(peer.commands(), vec![b"A".to_vec(), b"B".to_vec(), b"C".to_vec()]);
}

#[test]
fn test_unread_lines_do_not_leak_into_next_command() {
    let peer = mock_peer(&[("A", &[b"a1\ra2\n"]), ("B", &[b"b1\n"])]);
    let mut session = ready_session(&peer);
    let mut runner = CommandRunner::new(
        &mut session,
        &mock_config(bounded(1)),
        FramingOptions::default(),
        CancellationToken::new(),
    );

    let mut a_lines: Vec<Line> = Vec::new();
    let a = runner.run("A", &mut a_lines).unwrap();
    assert_eq!(a_lines, vec![Line::from("a1")]);
    assert_eq!(a.end, EndReason::LimitReached);

    let mut b_lines: Vec<Line> = Vec::new();
    let b = runner.run("B", &mut b_lines).unwrap();
    assert_eq!(b_lines, vec![Line::from("b1")]);
    assert_eq!(b.end, EndReason::LimitReached);
}

#[test]
fn test_commands_are_terminated_and_drained() {
    let peer = MockSerialPort::new();
    let mut session = ready_session(&peer);
    let mut runner = CommandRunner::new(
        &mut session,
        &mock_config(bounded(1)),
        FramingOptions::default(),
        CancellationToken::new(),
    );

    runner.run("MEAS:VOLT?\n", &mut Vec::<Line>::new()).unwrap();

    assert_eq!(peer.get_write_log().concat(), b"MEAS:VOLT?\r".to_vec());
    assert_eq!(peer.drain_count(), 1);
}

#[test]
fn test_empty_line_counts_toward_limit() {
    let peer = mock_peer(&[("Q", &[b"\r\n", b"value\r\n"])]);
    let mut session = ready_session(&peer);
    let mut runner = CommandRunner::new(
        &mut session,
        &mock_config(bounded(1)),
        FramingOptions::default(),
        CancellationToken::new(),
    );

    let mut lines: Vec<Line> = Vec::new();
    let report = runner.run("Q", &mut lines).unwrap();
    assert_eq!(lines, vec![Line::from("")]);
    assert_eq!(report.end, EndReason::LimitReached);
}

#[test]
fn test_limit_never_exceeded() {
    for n in 1..=5 {
        let peer = MockSerialPort::new();
        peer.reply_forever(b"x\n");
        let mut session = ready_session(&peer);
        let mut runner = CommandRunner::new(
            &mut session,
            &mock_config(bounded(n)),
            FramingOptions::default(),
            CancellationToken::new(),
        );
        let report = runner.run("GO", &mut Vec::<Line>::new()).unwrap();
        assert_eq!(report.lines, n);
    }
}

#[test]
fn test_crlf_split_across_reads() {
    let peer = MockSerialPort::new();
    peer.enqueue_lines(&[b"first\r", b"\nsecond\r\n"]);
    let mut session = ready_session(&peer);
    let mut transceiver = LineTransceiver::new(&mut session, FramingOptions::default());

    let timeout = Duration::from_millis(20);
    assert_eq!(transceiver.receive_line(timeout).into_line(), Some(Line::from("first")));
    assert_eq!(transceiver.receive_line(timeout).into_line(), Some(Line::from("second")));
    assert!(transceiver.receive_line(timeout).is_timed_out());
}

#[test]
fn test_overlong_partial_line_is_malformed() {
    let peer = MockSerialPort::new();
    peer.enqueue_read(&[b'z'; 64]);
    let mut session = ready_session(&peer);
    let options = FramingOptions {
        max_line_length: 16,
        read_chunk_size: 8,
    };
    let mut transceiver = LineTransceiver::new(&mut session, options);

    match transceiver.receive_line(Duration::from_millis(20)) {
        LineOutcome::Error(LineError::MalformedFrame(MalformedFrame::Overlong { limit })) => {
            assert_eq!(limit, 16)
        }
        other => panic!("expected overlong frame, got {other:?}"),
    }
}

#[test]
fn test_close_restores_original_settings() {
    let peer = MockSerialPort::new();
    let mut session = ready_session(&peer);
    assert!(matches!(peer.attrs(), MockAttrs::Applied(_)));

    session.close().unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(peer.attrs(), MockAttrs::Factory);
    assert_eq!(peer.open_handles(), 0);
}

#[test]
fn test_reconfigure_keeps_first_snapshot() {
    let peer = MockSerialPort::new();
    let mut session = SerialPortSession::new(MOCK_PATH);
    session.open(&peer).unwrap();
    session.configure(BaudRate::B9600).unwrap();
    session.configure(BaudRate::B38400).unwrap();
    session.close().unwrap();

    assert_eq!(peer.attrs(), MockAttrs::Factory);
}

#[test]
fn test_cancel_before_batch_sends_nothing() {
    let peer = MockSerialPort::new();
    let token = CancellationToken::new();
    token.cancel();
    let mut session = ready_session(&peer);
    let mut runner = CommandRunner::new(
        &mut session,
        &mock_config(LineLimit::Unbounded),
        FramingOptions::default(),
        token,
    );

    let batch = runner.run_batch(["A", "B"], &mut Vec::<Line>::new()).unwrap();
    assert!(batch.cancelled);
    assert!(batch.reports.is_empty());
    assert!(peer.commands().is_empty());
}

#[test]
fn test_sink_sees_command_and_finish() {
    #[derive(Default)]
    struct Recorder(Vec<String>);
    impl LineSink for Recorder {
        fn command(&mut self, command: &str) -> std::io::Result<()> {
            self.0.push(format!("> {command}"));
            Ok(())
        }
        fn line(&mut self, line: &Line) -> std::io::Result<()> {
            self.0.push(format!("< {line}"));
            Ok(())
        }
        fn finished(&mut self, report: &trx::CommandReport) -> std::io::Result<()> {
            self.0.push(format!("= {:?}", report.end));
            Ok(())
        }
    }

    let peer = mock_peer(&[("PING", &[b"PONG\n"])]);
    let mut session = ready_session(&peer);
    let mut runner = CommandRunner::new(
        &mut session,
        &mock_config(bounded(1)),
        FramingOptions::default(),
        CancellationToken::new(),
    );

    let mut recorder = Recorder::default();
    runner.run("PING", &mut recorder).unwrap();
    assert_eq!(recorder.0, vec!["> PING", "< PONG", "= LimitReached"]);
}
