use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;
use trx::line::LineSplitter;
use trx::port::{BaudRate, MockSerialPort, SerialPortSession};
use trx::runner::CommandRunner;
use trx::{CancellationToken, Line, LineLimit, PortConfiguration};

fn sample_stream() -> Vec<u8> {
    (0..256)
        .map(|i| format!("CH{:02} +{:>8.4} V\r\n", i % 16, i as f64 * 0.125))
        .collect::<String>()
        .into_bytes()
}

pub fn bench_line_splitting(c: &mut Criterion) {
    let stream = sample_stream();
    let mut group = c.benchmark_group("line_splitter");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    for chunk in [16usize, 256] {
        group.bench_function(format!("chunk_{chunk}"), |b| {
            b.iter(|| {
                let mut splitter = LineSplitter::new();
                let mut count = 0usize;
                for piece in stream.chunks(chunk) {
                    splitter.push(piece);
                    while let Some(line) = splitter.next_line() {
                        count += line.as_bytes().len();
                    }
                }
                black_box(count)
            })
        });
    }
    group.finish();
}

pub fn bench_command_exchange(c: &mut Criterion) {
    let config = PortConfiguration::new(
        "/dev/mock0",
        BaudRate::B115200,
        Duration::from_millis(1),
        LineLimit::Bounded(std::num::NonZeroU32::new(16).unwrap()),
    );

    c.bench_function("command_exchange_16_lines", |b| {
        let peer = MockSerialPort::new();
        peer.reply_forever(b"READING 12.3456\r\n");
        let mut session = SerialPortSession::new("/dev/mock0");
        session.open(&peer).unwrap();
        session.configure(BaudRate::B115200).unwrap();
        let mut runner = CommandRunner::new(
            &mut session,
            &config,
            Default::default(),
            CancellationToken::new(),
        );
        b.iter(|| {
            let mut lines: Vec<Line> = Vec::with_capacity(16);
            let report = runner.run("READ?", &mut lines).unwrap();
            black_box(report.lines)
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_line_splitting, bench_command_exchange
}
criterion_main!(benches);
