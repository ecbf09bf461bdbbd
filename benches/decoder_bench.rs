//! Performance benchmarks for the coin line codec and decoder.
//!
//! The acceptor produces a handful of lines per second, so these exist to
//! catch accidental regressions (allocation storms, quadratic scans) rather
//! than to chase throughput.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench decoder_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kiosk_protocol::{CoinDecoder, CoinLineCodec, Effect};
use std::hint::black_box;
use std::time::{Duration, Instant};
use tokio_util::codec::Decoder;

/// Mixed traffic: direct coins, split pairs, noise and unsupported values.
const TRAFFIC: [&str; 8] = ["5", "1", "0", "20", "ERR", "7", "2", "0"];

/// Benchmark decoding a mixed line sequence.
fn bench_decode_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder_mixed");
    group.throughput(Throughput::Elements(TRAFFIC.len() as u64));

    group.bench_function("process_lines", |b| {
        b.iter(|| {
            let mut decoder = CoinDecoder::new();
            let now = Instant::now();
            let mut credited = 0u32;
            for (i, line) in TRAFFIC.iter().enumerate() {
                let at = now + Duration::from_millis(i as u64 * 10);
                for effect in decoder.process_line(black_box(line), at) {
                    if let Effect::Credit(acceptance) = effect {
                        credited += acceptance.denomination.value();
                    }
                }
            }
            black_box(credited);
        });
    });

    group.finish();
}

/// Benchmark line framing at various burst sizes.
fn bench_line_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_codec");

    for lines in [1usize, 16, 256] {
        let payload = "10\r\n".repeat(lines);
        group.throughput(Throughput::Bytes(payload.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(lines), &payload, |b, payload| {
            b.iter(|| {
                let mut codec = CoinLineCodec::new();
                let mut buffer = BytesMut::from(payload.as_bytes());
                let mut count = 0;
                while let Some(line) = codec.decode(&mut buffer).unwrap() {
                    black_box(line);
                    count += 1;
                }
                black_box(count);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode_mixed, bench_line_codec);
criterion_main!(benches);
