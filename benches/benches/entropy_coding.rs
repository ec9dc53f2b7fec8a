//! Benchmarks for the bitstream primitives: prefix-code construction and
//! raw bit emission.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jxls_bitstream::{BitWriter, PrefixCode};
use jxls_core::consts::{NUM_LZ77_SYMBOLS, NUM_RAW_SYMBOLS};

const UP_TO_8_MIN: [u8; 12] = [0; 12];
const UP_TO_8_MAX: [u8; 12] = [7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 10];

fn sample_counts() -> ([u64; NUM_RAW_SYMBOLS], [u64; NUM_LZ77_SYMBOLS]) {
    let mut raw = [0u64; NUM_RAW_SYMBOLS];
    for (i, f) in raw.iter_mut().enumerate().take(11) {
        *f = (983_040 >> i) + 1;
    }
    let mut lz77 = [0u64; NUM_LZ77_SYMBOLS];
    for (i, f) in lz77.iter_mut().enumerate() {
        *f = 640 / (i as u64 + 1) + 1;
    }
    (raw, lz77)
}

fn bench_prefix_code_build(c: &mut Criterion) {
    let (raw, lz77) = sample_counts();
    c.bench_function("prefix_code_build", |b| {
        b.iter(|| {
            PrefixCode::new(
                black_box(&UP_TO_8_MIN),
                black_box(&UP_TO_8_MAX),
                black_box(&raw),
                black_box(&lz77),
            )
        })
    });
}

fn bench_prefix_code_write(c: &mut Criterion) {
    let (raw, lz77) = sample_counts();
    let code = PrefixCode::new(&UP_TO_8_MIN, &UP_TO_8_MAX, &raw, &lz77);
    c.bench_function("prefix_code_write_to", |b| {
        b.iter(|| {
            let mut writer = BitWriter::new();
            writer.allocate(512);
            code.write_to(&mut writer);
            black_box(writer.bytes_written())
        })
    });
}

fn bench_bitwriter_throughput(c: &mut Criterion) {
    let nbits: Vec<u64> = (0..4096).map(|i| 1 + (i % 24) as u64).collect();
    let bits: Vec<u64> = nbits.iter().map(|&n| (1u64 << n) - 1).collect();
    c.bench_function("bitwriter_write_multiple_4k", |b| {
        b.iter(|| {
            let mut writer = BitWriter::new();
            writer.allocate(4096 * 24);
            writer.write_multiple(black_box(&nbits), black_box(&bits));
            black_box(writer.bytes_written())
        })
    });
}

criterion_group!(
    benches,
    bench_prefix_code_build,
    bench_prefix_code_write,
    bench_bitwriter_throughput
);
criterion_main!(benches);
