//! End-to-end encoding benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use jxls::{encode, EncoderOptions, RayonRunner, SequentialRunner};

fn gradient_rgba(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = vec![0u8; width * height * 4];
    for y in 0..height {
        for x in 0..width {
            let px = &mut pixels[(y * width + x) * 4..][..4];
            px[0] = (x & 0xFF) as u8;
            px[1] = (y & 0xFF) as u8;
            px[2] = ((x ^ y) & 0xFF) as u8;
            px[3] = 255;
        }
    }
    pixels
}

fn bench_encode_256(c: &mut Criterion) {
    let pixels = gradient_rgba(256, 256);
    let options = EncoderOptions::new(256, 256, 4).effort(1);
    let mut group = c.benchmark_group("encode_256x256_rgba");
    group.throughput(Throughput::Bytes(pixels.len() as u64));
    group.bench_function("sequential", |b| {
        b.iter(|| encode(black_box(&pixels), 256 * 4, &options, Some(&SequentialRunner)).unwrap())
    });
    group.finish();
}

fn bench_encode_1024(c: &mut Criterion) {
    let pixels = gradient_rgba(1024, 1024);
    let options = EncoderOptions::new(1024, 1024, 4).effort(1);
    let mut group = c.benchmark_group("encode_1024x1024_rgba");
    group.throughput(Throughput::Bytes(pixels.len() as u64));
    group.bench_function("sequential", |b| {
        b.iter(|| encode(black_box(&pixels), 1024 * 4, &options, Some(&SequentialRunner)).unwrap())
    });
    group.bench_function("rayon", |b| {
        b.iter(|| encode(black_box(&pixels), 1024 * 4, &options, Some(&RayonRunner)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_encode_256, bench_encode_1024);
criterion_main!(benches);
