use rand::Rng;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use sensorframe::integrity::lfsr_digest16;
use sensorframe::{BitRow, BitRowSet, DecodeContext, Registry};

const CAPTURE_5IN1: &str =
    "{264}aaaaaaaaaa2dd4ee937ff7bffbef9efeaebfffff116c8008400410610151400000";
const CAPTURE_6IN1: &str = "{205}55555555545ba999263100058631fffffe66d006092bffe0cff8";

// Preamble search over a random row that almost never contains it.
fn bench_search(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let mut buf = [0u8; 128];
    for b in buf.iter_mut() {
        *b = rng.gen();
    }
    let row = BitRow::new(buf.to_vec(), buf.len() * 8).unwrap();

    let mut group = c.benchmark_group("bitbuffer");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("search", |b| {
        b.iter(|| row.search(0, &[0xaa, 0xaa, 0xaa, 0x2d, 0xd4], 40));
    });
    group.finish();
}

fn bench_lfsr(c: &mut Criterion) {
    let msg = [0u8; 23];
    let mut group = c.benchmark_group("integrity");
    group.throughput(Throughput::Bytes(msg.len() as u64));
    group.bench_function("lfsr_digest16", |b| {
        b.iter(|| lfsr_digest16(&msg, 0x8810, 0xba95));
    });
    group.finish();
}

fn bench_registry(c: &mut Criterion) {
    let registry = Registry::default();
    let ctx = DecodeContext::default();
    let five: BitRowSet = CAPTURE_5IN1.parse().unwrap();
    let six: BitRowSet = CAPTURE_6IN1.parse().unwrap();

    let mut group = c.benchmark_group("registry");
    group.bench_function("bresser_5in1", |b| {
        b.iter(|| {
            let detections = registry.decode(&ctx, &five);
            assert_eq!(detections.len(), 1);
        });
    });
    group.bench_function("bresser_6in1", |b| {
        b.iter(|| {
            let detections = registry.decode(&ctx, &six);
            assert_eq!(detections.len(), 1);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_search, bench_lfsr, bench_registry);
criterion_main!(benches);
