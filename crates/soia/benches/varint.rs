use criterion::{black_box, criterion_group, criterion_main, Criterion};
use soia::varint::{decode_number, encode_length_prefix, Cursor};

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_length_prefix");
    for &n in &[10u64, 1_000, 1_000_000, 10_000_000_000] {
        group.bench_with_input(format!("{n}"), &n, |b, &n| {
            b.iter(|| {
                let mut out = Vec::with_capacity(9);
                encode_length_prefix(black_box(n), &mut out);
                out
            })
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_number");
    for &n in &[10u64, 1_000, 1_000_000, 10_000_000_000] {
        let mut bytes = Vec::new();
        encode_length_prefix(n, &mut bytes);
        group.bench_with_input(format!("{n}"), &bytes, |b, bytes| {
            b.iter(|| {
                let mut cursor = Cursor::new(black_box(bytes));
                decode_number(&mut cursor).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
