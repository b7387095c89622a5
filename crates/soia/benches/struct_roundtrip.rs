use criterion::{black_box, criterion_group, criterion_main, Criterion};
use soia::serializer::{int32_serializer, string_serializer};
use soia::struct_ser::StructBuilder;
use soia::{Serializer, UnrecognizedFields};

#[derive(Clone, Default)]
struct Point {
    x: i32,
    y: i32,
    label: String,
    unrecognized: UnrecognizedFields,
}

#[derive(Default)]
struct PointBuilder {
    x: i32,
    y: i32,
    label: String,
    unrecognized: UnrecognizedFields,
}

fn point_serializer() -> Serializer<Point> {
    StructBuilder::new(
        "bench.soia:Point",
        PointBuilder::default,
        |b: PointBuilder| Point {
            x: b.x,
            y: b.y,
            label: b.label,
            unrecognized: b.unrecognized,
        },
        |p: &Point| &p.unrecognized,
        |b: &mut PointBuilder, u| b.unrecognized = u,
    )
    .add_field(0, "x", int32_serializer(), |p: &Point| p.x, |b: &mut PointBuilder, v| b.x = v)
    .add_field(1, "y", int32_serializer(), |p: &Point| p.y, |b: &mut PointBuilder, v| b.y = v)
    .add_field(
        2,
        "label",
        string_serializer(),
        |p: &Point| p.label.clone(),
        |b: &mut PointBuilder, v| b.label = v,
    )
    .finalize()
}

fn bench_round_trip(c: &mut Criterion) {
    let serializer = point_serializer();
    let point = Point {
        x: 12,
        y: -34,
        label: "sensor-7".to_string(),
        unrecognized: UnrecognizedFields::new(),
    };

    c.bench_function("struct_encode", |b| {
        b.iter(|| serializer.to_bytes(black_box(&point)))
    });

    let bytes = serializer.to_bytes(&point);
    c.bench_function("struct_decode", |b| {
        b.iter(|| serializer.from_bytes(black_box(&bytes), true).unwrap())
    });
}

criterion_group!(benches, bench_round_trip);
criterion_main!(benches);
