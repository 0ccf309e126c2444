use criterion::{Criterion, black_box, criterion_group, criterion_main};
use parabolica::geometry::{CurveBuilder, CurveConfig, CurveType, Normalizer};
use parabolica::telemetry::{Sample, SampleSequence};
use std::time::Duration;

/// A synthetic lap shaped like a rough oval, sampled at the given count.
/// Coordinates are in decimeters like a real positional feed.
fn create_lap(sample_count: usize) -> SampleSequence {
    let samples: Vec<Sample> = (0..sample_count)
        .map(|i| {
            let theta = i as f64 / sample_count as f64 * std::f64::consts::TAU;
            Sample::new(
                i as f64 * 0.1,
                4000.0 * theta.cos(),
                2500.0 * theta.sin(),
            )
            .with_z(30.0 * (2.0 * theta).sin())
            .with_speed(180.0 + 120.0 * theta.sin().abs())
        })
        .collect();
    SampleSequence::new(samples).expect("non-empty lap")
}

fn bench_normalizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalizer");
    let config = CurveConfig::default();

    for sample_count in [100usize, 1_000, 10_000] {
        let seq = create_lap(sample_count);
        group.bench_function(format!("normalize_{}_samples", sample_count), |b| {
            let normalizer = Normalizer::new();
            b.iter(|| black_box(normalizer.normalize(black_box(&seq), &config).unwrap()));
        });
    }

    group.finish();
}

fn bench_curve_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("curve_builder");

    let seq = create_lap(1_000);
    let normalizer = Normalizer::new();

    for curve_type in [CurveType::Nurbs, CurveType::Bezier] {
        let config = CurveConfig {
            curve_type,
            ..Default::default()
        };
        let track = normalizer.normalize(&seq, &config).unwrap();

        group.bench_function(format!("build_{:?}_1000_points", curve_type), |b| {
            let builder = CurveBuilder::new();
            b.iter(|| black_box(builder.build("bench", black_box(&track), &config).unwrap()));
        });

        let curve = CurveBuilder::new().build("bench", &track, &config).unwrap();
        group.bench_function(format!("evaluate_{:?}_1000_points", curve_type), |b| {
            b.iter(|| black_box(curve.evaluate()));
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let seq = create_lap(1_000);

    group.bench_function("serialize_sequence", |b| {
        b.iter(|| black_box(serde_json::to_string(&seq).unwrap()));
    });

    let json = serde_json::to_string(&seq).unwrap();
    group.bench_function("deserialize_sequence", |b| {
        b.iter(|| black_box(serde_json::from_str::<SampleSequence>(&json).unwrap()));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = bench_normalizer, bench_curve_builder, bench_serialization
}
criterion_main!(benches);
