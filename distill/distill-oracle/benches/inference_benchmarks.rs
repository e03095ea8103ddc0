//! Benchmarks for oracle inference.
//!
//! Run with: `cargo bench -p distill-oracle`
//!
//! The single-call latency here is what the acceptance gate budgets; the
//! batch path bounds offline evaluation throughput.

#![allow(
    missing_docs,
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::ignored_unit_patterns
)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use distill_oracle::{LinearRegressor, Regressor, RidgeConfig};
use sim_omav::OBS_DIM;

fn setup() -> LinearRegressor {
    let mut rng = ChaCha8Rng::seed_from_u64(71);
    let inputs: Vec<Vec<f64>> = (0..512)
        .map(|_| (0..OBS_DIM).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    let targets: Vec<Vec<f64>> = inputs
        .iter()
        .map(|x| vec![0.8 * x[0] - 0.2 * x[5], 0.5 * x[2] + 0.1])
        .collect();
    LinearRegressor::fit_rows(&inputs, &targets, RidgeConfig::default()).unwrap()
}

fn bench_predict_into(c: &mut Criterion) {
    let model = setup();
    let input = [0.3; OBS_DIM];
    let mut output = [0.0; 2];

    c.bench_function("predict_into", |b| {
        b.iter(|| {
            model.predict_into(&input, &mut output).unwrap();
            black_box(&output);
        });
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let model = setup();
    let mut rng = ChaCha8Rng::seed_from_u64(72);

    let mut group = c.benchmark_group("predict_batch");
    for &rows in &[16_usize, 256, 4096] {
        let inputs: Vec<Vec<f64>> = (0..rows)
            .map(|_| (0..OBS_DIM).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(rows), &inputs, |b, inputs| {
            b.iter(|| model.predict_batch(inputs).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_predict_into, bench_predict_batch);
criterion_main!(benches);
