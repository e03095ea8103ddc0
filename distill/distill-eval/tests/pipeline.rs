//! End-to-end distillation pipeline: build a teacher dataset, fit the
//! closed-form oracle, gate and export it, then score it in closed loop.
//!
//! The build is deliberately small; the point is that every stage hands a
//! valid artifact to the next, not statistical strength.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::time::Duration;

use alloc_types::VehicleGeometry;
use distill_dataset::{BuildConfig, DatasetBuilder, EpisodeConfig, WindStrata};
use distill_eval::{EvalConfig, EvalHarness, EvaluationReport};
use distill_oracle::{export_oracle, AcceptanceCriteria, LinearRegressor, RidgeConfig};

fn short_episode() -> EpisodeConfig {
    EpisodeConfig {
        duration: 1.0,
        warmup: 0.25,
        record_stride: 5,
        ..EpisodeConfig::default()
    }
}

#[test]
fn teacher_to_deployment_pipeline() {
    // Stage 1: teacher dataset over one wind stratum.
    let strata = WindStrata::uniform(13.0, 1).unwrap();
    let mut build = BuildConfig::new(strata);
    build.target_samples = 90;
    build.max_episodes = 24;
    build.min_fraction = 0.5;
    build.seed = 42;
    build.episode = short_episode();

    let builder = DatasetBuilder::new(VehicleGeometry::tilted_octo(), build).unwrap();
    let dataset = builder.build().unwrap();
    assert!(dataset.summary.total_samples >= 90);

    // Stage 2: closed-form fit.
    let model = LinearRegressor::fit(&dataset, RidgeConfig::default()).unwrap();

    // Stage 3: acceptance. An impossible latency budget blocks export; a
    // relaxed fidelity threshold lets this small fit through.
    let mut strict = AcceptanceCriteria::default().with_min_r2(0.0);
    strict.min_latency_samples = 200;
    strict.max_latency = Duration::from_nanos(1);
    let err = export_oracle(&model, &dataset, &strict).unwrap_err();
    assert!(err.is_gate_rejection(), "unexpected error: {err}");

    let mut criteria = AcceptanceCriteria::default().with_min_r2(0.0);
    criteria.min_latency_samples = 500;
    let artifact = export_oracle(&model, &dataset, &criteria).unwrap();

    assert_eq!(artifact.output_schema, vec!["z1", "z2"]);
    assert_eq!(
        artifact.metadata.fidelity.samples,
        dataset.val_samples().len()
    );
    assert_eq!(artifact.metadata.dataset, dataset.summary);

    // Stage 4: closed-loop evaluation with a sweep point past the
    // training envelope.
    let eval = EvalConfig {
        episodes_per_point: 1,
        gust_std: 0.3,
        episode: short_episode(),
        sweep_speeds: vec![4.0, 14.0],
        seed: 5,
    };
    let harness = EvalHarness::new(VehicleGeometry::tilted_octo(), eval).unwrap();
    let report = harness.evaluate(&artifact, &dataset).unwrap();

    assert_eq!(report.savings_by_stratum.len(), 1);
    assert_eq!(report.savings_by_stratum[0].episodes, 1);
    assert_eq!(report.savings_by_stratum[0].rejected, 0);
    assert!(report.power_statistics.baseline.mean > 0.0);
    assert!(report.power_statistics.savings_percent.is_finite());

    assert_eq!(
        report.oracle_performance.fidelity.samples,
        dataset.test_samples().len()
    );
    assert_eq!(report.oracle_performance.latency, artifact.metadata.latency);

    assert_eq!(report.robustness_curve.len(), 2);
    let near = &report.robustness_curve[0];
    let far = &report.robustness_curve[1];
    assert_eq!(near.wind_speed, 4.0);
    assert!(near.in_distribution);
    assert_eq!(near.fidelity.samples, 15);
    assert_eq!(far.wind_speed, 14.0);
    assert!(!far.in_distribution);
    assert_eq!(far.fidelity.samples, 15);

    // The report survives its JSON form and reads back identically.
    let text = report.to_json().unwrap();
    let restored = EvaluationReport::from_json(&text).unwrap();
    assert_eq!(restored, report);
    assert!(report.summary().contains("Robustness sweep:"));
}
