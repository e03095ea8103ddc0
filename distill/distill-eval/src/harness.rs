//! Closed-loop evaluation of an exported oracle.
//!
//! The harness flies the oracle in paired episodes against the minimum-norm
//! baseline: both flights share the wind realization and estimate noise, so
//! the power difference is attributable to the coefficients alone. Stratum
//! flights cover the training envelope at bin centers; the robustness sweep
//! adds configured speeds, including some past the envelope, to show where
//! fidelity and savings fall off.
//!
//! The harness is read-only over the artifact and the dataset.

use std::f64::consts::TAU;

use nalgebra::Vector3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use alloc_core::{PowerModel, PowerStatistics};
use alloc_types::VehicleGeometry;
use sim_omav::EpisodeParams;

use distill_dataset::{
    DistillSample, EpisodeConfig, EpisodeRunner, FlightMode, FrozenDataset, InferenceMode, Policy,
    WindStrata, ZeroPolicy,
};
use distill_oracle::{evaluate, OracleArtifact};

use crate::error::{EvalError, Result};
use crate::report::{
    EvaluationReport, OraclePerformance, PowerComparison, RobustnessPoint, StratumSavings,
};

/// Everything an evaluation needs besides the vehicle and the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalConfig {
    /// Episode pairs flown per stratum and per sweep point.
    pub episodes_per_point: usize,
    /// Gust standard deviation for evaluation flights (m/s).
    pub gust_std: f64,
    /// Per-episode timing and labeling knobs.
    pub episode: EpisodeConfig,
    /// Wind speeds of the robustness sweep (m/s); points past the training
    /// strata are reported as out of distribution.
    pub sweep_speeds: Vec<f64>,
    /// Master seed; flight seeds are derived from it.
    pub seed: u64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            episodes_per_point: 4,
            gust_std: 0.5,
            episode: EpisodeConfig::default(),
            sweep_speeds: vec![0.0, 3.0, 6.0, 9.0, 12.0, 15.0],
            seed: 17,
        }
    }
}

impl EvalConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.episodes_per_point == 0 {
            return Err(EvalError::invalid_config(
                "episodes_per_point must be positive",
            ));
        }
        if !(self.gust_std >= 0.0 && self.gust_std.is_finite()) {
            return Err(EvalError::invalid_config("gust_std must be non-negative"));
        }
        if self.sweep_speeds.is_empty() {
            return Err(EvalError::invalid_config(
                "sweep_speeds must name at least one speed",
            ));
        }
        if !self.sweep_speeds.iter().all(|s| s.is_finite() && *s >= 0.0) {
            return Err(EvalError::invalid_config(
                "sweep speeds must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Flies and scores exported oracles.
#[derive(Debug)]
pub struct EvalHarness {
    runner: EpisodeRunner,
    config: EvalConfig,
}

impl EvalHarness {
    /// Build a harness for a nominal vehicle.
    ///
    /// # Errors
    ///
    /// Rejects invalid configurations and geometries up front.
    pub fn new(nominal: VehicleGeometry, config: EvalConfig) -> Result<Self> {
        config.validate()?;
        let runner = EpisodeRunner::new(nominal, config.episode.clone())?;
        Ok(Self { runner, config })
    }

    /// Score an artifact against a frozen dataset and fresh flights.
    ///
    /// Recomputes fidelity on the held-out test split, flies paired
    /// oracle-vs-baseline episodes per training stratum, and sweeps the
    /// configured wind speeds. Overall power statistics cover the stratum
    /// flights; sweep points appear only on the curve.
    ///
    /// # Errors
    ///
    /// Schema rejection before any flight; [`EvalError::EpisodesExhausted`]
    /// when every episode at one point is rejected; layer failures
    /// propagate.
    pub fn evaluate(
        &self,
        artifact: &OracleArtifact,
        dataset: &FrozenDataset,
    ) -> Result<EvaluationReport> {
        artifact.validate_schema(&dataset.schema)?;
        let oracle = artifact.to_regressor()?;
        let fidelity = evaluate(&oracle, &dataset.test_samples())?;
        let strata = WindStrata::from_edges(dataset.summary.coverage.edges.clone())?;
        let baseline = ZeroPolicy::new(dataset.schema.coeff_dim());

        let mut savings_by_stratum = Vec::with_capacity(strata.bin_count());
        let mut overall_baseline = Vec::new();
        let mut overall_oracle = Vec::new();
        let mut point = 0u64;

        for bin in 0..strata.bin_count() {
            let lower = strata.edges()[bin];
            let upper = strata.edges()[bin + 1];
            let speed = 0.5 * (lower + upper);
            let flights = self.fly_point(&oracle, &baseline, speed, point)?;
            point += 1;

            overall_baseline.extend_from_slice(&flights.baseline_powers);
            overall_oracle.extend_from_slice(&flights.oracle_powers);
            savings_by_stratum.push(StratumSavings {
                lower,
                upper,
                episodes: flights.oracle_powers.len(),
                rejected: flights.rejected,
                power_baseline: power_stats(&flights.baseline_powers)?,
                power_oracle: power_stats(&flights.oracle_powers)?,
                savings_percent: flights.savings_percent(),
            });
            debug!(speed, savings = flights.savings_percent(), "stratum flown");
        }

        let mut robustness_curve = Vec::with_capacity(self.config.sweep_speeds.len());
        for &speed in &self.config.sweep_speeds {
            let flights = self.fly_point(&oracle, &baseline, speed, point)?;
            point += 1;

            let refs: Vec<&DistillSample> = flights.samples.iter().collect();
            robustness_curve.push(RobustnessPoint {
                wind_speed: speed,
                in_distribution: strata.bin_of(speed).is_some(),
                episodes: flights.oracle_powers.len(),
                rejected: flights.rejected,
                fidelity: evaluate(&oracle, &refs)?,
                savings_percent: flights.savings_percent(),
            });
            debug!(speed, savings = flights.savings_percent(), "sweep point flown");
        }

        let baseline_stats = power_stats(&overall_baseline)?;
        let oracle_stats = power_stats(&overall_oracle)?;
        let report = EvaluationReport {
            power_statistics: PowerComparison {
                baseline: baseline_stats,
                oracle: oracle_stats,
                savings_percent: PowerModel::savings_percent(
                    baseline_stats.mean,
                    oracle_stats.mean,
                ),
            },
            savings_by_stratum,
            oracle_performance: OraclePerformance {
                fidelity,
                latency: artifact.metadata.latency,
            },
            robustness_curve,
        };
        info!(
            strata = report.savings_by_stratum.len(),
            sweep_points = report.robustness_curve.len(),
            savings = report.power_statistics.savings_percent,
            "evaluation complete"
        );
        Ok(report)
    }

    /// Fly paired episodes at one wind speed.
    ///
    /// Episode seeds derive from the master seed by global episode index;
    /// each pair shares its seed, so both policies see the same wind.
    fn fly_point(
        &self,
        oracle: &dyn Policy,
        baseline: &dyn Policy,
        speed: f64,
        point: u64,
    ) -> Result<PointFlights> {
        let per_point = self.config.episodes_per_point as u64;
        let mut flights = PointFlights::default();

        for e in 0..per_point {
            let index = point * per_point + e;
            let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(index));
            let theta = rng.gen_range(0.0..TAU);
            let flight_seed: u64 = rng.gen();

            let mut params = EpisodeParams::nominal(self.runner.nominal());
            params.wind_speed = speed;
            params.wind_mean = Vector3::new(theta.cos(), theta.sin(), 0.0) * speed;
            params.gust_std = self.config.gust_std;

            let pair = self
                .runner
                .run(
                    index,
                    &params,
                    flight_seed,
                    FlightMode::Policy(oracle, InferenceMode::Deterministic),
                )
                .and_then(|oracle_flight| {
                    self.runner
                        .run(
                            index,
                            &params,
                            flight_seed,
                            FlightMode::Policy(baseline, InferenceMode::Deterministic),
                        )
                        .map(|baseline_flight| (oracle_flight, baseline_flight))
                });
            match pair {
                Ok((oracle_flight, baseline_flight)) => {
                    flights.oracle_powers.push(oracle_flight.mean_power_flown);
                    flights.baseline_powers.push(baseline_flight.mean_power_flown);
                    flights.samples.extend(oracle_flight.samples);
                }
                Err(err) if err.is_episode_rejection() => {
                    flights.rejected += 1;
                    warn!(speed, episode = index, error = %err, "evaluation episode rejected");
                }
                Err(err) => return Err(err.into()),
            }
        }

        if flights.oracle_powers.is_empty() {
            return Err(EvalError::EpisodesExhausted {
                wind_speed: speed,
                attempted: self.config.episodes_per_point,
            });
        }
        Ok(flights)
    }
}

#[derive(Default)]
struct PointFlights {
    baseline_powers: Vec<f64>,
    oracle_powers: Vec<f64>,
    samples: Vec<DistillSample>,
    rejected: usize,
}

impl PointFlights {
    fn savings_percent(&self) -> f64 {
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        PowerModel::savings_percent(mean(&self.baseline_powers), mean(&self.oracle_powers))
    }
}

fn power_stats(values: &[f64]) -> Result<PowerStatistics> {
    PowerStatistics::from_values(values)
        .ok_or_else(|| EvalError::invalid_config("no power values to summarize"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use nalgebra::{DMatrix, DVector};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use distill_dataset::{Dataset, DatasetSchema, EpisodeOutcome, SplitRatio};
    use distill_oracle::{
        FidelityReport, LinearRegressor, OracleMetadata, RidgeConfig,
    };
    use sim_omav::OBS_DIM;

    fn quick_config() -> EvalConfig {
        EvalConfig {
            episodes_per_point: 1,
            gust_std: 0.3,
            episode: EpisodeConfig {
                duration: 0.5,
                warmup: 0.1,
                record_stride: 5,
                ..EpisodeConfig::default()
            },
            sweep_speeds: vec![7.0],
            seed: 3,
        }
    }

    /// Frozen dataset with synthetic samples spread over two strata.
    fn synthetic_dataset(rows: usize) -> FrozenDataset {
        let mut rng = ChaCha8Rng::seed_from_u64(51);
        let strata = WindStrata::uniform(6.0, 2).unwrap();
        let mut dataset = Dataset::new(DatasetSchema::new(2), strata);

        let samples: Vec<DistillSample> = (0..rows)
            .map(|step| {
                let mut observation = [0.0; OBS_DIM];
                for v in &mut observation {
                    *v = rng.gen_range(-1.0..1.0);
                }
                let coefficients = vec![
                    0.6 * observation[0] + 0.1,
                    -0.4 * observation[2],
                ];
                let mut params = EpisodeParams::nominal(&VehicleGeometry::tilted_octo());
                params.wind_speed = rng.gen_range(0.0..6.0);
                DistillSample {
                    episode: 0,
                    step,
                    observation,
                    coefficients,
                    params,
                    power_baseline: 100.0,
                    power_teacher: 92.0,
                }
            })
            .collect();

        let params = EpisodeParams::nominal(&VehicleGeometry::tilted_octo());
        dataset.record_episode(EpisodeOutcome {
            samples,
            params,
            steps: rows,
            rms_position_error: 0.0,
            mean_power_flown: 0.0,
            fallback_steps: 0,
        });
        dataset.freeze(1, SplitRatio::default(), Some(13)).unwrap()
    }

    /// Artifact wrapping a regressor that always outputs zero, built
    /// against the dataset's schema.
    fn zero_artifact(dataset: &FrozenDataset, outputs: usize) -> OracleArtifact {
        let regressor = LinearRegressor::from_parts(
            DMatrix::zeros(outputs, OBS_DIM),
            DVector::zeros(outputs),
            RidgeConfig::default(),
        )
        .unwrap();
        let metadata = OracleMetadata {
            fidelity: FidelityReport {
                r_squared: vec![1.0; outputs],
                rmse: vec![0.0; outputs],
                samples: dataset.samples.len(),
            },
            latency: Duration::from_micros(10),
            dataset: dataset.summary.clone(),
        };
        let schema = DatasetSchema::new(outputs);
        OracleArtifact::new(&regressor, &schema, metadata).unwrap()
    }

    #[test]
    fn zero_oracle_matches_the_baseline_exactly() {
        let dataset = synthetic_dataset(80);
        let artifact = zero_artifact(&dataset, 2);
        let harness = EvalHarness::new(VehicleGeometry::tilted_octo(), quick_config()).unwrap();

        let report = harness.evaluate(&artifact, &dataset).unwrap();

        // Two training strata at bin centers, one sweep point past the
        // envelope.
        assert_eq!(report.savings_by_stratum.len(), 2);
        assert_eq!(report.savings_by_stratum[0].lower, 0.0);
        assert_eq!(report.savings_by_stratum[1].upper, 6.0);
        assert_eq!(report.robustness_curve.len(), 1);
        assert_eq!(report.robustness_curve[0].wind_speed, 7.0);
        assert!(!report.robustness_curve[0].in_distribution);

        // A zero-weight oracle flies the same commands as the baseline, so
        // the paired comparison cancels exactly.
        for stratum in &report.savings_by_stratum {
            assert_eq!(stratum.episodes, 1);
            assert_eq!(stratum.rejected, 0);
            assert!(stratum.savings_percent.abs() < 1e-12);
        }
        assert!(report.power_statistics.savings_percent.abs() < 1e-12);
        assert!(report.power_statistics.baseline.mean > 0.0);

        // Labels vary while the oracle predicts a constant, so held-out
        // fidelity is poor; the harness reports it rather than gating.
        assert!(report.oracle_performance.fidelity.r_squared.iter().all(|r| *r < 0.5));
        assert_eq!(report.oracle_performance.latency, Duration::from_micros(10));
    }

    #[test]
    fn mismatched_artifact_is_rejected_before_flying() {
        let dataset = synthetic_dataset(80);
        let artifact = zero_artifact(&dataset, 3);
        let harness = EvalHarness::new(VehicleGeometry::tilted_octo(), quick_config()).unwrap();

        let err = harness.evaluate(&artifact, &dataset).unwrap_err();
        assert!(matches!(err, EvalError::Oracle(_)));
    }

    #[test]
    fn degenerate_configs_are_rejected_up_front() {
        let geometry = VehicleGeometry::tilted_octo();

        let mut config = quick_config();
        config.episodes_per_point = 0;
        assert!(matches!(
            EvalHarness::new(geometry.clone(), config).unwrap_err(),
            EvalError::InvalidConfig { .. }
        ));

        let mut config = quick_config();
        config.sweep_speeds.clear();
        assert!(matches!(
            EvalHarness::new(geometry.clone(), config).unwrap_err(),
            EvalError::InvalidConfig { .. }
        ));

        let mut config = quick_config();
        config.sweep_speeds = vec![f64::NAN];
        assert!(matches!(
            EvalHarness::new(geometry.clone(), config).unwrap_err(),
            EvalError::InvalidConfig { .. }
        ));

        let mut config = quick_config();
        config.gust_std = -0.1;
        assert!(matches!(
            EvalHarness::new(geometry, config).unwrap_err(),
            EvalError::InvalidConfig { .. }
        ));
    }
}
