//! Wall-clock inference latency measurement.
//!
//! The acceptance gate needs a latency number comparable to the deployment
//! budget, not a statistical benchmark; a mean over enough calls on one
//! reused buffer is what the gate consumes. Use the criterion benches for
//! distribution-level analysis.

use std::hint::black_box;
use std::time::{Duration, Instant};

use distill_dataset::DistillSample;

use crate::error::{OracleError, Result};
use crate::regressor::Regressor;

/// Mean single-sample inference latency over repeated calls.
#[derive(Debug, Clone, Copy)]
pub struct LatencyBenchmark {
    min_samples: usize,
}

impl LatencyBenchmark {
    /// Benchmark running at least `min_samples` inference calls.
    #[must_use]
    pub fn new(min_samples: usize) -> Self {
        Self { min_samples }
    }

    /// Measure the mean per-call latency, cycling through `samples`.
    ///
    /// One output buffer is allocated up front and reused, so the
    /// measurement sees the same allocation-free path deployment does.
    ///
    /// # Errors
    ///
    /// Rejects an empty sample set and propagates prediction failures.
    pub fn measure(
        &self,
        regressor: &dyn Regressor,
        samples: &[&DistillSample],
    ) -> Result<Duration> {
        if samples.is_empty() {
            return Err(OracleError::invalid_config(
                "latency measurement needs at least one sample",
            ));
        }
        let calls = self.min_samples.max(1);
        let mut scratch = vec![0.0; regressor.output_dim()];

        let start = Instant::now();
        for i in 0..calls {
            let sample = samples[i % samples.len()];
            regressor.predict_into(&sample.observation, &mut scratch)?;
            black_box(&scratch);
        }
        let elapsed = start.elapsed();

        Ok(elapsed / u32::try_from(calls).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use alloc_types::VehicleGeometry;
    use nalgebra::{DMatrix, DVector};
    use sim_omav::{EpisodeParams, OBS_DIM};

    use crate::regressor::{LinearRegressor, RidgeConfig};

    fn model() -> LinearRegressor {
        LinearRegressor::from_parts(
            DMatrix::from_element(2, OBS_DIM, 0.01),
            DVector::zeros(2),
            RidgeConfig::default(),
        )
        .unwrap()
    }

    fn sample() -> DistillSample {
        DistillSample {
            episode: 0,
            step: 0,
            observation: [0.5; OBS_DIM],
            coefficients: vec![0.0, 0.0],
            params: EpisodeParams::nominal(&VehicleGeometry::tilted_octo()),
            power_baseline: 100.0,
            power_teacher: 95.0,
        }
    }

    #[test]
    fn mean_latency_is_positive_and_finite() {
        let model = model();
        let samples = [sample(), sample(), sample()];
        let refs: Vec<&DistillSample> = samples.iter().collect();

        // Cycles through 3 samples for 1000 calls.
        let latency = LatencyBenchmark::new(1000).measure(&model, &refs).unwrap();
        assert!(latency > Duration::ZERO);
        assert!(latency < Duration::from_millis(10));
    }

    #[test]
    fn empty_sample_set_is_rejected() {
        let model = model();
        let err = LatencyBenchmark::new(100).measure(&model, &[]).unwrap_err();
        assert!(matches!(err, OracleError::InvalidConfig { .. }));
    }
}
