//! Fidelity metrics and the acceptance gate.
//!
//! An oracle ships only if every output dimension tracks the teacher above
//! the R² threshold and mean inference stays inside the latency budget.
//! Both checks are blocking; a near miss is a miss.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use distill_dataset::DistillSample;

use crate::error::{OracleError, Result};
use crate::regressor::Regressor;

/// Variance floor below which a dimension counts as constant.
const VARIANCE_FLOOR: f64 = 1e-12;

/// Per-dimension fit quality against teacher labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FidelityReport {
    /// Coefficient of determination per output dimension.
    pub r_squared: Vec<f64>,
    /// Root-mean-square error per output dimension.
    pub rmse: Vec<f64>,
    /// Samples the report was computed over.
    pub samples: usize,
}

impl FidelityReport {
    /// The worst-fitting dimension, as `(dim, r_squared)`.
    #[must_use]
    pub fn worst(&self) -> Option<(usize, f64)> {
        self.r_squared
            .iter()
            .copied()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Thresholds an oracle must clear before export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceCriteria {
    /// Minimum R² every output dimension must reach.
    pub min_r2: f64,
    /// Budget on mean single-sample inference latency.
    pub max_latency: Duration,
    /// Minimum inference calls behind the latency measurement.
    pub min_latency_samples: usize,
}

impl Default for AcceptanceCriteria {
    fn default() -> Self {
        Self {
            min_r2: 0.98,
            max_latency: Duration::from_micros(50),
            min_latency_samples: 10_000,
        }
    }
}

impl AcceptanceCriteria {
    /// Criteria with a different R² threshold.
    #[must_use]
    pub fn with_min_r2(mut self, min_r2: f64) -> Self {
        self.min_r2 = min_r2;
        self
    }

    /// Validate the criteria.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_r2) {
            return Err(OracleError::invalid_config(
                "min_r2 must lie in [0, 1]",
            ));
        }
        if self.max_latency.is_zero() {
            return Err(OracleError::invalid_config("max_latency must be positive"));
        }
        if self.min_latency_samples == 0 {
            return Err(OracleError::invalid_config(
                "min_latency_samples must be positive",
            ));
        }
        Ok(())
    }
}

/// Measure per-dimension fidelity of predictions against teacher labels.
///
/// R² follows the usual `1 - SSE/SST` with the label mean as the trivial
/// predictor; a dimension whose labels are constant scores 1.0 when the
/// predictions match and 0.0 otherwise.
///
/// # Errors
///
/// Rejects an empty sample set and label widths the regressor does not
/// produce.
pub fn evaluate(regressor: &dyn Regressor, samples: &[&DistillSample]) -> Result<FidelityReport> {
    if samples.is_empty() {
        return Err(OracleError::invalid_config("no samples to evaluate"));
    }
    let k = regressor.output_dim();
    if samples.iter().any(|s| s.coefficients.len() != k) {
        return Err(OracleError::schema_mismatch(format!(
            "labels do not all have the regressor's {k} output dimensions"
        )));
    }

    let m = samples.len() as f64;
    let mut mean = vec![0.0; k];
    for sample in samples {
        for (j, y) in sample.coefficients.iter().enumerate() {
            mean[j] += y;
        }
    }
    for v in &mut mean {
        *v /= m;
    }

    let mut sse = vec![0.0; k];
    let mut sst = vec![0.0; k];
    let mut prediction = vec![0.0; k];
    for sample in samples {
        regressor.predict_into(&sample.observation, &mut prediction)?;
        for j in 0..k {
            let err = prediction[j] - sample.coefficients[j];
            sse[j] += err * err;
            let dev = sample.coefficients[j] - mean[j];
            sst[j] += dev * dev;
        }
    }

    let r_squared = sse
        .iter()
        .zip(&sst)
        .map(|(&e, &t)| {
            if t < VARIANCE_FLOOR {
                if e < VARIANCE_FLOOR {
                    1.0
                } else {
                    0.0
                }
            } else {
                1.0 - e / t
            }
        })
        .collect();
    let rmse = sse.iter().map(|&e| (e / m).sqrt()).collect();

    Ok(FidelityReport {
        r_squared,
        rmse,
        samples: samples.len(),
    })
}

/// Check fidelity and latency against the acceptance criteria.
///
/// # Errors
///
/// [`OracleError::FidelityBelowThreshold`] naming the first failing output
/// dimension, or [`OracleError::LatencyBudgetExceeded`]. Fidelity is
/// checked first.
pub fn gate(
    report: &FidelityReport,
    latency: Duration,
    criteria: &AcceptanceCriteria,
) -> Result<()> {
    criteria.validate()?;
    let threshold = criteria.min_r2;
    for (dim, &r2) in report.r_squared.iter().enumerate() {
        if r2 < threshold {
            return Err(OracleError::FidelityBelowThreshold { dim, r2, threshold });
        }
    }
    if latency > criteria.max_latency {
        return Err(OracleError::LatencyBudgetExceeded {
            measured: latency,
            budget: criteria.max_latency,
        });
    }
    Ok(())
}
