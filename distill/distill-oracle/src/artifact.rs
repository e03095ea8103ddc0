//! Deployment artifacts and the export pipeline.
//!
//! An [`OracleArtifact`] is everything a consumer needs to run the oracle
//! and to refuse it when it does not fit: weights, the exact feature and
//! output schemas, and the quality numbers from acceptance. Export through
//! [`export_oracle`] is blocked unless the acceptance gate passes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use distill_dataset::{DatasetSchema, DatasetSummary, FrozenDataset};
use nalgebra::{DMatrix, DVector};

use crate::acceptance::{evaluate, gate, AcceptanceCriteria, FidelityReport};
use crate::error::{OracleError, Result};
use crate::latency::LatencyBenchmark;
use crate::regressor::{LinearRegressor, Regressor, RidgeConfig};

/// Quality and provenance attached to an exported oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleMetadata {
    /// Per-dimension fidelity on the validation split.
    pub fidelity: FidelityReport,
    /// Measured mean single-sample inference latency.
    pub latency: Duration,
    /// Summary of the dataset the oracle was fitted on.
    pub dataset: DatasetSummary,
}

/// A self-describing, deployable oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleArtifact {
    /// Ordered input feature names.
    pub input_schema: Vec<String>,
    /// Ordered output names.
    pub output_schema: Vec<String>,
    /// One weight row per output, in `input_schema` order.
    pub weights: Vec<Vec<f64>>,
    /// Per-output intercepts.
    pub bias: Vec<f64>,
    /// Fit settings the weights were produced with.
    pub training: RidgeConfig,
    /// Fidelity, latency, and dataset provenance.
    pub metadata: OracleMetadata,
}

impl OracleArtifact {
    /// Package a fitted regressor against a dataset schema.
    ///
    /// # Errors
    ///
    /// Rejects regressors whose shape does not match the schema.
    pub fn new(
        regressor: &LinearRegressor,
        schema: &DatasetSchema,
        metadata: OracleMetadata,
    ) -> Result<Self> {
        if regressor.input_dim() != schema.obs_dim()
            || regressor.output_dim() != schema.coeff_dim()
        {
            return Err(OracleError::schema_mismatch(format!(
                "regressor maps {} -> {}, schema expects {} -> {}",
                regressor.input_dim(),
                regressor.output_dim(),
                schema.obs_dim(),
                schema.coeff_dim()
            )));
        }

        let columns = schema.columns();
        let weights = regressor.weights();
        Ok(Self {
            input_schema: columns[schema.observation_range()].to_vec(),
            output_schema: columns[schema.coefficient_range()].to_vec(),
            weights: (0..weights.nrows())
                .map(|j| (0..weights.ncols()).map(|i| weights[(j, i)]).collect())
                .collect(),
            bias: regressor.bias().iter().copied().collect(),
            training: regressor.config().clone(),
            metadata,
        })
    }

    /// Reassemble the regressor for deployment.
    ///
    /// # Errors
    ///
    /// Propagates shape and finiteness failures.
    pub fn to_regressor(&self) -> Result<LinearRegressor> {
        self.validate()?;
        let k = self.output_schema.len();
        let n = self.input_schema.len();
        let weights = DMatrix::from_fn(k, n, |j, i| self.weights[j][i]);
        let bias = DVector::from_vec(self.bias.clone());
        LinearRegressor::from_parts(weights, bias, self.training.clone())
    }

    /// Check that the artifact speaks a consumer's schema.
    ///
    /// # Errors
    ///
    /// [`OracleError::SchemaMismatch`] naming the first divergence.
    pub fn validate_schema(&self, expected: &DatasetSchema) -> Result<()> {
        let columns = expected.columns();
        let expected_inputs = &columns[expected.observation_range()];
        let expected_outputs = &columns[expected.coefficient_range()];

        if self.input_schema.len() != expected_inputs.len() {
            return Err(OracleError::schema_mismatch(format!(
                "artifact has {} input features, consumer expects {}",
                self.input_schema.len(),
                expected_inputs.len()
            )));
        }
        if self.output_schema.len() != expected_outputs.len() {
            return Err(OracleError::schema_mismatch(format!(
                "artifact has {} outputs, consumer expects {}",
                self.output_schema.len(),
                expected_outputs.len()
            )));
        }
        for (ours, theirs) in self.input_schema.iter().zip(expected_inputs) {
            if ours != theirs {
                return Err(OracleError::schema_mismatch(format!(
                    "input feature {ours:?} where consumer expects {theirs:?}"
                )));
            }
        }
        for (ours, theirs) in self.output_schema.iter().zip(expected_outputs) {
            if ours != theirs {
                return Err(OracleError::schema_mismatch(format!(
                    "output {ours:?} where consumer expects {theirs:?}"
                )));
            }
        }
        Ok(())
    }

    /// Check internal consistency of shapes and values.
    ///
    /// # Errors
    ///
    /// [`OracleError::SchemaMismatch`] describing the first inconsistency.
    pub fn validate(&self) -> Result<()> {
        let k = self.output_schema.len();
        let n = self.input_schema.len();
        if k == 0 || n == 0 {
            return Err(OracleError::schema_mismatch("empty artifact schema"));
        }
        if self.weights.len() != k || self.bias.len() != k {
            return Err(OracleError::schema_mismatch(format!(
                "{} weight rows and {} bias entries for {} outputs",
                self.weights.len(),
                self.bias.len(),
                k
            )));
        }
        if self.weights.iter().any(|row| row.len() != n) {
            return Err(OracleError::schema_mismatch(format!(
                "weight row width differs from the {n} input features"
            )));
        }
        let finite = self
            .weights
            .iter()
            .flatten()
            .chain(&self.bias)
            .all(|v| v.is_finite());
        if !finite {
            return Err(OracleError::schema_mismatch("non-finite weight"));
        }
        Ok(())
    }

    /// Serialize to a JSON artifact.
    ///
    /// # Errors
    ///
    /// Returns a serialization error from `serde_json`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load and validate a JSON artifact.
    ///
    /// # Errors
    ///
    /// Returns a parse error or the first internal inconsistency.
    pub fn from_json(text: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(text)?;
        artifact.validate()?;
        Ok(artifact)
    }
}

/// Gate a fitted regressor and package it for deployment.
///
/// Fidelity and latency are measured on the validation split; the artifact
/// exists only if both clear the criteria.
///
/// # Errors
///
/// Gate rejections ([`OracleError::is_gate_rejection`]) and measurement
/// failures.
pub fn export_oracle(
    regressor: &LinearRegressor,
    dataset: &FrozenDataset,
    criteria: &AcceptanceCriteria,
) -> Result<OracleArtifact> {
    let val = dataset.val_samples();
    let fidelity = evaluate(regressor, &val)?;
    let latency = LatencyBenchmark::new(criteria.min_latency_samples).measure(regressor, &val)?;
    gate(&fidelity, latency, criteria)?;

    let metadata = OracleMetadata {
        fidelity,
        latency,
        dataset: dataset.summary.clone(),
    };
    let artifact = OracleArtifact::new(regressor, &dataset.schema, metadata)?;
    info!(
        outputs = artifact.output_schema.len(),
        latency_us = latency.as_micros() as u64,
        "oracle accepted for export"
    );
    Ok(artifact)
}
