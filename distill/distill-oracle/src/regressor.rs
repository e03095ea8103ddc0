//! Closed-form regression from observations to null-space coefficients.
//!
//! The reference oracle is a per-output-dimension ridge regression fitted
//! by normal equations. Features are standardized for conditioning during
//! the fit, then the standardization is folded back into the stored affine
//! map, so inference is a bare matrix-vector product with no per-call
//! allocation.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::info;

use distill_dataset::{FrozenDataset, InferenceMode, Policy};
use sim_omav::OBS_DIM;

use crate::error::{OracleError, Result};

/// Closed-form fit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeConfig {
    /// L2 penalty on the standardized weights, per training sample.
    ///
    /// The effective penalty scales with the sample count, so the setting
    /// is independent of dataset size.
    pub ridge: f64,
}

impl Default for RidgeConfig {
    fn default() -> Self {
        Self { ridge: 1e-6 }
    }
}

impl RidgeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.ridge >= 0.0 && self.ridge.is_finite()) {
            return Err(OracleError::invalid_config(
                "ridge must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// A fitted map from feature vectors to coefficient vectors.
pub trait Regressor: Send + Sync {
    /// Input dimensionality.
    fn input_dim(&self) -> usize;

    /// Output dimensionality.
    fn output_dim(&self) -> usize;

    /// Predict one input into a caller-provided output buffer.
    ///
    /// # Errors
    ///
    /// Rejects inputs and buffers of the wrong length.
    fn predict_into(&self, input: &[f64], output: &mut [f64]) -> Result<()>;

    /// Predict a batch, one output row per input row.
    ///
    /// # Errors
    ///
    /// Rejects rows of the wrong length.
    fn predict_batch(&self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let mut rows = Vec::with_capacity(inputs.len());
        for input in inputs {
            let mut output = vec![0.0; self.output_dim()];
            self.predict_into(input, &mut output)?;
            rows.push(output);
        }
        Ok(rows)
    }
}

/// Ridge regression fitted by normal equations.
///
/// Implements [`Policy`], so a fitted model is a drop-in replacement for
/// the teacher search in closed-loop flight.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegressor {
    weights: DMatrix<f64>,
    bias: DVector<f64>,
    config: RidgeConfig,
}

impl LinearRegressor {
    /// Fit on the training split of a frozen dataset.
    ///
    /// Inputs are the raw observations; targets are the teacher
    /// coefficients. Nothing outside the observation enters the model, so
    /// deployment needs no information the flight controller lacks.
    ///
    /// # Errors
    ///
    /// Rejects empty training splits and numerically unusable data.
    pub fn fit(dataset: &FrozenDataset, config: RidgeConfig) -> Result<Self> {
        let train = dataset.train_samples();
        if train.is_empty() {
            return Err(OracleError::fit_failed("training split is empty"));
        }
        let inputs: Vec<Vec<f64>> = train.iter().map(|s| s.observation.to_vec()).collect();
        let targets: Vec<Vec<f64>> = train.iter().map(|s| s.coefficients.clone()).collect();
        let fitted = Self::fit_rows(&inputs, &targets, config)?;
        info!(
            rows = inputs.len(),
            features = fitted.input_dim(),
            outputs = fitted.output_dim(),
            "ridge fit complete"
        );
        Ok(fitted)
    }

    /// Fit on explicit feature and target rows.
    ///
    /// # Errors
    ///
    /// Rejects empty or ragged data and singular normal equations.
    pub fn fit_rows(
        inputs: &[Vec<f64>],
        targets: &[Vec<f64>],
        config: RidgeConfig,
    ) -> Result<Self> {
        config.validate()?;
        let rows = inputs.len();
        if rows == 0 {
            return Err(OracleError::fit_failed("no training rows"));
        }
        if targets.len() != rows {
            return Err(OracleError::fit_failed(format!(
                "{rows} inputs against {} targets",
                targets.len()
            )));
        }
        let n = inputs[0].len();
        let k = targets[0].len();
        if n == 0 || k == 0 {
            return Err(OracleError::fit_failed("empty feature or target vectors"));
        }
        if inputs.iter().any(|r| r.len() != n) || targets.iter().any(|r| r.len() != k) {
            return Err(OracleError::fit_failed("ragged training rows"));
        }
        let finite = inputs
            .iter()
            .chain(targets)
            .all(|r| r.iter().all(|v| v.is_finite()));
        if !finite {
            return Err(OracleError::fit_failed("non-finite training value"));
        }

        let m = rows as f64;
        let mut mean = vec![0.0; n];
        for row in inputs {
            for (i, x) in row.iter().enumerate() {
                mean[i] += x;
            }
        }
        for v in &mut mean {
            *v /= m;
        }
        let mut std = vec![0.0; n];
        for row in inputs {
            for (i, x) in row.iter().enumerate() {
                let d = x - mean[i];
                std[i] += d * d;
            }
        }
        for v in &mut std {
            *v = (*v / m).sqrt();
            // Constant features carry no signal; a unit scale keeps their
            // centered column at zero and the Gram matrix well posed.
            if *v < 1e-12 {
                *v = 1.0;
            }
        }

        let x = DMatrix::from_fn(rows, n, |r, c| (inputs[r][c] - mean[c]) / std[c]);
        let xt = x.transpose();
        let mut gram = &xt * &x;
        let penalty = config.ridge * m;
        for i in 0..n {
            gram[(i, i)] += penalty;
        }
        let chol = gram.cholesky().ok_or_else(|| {
            OracleError::fit_failed("normal equations are not positive definite")
        })?;

        let mut weights = DMatrix::zeros(k, n);
        let mut bias = DVector::zeros(k);
        for j in 0..k {
            let target_mean = targets.iter().map(|t| t[j]).sum::<f64>() / m;
            let y = DVector::from_fn(rows, |r, _| targets[r][j] - target_mean);
            let w_std = chol.solve(&(&xt * &y));

            // Fold the standardization back into a raw-space affine map.
            let mut b = target_mean;
            for i in 0..n {
                let w_raw = w_std[i] / std[i];
                weights[(j, i)] = w_raw;
                b -= w_raw * mean[i];
            }
            bias[j] = b;
        }

        Ok(Self {
            weights,
            bias,
            config,
        })
    }

    /// Reassemble a model from stored weights.
    ///
    /// # Errors
    ///
    /// Rejects mismatched shapes and non-finite values.
    pub fn from_parts(
        weights: DMatrix<f64>,
        bias: DVector<f64>,
        config: RidgeConfig,
    ) -> Result<Self> {
        config.validate()?;
        if weights.nrows() == 0 || weights.ncols() == 0 {
            return Err(OracleError::schema_mismatch("empty weight matrix"));
        }
        if weights.nrows() != bias.len() {
            return Err(OracleError::schema_mismatch(format!(
                "{} weight rows against {} bias entries",
                weights.nrows(),
                bias.len()
            )));
        }
        if !weights.iter().chain(bias.iter()).all(|v| v.is_finite()) {
            return Err(OracleError::schema_mismatch("non-finite weight"));
        }
        Ok(Self {
            weights,
            bias,
            config,
        })
    }

    /// Raw-space weight matrix, one row per output dimension.
    #[must_use]
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    /// Raw-space intercepts.
    #[must_use]
    pub fn bias(&self) -> &DVector<f64> {
        &self.bias
    }

    /// Fit settings the model was produced with.
    #[must_use]
    pub fn config(&self) -> &RidgeConfig {
        &self.config
    }
}

impl Regressor for LinearRegressor {
    fn input_dim(&self) -> usize {
        self.weights.ncols()
    }

    fn output_dim(&self) -> usize {
        self.weights.nrows()
    }

    fn predict_into(&self, input: &[f64], output: &mut [f64]) -> Result<()> {
        if input.len() != self.input_dim() {
            return Err(OracleError::schema_mismatch(format!(
                "input has {} features, model expects {}",
                input.len(),
                self.input_dim()
            )));
        }
        if output.len() != self.output_dim() {
            return Err(OracleError::schema_mismatch(format!(
                "output buffer holds {} values, model produces {}",
                output.len(),
                self.output_dim()
            )));
        }
        for (j, out) in output.iter_mut().enumerate() {
            let mut acc = self.bias[j];
            for (i, x) in input.iter().enumerate() {
                acc += self.weights[(j, i)] * x;
            }
            *out = acc;
        }
        Ok(())
    }
}

impl Policy for LinearRegressor {
    fn coeff_dim(&self) -> usize {
        self.output_dim()
    }

    fn infer(&self, observation: &[f64; OBS_DIM], _mode: InferenceMode) -> Vec<f64> {
        let mut out = vec![0.0; self.output_dim()];
        // A model fitted on something other than observations cannot fly;
        // minimum norm is the safe output.
        match self.predict_into(observation, &mut out) {
            Ok(()) => out,
            Err(_) => vec![0.0; self.output_dim()],
        }
    }
}
