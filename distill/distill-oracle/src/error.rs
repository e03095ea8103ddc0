//! Error types for oracle fitting and acceptance.

use std::time::Duration;

use thiserror::Error;

use distill_dataset::DatasetError;

/// Errors produced while fitting, gating, or loading an oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid oracle config: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The fit could not be completed on the given training data.
    #[error("fit failed: {reason}")]
    FitFailed {
        /// Why the fit was aborted.
        reason: String,
    },

    /// An artifact or input does not match the expected schema.
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// How the schemas differ.
        reason: String,
    },

    /// An output dimension fits the teacher worse than required.
    ///
    /// Named after the first failing dimension in output order.
    #[error(
        "fidelity below threshold: dimension {dim} has R^2 {r2:.4}, requires {threshold:.4}"
    )]
    FidelityBelowThreshold {
        /// Index of the failing output dimension.
        dim: usize,
        /// Coefficient of determination measured for that dimension.
        r2: f64,
        /// Minimum the acceptance criteria demand.
        threshold: f64,
    },

    /// Mean inference latency exceeds the deployment budget.
    #[error("latency budget exceeded: measured {measured:?}, budget {budget:?}")]
    LatencyBudgetExceeded {
        /// Measured mean per-sample latency.
        measured: Duration,
        /// Budget from the acceptance criteria.
        budget: Duration,
    },

    /// Dataset-side failure.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Artifact serialization failure.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OracleError {
    /// Invalid configuration with a reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Failed fit with a reason.
    pub fn fit_failed(reason: impl Into<String>) -> Self {
        Self::FitFailed {
            reason: reason.into(),
        }
    }

    /// Schema mismatch with a reason.
    pub fn schema_mismatch(reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            reason: reason.into(),
        }
    }

    /// Whether the error is an acceptance-gate rejection.
    ///
    /// Gate rejections mean the oracle is not good enough to ship; every
    /// other variant means the pipeline itself failed.
    #[must_use]
    pub fn is_gate_rejection(&self) -> bool {
        matches!(
            self,
            Self::FidelityBelowThreshold { .. } | Self::LatencyBudgetExceeded { .. }
        )
    }
}

/// Convenience alias for oracle results.
pub type Result<T> = std::result::Result<T, OracleError>;
