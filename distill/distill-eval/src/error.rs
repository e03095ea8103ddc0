//! Evaluation error type.

use distill_dataset::DatasetError;
use distill_oracle::OracleError;

/// Errors from closed-loop oracle evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// An evaluation setting is out of range.
    #[error("invalid evaluation config: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// Every evaluation flight at one sweep point was rejected.
    #[error("no surviving episode at {wind_speed} m/s after {attempted} attempts")]
    EpisodesExhausted {
        /// Wind speed of the failed point.
        wind_speed: f64,
        /// Episodes attempted at that point.
        attempted: usize,
    },

    /// A dataset-layer failure during evaluation flights.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// An oracle-layer failure, including schema rejection.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Report serialization failure.
    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EvalError {
    /// Invalid-config error from anything stringy.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, EvalError>;
