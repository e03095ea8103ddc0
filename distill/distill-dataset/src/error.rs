//! Error types for dataset generation.

use thiserror::Error;

use alloc_types::AllocError;
use sim_omav::SimOmavError;

/// Errors produced while building or freezing a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid dataset config: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A wind stratum ended up with fewer samples than required.
    ///
    /// The dataset is rejected as a whole; generate more episodes or relax
    /// the requirement instead of training on a hole in the envelope.
    #[error(
        "coverage insufficient: stratum {bin} has {count} samples, requires {required}"
    )]
    CoverageInsufficient {
        /// Index of the under-covered wind stratum.
        bin: usize,
        /// Samples that landed in the stratum.
        count: usize,
        /// Minimum the gate demands.
        required: usize,
    },

    /// Every attempted episode was rejected.
    #[error("no episodes survived generation ({attempted} attempted)")]
    Empty {
        /// Episodes attempted.
        attempted: usize,
    },

    /// The episode budget ran out before the sample target was met.
    #[error(
        "episode budget exhausted: {attempted} episodes yielded {collected} of {target} samples"
    )]
    ExhaustedEpisodeBudget {
        /// Episodes attempted, rejections included.
        attempted: usize,
        /// Samples collected before giving up.
        collected: usize,
        /// Samples the build was asked for.
        target: usize,
    },

    /// A stored artifact does not match the expected column layout.
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// How the header differs.
        reason: String,
    },

    /// Simulation failure (setup validation or an in-flight divergence).
    #[error(transparent)]
    Sim(#[from] SimOmavError),

    /// Allocation failure (setup validation or an infeasible teacher label).
    #[error(transparent)]
    Alloc(#[from] AllocError),

    /// Artifact serialization failure.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DatasetError {
    /// Invalid configuration with a reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Schema mismatch with a reason.
    pub fn schema_mismatch(reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            reason: reason.into(),
        }
    }

    /// Whether the error discards one episode rather than the whole build.
    ///
    /// Divergence and infeasible teacher labels reject the episode; the
    /// builder counts it and moves on to the next seed.
    #[must_use]
    pub fn is_episode_rejection(&self) -> bool {
        matches!(
            self,
            Self::Sim(SimOmavError::Diverged { .. })
                | Self::Alloc(AllocError::Infeasible { .. })
        )
    }
}

/// Convenience alias for dataset results.
pub type Result<T> = std::result::Result<T, DatasetError>;
