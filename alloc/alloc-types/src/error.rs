//! Error types for allocation operations.

use thiserror::Error;

/// Errors that can occur while building or using an allocation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocError {
    /// Vehicle geometry failed validation.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry {
        /// Description of the geometry error.
        reason: String,
    },

    /// A vector or matrix had the wrong dimension.
    #[error("dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked.
        context: String,
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// The actuation matrix does not span all six wrench axes.
    #[error("actuation matrix is rank deficient: rank {rank}, need {required}")]
    RankDeficient {
        /// Numerical rank of the actuation matrix.
        rank: usize,
        /// Required rank (always the wrench dimension).
        required: usize,
    },

    /// SVD factorization did not converge.
    #[error("SVD factorization failed")]
    SvdFailed,

    /// No actuator command within bounds can realize the requested wrench.
    #[error("allocation infeasible: worst bound violation {residual:.6}")]
    Infeasible {
        /// Worst per-actuator bound violation at the best coefficient found.
        residual: f64,
    },

    /// A non-finite value (`NaN` or `Inf`) was encountered.
    #[error("non-finite value in {context}")]
    NonFinite {
        /// Where the value appeared.
        context: String,
    },

    /// Iterative coefficient search did not converge.
    #[error("coefficient search failed: {reason}")]
    SearchFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl AllocError {
    /// Create an invalid geometry error.
    #[must_use]
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error.
    #[must_use]
    pub fn dimension_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create a non-finite value error.
    #[must_use]
    pub fn non_finite(context: impl Into<String>) -> Self {
        Self::NonFinite {
            context: context.into(),
        }
    }

    /// Create a search failure error.
    #[must_use]
    pub fn search_failed(reason: impl Into<String>) -> Self {
        Self::SearchFailed {
            reason: reason.into(),
        }
    }

    /// Check if this is an infeasibility error.
    #[must_use]
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible { .. })
    }
}
