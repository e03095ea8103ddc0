//! Error types for the flight simulation.

use thiserror::Error;

/// Errors produced by simulation configuration and stepping.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimOmavError {
    /// A configuration value is out of range or inconsistent.
    #[error("invalid simulation config: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The integrator produced a non-physical state.
    ///
    /// Episodes hitting this are discarded, never silently truncated.
    #[error("simulation diverged at step {step}: {reason}")]
    Diverged {
        /// Step index at which divergence was detected.
        step: usize,
        /// What blew up.
        reason: String,
    },

    /// An input to the simulation was not finite.
    #[error("non-finite input: {context}")]
    NonFinite {
        /// Which input contained NaN or infinity.
        context: String,
    },
}

impl SimOmavError {
    /// Invalid configuration with a reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Divergence at a step with a reason.
    pub fn diverged(step: usize, reason: impl Into<String>) -> Self {
        Self::Diverged {
            step,
            reason: reason.into(),
        }
    }

    /// Non-finite input in the named context.
    pub fn non_finite(context: impl Into<String>) -> Self {
        Self::NonFinite {
            context: context.into(),
        }
    }

    /// Whether this error marks a diverged episode.
    #[must_use]
    pub fn is_divergence(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}

/// Convenience alias for simulation results.
pub type Result<T> = std::result::Result<T, SimOmavError>;
