//! Closed-loop evaluation of distilled allocation oracles.
//!
//! An accepted oracle artifact is scored three ways before deployment:
//! fidelity against the reference search on held-out data, energy savings
//! against the minimum-norm baseline per wind stratum, and a robustness
//! sweep over wind speeds that deliberately leaves the training envelope.
//! The result is an [`EvaluationReport`] with a JSON form and a
//! human-readable summary.
//!
//! ```
//! use distill_eval::EvalConfig;
//!
//! # fn main() -> distill_eval::Result<()> {
//! let config = EvalConfig::default();
//! config.validate()?;
//! // The default sweep already probes past the training envelope.
//! assert!(config.sweep_speeds.iter().any(|s| *s > 12.0));
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

pub mod error;
pub mod harness;
pub mod report;

pub use error::{EvalError, Result};
pub use harness::{EvalConfig, EvalHarness};
pub use report::{
    EvaluationReport, OraclePerformance, PowerComparison, RobustnessPoint, StratumSavings,
};
