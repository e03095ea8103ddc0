//! Closed-form oracle fitting and acceptance for allocation distillation.
//!
//! The teacher search produces labeled observations; this crate fits a
//! ridge-regularized linear oracle to them, measures its fidelity and
//! inference latency, and packages the result into a self-describing
//! artifact. Export is gated: an oracle that misses the fidelity or
//! latency criteria never becomes an artifact.
//!
//! ```
//! use distill_oracle::{LinearRegressor, Regressor, RidgeConfig};
//!
//! # fn main() -> distill_oracle::Result<()> {
//! let inputs: Vec<Vec<f64>> = (0..20)
//!     .map(|i| vec![f64::from(i), f64::from(i % 5)])
//!     .collect();
//! let targets: Vec<Vec<f64>> = inputs
//!     .iter()
//!     .map(|x| vec![2.0 * x[0] - x[1], x[0] + 3.0 * x[1]])
//!     .collect();
//!
//! let model = LinearRegressor::fit_rows(&inputs, &targets, RidgeConfig::default())?;
//! let mut out = [0.0; 2];
//! model.predict_into(&[4.0, 2.0], &mut out)?;
//! assert!((out[0] - 6.0).abs() < 1e-3);
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

pub mod acceptance;
pub mod artifact;
pub mod error;
pub mod latency;
pub mod regressor;

pub use acceptance::{evaluate, gate, AcceptanceCriteria, FidelityReport};
pub use artifact::{export_oracle, OracleArtifact, OracleMetadata};
pub use error::{OracleError, Result};
pub use latency::LatencyBenchmark;
pub use regressor::{LinearRegressor, Regressor, RidgeConfig};
