//! Teacher dataset generation for allocation distillation.
//!
//! The expensive null-space power search is the teacher; this crate flies
//! it in closed loop over randomized wind and vehicle parameters and
//! records `(observation, optimal coefficients)` pairs, together with the
//! power the teacher and the minimum-norm baseline would draw at each
//! visited state. Datasets are stratified by wind speed, gated on
//! per-stratum coverage, and frozen into a JSON artifact with fixed
//! train/val/test splits.
//!
//! ```
//! use alloc_types::VehicleGeometry;
//! use distill_dataset::{BuildConfig, DatasetBuilder, WindStrata};
//!
//! # fn main() -> distill_dataset::Result<()> {
//! let strata = WindStrata::uniform(13.0, 1)?;
//! let mut config = BuildConfig::new(strata);
//! config.target_samples = 30;
//! config.max_episodes = 8;
//! config.min_fraction = 0.5;
//! config.episode.duration = 1.0;
//! config.episode.warmup = 0.25;
//!
//! let builder = DatasetBuilder::new(VehicleGeometry::tilted_octo(), config)?;
//! let frozen = builder.build()?;
//! assert!(frozen.summary.total_samples >= 30);
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

pub mod builder;
pub mod dataset;
pub mod episode;
pub mod error;
pub mod policy;
pub mod sample;
pub mod schema;
pub mod splits;
pub mod strata;

pub use builder::{BuildConfig, DatasetBuilder};
pub use dataset::{Dataset, DatasetSummary, FrozenDataset};
pub use episode::{EpisodeConfig, EpisodeOutcome, EpisodeRunner, FlightMode};
pub use error::{DatasetError, Result};
pub use policy::{InferenceMode, Policy, ReferenceSearchPolicy, SeededExploration, ZeroPolicy};
pub use sample::DistillSample;
pub use schema::DatasetSchema;
pub use splits::{split_stratified, SplitIndices, SplitRatio};
pub use strata::{CoverageReport, WindStrata};
