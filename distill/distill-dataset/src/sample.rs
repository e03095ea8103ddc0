//! One labeled training sample.

use serde::{Deserialize, Serialize};

use alloc_core::PowerModel;
use sim_omav::{EpisodeParams, OBS_DIM};

/// A visited observation with its teacher label and power bookkeeping.
///
/// `coefficients` is the clean teacher optimum for the wrench commanded at
/// this observation, never the (possibly jittered) coefficients that were
/// actually flown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistillSample {
    /// Identifier of the episode that produced this sample.
    pub episode: u64,
    /// Control step within the episode.
    pub step: usize,
    /// Flat observation at the moment of labeling.
    pub observation: [f64; OBS_DIM],
    /// Teacher-optimal null-space coefficients.
    pub coefficients: Vec<f64>,
    /// Episode ground truth behind this sample.
    pub params: EpisodeParams,
    /// True power of the minimum-norm allocation for the same wrench.
    pub power_baseline: f64,
    /// True power of the teacher-optimal allocation.
    pub power_teacher: f64,
}

impl DistillSample {
    /// Power saved by the teacher relative to minimum-norm, in percent.
    #[must_use]
    pub fn savings_percent(&self) -> f64 {
        PowerModel::savings_percent(self.power_baseline, self.power_teacher)
    }

    /// Mean wind speed of the episode this sample came from.
    #[must_use]
    pub fn wind_speed(&self) -> f64 {
        self.params.wind_speed
    }

    /// Whether every numeric field is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.observation.iter().all(|v| v.is_finite())
            && self.coefficients.iter().all(|v| v.is_finite())
            && self.power_baseline.is_finite()
            && self.power_teacher.is_finite()
    }
}
