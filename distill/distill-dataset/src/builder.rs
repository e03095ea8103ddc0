//! Batch dataset generation.
//!
//! The builder flies teacher episodes in waves until the sample target is
//! met, drawing each episode's seed from the master seed by index. Rejected
//! episodes are counted and the shortfall is covered by the next wave; the
//! episode budget caps how long that can go on. The coverage gate then
//! decides whether what survived is usable.
//!
//! With the `parallel` feature a wave runs across a rayon pool. Every
//! episode is fully determined by its index, so the frozen dataset is
//! identical for a given master seed regardless of scheduling.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, warn};

use alloc_types::VehicleGeometry;
use sim_omav::DomainRandomization;

use crate::dataset::{Dataset, FrozenDataset};
use crate::episode::{EpisodeConfig, EpisodeOutcome, EpisodeRunner, FlightMode};
use crate::error::{DatasetError, Result};
use crate::schema::DatasetSchema;
use crate::splits::SplitRatio;
use crate::strata::WindStrata;

/// Everything a dataset build needs besides the vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Samples the build must collect before freezing.
    pub target_samples: usize,
    /// Episodes the build may attempt, rejections included.
    pub max_episodes: usize,
    /// Master seed; episode seeds are derived from it.
    pub seed: u64,
    /// Per-episode timing and labeling knobs.
    pub episode: EpisodeConfig,
    /// Ranges the per-episode parameters are drawn from.
    pub randomization: DomainRandomization,
    /// Wind stratification for coverage and splits.
    pub strata: WindStrata,
    /// Fraction of the sample target every stratum must reach.
    pub min_fraction: f64,
    /// Train/val/test proportions.
    pub split: SplitRatio,
}

impl BuildConfig {
    /// Default build over a given wind stratification.
    #[must_use]
    pub fn new(strata: WindStrata) -> Self {
        Self {
            target_samples: 200_000,
            max_episodes: 5000,
            seed: 7,
            episode: EpisodeConfig::default(),
            randomization: DomainRandomization::default(),
            strata,
            min_fraction: 0.1,
            split: SplitRatio::default(),
        }
    }

    /// Minimum samples every stratum must hold at freeze time.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn required_per_bin(&self) -> usize {
        (self.min_fraction * self.target_samples as f64).ceil() as usize
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.target_samples == 0 {
            return Err(DatasetError::invalid_config(
                "target_samples must be positive",
            ));
        }
        if self.max_episodes == 0 {
            return Err(DatasetError::invalid_config(
                "max_episodes must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_fraction) {
            return Err(DatasetError::invalid_config(
                "min_fraction must lie in [0, 1]",
            ));
        }
        self.episode.validate()?;
        self.randomization.validate()?;
        Ok(())
    }
}

/// Generates and freezes teacher datasets.
#[derive(Debug)]
pub struct DatasetBuilder {
    runner: EpisodeRunner,
    config: BuildConfig,
}

impl DatasetBuilder {
    /// Build a dataset builder for a nominal vehicle.
    ///
    /// # Errors
    ///
    /// Rejects invalid configurations and geometries up front.
    pub fn new(nominal: VehicleGeometry, config: BuildConfig) -> Result<Self> {
        config.validate()?;
        let runner = EpisodeRunner::new(nominal, config.episode.clone())?;
        Ok(Self { runner, config })
    }

    /// The episode runner this builder flies.
    #[must_use]
    pub fn runner(&self) -> &EpisodeRunner {
        &self.runner
    }

    /// Generate episodes until the target is met, gate coverage, and freeze.
    ///
    /// # Errors
    ///
    /// [`DatasetError::ExhaustedEpisodeBudget`] when `max_episodes` run out
    /// below the sample target; coverage and configuration failures
    /// propagate; individual episode rejections only surface as counts in
    /// the summary.
    pub fn build(&self) -> Result<FrozenDataset> {
        let mut dataset = Dataset::new(
            DatasetSchema::new(self.runner.coeff_dim()),
            self.config.strata.clone(),
        );
        let per_episode = self.config.episode.samples_per_episode().max(1);
        let mut attempted = 0usize;

        while dataset.len() < self.config.target_samples {
            if attempted >= self.config.max_episodes {
                return Err(DatasetError::ExhaustedEpisodeBudget {
                    attempted,
                    collected: dataset.len(),
                    target: self.config.target_samples,
                });
            }
            let shortfall = self.config.target_samples - dataset.len();
            let wave = shortfall
                .div_ceil(per_episode)
                .min(self.config.max_episodes - attempted);

            for (index, outcome) in self.wave_outcomes(attempted, wave) {
                match outcome {
                    Ok(outcome) => dataset.record_episode(outcome),
                    Err(err) if err.is_episode_rejection() => {
                        warn!(episode = index, error = %err, "episode rejected");
                        dataset.record_rejection();
                    }
                    Err(err) => return Err(err),
                }
            }
            attempted += wave;
            debug!(
                attempted,
                collected = dataset.len(),
                target = self.config.target_samples,
                "wave complete"
            );
        }
        info!(
            samples = dataset.len(),
            episodes = attempted,
            "generation complete"
        );

        dataset.freeze(
            self.config.required_per_bin(),
            self.config.split,
            Some(self.config.seed),
        )
    }

    fn wave_outcomes(&self, start: usize, len: usize) -> Vec<(usize, Result<EpisodeOutcome>)> {
        #[cfg(feature = "parallel")]
        {
            (start..start + len)
                .into_par_iter()
                .map(|index| (index, self.run_episode(index)))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            (start..start + len)
                .map(|index| (index, self.run_episode(index)))
                .collect()
        }
    }

    /// Draw parameters and fly episode `index`.
    ///
    /// The parameter draw and the flight use separate streams so that a
    /// change in the randomization ranges never shifts the wind realization
    /// of a later episode.
    fn run_episode(&self, index: usize) -> Result<EpisodeOutcome> {
        let episode = index as u64;
        let episode_seed = self.config.seed.wrapping_add(episode);
        let mut rng = ChaCha8Rng::seed_from_u64(episode_seed);
        let params = self
            .config
            .randomization
            .sample(self.runner.nominal(), &mut rng)?;
        let flight_seed: u64 = rng.gen();
        self.runner
            .run(episode, &params, flight_seed, FlightMode::Teacher)
    }
}
