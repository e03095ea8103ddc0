//! Dataset splitting utilities.
//!
//! Splits are stratified by wind speed so train, validation, and test each
//! see the whole envelope. Holding the high-wind strata out of training
//! entirely is the evaluation harness's job, not the splitter's.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::sample::DistillSample;
use crate::strata::WindStrata;

/// Ratio for splitting datasets into train/validation/test sets.
///
/// The two stored proportions are train and validation; the remainder goes
/// to test.
///
/// # Example
///
/// ```
/// use distill_dataset::SplitRatio;
///
/// // 70% train, 15% validation, 15% test
/// let ratio = SplitRatio::new(0.7, 0.15);
/// assert!((ratio.test_ratio() - 0.15).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatio {
    train: f64,
    val: f64,
}

impl SplitRatio {
    /// Creates a new split ratio.
    ///
    /// # Panics
    ///
    /// Panics unless both proportions are positive and leave a positive
    /// remainder for test.
    #[must_use]
    pub fn new(train: f64, val: f64) -> Self {
        assert!(
            train > 0.0 && val > 0.0 && train + val < 1.0,
            "split proportions must be positive and sum below 1, got {train} + {val}"
        );
        Self { train, val }
    }

    /// Creates a split ratio, returning `None` if invalid.
    #[must_use]
    pub fn try_new(train: f64, val: f64) -> Option<Self> {
        if train > 0.0 && val > 0.0 && train + val < 1.0 {
            Some(Self { train, val })
        } else {
            None
        }
    }

    /// Returns the training proportion.
    #[must_use]
    pub const fn train_ratio(&self) -> f64 {
        self.train
    }

    /// Returns the validation proportion.
    #[must_use]
    pub const fn val_ratio(&self) -> f64 {
        self.val
    }

    /// Returns the test proportion.
    #[must_use]
    pub fn test_ratio(&self) -> f64 {
        1.0 - self.train - self.val
    }

    /// Computes the two split points for a given group size.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn split_points(&self, total: usize) -> (usize, usize) {
        let train_point = ((total as f64) * self.train).round() as usize;
        let val_point = ((total as f64) * (self.train + self.val)).round() as usize;
        let train_point = train_point.min(total);
        (train_point, val_point.clamp(train_point, total))
    }

    /// Common 70/15/15 split.
    pub const SEVENTY_FIFTEEN_FIFTEEN: Self = Self {
        train: 0.7,
        val: 0.15,
    };

    /// Common 80/10/10 split.
    pub const EIGHTY_TEN_TEN: Self = Self {
        train: 0.8,
        val: 0.1,
    };
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self::SEVENTY_FIFTEEN_FIFTEEN
    }
}

/// Index lists of the three splits into one sample buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    /// Training sample indices.
    pub train: Vec<usize>,
    /// Validation sample indices.
    pub val: Vec<usize>,
    /// Test sample indices.
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Total indices across the three splits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    /// Whether all three splits are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits samples into train/val/test, stratified by wind stratum.
///
/// Each stratum is shuffled and cut separately with a seed derived from
/// the stratum index, so the assignment of any one sample is independent
/// of how many samples other strata hold. Samples outside the strata form
/// one extra group and are split the same way.
#[must_use]
pub fn split_stratified(
    samples: &[DistillSample],
    strata: &WindStrata,
    ratio: SplitRatio,
    seed: Option<u64>,
) -> SplitIndices {
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); strata.bin_count() + 1];
    for (index, sample) in samples.iter().enumerate() {
        match strata.bin_of(sample.wind_speed()) {
            Some(bin) => groups[bin].push(index),
            None => groups[strata.bin_count()].push(index),
        }
    }

    let mut splits = SplitIndices {
        train: Vec::new(),
        val: Vec::new(),
        test: Vec::new(),
    };

    for (bin, mut group) in groups.into_iter().enumerate() {
        if group.is_empty() {
            continue;
        }
        let group_seed = seed.map(|s| s.wrapping_add(bin as u64 + 1));
        let mut rng = group_seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        group.shuffle(&mut rng);

        let (train_point, val_point) = ratio.split_points(group.len());
        splits.train.extend_from_slice(&group[..train_point]);
        splits.val.extend_from_slice(&group[train_point..val_point]);
        splits.test.extend_from_slice(&group[val_point..]);
    }

    splits
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use alloc_types::VehicleGeometry;
    use sim_omav::{EpisodeParams, OBS_DIM};

    fn sample_at(wind_speed: f64) -> DistillSample {
        let mut params = EpisodeParams::nominal(&VehicleGeometry::tilted_octo());
        params.wind_speed = wind_speed;
        DistillSample {
            episode: 0,
            step: 0,
            observation: [0.0; OBS_DIM],
            coefficients: vec![0.0, 0.0],
            params,
            power_baseline: 1.0,
            power_teacher: 1.0,
        }
    }

    fn envelope_samples(per_bin: usize) -> Vec<DistillSample> {
        let mut samples = Vec::new();
        for bin in 0..3 {
            for i in 0..per_bin {
                let speed = 4.0 * (bin as f64) + 4.0 * (i as f64) / (per_bin as f64);
                samples.push(sample_at(speed));
            }
        }
        samples
    }

    #[test]
    fn split_ratio_accessors() {
        let ratio = SplitRatio::new(0.7, 0.15);
        assert!((ratio.train_ratio() - 0.7).abs() < 1e-9);
        assert!((ratio.val_ratio() - 0.15).abs() < 1e-9);
        assert!((ratio.test_ratio() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn split_ratio_try_new() {
        assert!(SplitRatio::try_new(0.7, 0.2).is_some());
        assert!(SplitRatio::try_new(0.0, 0.5).is_none());
        assert!(SplitRatio::try_new(0.8, 0.2).is_none());
        assert!(SplitRatio::try_new(0.5, -0.1).is_none());
    }

    #[test]
    fn split_points_cover_the_group() {
        let ratio = SplitRatio::new(0.7, 0.15);
        let (train, val) = ratio.split_points(100);
        assert_eq!(train, 70);
        assert_eq!(val, 85);

        let (train, val) = ratio.split_points(0);
        assert_eq!((train, val), (0, 0));
    }

    #[test]
    fn stratified_split_partitions_without_duplicates() {
        let samples = envelope_samples(40);
        let strata = WindStrata::uniform(12.0, 3).unwrap();
        let splits = split_stratified(&samples, &strata, SplitRatio::default(), Some(42));

        assert_eq!(splits.len(), samples.len());
        let mut all: Vec<usize> = splits
            .train
            .iter()
            .chain(&splits.val)
            .chain(&splits.test)
            .copied()
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), samples.len());
    }

    #[test]
    fn every_stratum_reaches_every_split() {
        let samples = envelope_samples(40);
        let strata = WindStrata::uniform(12.0, 3).unwrap();
        let splits = split_stratified(&samples, &strata, SplitRatio::default(), Some(7));

        for bin in 0..3 {
            for indices in [&splits.train, &splits.val, &splits.test] {
                let hits = indices
                    .iter()
                    .filter(|&&i| strata.bin_of(samples[i].wind_speed()) == Some(bin))
                    .count();
                assert!(hits > 0, "stratum {bin} missing from a split");
            }
        }
    }

    #[test]
    fn split_is_reproducible() {
        let samples = envelope_samples(30);
        let strata = WindStrata::uniform(12.0, 3).unwrap();
        let a = split_stratified(&samples, &strata, SplitRatio::default(), Some(5));
        let b = split_stratified(&samples, &strata, SplitRatio::default(), Some(5));
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_samples_are_still_assigned() {
        let mut samples = envelope_samples(20);
        for _ in 0..10 {
            samples.push(sample_at(25.0));
        }
        let strata = WindStrata::uniform(12.0, 3).unwrap();
        let splits = split_stratified(&samples, &strata, SplitRatio::default(), Some(3));
        assert_eq!(splits.len(), samples.len());
    }
}
