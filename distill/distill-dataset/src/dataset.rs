//! Dataset accumulation and frozen training artifacts.
//!
//! A [`Dataset`] absorbs episode outcomes as they arrive; [`Dataset::freeze`]
//! applies the coverage gate, cuts stratified splits, and produces an
//! immutable [`FrozenDataset`] that can round-trip through JSON. Freezing
//! fails rather than emit a dataset with an under-covered wind stratum.

use serde::{Deserialize, Serialize};
use tracing::info;

use alloc_core::PowerStatistics;

use crate::episode::EpisodeOutcome;
use crate::error::{DatasetError, Result};
use crate::sample::DistillSample;
use crate::schema::DatasetSchema;
use crate::splits::{split_stratified, SplitIndices, SplitRatio};
use crate::strata::{CoverageReport, WindStrata};

/// Provenance and quality numbers of a frozen dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Samples in the frozen dataset.
    pub total_samples: usize,
    /// Episodes that contributed samples.
    pub episodes_kept: usize,
    /// Episodes rejected for divergence or infeasible labels.
    pub episodes_rejected: usize,
    /// Minimum-norm power statistics across all samples.
    pub power_baseline: PowerStatistics,
    /// Teacher-optimum power statistics across all samples.
    pub power_teacher: PowerStatistics,
    /// Teacher-over-baseline savings statistics, in percent.
    pub savings: PowerStatistics,
    /// Per-stratum sample counts at freeze time.
    pub coverage: CoverageReport,
}

/// Mutable accumulator for labeled samples.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: DatasetSchema,
    strata: WindStrata,
    samples: Vec<DistillSample>,
    episodes_kept: usize,
    episodes_rejected: usize,
}

impl Dataset {
    /// Empty dataset for a given schema and wind stratification.
    #[must_use]
    pub fn new(schema: DatasetSchema, strata: WindStrata) -> Self {
        Self {
            schema,
            strata,
            samples: Vec::new(),
            episodes_kept: 0,
            episodes_rejected: 0,
        }
    }

    /// The row schema.
    #[must_use]
    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    /// The wind stratification.
    #[must_use]
    pub fn strata(&self) -> &WindStrata {
        &self.strata
    }

    /// Samples absorbed so far.
    #[must_use]
    pub fn samples(&self) -> &[DistillSample] {
        &self.samples
    }

    /// Number of samples absorbed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples have been absorbed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Absorb a completed episode's samples.
    pub fn record_episode(&mut self, outcome: EpisodeOutcome) {
        self.episodes_kept += 1;
        self.samples.extend(outcome.samples);
    }

    /// Count an episode rejected during generation.
    pub fn record_rejection(&mut self) {
        self.episodes_rejected += 1;
    }

    /// Current per-stratum counts.
    #[must_use]
    pub fn coverage(&self) -> CoverageReport {
        self.strata.coverage(&self.samples)
    }

    /// Gate coverage, cut splits, and seal the dataset.
    ///
    /// # Errors
    ///
    /// [`DatasetError::Empty`] when nothing was absorbed,
    /// [`DatasetError::CoverageInsufficient`] when a stratum falls short of
    /// `required_per_bin`, and a schema error if any sample cannot be
    /// encoded as a row.
    pub fn freeze(
        self,
        required_per_bin: usize,
        ratio: SplitRatio,
        seed: Option<u64>,
    ) -> Result<FrozenDataset> {
        let attempted = self.episodes_kept + self.episodes_rejected;
        if self.samples.is_empty() {
            return Err(DatasetError::Empty { attempted });
        }

        let coverage = self.strata.coverage(&self.samples);
        coverage.require(required_per_bin)?;

        for sample in &self.samples {
            self.schema.encode_row(sample)?;
        }

        let splits = split_stratified(&self.samples, &self.strata, ratio, seed);
        let stats = |values: Vec<f64>| {
            PowerStatistics::from_values(&values).ok_or(DatasetError::Empty { attempted })
        };
        let power_baseline = stats(self.samples.iter().map(|s| s.power_baseline).collect())?;
        let power_teacher = stats(self.samples.iter().map(|s| s.power_teacher).collect())?;
        let savings =
            stats(self.samples.iter().map(DistillSample::savings_percent).collect())?;

        let summary = DatasetSummary {
            total_samples: self.samples.len(),
            episodes_kept: self.episodes_kept,
            episodes_rejected: self.episodes_rejected,
            power_baseline,
            power_teacher,
            savings,
            coverage,
        };
        info!(
            samples = summary.total_samples,
            kept = summary.episodes_kept,
            rejected = summary.episodes_rejected,
            mean_savings = summary.savings.mean,
            "dataset frozen"
        );

        Ok(FrozenDataset {
            columns: self.schema.columns(),
            schema: self.schema,
            samples: self.samples,
            splits,
            summary,
        })
    }
}

/// Immutable, split, coverage-checked dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenDataset {
    /// Ordered column names of the row encoding.
    pub columns: Vec<String>,
    /// Schema the columns were generated from.
    pub schema: DatasetSchema,
    /// All samples, in absorption order.
    pub samples: Vec<DistillSample>,
    /// Stratified train/val/test indices into `samples`.
    pub splits: SplitIndices,
    /// Provenance and quality numbers.
    pub summary: DatasetSummary,
}

impl FrozenDataset {
    /// Samples of the training split.
    #[must_use]
    pub fn train_samples(&self) -> Vec<&DistillSample> {
        self.gather(&self.splits.train)
    }

    /// Samples of the validation split.
    #[must_use]
    pub fn val_samples(&self) -> Vec<&DistillSample> {
        self.gather(&self.splits.val)
    }

    /// Samples of the test split.
    #[must_use]
    pub fn test_samples(&self) -> Vec<&DistillSample> {
        self.gather(&self.splits.test)
    }

    fn gather(&self, indices: &[usize]) -> Vec<&DistillSample> {
        indices.iter().filter_map(|&i| self.samples.get(i)).collect()
    }

    /// Encode every sample as a numeric row, in `columns` order.
    ///
    /// # Errors
    ///
    /// Returns a schema error if a sample disagrees with the schema.
    pub fn rows(&self) -> Result<Vec<Vec<f64>>> {
        self.samples.iter().map(|s| self.schema.encode_row(s)).collect()
    }

    /// Check internal consistency (columns, split indices, coefficient widths).
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::SchemaMismatch`] describing the first
    /// inconsistency found.
    pub fn validate(&self) -> Result<()> {
        self.schema.validate_columns(&self.columns)?;
        if self.splits.len() != self.samples.len() {
            return Err(DatasetError::schema_mismatch(format!(
                "splits cover {} samples, dataset has {}",
                self.splits.len(),
                self.samples.len()
            )));
        }
        let out_of_range = self
            .splits
            .train
            .iter()
            .chain(&self.splits.val)
            .chain(&self.splits.test)
            .any(|&i| i >= self.samples.len());
        if out_of_range {
            return Err(DatasetError::schema_mismatch(
                "split index beyond the sample buffer",
            ));
        }
        for sample in &self.samples {
            if sample.coefficients.len() != self.schema.coeff_dim() {
                return Err(DatasetError::schema_mismatch(format!(
                    "sample has {} coefficients, schema expects {}",
                    sample.coefficients.len(),
                    self.schema.coeff_dim()
                )));
            }
        }
        Ok(())
    }

    /// Serialize to a JSON artifact.
    ///
    /// # Errors
    ///
    /// Returns a serialization error from `serde_json`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load and validate a JSON artifact.
    ///
    /// # Errors
    ///
    /// Returns a parse error or the first internal inconsistency.
    pub fn from_json(text: &str) -> Result<Self> {
        let dataset: Self = serde_json::from_str(text)?;
        dataset.validate()?;
        Ok(dataset)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use alloc_types::VehicleGeometry;
    use sim_omav::{EpisodeParams, OBS_DIM};

    fn sample_at(wind_speed: f64, power_teacher: f64) -> DistillSample {
        let mut params = EpisodeParams::nominal(&VehicleGeometry::tilted_octo());
        params.wind_speed = wind_speed;
        DistillSample {
            episode: 0,
            step: 0,
            observation: [0.1; OBS_DIM],
            coefficients: vec![0.2, -0.1],
            params,
            power_baseline: 100.0,
            power_teacher,
        }
    }

    fn outcome_with(samples: Vec<DistillSample>) -> EpisodeOutcome {
        let params = EpisodeParams::nominal(&VehicleGeometry::tilted_octo());
        EpisodeOutcome {
            samples,
            params,
            steps: 0,
            rms_position_error: 0.0,
            mean_power_flown: 0.0,
            fallback_steps: 0,
        }
    }

    fn covered_dataset(per_bin: usize) -> Dataset {
        let strata = WindStrata::uniform(12.0, 3).unwrap();
        let mut dataset = Dataset::new(DatasetSchema::new(2), strata);
        for bin in 0..3 {
            let samples = (0..per_bin)
                .map(|i| sample_at(4.0 * bin as f64 + 0.5, 90.0 + i as f64))
                .collect();
            dataset.record_episode(outcome_with(samples));
        }
        dataset.record_rejection();
        dataset
    }

    // ==================== Freezing ====================

    #[test]
    fn freeze_partitions_every_sample() {
        let frozen = covered_dataset(20)
            .freeze(10, SplitRatio::default(), Some(5))
            .unwrap();

        assert_eq!(frozen.samples.len(), 60);
        assert_eq!(frozen.splits.len(), 60);
        assert_eq!(frozen.summary.total_samples, 60);
        assert_eq!(frozen.summary.episodes_kept, 3);
        assert_eq!(frozen.summary.episodes_rejected, 1);
        frozen.validate().unwrap();

        let mut seen: Vec<usize> = frozen
            .splits
            .train
            .iter()
            .chain(&frozen.splits.val)
            .chain(&frozen.splits.test)
            .copied()
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..60).collect::<Vec<_>>());
    }

    #[test]
    fn freeze_reports_positive_savings() {
        let frozen = covered_dataset(20)
            .freeze(10, SplitRatio::default(), Some(5))
            .unwrap();
        // Teacher powers sit between 90 and 110 against a baseline of 100.
        assert!(frozen.summary.savings.mean < 10.0);
        assert!(frozen.summary.savings.max <= 10.0 + 1e-12);
        assert_eq!(frozen.summary.power_baseline.mean, 100.0);
        assert!(frozen.summary.power_teacher.min >= 90.0);
    }

    #[test]
    fn under_covered_stratum_fails_the_gate() {
        let err = covered_dataset(20)
            .freeze(21, SplitRatio::default(), Some(5))
            .unwrap_err();
        match err {
            DatasetError::CoverageInsufficient { count, required, .. } => {
                assert_eq!(count, 20);
                assert_eq!(required, 21);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_dataset_cannot_freeze() {
        let strata = WindStrata::uniform(12.0, 3).unwrap();
        let mut dataset = Dataset::new(DatasetSchema::new(2), strata);
        dataset.record_rejection();
        dataset.record_rejection();
        let err = dataset
            .freeze(1, SplitRatio::default(), None)
            .unwrap_err();
        assert!(matches!(err, DatasetError::Empty { attempted: 2 }));
    }

    // ==================== Artifacts ====================

    #[test]
    fn json_round_trip_preserves_the_dataset() {
        let frozen = covered_dataset(15)
            .freeze(10, SplitRatio::default(), Some(7))
            .unwrap();
        let text = frozen.to_json().unwrap();
        let restored = FrozenDataset::from_json(&text).unwrap();
        assert_eq!(restored, frozen);
    }

    #[test]
    fn tampered_columns_are_rejected_on_load() {
        let frozen = covered_dataset(15)
            .freeze(10, SplitRatio::default(), Some(7))
            .unwrap();
        let text = frozen.to_json().unwrap().replace("\"z1\"", "\"q1\"");
        let err = FrozenDataset::from_json(&text).unwrap_err();
        assert!(matches!(err, DatasetError::SchemaMismatch { .. }));
    }

    #[test]
    fn split_accessors_return_disjoint_views() {
        let frozen = covered_dataset(15)
            .freeze(10, SplitRatio::default(), Some(7))
            .unwrap();
        let total = frozen.train_samples().len()
            + frozen.val_samples().len()
            + frozen.test_samples().len();
        assert_eq!(total, frozen.samples.len());
        assert!(!frozen.train_samples().is_empty());
        assert!(!frozen.val_samples().is_empty());
        assert!(!frozen.test_samples().is_empty());
    }

    #[test]
    fn rows_follow_the_schema_width() {
        let frozen = covered_dataset(15)
            .freeze(10, SplitRatio::default(), Some(7))
            .unwrap();
        let rows = frozen.rows().unwrap();
        assert_eq!(rows.len(), frozen.samples.len());
        for row in &rows {
            assert_eq!(row.len(), frozen.schema.width());
        }
    }
}
