//! Wind-speed stratification and the coverage gate.
//!
//! A dataset that under-samples part of the wind envelope trains an oracle
//! that silently extrapolates exactly where the vehicle works hardest. The
//! gate makes that failure loud: freezing a dataset fails unless every
//! stratum holds the required number of samples.

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::sample::DistillSample;

/// Wind-speed strata defined by ascending bin edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindStrata {
    edges: Vec<f64>,
}

impl WindStrata {
    /// Equal-width strata over `[0, max_speed]`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidConfig`] for zero bins or a
    /// non-positive maximum.
    pub fn uniform(max_speed: f64, bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(DatasetError::invalid_config("strata need at least one bin"));
        }
        if !(max_speed > 0.0 && max_speed.is_finite()) {
            return Err(DatasetError::invalid_config(
                "max_speed must be positive and finite",
            ));
        }
        let edges = (0..=bins)
            .map(|i| max_speed * (i as f64) / (bins as f64))
            .collect();
        Ok(Self { edges })
    }

    /// Strata from explicit ascending edges.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidConfig`] unless at least two strictly
    /// ascending finite edges are given.
    pub fn from_edges(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(DatasetError::invalid_config("strata need two edges"));
        }
        if !edges.iter().all(|e| e.is_finite()) {
            return Err(DatasetError::invalid_config("edges must be finite"));
        }
        if !edges.windows(2).all(|w| w[0] < w[1]) {
            return Err(DatasetError::invalid_config(
                "edges must be strictly ascending",
            ));
        }
        Ok(Self { edges })
    }

    /// Number of strata.
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.edges.len() - 1
    }

    /// Bin edges.
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Stratum index of a wind speed, `None` outside `[first, last]`.
    ///
    /// The final edge is an inclusive upper bound; speeds beyond it are
    /// out of distribution and excluded from coverage accounting.
    #[must_use]
    pub fn bin_of(&self, wind_speed: f64) -> Option<usize> {
        if !wind_speed.is_finite() {
            return None;
        }
        if wind_speed < self.edges[0] || wind_speed > self.edges[self.edges.len() - 1] {
            return None;
        }
        // partition_point gives the first edge above the speed.
        let idx = self.edges.partition_point(|e| *e <= wind_speed);
        Some(idx.min(self.bin_count()) - 1)
    }

    /// Count samples per stratum.
    #[must_use]
    pub fn coverage(&self, samples: &[DistillSample]) -> CoverageReport {
        let mut counts = vec![0usize; self.bin_count()];
        let mut out_of_range = 0usize;
        for sample in samples {
            match self.bin_of(sample.wind_speed()) {
                Some(bin) => counts[bin] += 1,
                None => out_of_range += 1,
            }
        }
        CoverageReport {
            edges: self.edges.clone(),
            counts,
            out_of_range,
        }
    }
}

/// Per-stratum sample counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Bin edges the counts refer to.
    pub edges: Vec<f64>,
    /// Samples per stratum.
    pub counts: Vec<usize>,
    /// Samples whose wind speed fell outside the strata.
    pub out_of_range: usize,
}

impl CoverageReport {
    /// Total in-range samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Per-stratum fraction of a target sample count.
    #[must_use]
    pub fn fractions(&self, target: usize) -> Vec<f64> {
        let target = target.max(1) as f64;
        self.counts.iter().map(|&c| c as f64 / target).collect()
    }

    /// The stratum with the fewest samples.
    #[must_use]
    pub fn least_covered(&self) -> Option<(usize, usize)> {
        self.counts
            .iter()
            .copied()
            .enumerate()
            .min_by_key(|(_, count)| *count)
    }

    /// Enforce the per-stratum minimum.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::CoverageInsufficient`] naming the worst
    /// under-covered stratum.
    pub fn require(&self, required: usize) -> Result<()> {
        if let Some((bin, count)) = self.least_covered() {
            if count < required {
                return Err(DatasetError::CoverageInsufficient {
                    bin,
                    count,
                    required,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use alloc_types::VehicleGeometry;
    use sim_omav::EpisodeParams;

    fn sample_at(wind_speed: f64) -> DistillSample {
        let mut params = EpisodeParams::nominal(&VehicleGeometry::tilted_octo());
        params.wind_speed = wind_speed;
        DistillSample {
            episode: 0,
            step: 0,
            observation: [0.0; sim_omav::OBS_DIM],
            coefficients: vec![0.0, 0.0],
            params,
            power_baseline: 1.0,
            power_teacher: 1.0,
        }
    }

    #[test]
    fn uniform_edges_partition_the_envelope() {
        let strata = WindStrata::uniform(12.0, 4).unwrap();
        assert_eq!(strata.bin_count(), 4);
        assert_eq!(strata.bin_of(0.0), Some(0));
        assert_eq!(strata.bin_of(2.9), Some(0));
        assert_eq!(strata.bin_of(3.0), Some(1));
        assert_eq!(strata.bin_of(11.9), Some(3));
        // The last edge itself is still in distribution.
        assert_eq!(strata.bin_of(12.0), Some(3));
        assert_eq!(strata.bin_of(12.1), None);
        assert_eq!(strata.bin_of(-0.1), None);
        assert_eq!(strata.bin_of(f64::NAN), None);
    }

    #[test]
    fn fractions_are_relative_to_the_target() {
        let strata = WindStrata::uniform(12.0, 3).unwrap();
        let samples = vec![sample_at(1.0), sample_at(2.0), sample_at(5.0)];
        let report = strata.coverage(&samples);
        assert_eq!(report.fractions(10), vec![0.2, 0.1, 0.0]);
    }

    #[test]
    fn coverage_counts_land_in_the_right_bins() {
        let strata = WindStrata::uniform(12.0, 3).unwrap();
        let samples = vec![
            sample_at(1.0),
            sample_at(2.0),
            sample_at(5.0),
            sample_at(9.0),
            sample_at(15.0),
        ];
        let report = strata.coverage(&samples);
        assert_eq!(report.counts, vec![2, 1, 1]);
        assert_eq!(report.out_of_range, 1);
        assert_eq!(report.total(), 4);
    }

    #[test]
    fn gate_rejects_the_emptiest_stratum() {
        let strata = WindStrata::uniform(12.0, 3).unwrap();
        let samples = vec![sample_at(1.0), sample_at(2.0), sample_at(5.0)];
        let report = strata.coverage(&samples);

        let err = report.require(2).unwrap_err();
        match err {
            DatasetError::CoverageInsufficient {
                bin,
                count,
                required,
            } => {
                assert_eq!(bin, 2);
                assert_eq!(count, 0);
                assert_eq!(required, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn gate_passes_when_all_strata_are_full() {
        let strata = WindStrata::uniform(12.0, 2).unwrap();
        let samples = vec![sample_at(2.0), sample_at(3.0), sample_at(8.0), sample_at(9.0)];
        strata.coverage(&samples).require(2).unwrap();
    }

    #[test]
    fn bad_edges_are_rejected() {
        assert!(WindStrata::uniform(12.0, 0).is_err());
        assert!(WindStrata::uniform(0.0, 3).is_err());
        assert!(WindStrata::from_edges(vec![0.0]).is_err());
        assert!(WindStrata::from_edges(vec![0.0, 5.0, 5.0]).is_err());
        assert!(WindStrata::from_edges(vec![0.0, 5.0, 3.0]).is_err());
    }
}
