//! The flat column contract for exported datasets.
//!
//! Consumers outside this workspace (training scripts, notebooks) read the
//! exported rows positionally, so the column order is part of the public
//! contract and is checked, not assumed: artifacts carry their header and
//! [`DatasetSchema::validate_columns`] rejects any drift.

use std::ops::Range;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use sim_omav::{EpisodeParams, OBS_DIM};

use crate::error::{DatasetError, Result};
use crate::sample::DistillSample;

/// Number of metadata columns after the coefficient block.
const META_COLUMNS: usize = 11;

/// Column layout of one exported row.
///
/// Order: `obs_0..obs_20`, `z1..zk`, then episode metadata
/// (`wind_x`, `wind_y`, `wind_z`, `wind_speed`, `mass`, `inertia_xx`,
/// `inertia_yy`, `inertia_zz`, `thrust_coeff`, `power_baseline`,
/// `power_teacher`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    obs_dim: usize,
    coeff_dim: usize,
}

impl DatasetSchema {
    /// Schema for a given coefficient dimensionality.
    #[must_use]
    pub fn new(coeff_dim: usize) -> Self {
        Self {
            obs_dim: OBS_DIM,
            coeff_dim,
        }
    }

    /// Observation dimensionality.
    #[must_use]
    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    /// Coefficient dimensionality.
    #[must_use]
    pub fn coeff_dim(&self) -> usize {
        self.coeff_dim
    }

    /// Total row width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.obs_dim + self.coeff_dim + META_COLUMNS
    }

    /// Columns holding the observation.
    #[must_use]
    pub fn observation_range(&self) -> Range<usize> {
        0..self.obs_dim
    }

    /// Columns holding the teacher coefficients.
    #[must_use]
    pub fn coefficient_range(&self) -> Range<usize> {
        self.obs_dim..self.obs_dim + self.coeff_dim
    }

    /// Ordered column names.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        for i in 0..self.obs_dim {
            names.push(format!("obs_{i}"));
        }
        for i in 1..=self.coeff_dim {
            names.push(format!("z{i}"));
        }
        for name in [
            "wind_x",
            "wind_y",
            "wind_z",
            "wind_speed",
            "mass",
            "inertia_xx",
            "inertia_yy",
            "inertia_zz",
            "thrust_coeff",
            "power_baseline",
            "power_teacher",
        ] {
            names.push(name.to_owned());
        }
        names
    }

    /// The column names joined into one comma-separated header line.
    #[must_use]
    pub fn header(&self) -> String {
        self.columns().join(",")
    }

    /// Encode one sample into a row.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::SchemaMismatch`] when the sample's
    /// coefficient count differs from the schema.
    pub fn encode_row(&self, sample: &DistillSample) -> Result<Vec<f64>> {
        if sample.coefficients.len() != self.coeff_dim {
            return Err(DatasetError::schema_mismatch(format!(
                "sample has {} coefficients, schema expects {}",
                sample.coefficients.len(),
                self.coeff_dim
            )));
        }
        let mut row = Vec::with_capacity(self.width());
        row.extend_from_slice(&sample.observation);
        row.extend_from_slice(&sample.coefficients);
        let p = &sample.params;
        row.extend_from_slice(&[
            p.wind_mean.x,
            p.wind_mean.y,
            p.wind_mean.z,
            p.wind_speed,
            p.mass,
            p.inertia.x,
            p.inertia.y,
            p.inertia.z,
            p.thrust_coeff,
            sample.power_baseline,
            sample.power_teacher,
        ]);
        Ok(row)
    }

    /// Decode a row back into a sample.
    ///
    /// The row encoding does not carry the episode id, step index, or gust
    /// intensity; those fields decode as zero.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::SchemaMismatch`] when the row width differs
    /// from the schema.
    pub fn decode_row(&self, row: &[f64]) -> Result<DistillSample> {
        if row.len() != self.width() || self.obs_dim != OBS_DIM {
            return Err(DatasetError::schema_mismatch(format!(
                "row has {} values, schema expects {}",
                row.len(),
                self.width()
            )));
        }
        let mut observation = [0.0; OBS_DIM];
        observation.copy_from_slice(&row[self.observation_range()]);
        let coefficients = row[self.coefficient_range()].to_vec();
        let m = self.obs_dim + self.coeff_dim;
        let params = EpisodeParams {
            wind_mean: Vector3::new(row[m], row[m + 1], row[m + 2]),
            wind_speed: row[m + 3],
            gust_std: 0.0,
            mass: row[m + 4],
            inertia: Vector3::new(row[m + 5], row[m + 6], row[m + 7]),
            thrust_coeff: row[m + 8],
        };
        Ok(DistillSample {
            episode: 0,
            step: 0,
            observation,
            coefficients,
            params,
            power_baseline: row[m + 9],
            power_teacher: row[m + 10],
        })
    }

    /// Check a stored header against this schema.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::SchemaMismatch`] naming the first deviation.
    pub fn validate_columns(&self, header: &[String]) -> Result<()> {
        if self.obs_dim != OBS_DIM {
            return Err(DatasetError::schema_mismatch(format!(
                "schema declares {} observation columns, this build uses {OBS_DIM}",
                self.obs_dim
            )));
        }
        let expected = self.columns();
        if header.len() != expected.len() {
            return Err(DatasetError::schema_mismatch(format!(
                "header has {} columns, schema expects {}",
                header.len(),
                expected.len()
            )));
        }
        for (i, (got, want)) in header.iter().zip(&expected).enumerate() {
            if got != want {
                return Err(DatasetError::schema_mismatch(format!(
                    "column {i} is '{got}', expected '{want}'"
                )));
            }
        }
        Ok(())
    }
}
