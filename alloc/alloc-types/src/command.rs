//! Per-actuator commands and bounds.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::AllocError;
use crate::Result;

/// Closed interval of admissible values for one actuator command.
///
/// Units match the actuator command (thrust-equivalent units for rotors).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorBounds {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl ActuatorBounds {
    /// Create bounds from explicit endpoints.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Bounds `[0, max]` for a non-reversible rotor.
    #[must_use]
    pub const fn non_negative(max: f64) -> Self {
        Self { min: 0.0, max }
    }

    /// Symmetric bounds `[-limit, limit]` for a reversible rotor.
    #[must_use]
    pub const fn symmetric(limit: f64) -> Self {
        Self {
            min: -limit,
            max: limit,
        }
    }

    /// Validate that the interval is finite and non-empty.
    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(AllocError::non_finite("actuator bounds"));
        }
        if self.min > self.max {
            return Err(AllocError::invalid_geometry(format!(
                "actuator bounds empty: [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Clamp a value into the interval.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Whether `value` lies inside the interval, within `tol`.
    #[must_use]
    pub fn contains(&self, value: f64, tol: f64) -> bool {
        value >= self.min - tol && value <= self.max + tol
    }

    /// How far `value` lies outside the interval (zero when inside).
    #[must_use]
    pub fn violation(&self, value: f64) -> f64 {
        (self.min - value).max(value - self.max).max(0.0)
    }

    /// Interval width.
    #[must_use]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// One command value per actuator.
///
/// The entry order matches the column order of the actuation matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    values: DVector<f64>,
}

impl ActuatorCommand {
    /// Wrap a command vector.
    #[must_use]
    pub fn new(values: DVector<f64>) -> Self {
        Self { values }
    }

    /// All-zero command for `n` actuators.
    #[must_use]
    pub fn zeros(n: usize) -> Self {
        Self {
            values: DVector::zeros(n),
        }
    }

    /// Build from a plain vector of values.
    #[must_use]
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            values: DVector::from_vec(values),
        }
    }

    /// Number of actuators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the command is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    /// Command value for actuator `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied()
    }

    /// Underlying vector.
    #[must_use]
    pub fn as_vector(&self) -> &DVector<f64> {
        &self.values
    }

    /// Entries as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        self.values.as_slice()
    }

    /// Largest absolute entry (zero for an empty command).
    #[must_use]
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0, |m, v| m.max(v.abs()))
    }

    /// Whether every entry is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Whether every entry lies inside its bounds, within `tol`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::DimensionMismatch`] if `bounds` has a different
    /// length than the command.
    pub fn within_bounds(&self, bounds: &[ActuatorBounds], tol: f64) -> Result<bool> {
        if bounds.len() != self.len() {
            return Err(AllocError::dimension_mismatch(
                "actuator bounds",
                self.len(),
                bounds.len(),
            ));
        }
        Ok(self
            .values
            .iter()
            .zip(bounds)
            .all(|(v, b)| b.contains(*v, tol)))
    }
}
