//! Six-axis wrench (force + torque) in the body frame.

use nalgebra::{DVector, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::AllocError;
use crate::Result;

/// Dimension of a wrench vector (three force axes, three torque axes).
pub const WRENCH_DIM: usize = 6;

/// Standard gravitational acceleration (m/s^2).
pub const STANDARD_GRAVITY: f64 = 9.81;

/// A force/torque pair expressed in the vehicle body frame.
///
/// Coordinate system is right-handed, z-up. Stacked vector order is
/// `[fx, fy, fz, tx, ty, tz]` and is part of the actuation-matrix contract.
///
/// # Example
///
/// ```
/// use alloc_types::Wrench;
/// use nalgebra::Vector3;
///
/// let w = Wrench::new(Vector3::new(0.0, 0.0, 9.81), Vector3::zeros());
/// assert_eq!(w.to_dvector()[2], 9.81);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wrench {
    /// Force component (N).
    pub force: Vector3<f64>,
    /// Torque component (N m).
    pub torque: Vector3<f64>,
}

impl Wrench {
    /// Create a wrench from force and torque vectors.
    #[must_use]
    pub const fn new(force: Vector3<f64>, torque: Vector3<f64>) -> Self {
        Self { force, torque }
    }

    /// The zero wrench.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }

    /// Gravity-compensating wrench for a level vehicle of the given mass.
    #[must_use]
    pub fn hover(mass: f64) -> Self {
        Self {
            force: Vector3::new(0.0, 0.0, mass * STANDARD_GRAVITY),
            torque: Vector3::zeros(),
        }
    }

    /// Stack force and torque into a 6-vector.
    #[must_use]
    pub fn to_dvector(&self) -> DVector<f64> {
        DVector::from_vec(vec![
            self.force.x,
            self.force.y,
            self.force.z,
            self.torque.x,
            self.torque.y,
            self.torque.z,
        ])
    }

    /// Rebuild a wrench from a stacked 6-vector.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::DimensionMismatch`] if the vector is not
    /// 6-dimensional.
    pub fn from_dvector(v: &DVector<f64>) -> Result<Self> {
        if v.len() != WRENCH_DIM {
            return Err(AllocError::dimension_mismatch("wrench", WRENCH_DIM, v.len()));
        }
        Ok(Self {
            force: Vector3::new(v[0], v[1], v[2]),
            torque: Vector3::new(v[3], v[4], v[5]),
        })
    }

    /// Euclidean norm of the stacked 6-vector.
    #[must_use]
    pub fn norm(&self) -> f64 {
        (self.force.norm_squared() + self.torque.norm_squared()).sqrt()
    }

    /// Whether all six components are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.force.iter().chain(self.torque.iter()).all(|c| c.is_finite())
    }
}

impl Default for Wrench {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::ops::Sub for Wrench {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            force: self.force - rhs.force,
            torque: self.torque - rhs.torque,
        }
    }
}

impl std::ops::Add for Wrench {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            force: self.force + rhs.force,
            torque: self.torque + rhs.torque,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn stacking_round_trip() {
        let w = Wrench::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0));
        let v = w.to_dvector();
        assert_eq!(v.len(), WRENCH_DIM);
        let back = Wrench::from_dvector(&v).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn from_dvector_rejects_wrong_len() {
        let v = DVector::from_vec(vec![1.0; 5]);
        assert!(Wrench::from_dvector(&v).is_err());
    }

    #[test]
    fn hover_compensates_weight() {
        let w = Wrench::hover(4.0);
        assert_relative_eq!(w.force.z, 4.0 * STANDARD_GRAVITY);
        assert_eq!(w.torque, Vector3::zeros());
    }

    #[test]
    fn norm_and_arithmetic() {
        let a = Wrench::new(Vector3::new(3.0, 0.0, 0.0), Vector3::new(0.0, 4.0, 0.0));
        assert_relative_eq!(a.norm(), 5.0);

        let d = a - a;
        assert_relative_eq!(d.norm(), 0.0);

        let s = a + a;
        assert_relative_eq!(s.force.x, 6.0);
    }

    #[test]
    fn finiteness() {
        assert!(Wrench::hover(1.0).is_finite());
        let bad = Wrench::new(Vector3::new(f64::NAN, 0.0, 0.0), Vector3::zeros());
        assert!(!bad.is_finite());
    }
}
