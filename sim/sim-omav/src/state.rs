//! Vehicle state and the flat observation encoding.
//!
//! The observation vector is the contract between the simulation and every
//! downstream consumer: dataset rows store it column by column, and learned
//! policies index into it. Its layout is fixed:
//!
//! | Range    | Content                              |
//! |----------|--------------------------------------|
//! | `0..3`   | position (m, world frame)            |
//! | `3..12`  | rotation matrix, row-major           |
//! | `12..15` | linear velocity (m/s, world frame)   |
//! | `15..18` | angular velocity (rad/s, body frame) |
//! | `18..21` | wind velocity estimate (m/s, world)  |
//!
//! The rotation is encoded as the full matrix rather than Euler angles or a
//! quaternion so the encoding is unique and free of discontinuities.

use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimOmavError};

/// Dimension of the flat observation vector.
pub const OBS_DIM: usize = 21;

/// Rigid-body state of the vehicle.
///
/// Position and linear velocity are expressed in the world frame (z up);
/// angular velocity is expressed in the body frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Position of the center of mass.
    pub position: Vector3<f64>,
    /// Body-to-world rotation.
    pub rotation: Rotation3<f64>,
    /// Linear velocity of the center of mass.
    pub velocity: Vector3<f64>,
    /// Angular velocity in the body frame.
    pub angular_velocity: Vector3<f64>,
}

impl VehicleState {
    /// A level, motionless state at the given position.
    #[must_use]
    pub fn at_rest(position: Vector3<f64>) -> Self {
        Self {
            position,
            rotation: Rotation3::identity(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.rotation.matrix().iter().all(|v| v.is_finite())
            && self.velocity.iter().all(|v| v.is_finite())
            && self.angular_velocity.iter().all(|v| v.is_finite())
    }

    /// Encode the state and a wind estimate into the flat observation.
    #[must_use]
    pub fn observation(&self, wind_estimate: &Vector3<f64>) -> [f64; OBS_DIM] {
        let mut obs = [0.0; OBS_DIM];
        obs[0..3].copy_from_slice(self.position.as_slice());
        let r = self.rotation.matrix();
        for row in 0..3 {
            for col in 0..3 {
                obs[3 + 3 * row + col] = r[(row, col)];
            }
        }
        obs[12..15].copy_from_slice(self.velocity.as_slice());
        obs[15..18].copy_from_slice(self.angular_velocity.as_slice());
        obs[18..21].copy_from_slice(wind_estimate.as_slice());
        obs
    }

    /// Decode a flat observation back into a state and wind estimate.
    ///
    /// The rotation block is re-orthonormalized, so observations that went
    /// through lossy storage still decode to a proper rotation.
    ///
    /// # Errors
    ///
    /// Returns [`SimOmavError::NonFinite`] when the observation contains
    /// NaN or infinity.
    pub fn from_observation(obs: &[f64; OBS_DIM]) -> Result<(Self, Vector3<f64>)> {
        if !obs.iter().all(|v| v.is_finite()) {
            return Err(SimOmavError::non_finite("observation"));
        }
        let mut r = Matrix3::zeros();
        for row in 0..3 {
            for col in 0..3 {
                r[(row, col)] = obs[3 + 3 * row + col];
            }
        }
        let state = Self {
            position: Vector3::new(obs[0], obs[1], obs[2]),
            rotation: Rotation3::from_matrix(&r),
            velocity: Vector3::new(obs[12], obs[13], obs[14]),
            angular_velocity: Vector3::new(obs[15], obs[16], obs[17]),
        };
        let wind = Vector3::new(obs[18], obs[19], obs[20]);
        Ok((state, wind))
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::at_rest(Vector3::zeros())
    }
}
