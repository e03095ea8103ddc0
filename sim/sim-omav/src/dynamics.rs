//! Rigid-body dynamics with wind drag.
//!
//! The plant model behind every episode: a single rigid body driven by the
//! body-frame wrench the allocator realizes, plus gravity and a linear
//! aerodynamic drag toward the ambient wind. Integration is semi-implicit
//! Euler with the rotation updated through the exponential map, so the
//! attitude never leaves the rotation manifold.

use nalgebra::{Rotation3, Vector3};
use tracing::warn;

use alloc_types::{Wrench, STANDARD_GRAVITY};

use crate::error::{Result, SimOmavError};
use crate::state::VehicleState;

/// Default divergence guard on speed (m/s).
pub const DEFAULT_SPEED_LIMIT: f64 = 50.0;
/// Default divergence guard on body rates (rad/s).
pub const DEFAULT_RATE_LIMIT: f64 = 100.0;

/// Plant model seam.
///
/// Implementations advance a state by one step under a body-frame wrench
/// and ambient wind. `step_index` is carried for divergence reporting.
pub trait VehicleDynamics {
    /// Advance `state` by `dt`.
    ///
    /// # Errors
    ///
    /// Returns [`SimOmavError::Diverged`] when the new state is
    /// non-physical, leaving `state` at the last good value.
    fn step(
        &self,
        state: &mut VehicleState,
        wrench: &Wrench,
        wind: &Vector3<f64>,
        dt: f64,
        step_index: usize,
    ) -> Result<()>;
}

/// Six-degree-of-freedom rigid body with diagonal inertia.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyDynamics {
    mass: f64,
    inertia: Vector3<f64>,
    drag_coeff: f64,
    speed_limit: f64,
    rate_limit: f64,
}

impl RigidBodyDynamics {
    /// Create a plant model.
    ///
    /// `drag_coeff` is the linear airframe drag (N s/m) applied to the
    /// velocity relative to the wind.
    ///
    /// # Errors
    ///
    /// Returns [`SimOmavError::InvalidConfig`] for non-positive mass or
    /// inertia, or negative drag.
    pub fn new(mass: f64, inertia: Vector3<f64>, drag_coeff: f64) -> Result<Self> {
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(SimOmavError::invalid_config("mass must be positive"));
        }
        if !inertia.iter().all(|v| *v > 0.0 && v.is_finite()) {
            return Err(SimOmavError::invalid_config(
                "inertia moments must be positive",
            ));
        }
        if !(drag_coeff >= 0.0 && drag_coeff.is_finite()) {
            return Err(SimOmavError::invalid_config(
                "drag_coeff must be non-negative",
            ));
        }
        Ok(Self {
            mass,
            inertia,
            drag_coeff,
            speed_limit: DEFAULT_SPEED_LIMIT,
            rate_limit: DEFAULT_RATE_LIMIT,
        })
    }

    /// Override the divergence guards.
    #[must_use]
    pub fn with_limits(mut self, speed_limit: f64, rate_limit: f64) -> Self {
        self.speed_limit = speed_limit;
        self.rate_limit = rate_limit;
        self
    }

    /// Vehicle mass (kg).
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Diagonal inertia (kg m^2).
    #[must_use]
    pub fn inertia(&self) -> Vector3<f64> {
        self.inertia
    }

    /// Airframe drag coefficient (N s/m).
    #[must_use]
    pub fn drag_coeff(&self) -> f64 {
        self.drag_coeff
    }

    fn guard(&self, state: &VehicleState, step_index: usize) -> Result<()> {
        if !state.is_finite() {
            return Err(SimOmavError::diverged(step_index, "state became non-finite"));
        }
        let speed = state.velocity.norm();
        if speed > self.speed_limit {
            return Err(SimOmavError::diverged(
                step_index,
                format!("speed {speed:.1} m/s exceeded limit {}", self.speed_limit),
            ));
        }
        let rate = state.angular_velocity.norm();
        if rate > self.rate_limit {
            return Err(SimOmavError::diverged(
                step_index,
                format!("body rate {rate:.1} rad/s exceeded limit {}", self.rate_limit),
            ));
        }
        Ok(())
    }
}

impl VehicleDynamics for RigidBodyDynamics {
    fn step(
        &self,
        state: &mut VehicleState,
        wrench: &Wrench,
        wind: &Vector3<f64>,
        dt: f64,
        step_index: usize,
    ) -> Result<()> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(SimOmavError::invalid_config("dt must be positive"));
        }
        if !wrench.is_finite() {
            return Err(SimOmavError::non_finite("wrench"));
        }
        if !wind.iter().all(|v| v.is_finite()) {
            return Err(SimOmavError::non_finite("wind"));
        }

        let mut next = state.clone();

        // Translation: thrust rotated to world, gravity, drag toward wind.
        let thrust_world = next.rotation * wrench.force;
        let drag = (wind - next.velocity) * self.drag_coeff;
        let accel = (thrust_world + drag) / self.mass
            - Vector3::new(0.0, 0.0, STANDARD_GRAVITY);
        next.velocity += accel * dt;
        next.position += next.velocity * dt;

        // Rotation: Euler's equation with diagonal inertia, then the
        // exponential map on the body-frame rate.
        let omega = next.angular_velocity;
        let inertia_omega = omega.component_mul(&self.inertia);
        let angular_accel =
            (wrench.torque - omega.cross(&inertia_omega)).component_div(&self.inertia);
        next.angular_velocity += angular_accel * dt;
        next.rotation *= Rotation3::from_scaled_axis(next.angular_velocity * dt);

        if let Err(err) = self.guard(&next, step_index) {
            warn!(step_index, %err, "integration diverged");
            return Err(err);
        }
        *state = next;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn plant() -> RigidBodyDynamics {
        RigidBodyDynamics::new(4.0, Vector3::new(0.08, 0.08, 0.14), 0.0).unwrap()
    }

    #[test]
    fn hover_wrench_holds_position() {
        let dynamics = plant();
        let mut state = VehicleState::at_rest(Vector3::new(0.0, 0.0, 2.0));
        let hover = Wrench::hover(4.0);
        let wind = Vector3::zeros();

        for step in 0..1000 {
            dynamics.step(&mut state, &hover, &wind, 0.002, step).unwrap();
        }
        assert_relative_eq!(state.position, Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-9);
        assert!(state.velocity.norm() < 1e-9);
    }

    #[test]
    fn free_fall_matches_closed_form() {
        let dynamics = plant();
        let mut state = VehicleState::at_rest(Vector3::zeros());
        let zero = Wrench::zero();
        let wind = Vector3::zeros();

        let dt = 0.001;
        for step in 0..1000 {
            dynamics.step(&mut state, &zero, &wind, dt, step).unwrap();
        }
        // Semi-implicit Euler falls exactly -g dt^2 n(n+1)/2.
        let t = dt * 1000.0;
        let expected = -0.5 * STANDARD_GRAVITY * t * (t + dt);
        assert_relative_eq!(state.position.z, expected, epsilon = 1e-9);
    }

    #[test]
    fn drag_accelerates_toward_wind() {
        let dynamics = RigidBodyDynamics::new(4.0, Vector3::new(0.08, 0.08, 0.14), 2.0).unwrap();
        let mut state = VehicleState::at_rest(Vector3::zeros());
        let hover = Wrench::hover(4.0);
        let wind = Vector3::new(5.0, 0.0, 0.0);

        for step in 0..5000 {
            dynamics.step(&mut state, &hover, &wind, 0.002, step).unwrap();
        }
        // Time constant m / c = 2 s, so 10 s reaches ~99% of wind speed.
        assert!(state.velocity.x > 4.8);
        assert!(state.velocity.x < 5.0 + 1e-9);
    }

    #[test]
    fn constant_torque_spins_up() {
        let dynamics = plant();
        let mut state = VehicleState::at_rest(Vector3::zeros());
        let wrench = Wrench::new(Vector3::new(0.0, 0.0, 4.0 * STANDARD_GRAVITY), Vector3::new(0.0, 0.0, 0.07));
        let wind = Vector3::zeros();

        let dt = 0.001;
        for step in 0..1000 {
            dynamics.step(&mut state, &wrench, &wind, dt, step).unwrap();
        }
        // Pure yaw torque about a principal axis: omega_z = tau / I_z * t.
        assert_relative_eq!(state.angular_velocity.z, 0.07 / 0.14, epsilon = 1e-9);
        assert!(state.angular_velocity.xy().norm() < 1e-12);
    }

    #[test]
    fn rotation_stays_orthonormal() {
        let dynamics = plant();
        let mut state = VehicleState::at_rest(Vector3::zeros());
        let wrench = Wrench::new(
            Vector3::new(0.0, 0.0, 4.0 * STANDARD_GRAVITY),
            Vector3::new(0.02, -0.015, 0.01),
        );
        let wind = Vector3::zeros();

        for step in 0..1000 {
            dynamics.step(&mut state, &wrench, &wind, 0.002, step).unwrap();
        }
        let r = state.rotation.matrix();
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-9);
    }

    #[test]
    fn runaway_speed_is_divergence() {
        let dynamics = plant().with_limits(10.0, 100.0);
        let mut state = VehicleState::at_rest(Vector3::zeros());
        let wrench = Wrench::new(Vector3::new(400.0, 0.0, 4.0 * STANDARD_GRAVITY), Vector3::zeros());
        let wind = Vector3::zeros();

        let mut result = Ok(());
        for step in 0..1000 {
            result = dynamics.step(&mut state, &wrench, &wind, 0.01, step);
            if result.is_err() {
                break;
            }
        }
        let err = result.unwrap_err();
        assert!(err.is_divergence());
        // State keeps the last good value.
        assert!(state.velocity.norm() <= 10.0);
    }

    #[test]
    fn non_finite_inputs_are_rejected() {
        let dynamics = plant();
        let mut state = VehicleState::at_rest(Vector3::zeros());
        let bad = Wrench::new(Vector3::new(f64::NAN, 0.0, 0.0), Vector3::zeros());
        let err = dynamics
            .step(&mut state, &bad, &Vector3::zeros(), 0.01, 0)
            .unwrap_err();
        assert_eq!(err, SimOmavError::non_finite("wrench"));
    }

    #[test]
    fn constructor_rejects_bad_parameters() {
        assert!(RigidBodyDynamics::new(0.0, Vector3::new(0.1, 0.1, 0.1), 0.0).is_err());
        assert!(RigidBodyDynamics::new(4.0, Vector3::new(0.1, -0.1, 0.1), 0.0).is_err());
        assert!(RigidBodyDynamics::new(4.0, Vector3::new(0.1, 0.1, 0.1), -1.0).is_err());
    }
}
