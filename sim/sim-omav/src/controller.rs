//! Station-keeping controller producing body wrench commands.
//!
//! A PD law on position and attitude with gravity compensation and wind
//! drag feedforward. The vehicle is omnidirectional, so unlike a planar
//! multirotor the controller never tilts to produce lateral force: it
//! requests the lateral component directly and keeps the attitude level.
//!
//! The controller runs on nominal parameters. Episode randomization feeds
//! the plant the true mass and inertia, so a mismatch shows up as tracking
//! error the PD terms absorb.

use nalgebra::{Matrix3, Vector3};

use alloc_types::{VehicleGeometry, Wrench, STANDARD_GRAVITY};

use crate::state::VehicleState;

/// Default proportional gain on position error (1/s^2).
pub const DEFAULT_KP_POS: f64 = 8.0;
/// Default derivative gain on velocity (1/s).
pub const DEFAULT_KD_POS: f64 = 4.0;
/// Default proportional gain on attitude error (1/s^2).
pub const DEFAULT_KP_ATT: f64 = 20.0;
/// Default derivative gain on body rate (1/s).
pub const DEFAULT_KD_ATT: f64 = 8.0;
/// Default ceiling on commanded PD acceleration (m/s^2).
pub const DEFAULT_ACCEL_LIMIT: f64 = 6.0;

/// PD station-keeping controller with wind feedforward.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverController {
    kp_pos: f64,
    kd_pos: f64,
    kp_att: f64,
    kd_att: f64,
    accel_limit: f64,
    nominal_mass: f64,
    nominal_inertia: Vector3<f64>,
    drag_coeff: f64,
}

impl HoverController {
    /// Controller with default gains for the given nominal parameters.
    ///
    /// `drag_coeff` matches the plant's airframe drag and sizes the wind
    /// feedforward; pass zero to disable it.
    #[must_use]
    pub fn new(nominal_mass: f64, nominal_inertia: Vector3<f64>, drag_coeff: f64) -> Self {
        Self {
            kp_pos: DEFAULT_KP_POS,
            kd_pos: DEFAULT_KD_POS,
            kp_att: DEFAULT_KP_ATT,
            kd_att: DEFAULT_KD_ATT,
            accel_limit: DEFAULT_ACCEL_LIMIT,
            nominal_mass,
            nominal_inertia,
            drag_coeff,
        }
    }

    /// Controller sized from a vehicle description.
    #[must_use]
    pub fn from_geometry(geometry: &VehicleGeometry, drag_coeff: f64) -> Self {
        Self::new(geometry.mass, geometry.inertia, drag_coeff)
    }

    /// Override the PD gains.
    #[must_use]
    pub fn with_gains(mut self, kp_pos: f64, kd_pos: f64, kp_att: f64, kd_att: f64) -> Self {
        self.kp_pos = kp_pos;
        self.kd_pos = kd_pos;
        self.kp_att = kp_att;
        self.kd_att = kd_att;
        self
    }

    /// Override the commanded-acceleration ceiling.
    #[must_use]
    pub fn with_accel_limit(mut self, accel_limit: f64) -> Self {
        self.accel_limit = accel_limit;
        self
    }

    /// Compute the body wrench holding `target` against the estimated wind.
    #[must_use]
    pub fn wrench(
        &self,
        state: &VehicleState,
        target: &Vector3<f64>,
        wind_estimate: &Vector3<f64>,
    ) -> Wrench {
        // Translational channel: PD acceleration, capped, plus gravity and
        // drag feedforward. Drag pushes the airframe downwind, so the
        // feedforward thrusts upwind by the same amount.
        let pd = (target - state.position) * self.kp_pos - state.velocity * self.kd_pos;
        let accel = clamp_norm(pd, self.accel_limit);
        let force_world = (accel + Vector3::new(0.0, 0.0, STANDARD_GRAVITY)) * self.nominal_mass
            - (wind_estimate - state.velocity) * self.drag_coeff;
        let force_body = state.rotation.inverse() * force_world;

        // Attitude channel: drive the rotation to level. Near identity the
        // vee of the skew part is the rotation vector.
        let r = state.rotation.matrix();
        let attitude_error = vee(&(0.5 * (r - r.transpose())));
        let rate_pd = -attitude_error * self.kp_att - state.angular_velocity * self.kd_att;
        let torque = self.nominal_inertia.component_mul(&rate_pd);

        Wrench::new(force_body, torque)
    }
}

/// Extract the vector of a skew-symmetric matrix.
fn vee(m: &Matrix3<f64>) -> Vector3<f64> {
    Vector3::new(m[(2, 1)], m[(0, 2)], m[(1, 0)])
}

fn clamp_norm(v: Vector3<f64>, limit: f64) -> Vector3<f64> {
    let norm = v.norm();
    if norm > limit {
        v * (limit / norm)
    } else {
        v
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    use crate::dynamics::{RigidBodyDynamics, VehicleDynamics};

    fn controller() -> HoverController {
        HoverController::new(4.0, Vector3::new(0.08, 0.08, 0.14), 0.0)
    }

    #[test]
    fn at_target_level_commands_hover() {
        let state = VehicleState::at_rest(Vector3::new(0.0, 0.0, 2.0));
        let wrench = controller().wrench(&state, &Vector3::new(0.0, 0.0, 2.0), &Vector3::zeros());

        assert_relative_eq!(wrench.force, Wrench::hover(4.0).force, epsilon = 1e-12);
        assert!(wrench.torque.norm() < 1e-12);
    }

    #[test]
    fn below_target_pushes_up() {
        let state = VehicleState::at_rest(Vector3::new(0.0, 0.0, 1.0));
        let wrench = controller().wrench(&state, &Vector3::new(0.0, 0.0, 2.0), &Vector3::zeros());
        assert!(wrench.force.z > 4.0 * STANDARD_GRAVITY);
    }

    #[test]
    fn wind_feedforward_thrusts_upwind() {
        let controller = HoverController::new(4.0, Vector3::new(0.08, 0.08, 0.14), 0.5);
        let state = VehicleState::at_rest(Vector3::zeros());
        let wind = Vector3::new(6.0, 0.0, 0.0);
        let wrench = controller.wrench(&state, &Vector3::zeros(), &wind);

        assert!(wrench.force.x < -2.9);
        assert_relative_eq!(wrench.force.z, 4.0 * STANDARD_GRAVITY, epsilon = 1e-12);
    }

    #[test]
    fn tilt_produces_restoring_torque() {
        let mut state = VehicleState::at_rest(Vector3::zeros());
        state.rotation = Rotation3::from_euler_angles(0.1, 0.0, 0.0);
        let wrench = controller().wrench(&state, &Vector3::zeros(), &Vector3::zeros());
        // Positive roll needs negative roll torque.
        assert!(wrench.torque.x < 0.0);
        assert!(wrench.torque.y.abs() < 1e-9);
    }

    #[test]
    fn pd_acceleration_is_capped() {
        let state = VehicleState::at_rest(Vector3::new(100.0, 0.0, 0.0));
        let wrench = controller().wrench(&state, &Vector3::zeros(), &Vector3::zeros());
        let lateral = Vector3::new(wrench.force.x, wrench.force.y, 0.0);
        assert!(lateral.norm() <= 4.0 * DEFAULT_ACCEL_LIMIT + 1e-9);
    }

    // ==================== Closed loop ====================

    #[test]
    fn closed_loop_converges_to_target() {
        let inertia = Vector3::new(0.08, 0.08, 0.14);
        let controller = HoverController::new(4.0, inertia, 0.0);
        let dynamics = RigidBodyDynamics::new(4.0, inertia, 0.0).unwrap();
        let target = Vector3::new(0.0, 0.0, 2.0);
        let wind = Vector3::zeros();

        let mut state = VehicleState::at_rest(Vector3::new(1.0, -0.5, 1.5));
        let dt = 0.002;
        for step in 0..4000 {
            let wrench = controller.wrench(&state, &target, &wind);
            dynamics.step(&mut state, &wrench, &wind, dt, step).unwrap();
        }

        assert!((state.position - target).norm() < 0.05);
        assert!(state.velocity.norm() < 0.05);
    }

    #[test]
    fn closed_loop_rejects_steady_wind() {
        let inertia = Vector3::new(0.08, 0.08, 0.14);
        let drag = 0.5;
        let controller = HoverController::new(4.0, inertia, drag);
        let dynamics = RigidBodyDynamics::new(4.0, inertia, drag).unwrap();
        let target = Vector3::new(0.0, 0.0, 2.0);
        let wind = Vector3::new(6.0, 0.0, 0.0);

        let mut state = VehicleState::at_rest(target);
        let dt = 0.002;
        for step in 0..5000 {
            let wrench = controller.wrench(&state, &target, &wind);
            dynamics.step(&mut state, &wrench, &wind, dt, step).unwrap();
        }

        // Exact feedforward leaves no steady-state offset.
        assert!((state.position - target).norm() < 0.01);
    }

    #[test]
    fn closed_loop_tolerates_mass_mismatch() {
        let inertia = Vector3::new(0.08, 0.08, 0.14);
        // Controller believes 4.0 kg, the plant is 10% heavier.
        let controller = HoverController::new(4.0, inertia, 0.0);
        let dynamics = RigidBodyDynamics::new(4.4, inertia * 1.1, 0.0).unwrap();
        let target = Vector3::new(0.0, 0.0, 2.0);
        let wind = Vector3::zeros();

        let mut state = VehicleState::at_rest(target);
        let dt = 0.002;
        for step in 0..5000 {
            let wrench = controller.wrench(&state, &target, &wind);
            dynamics.step(&mut state, &wrench, &wind, dt, step).unwrap();
        }

        // PD on position absorbs the bias up to a small droop.
        assert!((state.position - target).norm() < 0.2);
        assert!(state.velocity.norm() < 0.05);
    }
}
