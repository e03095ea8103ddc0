//! Vehicle geometry: rotor layout, mass properties, actuation coefficients.
//!
//! The geometry is the single source of truth for the actuation matrix.
//! It is validated once, then treated as read-only by every downstream
//! component (allocator, simulation, dataset builder).

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::command::ActuatorBounds;
use crate::error::AllocError;
use crate::wrench::WRENCH_DIM;
use crate::Result;

/// Rotor spin direction, viewed from above the rotor disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpinDirection {
    /// Counter-clockwise.
    Ccw,
    /// Clockwise.
    Cw,
}

impl SpinDirection {
    /// Sign of the reaction drag torque about the thrust axis.
    #[must_use]
    pub const fn sign(&self) -> f64 {
        match self {
            Self::Ccw => 1.0,
            Self::Cw => -1.0,
        }
    }
}

/// Placement of a single rotor in the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotorGeometry {
    /// Rotor hub position (m).
    pub position: Vector3<f64>,
    /// Unit thrust direction.
    pub axis: Vector3<f64>,
    /// Spin direction.
    pub spin: SpinDirection,
}

impl RotorGeometry {
    /// Create a rotor placement.
    #[must_use]
    pub const fn new(position: Vector3<f64>, axis: Vector3<f64>, spin: SpinDirection) -> Self {
        Self {
            position,
            axis,
            spin,
        }
    }
}

/// Full vehicle description for allocation and simulation.
///
/// The actuation matrix column for rotor `i` is
/// `[kf * a_i ; kf * (p_i x a_i) + s_i * km * a_i]` where `p_i` is the hub
/// position, `a_i` the unit thrust axis, `s_i` the spin sign, and `kf`, `km`
/// the thrust and drag coefficients. Commands are in thrust-equivalent units
/// so that `kf * u_i` is the rotor thrust in newtons.
///
/// # Example
///
/// ```
/// use alloc_types::VehicleGeometry;
///
/// let geometry = VehicleGeometry::tilted_octo();
/// assert_eq!(geometry.actuator_count(), 8);
/// assert!(geometry.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleGeometry {
    /// Rotor placements, in actuation-matrix column order.
    pub rotors: Vec<RotorGeometry>,
    /// Per-actuator command bounds, same order as `rotors`.
    pub bounds: Vec<ActuatorBounds>,
    /// Vehicle mass (kg).
    pub mass: f64,
    /// Diagonal body inertia (kg m^2).
    pub inertia: Vector3<f64>,
    /// Thrust coefficient `kf` (N per command unit).
    pub thrust_coeff: f64,
    /// Drag torque coefficient `km` (N m per command unit).
    pub drag_coeff: f64,
    /// Expected null-space dimensionality of the actuation matrix.
    pub coeff_dim: usize,
}

impl VehicleGeometry {
    /// Reference omnidirectional octorotor.
    ///
    /// Eight rotors, equally spaced on a 0.30 m circle, canted 35 degrees
    /// about the tangential direction with sign pattern `++--++--` and
    /// alternating spin. The pattern makes the layout omnidirectional
    /// (rank 6, two-dimensional null space) while keeping pure vertical
    /// thrust symmetric across all rotors.
    #[must_use]
    pub fn tilted_octo() -> Self {
        Self::tilted_octo_with(0.30, 35.0_f64.to_radians(), 10.0)
    }

    /// Parametrized omnidirectional octorotor.
    ///
    /// # Arguments
    ///
    /// - `arm_length`: rotor circle radius (m)
    /// - `cant_angle`: tilt away from vertical (rad), in `(0, pi/2)`
    /// - `max_command`: per-rotor command upper bound (lower bound is zero)
    #[must_use]
    pub fn tilted_octo_with(arm_length: f64, cant_angle: f64, max_command: f64) -> Self {
        let n = 8;
        let (sin_cant, cos_cant) = cant_angle.sin_cos();
        let mut rotors = Vec::with_capacity(n);
        for i in 0..n {
            let theta = std::f64::consts::TAU * (i as f64) / (n as f64);
            let (sin_t, cos_t) = theta.sin_cos();
            let position = Vector3::new(arm_length * cos_t, arm_length * sin_t, 0.0);
            let tangent = Vector3::new(-sin_t, cos_t, 0.0);
            // Cant sign pattern ++--++-- keeps uniform commands wrench-pure
            // in z; alternating spin balances drag torque.
            let cant_sign = if (i / 2) % 2 == 0 { 1.0 } else { -1.0 };
            let axis = tangent * (cant_sign * sin_cant) + Vector3::new(0.0, 0.0, cos_cant);
            let spin = if i % 2 == 0 {
                SpinDirection::Ccw
            } else {
                SpinDirection::Cw
            };
            rotors.push(RotorGeometry::new(position, axis, spin));
        }

        Self {
            rotors,
            bounds: vec![ActuatorBounds::non_negative(max_command); n],
            mass: 4.0,
            inertia: Vector3::new(0.08, 0.08, 0.14),
            thrust_coeff: 1.0,
            drag_coeff: 0.016,
            coeff_dim: 2,
        }
    }

    /// Set the vehicle mass.
    #[must_use]
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Set the diagonal inertia.
    #[must_use]
    pub fn with_inertia(mut self, inertia: Vector3<f64>) -> Self {
        self.inertia = inertia;
        self
    }

    /// Set thrust and drag coefficients.
    #[must_use]
    pub fn with_coefficients(mut self, thrust_coeff: f64, drag_coeff: f64) -> Self {
        self.thrust_coeff = thrust_coeff;
        self.drag_coeff = drag_coeff;
        self
    }

    /// Replace all actuator bounds with one shared interval.
    #[must_use]
    pub fn with_uniform_bounds(mut self, bounds: ActuatorBounds) -> Self {
        self.bounds = vec![bounds; self.rotors.len()];
        self
    }

    /// Number of actuators.
    #[must_use]
    pub fn actuator_count(&self) -> usize {
        self.rotors.len()
    }

    /// Validate the geometry.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidGeometry`] or
    /// [`AllocError::DimensionMismatch`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let n = self.rotors.len();
        if n <= WRENCH_DIM {
            return Err(AllocError::invalid_geometry(format!(
                "need more than {WRENCH_DIM} actuators for null-space allocation, got {n}"
            )));
        }
        if self.bounds.len() != n {
            return Err(AllocError::dimension_mismatch(
                "actuator bounds",
                n,
                self.bounds.len(),
            ));
        }
        for (i, rotor) in self.rotors.iter().enumerate() {
            if !rotor.position.iter().all(|c| c.is_finite()) {
                return Err(AllocError::non_finite(format!("rotor {i} position")));
            }
            let axis_norm = rotor.axis.norm();
            if !axis_norm.is_finite() || (axis_norm - 1.0).abs() > 1e-6 {
                return Err(AllocError::invalid_geometry(format!(
                    "rotor {i} axis is not a unit vector (norm {axis_norm})"
                )));
            }
        }
        for bounds in &self.bounds {
            bounds.validate()?;
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(AllocError::invalid_geometry(format!(
                "mass must be positive, got {}",
                self.mass
            )));
        }
        if self.inertia.iter().any(|j| !j.is_finite() || *j <= 0.0) {
            return Err(AllocError::invalid_geometry(
                "inertia components must be positive",
            ));
        }
        if !self.thrust_coeff.is_finite() || self.thrust_coeff <= 0.0 {
            return Err(AllocError::invalid_geometry(format!(
                "thrust coefficient must be positive, got {}",
                self.thrust_coeff
            )));
        }
        if !self.drag_coeff.is_finite() || self.drag_coeff < 0.0 {
            return Err(AllocError::invalid_geometry(format!(
                "drag coefficient must be non-negative, got {}",
                self.drag_coeff
            )));
        }
        if self.coeff_dim == 0 || self.coeff_dim > n - WRENCH_DIM {
            return Err(AllocError::dimension_mismatch(
                "null-space coefficients",
                n - WRENCH_DIM,
                self.coeff_dim,
            ));
        }
        Ok(())
    }
}
