//! Null-space allocator: wrench plus coefficients in, bounded command out.

use nalgebra::DVector;
use tracing::debug;

use alloc_types::{
    ActuatorBounds, ActuatorCommand, AllocError, Result, VehicleGeometry, Wrench,
};

use crate::actuation::ActuationMap;
use crate::saturation::{hard_clip, null_scale_alpha, SaturationPolicy, SaturationReport};

/// Default feasibility tolerance on actuator bounds.
pub const DEFAULT_BOUND_TOLERANCE: f64 = 1e-9;

/// Result of one allocation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Bounded actuator command.
    pub command: ActuatorCommand,
    /// Wrench actually produced by `command` (exactly `B * u`).
    pub achieved: Wrench,
    /// Saturation record, present iff the unsaturated command left the box.
    pub saturation: Option<SaturationReport>,
}

impl Allocation {
    /// Whether saturation was applied.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.saturation.is_some()
    }

    /// Wrench error introduced by saturation (zero when unsaturated).
    #[must_use]
    pub fn wrench_error(&self) -> f64 {
        self.saturation.as_ref().map_or(0.0, |s| s.wrench_error)
    }
}

/// Maps desired wrenches and null-space coefficients to bounded commands.
///
/// The allocator computes `u = pinv(B) * w + N * z`. Before saturation this
/// reproduces the wrench exactly; when `u` leaves the actuator box the
/// configured [`SaturationPolicy`] decides between clipping (recording the
/// wrench violation) and scaling the null-space term back (preserving the
/// wrench). Pure and `Sync`: no internal state changes after construction.
///
/// # Example
///
/// ```
/// use alloc_core::NullSpaceAllocator;
/// use alloc_types::{VehicleGeometry, Wrench};
///
/// let geometry = VehicleGeometry::tilted_octo();
/// let allocator = NullSpaceAllocator::new(&geometry).unwrap();
///
/// let allocation = allocator
///     .allocate(&Wrench::hover(geometry.mass), &[0.0, 0.0])
///     .unwrap();
/// assert!(!allocation.is_saturated());
/// ```
#[derive(Debug, Clone)]
pub struct NullSpaceAllocator {
    map: ActuationMap,
    bounds: Vec<ActuatorBounds>,
    policy: SaturationPolicy,
    tolerance: f64,
}

impl NullSpaceAllocator {
    /// Build an allocator with the default [`SaturationPolicy::NullScale`].
    ///
    /// # Errors
    ///
    /// Propagates [`ActuationMap::from_geometry`] errors.
    pub fn new(geometry: &VehicleGeometry) -> Result<Self> {
        Self::with_policy(geometry, SaturationPolicy::default())
    }

    /// Build an allocator with an explicit saturation policy.
    ///
    /// # Errors
    ///
    /// Propagates [`ActuationMap::from_geometry`] errors.
    pub fn with_policy(geometry: &VehicleGeometry, policy: SaturationPolicy) -> Result<Self> {
        let map = ActuationMap::from_geometry(geometry)?;
        Ok(Self {
            map,
            bounds: geometry.bounds.clone(),
            policy,
            tolerance: DEFAULT_BOUND_TOLERANCE,
        })
    }

    /// Override the bound feasibility tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// The prepared actuation map.
    #[must_use]
    pub fn map(&self) -> &ActuationMap {
        &self.map
    }

    /// Per-actuator bounds.
    #[must_use]
    pub fn bounds(&self) -> &[ActuatorBounds] {
        &self.bounds
    }

    /// Configured saturation policy.
    #[must_use]
    pub fn policy(&self) -> SaturationPolicy {
        self.policy
    }

    /// Null-space coefficient dimensionality.
    #[must_use]
    pub fn coeff_dim(&self) -> usize {
        self.map.coeff_dim()
    }

    /// Allocate a command for `wrench` with null-space coefficients `z`.
    ///
    /// # Errors
    ///
    /// - [`AllocError::NonFinite`] for non-finite inputs
    /// - [`AllocError::DimensionMismatch`] if `coefficients` has the wrong
    ///   length
    /// - [`AllocError::Infeasible`] under [`SaturationPolicy::NullScale`]
    ///   when no scaling of the perturbation yields a bounded command. With
    ///   `z = 0` this is exactly the case where the minimum-norm solution
    ///   violates the bounds.
    pub fn allocate(&self, wrench: &Wrench, coefficients: &[f64]) -> Result<Allocation> {
        if !wrench.is_finite() {
            return Err(AllocError::non_finite("wrench"));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(AllocError::non_finite("coefficients"));
        }

        let z = DVector::from_column_slice(coefficients);
        let base = self.map.min_norm_solution(wrench);
        if !base.iter().all(|v| v.is_finite()) {
            return Err(AllocError::non_finite("minimum-norm solution"));
        }
        let delta = self.map.perturbation(&z)?;
        let raw = &base + &delta;

        let command = ActuatorCommand::new(raw.clone());
        if command.within_bounds(&self.bounds, self.tolerance)? {
            let achieved = self.map.wrench_of(&raw)?;
            return Ok(Allocation {
                command,
                achieved,
                saturation: None,
            });
        }

        match self.policy {
            SaturationPolicy::HardClip => {
                let (clipped_command, clipped) = hard_clip(&raw, &self.bounds);
                let achieved = self.map.wrench_of(&clipped_command)?;
                let wrench_error = (achieved - *wrench).norm();
                debug!(
                    wrench_error,
                    clipped = clipped.len(),
                    "hard clip applied"
                );
                Ok(Allocation {
                    command: ActuatorCommand::new(clipped_command),
                    achieved,
                    saturation: Some(SaturationReport {
                        policy: self.policy,
                        clipped,
                        wrench_error,
                        scale: 1.0,
                    }),
                })
            }
            SaturationPolicy::NullScale => {
                let (alpha, binding) =
                    null_scale_alpha(&base, &delta, &self.bounds, self.tolerance)?;
                let mut scaled = &base + &delta * alpha;
                for (i, bound) in self.bounds.iter().enumerate() {
                    scaled[i] = bound.clamp(scaled[i]);
                }
                let achieved = self.map.wrench_of(&scaled)?;
                let wrench_error = (achieved - *wrench).norm();
                debug!(alpha, binding = binding.len(), "null-space perturbation scaled");
                Ok(Allocation {
                    command: ActuatorCommand::new(scaled),
                    achieved,
                    saturation: Some(SaturationReport {
                        policy: self.policy,
                        clipped: binding,
                        wrench_error,
                        scale: alpha,
                    }),
                })
            }
        }
    }

    /// Allocate the minimum-norm command (`z = 0`) for `wrench`.
    ///
    /// # Errors
    ///
    /// Same as [`allocate`](Self::allocate).
    pub fn allocate_min_norm(&self, wrench: &Wrench) -> Result<Allocation> {
        let zeros = vec![0.0; self.coeff_dim()];
        self.allocate(wrench, &zeros)
    }

    /// Worst bound violation of the minimum-norm solution for `wrench`.
    ///
    /// Zero means the wrench is reachable without null-space help.
    #[must_use]
    pub fn min_norm_violation(&self, wrench: &Wrench) -> f64 {
        self.base_violation(&self.map.min_norm_solution(wrench))
    }

    fn base_violation(&self, base: &DVector<f64>) -> f64 {
        base.iter()
            .zip(&self.bounds)
            .map(|(v, b)| b.violation(*v))
            .fold(0.0, f64::max)
    }
}
