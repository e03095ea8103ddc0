//! Saturation policies for commands that leave the actuator box.
//!
//! Two policies are supported:
//!
//! - [`SaturationPolicy::HardClip`] clamps each entry independently. The
//!   realized wrench then differs from the request; the violation magnitude
//!   is recorded, never silently dropped. This policy never fails.
//! - [`SaturationPolicy::NullScale`] picks the largest factor `alpha` in
//!   `[0, 1]` such that `u = base + alpha * delta` stays inside bounds,
//!   where `delta` is the wrench-free null-space perturbation. The realized
//!   wrench is preserved exactly; what is sacrificed is energy optimality.
//!   When no `alpha` yields a bounded command the wrench is infeasible along
//!   this fiber and the policy reports [`AllocError::Infeasible`]. Note the
//!   perturbation can also *recover* feasibility: a minimum-norm solution
//!   outside the box is acceptable as long as some scaled perturbation
//!   brings the command back in.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use alloc_types::{ActuatorBounds, AllocError, Result};

/// How to handle commands outside the actuator box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SaturationPolicy {
    /// Clamp each actuator independently, recording the wrench violation.
    HardClip,
    /// Scale the null-space perturbation back into the box, preserving the
    /// wrench exactly.
    #[default]
    NullScale,
}

impl SaturationPolicy {
    /// Policy name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::HardClip => "hard-clip",
            Self::NullScale => "null-scale",
        }
    }
}

impl std::fmt::Display for SaturationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Record of a saturation event.
///
/// Produced whenever the unsaturated command left the actuator box. The
/// allocation itself still succeeds; consumers decide what to do with the
/// violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationReport {
    /// Policy that was applied.
    pub policy: SaturationPolicy,
    /// Actuators that were clipped (hard clip) or that bound the scale
    /// factor (null scale).
    pub clipped: Vec<usize>,
    /// Norm of the wrench error introduced by saturation. Zero under
    /// [`SaturationPolicy::NullScale`] up to numerical noise.
    pub wrench_error: f64,
    /// Scale factor applied to the null-space perturbation. Always `1.0`
    /// under [`SaturationPolicy::HardClip`].
    pub scale: f64,
}

/// Clamp every entry into its bounds.
///
/// Returns the clipped command and the indices of the entries that moved.
#[must_use]
pub(crate) fn hard_clip(command: &DVector<f64>, bounds: &[ActuatorBounds]) -> (DVector<f64>, Vec<usize>) {
    let mut clipped = Vec::new();
    let mut out = command.clone();
    for (i, bound) in bounds.iter().enumerate() {
        let clamped = bound.clamp(out[i]);
        if (clamped - out[i]).abs() > 0.0 {
            clipped.push(i);
            out[i] = clamped;
        }
    }
    (out, clipped)
}

/// Largest `alpha` in `[0, 1]` such that `base + alpha * delta` stays inside
/// bounds, together with the actuators that bind it.
///
/// Each actuator restricts `alpha` to an interval; the feasible set is the
/// intersection of all of them with `[0, 1]`. The largest member is chosen
/// so that as much of the requested perturbation as possible survives.
///
/// # Errors
///
/// - [`AllocError::DimensionMismatch`] on inconsistent input lengths
/// - [`AllocError::Infeasible`] when the intersection is empty, with the
///   smallest achievable bound violation as the residual
pub(crate) fn null_scale_alpha(
    base: &DVector<f64>,
    delta: &DVector<f64>,
    bounds: &[ActuatorBounds],
    tol: f64,
) -> Result<(f64, Vec<usize>)> {
    if base.len() != bounds.len() || delta.len() != bounds.len() {
        return Err(AllocError::dimension_mismatch(
            "saturation inputs",
            bounds.len(),
            base.len().min(delta.len()),
        ));
    }

    let mut lower = 0.0_f64;
    let mut upper = 1.0_f64;
    let mut uppers = vec![f64::INFINITY; bounds.len()];
    let mut empty = false;
    for (i, bound) in bounds.iter().enumerate() {
        let d = delta[i];
        if d.abs() <= tol {
            if !bound.contains(base[i], tol) {
                empty = true;
            }
            continue;
        }
        let (lo, hi) = if d > 0.0 {
            ((bound.min - base[i]) / d, (bound.max - base[i]) / d)
        } else {
            ((bound.max - base[i]) / d, (bound.min - base[i]) / d)
        };
        uppers[i] = hi;
        lower = lower.max(lo);
        upper = upper.min(hi);
    }

    if empty || lower > upper + tol {
        let worst = |alpha: f64| -> f64 {
            bounds
                .iter()
                .enumerate()
                .map(|(i, b)| b.violation(base[i] + alpha * delta[i]))
                .fold(0.0, f64::max)
        };
        let residual = [0.0, 1.0, lower.clamp(0.0, 1.0), upper.clamp(0.0, 1.0)]
            .iter()
            .map(|a| worst(*a))
            .fold(f64::INFINITY, f64::min);
        return Err(AllocError::Infeasible { residual });
    }

    let alpha = upper.min(1.0).max(lower);
    let binding = if alpha < 1.0 {
        uppers
            .iter()
            .enumerate()
            .filter(|(_, hi)| **hi <= alpha + 1e-12)
            .map(|(i, _)| i)
            .collect()
    } else {
        Vec::new()
    };

    Ok((alpha, binding))
}
