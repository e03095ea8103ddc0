//! Energy-optimal null-space coefficient search.
//!
//! For a fixed wrench `w`, every command on the fiber `u = pinv(B) w + N z`
//! realizes `w` exactly; the coefficients `z` only redistribute effort. The
//! power proxy is convex in `z` (a sum of `|.|^1.5` terms composed with an
//! affine map) and the bounded-command constraint cuts a convex region out
//! of coefficient space, so a descent over feasible points finds the global
//! optimum up to step resolution.
//!
//! The search is a projected compass search: deterministic, derivative-free,
//! and robust to the kink of `|.|^1.5` at zero thrust. A feasibility phase
//! first recovers a bounded command when the minimum-norm solution sits
//! outside the actuator box; if even that fails, the wrench is infeasible.
//!
//! The result is the ground truth that learned policies are measured
//! against.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use alloc_types::{ActuatorBounds, ActuatorCommand, AllocError, Result, Wrench};

use crate::allocator::NullSpaceAllocator;
use crate::energy::PowerModel;

/// Knobs for the coefficient search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Iteration cap for each search phase.
    pub max_iterations: usize,
    /// Initial compass step as a fraction of the search radius.
    pub step_fraction: f64,
    /// Step shrink factor applied when no direction improves.
    pub shrink: f64,
    /// Absolute step size below which the search is converged
    /// (command units).
    pub step_tolerance: f64,
    /// Largest per-actuator bound violation still considered feasible.
    pub feasibility_tolerance: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            step_fraction: 0.25,
            shrink: 0.5,
            step_tolerance: 1e-6,
            feasibility_tolerance: 1e-7,
        }
    }
}

impl SearchOptions {
    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AllocError::search_failed("max_iterations must be positive"));
        }
        if !(self.step_fraction > 0.0 && self.step_fraction.is_finite()) {
            return Err(AllocError::search_failed("step_fraction must be positive"));
        }
        if !(self.shrink > 0.0 && self.shrink < 1.0) {
            return Err(AllocError::search_failed("shrink must be in (0, 1)"));
        }
        if !(self.step_tolerance > 0.0 && self.step_tolerance.is_finite()) {
            return Err(AllocError::search_failed("step_tolerance must be positive"));
        }
        if !(self.feasibility_tolerance > 0.0 && self.feasibility_tolerance.is_finite()) {
            return Err(AllocError::search_failed(
                "feasibility_tolerance must be positive",
            ));
        }
        Ok(())
    }
}

/// Result of an energy-optimal coefficient search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Optimal null-space coefficients.
    pub coefficients: DVector<f64>,
    /// Bounded command at the optimum.
    pub command: ActuatorCommand,
    /// Power proxy at the optimum.
    pub power: f64,
    /// Compass iterations spent across both phases.
    pub iterations: usize,
    /// Whether the step size shrank below tolerance before the iteration
    /// cap. A non-converged outcome is still the best feasible point found.
    pub converged: bool,
}

/// Find the coefficients minimizing the power proxy for `wrench`.
///
/// Deterministic: identical inputs give identical outcomes.
///
/// # Errors
///
/// - [`AllocError::Infeasible`] when no coefficients yield a bounded command
/// - [`AllocError::NonFinite`] / [`AllocError::SearchFailed`] on degenerate
///   inputs
pub fn optimal_coefficients(
    allocator: &NullSpaceAllocator,
    power: &PowerModel,
    wrench: &Wrench,
    options: &SearchOptions,
) -> Result<SearchOutcome> {
    options.validate()?;
    power.validate()?;
    if !wrench.is_finite() {
        return Err(AllocError::non_finite("wrench"));
    }

    let problem = Fiber::new(allocator, wrench);
    let radius = problem.radius();
    if !radius.is_finite() {
        return Err(AllocError::search_failed("search radius is not finite"));
    }

    let (anchor, feasibility_iters) = find_feasible(&problem, options, radius)?;

    let objective = |z: &DVector<f64>| -> f64 {
        let u = problem.command_at(z);
        if worst_violation(&u, problem.bounds) > options.feasibility_tolerance {
            return f64::INFINITY;
        }
        power
            .power(&ActuatorCommand::new(u), problem.bounds)
            .unwrap_or(f64::INFINITY)
    };

    let start_power = objective(&anchor);
    if !start_power.is_finite() {
        return Err(AllocError::search_failed(
            "feasible anchor has non-finite power",
        ));
    }

    let descent = compass_minimize(&objective, anchor, radius, options, None);
    let iterations = feasibility_iters + descent.iterations;

    let mut u = problem.command_at(&descent.minimizer);
    for (i, bound) in problem.bounds.iter().enumerate() {
        u[i] = bound.clamp(u[i]);
    }

    debug!(
        power = descent.value,
        iterations,
        converged = descent.converged,
        "coefficient search finished"
    );

    Ok(SearchOutcome {
        coefficients: descent.minimizer,
        command: ActuatorCommand::new(u),
        power: descent.value,
        iterations,
        converged: descent.converged,
    })
}

/// Find any coefficients yielding a bounded command for `wrench`.
///
/// Returns `Ok(None)` when the wrench is infeasible along the null-space
/// fiber.
///
/// # Errors
///
/// Propagates option validation and non-finite input errors.
pub fn feasible_coefficients(
    allocator: &NullSpaceAllocator,
    wrench: &Wrench,
    options: &SearchOptions,
) -> Result<Option<DVector<f64>>> {
    options.validate()?;
    if !wrench.is_finite() {
        return Err(AllocError::non_finite("wrench"));
    }
    let problem = Fiber::new(allocator, wrench);
    match find_feasible(&problem, options, problem.radius()) {
        Ok((z, _)) => Ok(Some(z)),
        Err(AllocError::Infeasible { .. }) => Ok(None),
        Err(other) => Err(other),
    }
}

/// The affine solution fiber of one wrench.
struct Fiber<'a> {
    base: DVector<f64>,
    null_basis: &'a nalgebra::DMatrix<f64>,
    bounds: &'a [ActuatorBounds],
}

impl<'a> Fiber<'a> {
    fn new(allocator: &'a NullSpaceAllocator, wrench: &Wrench) -> Self {
        Self {
            base: allocator.map().min_norm_solution(wrench),
            null_basis: allocator.map().null_basis(),
            bounds: allocator.bounds(),
        }
    }

    fn command_at(&self, z: &DVector<f64>) -> DVector<f64> {
        &self.base + self.null_basis * z
    }

    fn coeff_dim(&self) -> usize {
        self.null_basis.ncols()
    }

    /// Radius bounding every feasible coefficient vector.
    ///
    /// The null basis is orthonormal, so `|z| = |N z| <= |u - base|` for any
    /// command `u` on the fiber. Any bounded `u` is within the box diagonal
    /// of the clamped base, hence the bound below.
    fn radius(&self) -> f64 {
        let dist: f64 = self
            .base
            .iter()
            .zip(self.bounds)
            .map(|(v, b)| {
                let c = b.clamp(*v);
                (v - c) * (v - c)
            })
            .sum::<f64>()
            .sqrt();
        let diagonal: f64 = self
            .bounds
            .iter()
            .map(|b| b.span() * b.span())
            .sum::<f64>()
            .sqrt();
        dist + diagonal
    }
}

/// Worst per-actuator violation of a command.
fn worst_violation(u: &DVector<f64>, bounds: &[ActuatorBounds]) -> f64 {
    u.iter()
        .zip(bounds)
        .map(|(v, b)| b.violation(*v))
        .fold(0.0, f64::max)
}

/// Phase one: a feasible anchor, or proof of infeasibility.
fn find_feasible(
    problem: &Fiber<'_>,
    options: &SearchOptions,
    radius: f64,
) -> Result<(DVector<f64>, usize)> {
    let zero = DVector::zeros(problem.coeff_dim());
    let base_violation = worst_violation(&problem.command_at(&zero), problem.bounds);
    if base_violation <= options.feasibility_tolerance {
        return Ok((zero, 0));
    }

    trace!(base_violation, "minimum-norm solution infeasible, recovering");
    let objective = |z: &DVector<f64>| -> f64 {
        let u = problem.command_at(z);
        u.iter()
            .zip(problem.bounds)
            .map(|(v, b)| {
                let viol = b.violation(*v);
                viol * viol
            })
            .sum()
    };

    let target = options.feasibility_tolerance * options.feasibility_tolerance;
    let descent = compass_minimize(&objective, zero, radius, options, Some(target));

    let residual = worst_violation(&problem.command_at(&descent.minimizer), problem.bounds);
    if residual > options.feasibility_tolerance {
        return Err(AllocError::Infeasible { residual });
    }
    Ok((descent.minimizer, descent.iterations))
}

struct Descent {
    minimizer: DVector<f64>,
    value: f64,
    iterations: usize,
    converged: bool,
}

/// Deterministic compass search over coefficient space.
///
/// Probes `+/- step` along each axis, keeps strict improvements, shrinks
/// the step when none helps. On a convex objective this converges to the
/// global minimum within the final step resolution.
fn compass_minimize<F: Fn(&DVector<f64>) -> f64>(
    objective: &F,
    start: DVector<f64>,
    radius: f64,
    options: &SearchOptions,
    stop_below: Option<f64>,
) -> Descent {
    let mut z = start;
    let mut value = objective(&z);
    let dim = z.len();
    let mut step = (options.step_fraction * radius).max(options.step_tolerance);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        if let Some(floor) = stop_below {
            if value <= floor {
                converged = true;
                break;
            }
        }
        iterations += 1;

        let mut improved = false;
        for axis in 0..dim {
            for sign in [1.0_f64, -1.0] {
                let mut candidate = z.clone();
                candidate[axis] += sign * step;
                let candidate_value = objective(&candidate);
                if candidate_value < value - 1e-12 {
                    z = candidate;
                    value = candidate_value;
                    improved = true;
                }
            }
        }

        if !improved {
            step *= options.shrink;
            if step < options.step_tolerance {
                converged = true;
                break;
            }
        }
    }

    Descent {
        minimizer: z,
        value,
        iterations,
        converged,
    }
}
