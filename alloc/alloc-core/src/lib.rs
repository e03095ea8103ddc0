//! Null-space control allocation for overactuated multirotors.
//!
//! The core objects:
//!
//! - [`ActuationMap`]: the linear map from actuator commands to body
//!   wrenches, with its pseudo-inverse and an orthonormal null-space basis
//! - [`NullSpaceAllocator`]: turns a wrench and null-space coefficients into
//!   a bounded actuator command, with configurable saturation handling
//! - [`PowerModel`]: the electrical power proxy that makes one point on the
//!   solution fiber better than another
//! - [`optimal_coefficients`]: the reference search that finds the
//!   energy-optimal coefficients for a wrench
//!
//! Everything here is deterministic and allocation-light; the per-call cost
//! of [`NullSpaceAllocator::allocate`] is a handful of small matrix-vector
//! products, suitable for control-rate loops.
//!
//! ```
//! use alloc_core::{NullSpaceAllocator, PowerModel, optimal_coefficients, SearchOptions};
//! use alloc_types::{VehicleGeometry, Wrench};
//!
//! # fn main() -> alloc_types::Result<()> {
//! let geometry = VehicleGeometry::tilted_octo();
//! let allocator = NullSpaceAllocator::new(&geometry)?;
//! let power = PowerModel::from_geometry(&geometry);
//!
//! let hover = Wrench::hover(geometry.mass);
//! let outcome = optimal_coefficients(&allocator, &power, &hover, &SearchOptions::default())?;
//! assert!(outcome.converged);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

pub mod actuation;
pub mod allocator;
pub mod energy;
pub mod reference;
pub mod saturation;

pub use actuation::ActuationMap;
pub use allocator::{Allocation, NullSpaceAllocator, DEFAULT_BOUND_TOLERANCE};
pub use energy::{PowerModel, PowerStatistics, POWER_EXPONENT};
pub use reference::{feasible_coefficients, optimal_coefficients, SearchOptions, SearchOutcome};
pub use saturation::{SaturationPolicy, SaturationReport};

pub use alloc_types::{AllocError, Result};
