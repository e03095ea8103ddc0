//! Shared types for omnidirectional multirotor control allocation.
//!
//! This crate provides the foundational types for the allocation stack:
//!
//! - [`VehicleGeometry`] - Rotor layout, mass properties, actuation coefficients
//! - [`Wrench`] - Six-axis force/torque in the body frame
//! - [`ActuatorCommand`] / [`ActuatorBounds`] - Per-actuator commands and limits
//! - [`AllocError`] - Shared error type for allocation operations
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They carry no allocation algorithms, no
//! simulation, no learned models. They are the common language between the
//! allocator, the vehicle simulation, and the distillation pipeline.
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed, body frame

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::cast_precision_loss,      // usize to f64 is fine for counts
    clippy::missing_errors_doc,       // Error docs added where non-obvious
)]

mod command;
mod error;
mod geometry;
mod wrench;

pub use command::{ActuatorBounds, ActuatorCommand};
pub use error::AllocError;
pub use geometry::{RotorGeometry, SpinDirection, VehicleGeometry};
pub use wrench::{Wrench, STANDARD_GRAVITY, WRENCH_DIM};

// Re-export math types for convenience
pub use nalgebra::{DMatrix, DVector, Vector3};

/// Result type for allocation operations.
pub type Result<T> = std::result::Result<T, AllocError>;
