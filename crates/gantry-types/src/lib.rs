//! Core types for the gantry simulation kernel.
//!
//! This crate provides the foundational data types shared by the scene
//! description parser, the physics backend, and the simulation kernel:
//!
//! - [`Pose`] / [`Twist`] - rigid body configuration and velocity
//! - [`MassProperties`] - mass, center of mass, inertia, aggregation
//! - [`BodyHandle`], [`GeomHandle`], [`JointHandle`], [`ElementId`] - arena handles
//! - [`Rgba`] - surface colors
//! - [`ContactConfig`] / [`StepConfig`] - global contact and stepping parameters
//! - [`SimError`] - runtime error type
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They carry no physics, no parsing, and no
//! backend state. They are the common language between:
//!
//! - The scene description parser (building element trees)
//! - The physics backend (bodies, geoms, joints)
//! - The simulation kernel (compilation, stepping, transform caching)
//! - Render and sensor consumers (reading cached world transforms)
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed, SI units throughout (m, kg, s, rad)

#![doc(html_root_url = "https://docs.rs/gantry-types/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod color;
mod config;
mod error;
mod ids;
mod mass;
mod pose;

pub use color::Rgba;
pub use config::{ContactConfig, StepConfig};
pub use error::SimError;
pub use ids::{BodyHandle, ElementId, GeomHandle, JointHandle};
pub use mass::MassProperties;
pub use pose::{Pose, Twist};

// Re-export math types for convenience
pub use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, UnitQuaternion, Vector3};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
