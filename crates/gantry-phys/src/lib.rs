//! Rigid body physics backend for the gantry simulation kernel.
//!
//! This crate implements the physics boundary the kernel consumes: world
//! and collision-space management, rigid bodies, collision geoms, a narrow
//! phase over sphere/box/capsule primitives, one-step contact constraints,
//! hinge/slider joints with stops and motors, and a projected Gauss-Seidel
//! velocity solver with a quick and a full iteration profile.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                         World                              │
//! │  bodies · geoms · joints · spaces · contact group          │
//! │  collide(): broad phase → narrow phase → contacts/events   │
//! │  step():    forces → solver iterations → pose integration  │
//! └────────────┬──────────────────┬────────────────────────────┘
//!              │                  │
//!              ▼                  ▼
//! ┌──────────────────────┐  ┌────────────────────────────────┐
//! │  collide / ray       │  │  contact / joint constraints   │
//! │  shape pair tests    │  │  PGS impulse rows (ERP/CFM)    │
//! └──────────────────────┘  └────────────────────────────────┘
//! ```
//!
//! # Contact lifecycle
//!
//! Contacts are rebuilt from current geometry overlap by every
//! [`World::collide`] call and consumed by the following [`World::step`];
//! nothing carries over between steps.
//!
//! # Quick Start
//!
//! ```
//! use gantry_phys::{Shape, SolverProfile, World};
//! use gantry_types::{ContactConfig, MassProperties, Pose, Point3, Vector3};
//!
//! let mut world = World::new(Vector3::new(0.0, 0.0, -9.8), ContactConfig::default());
//! let ball = world.add_body(
//!     Pose::from_position(Point3::new(0.0, 0.0, 1.0)),
//!     MassProperties::sphere(1.0, 0.1),
//!     Some("ball".into()),
//! );
//! world.add_geom(Some(ball), Pose::identity(), Shape::Sphere { radius: 0.1 }, None, false, None);
//!
//! for _ in 0..100 {
//!     world.collide(true);
//!     world.step(0.01, SolverProfile::Full).unwrap();
//! }
//! assert!((world.body(ball).twist.linear.z + 9.8).abs() < 1e-9);
//! ```

#![doc(html_root_url = "https://docs.rs/gantry-phys/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::cast_possible_truncation, // Arena sizes fit u32
    clippy::missing_errors_doc,
)]

mod body;
mod collide;
mod contact;
mod geom;
mod joint;
mod ray;
mod world;

pub use body::RigidBody;
pub use collide::{ContactPoint, Contacts, collide as collide_shapes};
pub use contact::{ContactConstraint, MaterialTable};
pub use geom::{Aabb, Geom, Shape};
pub use joint::{Joint, JointKind, JointLimit};
pub use ray::ray_shape;
pub use world::{CollisionEvent, CollisionObserver, SolverProfile, World};
