//! Simulation kernel for the gantry robot/physics simulator.
//!
//! This crate ties the pieces together: it compiles a parsed scene
//! description ([`gantry_scene::SceneTree`]) into a [`Simulation`] holding a
//! physics world, actuator and sensor ports and the model-matrix cache, and
//! steps it with the [`Stepper`].
//!
//! # Data flow
//!
//! ```text
//! scene file ──▶ gantry-scene ──▶ SceneTree
//!                                    │ compile()
//!                                    ▼
//!                 Simulation (world · ports · matrix cache)
//!                                    │ Stepper::step(), once per tick
//!                                    ▼
//!        actuators → collision → solver → counters/frame rate
//!                                    │
//!                                    ▼
//!     update_matrices(class) → draw_items(class) → render/sensor consumers
//! ```
//!
//! # Example
//!
//! ```
//! use gantry_sim::{Stepper, load_scene_str};
//!
//! let mut sim = load_scene_str(r#"
//!     <Simulation>
//!         <Scene name="main" stepLength="0.01" gravity="-9.8">
//!             <Body ref="ball"/>
//!         </Scene>
//!         <Body name="ball">
//!             <Translation z="1m"/>
//!             <SphereMass name="m" value="1kg" radius="10cm"/>
//!             <SphereGeometry name="g" radius="10cm"/>
//!         </Body>
//!     </Simulation>
//! "#).expect("scene should load");
//!
//! let mut stepper = Stepper::new();
//! for _ in 0..100 {
//!     stepper.step(&mut sim).expect("step should succeed");
//! }
//!
//! let ball = sim.body_by_name("ball").expect("ball exists");
//! assert!((sim.world.body(ball).twist.linear.z + 9.8).abs() < 1e-9);
//! ```

#![doc(html_root_url = "https://docs.rs/gantry-sim/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation, // Registry sizes fit u32
    clippy::missing_errors_doc,
)]

mod actuators;
mod compile;
mod context;
mod matrices;
mod meshes;
mod render;
mod sensors;
mod stepper;

pub use actuators::{MotorController, MotorPort, UserInputPort};
pub use compile::compile;
pub use context::Simulation;
pub use matrices::{MatrixBuilder, MatrixCache, MatrixId, ModelMatrix, UsageClass};
pub use meshes::{box_mesh, cylinder_mesh, marker_mesh, sphere_mesh};
pub use render::{
    CameraView, DrawItem, LightInfo, MeshData, MeshHandle, NullRenderer, OffscreenRenderer,
    SurfaceData, SurfaceHandle,
};
pub use sensors::{SensorKind, SensorPort, SensorValue};
pub use stepper::{StepResult, Stepper};

use std::path::Path;
use thiserror::Error;

/// Errors from loading and compiling a scene in one call.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The scene description was rejected.
    #[error(transparent)]
    Scene(#[from] gantry_scene::SceneError),
    /// The loaded tree failed to compile.
    #[error(transparent)]
    Sim(#[from] gantry_types::SimError),
}

/// Load and compile a scene description from a file.
///
/// # Errors
///
/// Returns every recorded scene problem, or a compile error.
pub fn load_scene_file(path: impl AsRef<Path>) -> Result<Simulation, LoadError> {
    let tree = gantry_scene::load_file(path)?;
    Ok(compile(&tree)?)
}

/// Load and compile a scene description from a string.
///
/// # Errors
///
/// Returns every recorded scene problem, or a compile error.
pub fn load_scene_str(source: &str) -> Result<Simulation, LoadError> {
    let tree = gantry_scene::load_str(source)?;
    Ok(compile(&tree)?)
}
