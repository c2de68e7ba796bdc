//! The simulation context.
//!
//! One [`Simulation`] value owns everything a loaded scene produced: the
//! physics world, the model-matrix cache, actuator and sensor ports, render
//! registries and the name lookup tables. It is constructed by
//! [`crate::compile`], threaded explicitly through every call that needs it,
//! and torn down by dropping it; there is no ambient global state, and the
//! arena-handle design makes teardown order a non-issue.

use gantry_phys::{SolverProfile, World};
use gantry_types::{BodyHandle, JointHandle, Pose, Rgba, SimError, StepConfig};
use hashbrown::HashMap;

use crate::actuators::{MotorPort, UserInputPort};
use crate::matrices::{MatrixCache, MatrixId, UsageClass};
use crate::render::{
    CameraView, DrawItem, LightInfo, MeshData, MeshHandle, OffscreenRenderer, SurfaceData,
    SurfaceHandle,
};
use crate::sensors::SensorPort;

/// A (mesh, matrix, surface) binding under one usage class.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DrawBinding {
    pub mesh: MeshHandle,
    pub matrix: MatrixId,
    pub surface: SurfaceHandle,
}

/// A compiled, steppable simulation.
pub struct Simulation {
    /// The physics world.
    pub world: World,
    /// Fixed-step timing configuration.
    pub step_config: StepConfig,
    /// The model-matrix cache.
    pub matrices: MatrixCache,
    /// Motor ports, acted on every step.
    pub motors: Vec<MotorPort>,
    /// Sensor ports.
    pub sensors: Vec<SensorPort>,
    /// User input ports.
    pub user_inputs: Vec<UserInputPort>,
    /// Scene lights for render consumers.
    pub lights: Vec<LightInfo>,
    /// Scene background color.
    pub background: Rgba,

    pub(crate) meshes: Vec<MeshData>,
    pub(crate) surfaces: Vec<SurfaceData>,
    pub(crate) bindings: [Vec<DrawBinding>; 6],
    pub(crate) body_names: HashMap<String, BodyHandle>,
    pub(crate) joint_names: HashMap<String, JointHandle>,
    pub(crate) motor_names: HashMap<String, usize>,
    pub(crate) sensor_names: HashMap<String, usize>,
    pub(crate) user_input_names: HashMap<String, usize>,
    pub(crate) quick_solver_ratio: u32,
    pub(crate) body_collisions: bool,

    step_count: u64,
    time: f64,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("world", &self.world)
            .field("step_count", &self.step_count)
            .field("time", &self.time)
            .field("motors", &self.motors.len())
            .field("sensors", &self.sensors.len())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    pub(crate) fn new(world: World, step_config: StepConfig, background: Rgba) -> Self {
        Self {
            world,
            step_config,
            matrices: MatrixCache::new(),
            motors: Vec::new(),
            sensors: Vec::new(),
            user_inputs: Vec::new(),
            lights: Vec::new(),
            background,
            meshes: Vec::new(),
            surfaces: Vec::new(),
            bindings: Default::default(),
            body_names: HashMap::new(),
            joint_names: HashMap::new(),
            motor_names: HashMap::new(),
            sensor_names: HashMap::new(),
            user_input_names: HashMap::new(),
            quick_solver_ratio: 0,
            body_collisions: true,
            step_count: 0,
            time: 0.0,
        }
    }

    /// Number of completed simulation steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Simulated time in seconds.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Whether movable bodies collide with each other in this scene.
    #[must_use]
    pub fn body_collisions(&self) -> bool {
        self.body_collisions
    }

    pub(crate) fn advance_counters(&mut self) {
        self.step_count += 1;
        self.time += self.step_config.step_length;
    }

    /// The solver profile for the current step: the quick profile every Nth
    /// step when configured, the full profile otherwise.
    #[must_use]
    pub fn solver_profile(&self) -> SolverProfile {
        if self.quick_solver_ratio > 0
            && self.step_count % u64::from(self.quick_solver_ratio) == 0
        {
            SolverProfile::Quick
        } else {
            SolverProfile::Full
        }
    }

    // -- name lookups -------------------------------------------------------

    /// Body handle by scene element name.
    pub fn body_by_name(&self, name: &str) -> gantry_types::Result<BodyHandle> {
        self.body_names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::not_found(name))
    }

    /// Joint handle by scene element name.
    pub fn joint_by_name(&self, name: &str) -> gantry_types::Result<JointHandle> {
        self.joint_names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::not_found(name))
    }

    /// Motor port by name.
    #[must_use]
    pub fn motor_by_name(&mut self, name: &str) -> Option<&mut MotorPort> {
        let index = *self.motor_names.get(name)?;
        self.motors.get_mut(index)
    }

    /// Sensor port by name.
    #[must_use]
    pub fn sensor_by_name(&self, name: &str) -> Option<&SensorPort> {
        let index = *self.sensor_names.get(name)?;
        self.sensors.get(index)
    }

    /// User input port by name.
    #[must_use]
    pub fn user_input_by_name(&mut self, name: &str) -> Option<&mut UserInputPort> {
        let index = *self.user_input_names.get(name)?;
        self.user_inputs.get_mut(index)
    }

    // -- matrices and rendering --------------------------------------------

    /// Refresh the cached matrices of one usage class for the current step.
    /// `force` recomputes even when the class is already fresh for this
    /// step (interactive dragging changes poses without advancing the step
    /// counter).
    pub fn update_matrices(&mut self, class: UsageClass, force: bool) {
        let world = &self.world;
        self.matrices.update(class, self.step_count, force, &|body| {
            world.body(body).pose
        });
    }

    /// The draw list of one usage class. Call [`Simulation::update_matrices`]
    /// for the class first; the cache hands out whatever was last computed.
    #[must_use]
    pub fn draw_items(&self, class: UsageClass) -> Vec<DrawItem> {
        self.bindings[class_index(class)]
            .iter()
            .map(|binding| DrawItem {
                mesh: binding.mesh,
                matrix: *self.matrices.matrix(binding.matrix).current(),
                surface: binding.surface,
            })
            .collect()
    }

    /// Mesh data for a handle.
    #[must_use]
    pub fn mesh(&self, handle: MeshHandle) -> &MeshData {
        &self.meshes[handle.0 as usize]
    }

    /// Surface data for a handle.
    #[must_use]
    pub fn surface(&self, handle: SurfaceHandle) -> &SurfaceData {
        &self.surfaces[handle.0 as usize]
    }

    /// Render a camera sensor's image through the offscreen boundary.
    /// Returns `None` if the name is not a camera sensor.
    pub fn camera_image(
        &mut self,
        name: &str,
        renderer: &mut dyn OffscreenRenderer,
    ) -> Option<Vec<u8>> {
        let index = *self.sensor_names.get(name)?;
        let (view, width, height): (CameraView, u32, u32) =
            self.sensors.get(index)?.camera_view(&self.world)?;
        self.update_matrices(UsageClass::Appearance, false);
        let items = self.draw_items(UsageClass::Appearance);
        Some(renderer.render(width, height, &view, &items, &self.lights))
    }

    /// Move a body during an interactive drag: the pose changes without the
    /// step counter advancing, so consumers must refresh with `force`.
    pub fn drag_body(&mut self, body: BodyHandle, pose: Pose) {
        self.world.body_mut(body).pose = pose;
        self.world.reset_velocity(body);
    }
}

pub(crate) fn class_index(class: UsageClass) -> usize {
    UsageClass::ALL
        .iter()
        .position(|&c| c == class)
        .unwrap_or(0)
}
