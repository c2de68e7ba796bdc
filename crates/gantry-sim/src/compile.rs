//! Scene compilation: element tree to steppable simulation.
//!
//! One traversal builds everything: world poses compose down the parent
//! chain (parent pose, then the element's fixed translation, then its fixed
//! rotation), masses aggregate bottom-up into one mass per body, geoms
//! attach relative to the body's center of mass, joints wire child bodies
//! to their parents, and every drawable registers a model matrix under its
//! usage class.

use gantry_phys::{Shape, World};
use gantry_scene::{
    AppearanceShape, DeflectionAttrs, ElementData, ElementKind, FacesAttrs, GeometryShape,
    MotorAttrs, Projection, SceneTree, SensorAttrs, SurfaceAttrs,
};
use gantry_types::{
    BodyHandle, ContactConfig, ElementId, GeomHandle, MassProperties, Pose, StepConfig, Vector3,
};
use nalgebra::Point3;
use std::cell::Cell;
use std::rc::Rc;

use crate::actuators::{MotorController, MotorPort, UserInputPort};
use crate::context::{DrawBinding, Simulation, class_index};
use crate::matrices::{MatrixBuilder, UsageClass};
use crate::meshes;
use crate::render::{LightInfo, MeshData, MeshHandle, SurfaceData, SurfaceHandle};
use crate::sensors::{SensorKind, SensorPort};

/// Compile a loaded scene tree into a simulation.
///
/// # Errors
///
/// Returns an error if the scene-level timing or contact configuration is
/// invalid. Structural problems are the parser's job; a tree that loaded
/// cleanly compiles.
pub fn compile(tree: &SceneTree) -> gantry_types::Result<Simulation> {
    let attrs = tree.scene_attrs();
    let contact_config = ContactConfig {
        erp: attrs.erp,
        cfm: attrs.cfm,
        stop_erp: attrs.erp,
        stop_cfm: attrs.cfm,
        default_friction: attrs.default_friction,
        full_iterations: attrs.solver_iterations.max(1),
        quick_iterations: attrs.quick_solver_iterations.max(1),
        quick_solver_ratio: attrs.quick_solver_ratio,
        body_collisions: attrs.body_collisions,
    };
    contact_config.validate()?;
    let step_config = StepConfig {
        step_length: attrs.step_length,
        gravity: attrs.gravity,
    };
    step_config.validate()?;

    let world = World::new(
        Vector3::new(0.0, 0.0, attrs.gravity),
        contact_config,
    );
    let mut sim = Simulation::new(world, step_config, attrs.background);
    sim.quick_solver_ratio = attrs.quick_solver_ratio;
    sim.body_collisions = attrs.body_collisions;

    let mut compiler = Compiler {
        tree,
        sim,
        marker: None,
        plain_surface: None,
    };
    compiler.compile_scene()?;

    let sim = compiler.sim;
    tracing::debug!(
        bodies = sim.world.body_count(),
        joints = sim.world.joint_count(),
        geoms = sim.world.geoms().len(),
        matrices = sim.matrices.len(),
        "scene compiled"
    );
    Ok(sim)
}

struct Compiler<'t> {
    tree: &'t SceneTree,
    sim: Simulation,
    marker: Option<(MeshHandle, SurfaceHandle)>,
    plain_surface: Option<SurfaceHandle>,
}

impl<'t> Compiler<'t> {
    fn compile_scene(&mut self) -> gantry_types::Result<()> {
        let root = self.tree.root();
        for &child in self.tree.children(root) {
            let element = self.tree.get(child);
            match element.kind {
                ElementKind::Body => {
                    self.compile_body(child, Pose::identity(), None)?;
                }
                ElementKind::Compound => self.compile_compound(child, Pose::identity())?,
                ElementKind::Light => {
                    if let ElementData::Light(light) = &element.data {
                        self.sim.lights.push(LightInfo {
                            position: light.position,
                            diffuse: light.diffuse,
                            ambient: light.ambient,
                            attenuation: [
                                light.constant_attenuation,
                                light.linear_attenuation,
                                light.quadratic_attenuation,
                            ],
                        });
                    }
                }
                ElementKind::UserInput => self.compile_user_input(child),
                _ => {}
            }
        }

        // The interactive drag plane starts at the world origin; dragging
        // repositions it with forced matrix refreshes.
        let (marker_mesh, marker_surface) = self.marker();
        let lookup = Self::pose_lookup(&self.sim.world);
        let matrix = self.sim.matrices.insert(
            MatrixBuilder::new().push_pose(&Pose::identity()),
            UsageClass::DragPlane,
            &lookup,
        );
        self.sim.bindings[class_index(UsageClass::DragPlane)].push(DrawBinding {
            mesh: marker_mesh,
            matrix,
            surface: marker_surface,
        });
        Ok(())
    }

    /// A static assembly: geoms land in static space at their world pose.
    fn compile_compound(&mut self, id: ElementId, base: Pose) -> gantry_types::Result<()> {
        let pose = base.compose(&self.local_pose(id));
        for &child in self.tree.children(id) {
            let element = self.tree.get(child);
            match element.kind {
                ElementKind::Body => {
                    self.compile_body(child, pose, None)?;
                }
                ElementKind::Compound => self.compile_compound(child, pose)?,
                kind if kind.is_geometry() => {
                    self.compile_geom(child, None, pose, UsageClass::PhysicalDrawing);
                }
                kind if kind.is_appearance() => {
                    self.compile_appearance(child, None, pose);
                }
                kind if kind.is_sensor() => {
                    let offset = pose.compose(&self.local_pose(child));
                    self.compile_sensor(child, None, offset, &[]);
                }
                ElementKind::UserInput => self.compile_user_input(child),
                _ => {}
            }
        }
        Ok(())
    }

    /// A movable body: aggregate mass, create the backend body at its
    /// center of mass, then attach geoms, appearances, sensors and joints.
    fn compile_body(
        &mut self,
        id: ElementId,
        base: Pose,
        root: Option<BodyHandle>,
    ) -> gantry_types::Result<BodyHandle> {
        let element = self.tree.get(id);
        let origin = base.compose(&self.local_pose(id));

        // Aggregate the mass subtree about the body origin.
        let mut aggregate = MassProperties::zero();
        for &child in self.tree.children(id) {
            if self.tree.get(child).kind.is_mass() {
                aggregate = aggregate.combine(&self.aggregate_mass(child));
            }
        }
        aggregate.validate()?;

        // The backend body frame sits at the center of mass.
        let com = aggregate.center_of_mass;
        let body_pose = Pose {
            position: origin.transform_point(&Point3::from(com)),
            rotation: origin.rotation,
        };
        let mass_at_com = MassProperties::new(aggregate.mass, Vector3::zeros(), aggregate.inertia);

        let handle = self
            .sim
            .world
            .add_body(body_pose, mass_at_com, element.name.clone());
        let root = root.unwrap_or(handle);
        self.sim.world.set_body_root(handle, root);
        if let Some(name) = &element.name {
            self.sim.body_names.insert(name.clone(), handle);
        }

        // Geoms and appearances attach relative to the COM frame.
        let mut body_geoms: Vec<GeomHandle> = Vec::new();
        for &child in self.tree.children(id) {
            let kind = self.tree.get(child).kind;
            if kind.is_geometry() {
                let offset = shift_by_com(&self.local_pose(child), &com);
                if let Some(geom) =
                    self.compile_geom(child, Some(handle), offset, UsageClass::PhysicalDrawing)
                {
                    body_geoms.push(geom);
                }
            } else if kind.is_appearance() {
                let offset = shift_by_com(&self.local_pose(child), &com);
                self.compile_appearance(child, Some(handle), offset);
            }
        }

        for &child in self.tree.children(id) {
            let kind = self.tree.get(child).kind;
            if kind.is_sensor() {
                let offset = shift_by_com(&self.local_pose(child), &com);
                self.compile_sensor(child, Some(handle), offset, &body_geoms);
            } else if kind == ElementKind::UserInput {
                self.compile_user_input(child);
            }
        }

        // Origin marker matrix for this body.
        let (marker_mesh, marker_surface) = self.marker();
        let lookup = Self::pose_lookup(&self.sim.world);
        let matrix = self.sim.matrices.insert(
            MatrixBuilder::new().push_body(handle),
            UsageClass::Origin,
            &lookup,
        );
        drop(lookup);
        self.sim.bindings[class_index(UsageClass::Origin)].push(DrawBinding {
            mesh: marker_mesh,
            matrix,
            surface: marker_surface,
        });

        // Joints own their child bodies; the joint frame composes from the
        // body origin, not the shifted COM frame.
        for &child in self.tree.children(id) {
            if self.tree.get(child).kind.is_joint() {
                self.compile_joint(child, handle, origin, root)?;
            }
        }

        Ok(handle)
    }

    /// One joint element: compose the joint frame, compile the child body
    /// against it, create the backend joint, attach deflection and motor.
    fn compile_joint(
        &mut self,
        id: ElementId,
        parent: BodyHandle,
        parent_origin: Pose,
        root: BodyHandle,
    ) -> gantry_types::Result<()> {
        let element = self.tree.get(id);
        let joint_pose = parent_origin.compose(&self.local_pose(id));

        let Some(body_child) = self.tree.child_of_kind(id, ElementKind::Body) else {
            return Ok(()); // The parser guarantees one; tolerate anyway.
        };
        let child_handle = self.compile_body(body_child, joint_pose, Some(root))?;

        let axis_id = self.tree.child_of_kind(id, ElementKind::Axis);
        let (direction, axis_cfm) = axis_id.map_or((Vector3::x(), None), |axis| {
            match &self.tree.get(axis).data {
                ElementData::Axis(attrs) => {
                    let direction = attrs
                        .direction
                        .try_normalize(1e-12)
                        .unwrap_or_else(Vector3::x);
                    (direction, attrs.cfm)
                }
                _ => (Vector3::x(), None),
            }
        });
        let axis_world = joint_pose.transform_vector(&direction);

        let handle = match element.kind {
            ElementKind::Slider => self.sim.world.add_slider(
                Some(parent),
                child_handle,
                joint_pose.position,
                axis_world,
                element.name.clone(),
            ),
            _ => self.sim.world.add_hinge(
                Some(parent),
                child_handle,
                joint_pose.position,
                axis_world,
                element.name.clone(),
            ),
        };
        if let Some(name) = &element.name {
            self.sim.joint_names.insert(name.clone(), handle);
        }

        if let Some(axis) = axis_id {
            if let Some(cfm) = axis_cfm {
                self.sim.world.joint_mut(handle).axis_cfm = cfm;
            }
            if let Some(deflection) = self.tree.child_of_kind(axis, ElementKind::Deflection) {
                if let ElementData::Deflection(attrs) = &self.tree.get(deflection).data {
                    let limit = joint_limit(attrs, &self.sim.world.config);
                    self.sim.world.joint_mut(handle).limit = Some(limit);
                }
            }
            if let Some(motor_id) = self.tree.child_of_class(axis, gantry_scene::elements::class::MOTOR)
            {
                self.compile_motor(motor_id, handle);
            }
        }
        Ok(())
    }

    fn compile_motor(&mut self, id: ElementId, joint: gantry_types::JointHandle) {
        let element = self.tree.get(id);
        let ElementData::Motor(attrs) = &element.data else {
            return;
        };
        let (controller, max_velocity, max_force) = match *attrs {
            MotorAttrs::Servo {
                p,
                i,
                d,
                max_velocity,
                max_force,
            } => (
                MotorController::Servo {
                    p,
                    i,
                    d,
                    integral: 0.0,
                    last_error: 0.0,
                },
                max_velocity,
                max_force,
            ),
            MotorAttrs::Velocity {
                max_velocity,
                max_force,
            } => (MotorController::Velocity, max_velocity, max_force),
            MotorAttrs::Pt2 {
                t,
                d,
                k,
                max_velocity,
                max_force,
            } => (
                MotorController::Pt2 {
                    t,
                    d,
                    k,
                    state: 0.0,
                    state_velocity: 0.0,
                },
                max_velocity,
                max_force,
            ),
        };
        let port = MotorPort::new(
            element.name.clone(),
            joint,
            max_velocity,
            max_force,
            controller,
        );
        if let Some(name) = &element.name {
            self.sim
                .motor_names
                .insert(name.clone(), self.sim.motors.len());
        }
        self.sim.motors.push(port);
    }

    /// One collision geometry. Returns the created geom handle.
    fn compile_geom(
        &mut self,
        id: ElementId,
        body: Option<BodyHandle>,
        offset: Pose,
        class: UsageClass,
    ) -> Option<GeomHandle> {
        let element = self.tree.get(id);
        let ElementData::Geometry(attrs) = &element.data else {
            return None;
        };

        let shape = match &attrs.shape {
            GeometryShape::Box {
                width,
                depth,
                height,
            } => Shape::Box {
                half: Vector3::new(0.5 * width, 0.5 * depth, 0.5 * height),
            },
            GeometryShape::Sphere { radius } => Shape::Sphere { radius: *radius },
            // Cylinders collide as capsules of the same outer envelope.
            GeometryShape::Cylinder { radius, height }
            | GeometryShape::Capsule { radius, height } => Shape::Capsule {
                radius: *radius,
                half_length: (0.5 * height - radius).max(0.0),
            },
            GeometryShape::Complex => {
                let (vertices, indices) = self.mesh_payload(id);
                Shape::mesh(vertices, indices)
            }
        };

        let material = self.geom_material(id);
        let geom = self.sim.world.add_geom(
            body,
            offset,
            shape,
            material,
            attrs.immaterial,
            Some(id),
        );

        // Physics-shape drawing matrix.
        let mesh = self.shape_mesh(&attrs.shape, id);
        let surface = self.plain_surface();
        let lookup = Self::pose_lookup(&self.sim.world);
        let builder = match body {
            Some(body) => MatrixBuilder::new().push_body(body).push_pose(&offset),
            None => MatrixBuilder::new().push_pose(&offset),
        };
        let matrix = self.sim.matrices.insert(builder, class, &lookup);
        self.sim.bindings[class_index(class)].push(DrawBinding {
            mesh,
            matrix,
            surface,
        });
        Some(geom)
    }

    /// Material child of a geometry: registers friction entries and names
    /// the geom's material.
    fn geom_material(&mut self, id: ElementId) -> Option<String> {
        let material_id = self.tree.child_of_kind(id, ElementKind::Material)?;
        let material = self.tree.get(material_id);
        let name = material.name.clone()?;
        for &entry in self.tree.children(material_id) {
            let entry_element = self.tree.get(entry);
            if let ElementData::Friction(attrs) = &entry_element.data {
                match entry_element.kind {
                    ElementKind::RollingFriction => self.sim.world.materials.set_rolling(
                        &name,
                        &attrs.other_material,
                        attrs.coefficient,
                    ),
                    _ => self.sim.world.materials.set_sliding(
                        &name,
                        &attrs.other_material,
                        attrs.coefficient,
                    ),
                }
            }
        }
        Some(name)
    }

    fn compile_appearance(&mut self, id: ElementId, body: Option<BodyHandle>, offset: Pose) {
        let element = self.tree.get(id);
        let ElementData::Appearance(shape) = &element.data else {
            return;
        };

        let mesh_data = match shape {
            AppearanceShape::Box {
                width,
                depth,
                height,
            } => meshes::box_mesh(*width, *depth, *height),
            AppearanceShape::Sphere { radius } => meshes::sphere_mesh(*radius, 16, 8),
            AppearanceShape::Cylinder { radius, height } => {
                meshes::cylinder_mesh(*radius, *height, 16)
            }
            AppearanceShape::Complex => {
                let (vertices, indices) = self.mesh_payload(id);
                let (normals, tex_coords) = self.mesh_extras(id);
                MeshData {
                    vertices,
                    normals,
                    tex_coords,
                    indices,
                }
            }
        };
        let mesh = self.register_mesh(mesh_data);

        let surface = self
            .tree
            .child_of_kind(id, ElementKind::Surface)
            .and_then(|s| match &self.tree.get(s).data {
                ElementData::Surface(attrs) => Some(self.register_surface(attrs)),
                _ => None,
            })
            .unwrap_or_else(|| self.plain_surface());

        let lookup = Self::pose_lookup(&self.sim.world);
        let builder = match body {
            Some(body) => MatrixBuilder::new().push_body(body).push_pose(&offset),
            None => MatrixBuilder::new().push_pose(&offset),
        };
        let matrix = self
            .sim
            .matrices
            .insert(builder, UsageClass::Appearance, &lookup);
        drop(lookup);
        self.sim.bindings[class_index(UsageClass::Appearance)].push(DrawBinding {
            mesh,
            matrix,
            surface,
        });

        // Nested appearances compose onto this one's offset.
        for &child in self.tree.children(id) {
            if self.tree.get(child).kind.is_appearance() {
                let child_offset = offset.compose(&self.local_pose(child));
                self.compile_appearance(child, body, child_offset);
            }
        }
    }

    fn compile_sensor(
        &mut self,
        id: ElementId,
        body: Option<BodyHandle>,
        offset: Pose,
        body_geoms: &[GeomHandle],
    ) {
        let element = self.tree.get(id);
        let ElementData::Sensor(attrs) = &element.data else {
            return;
        };

        let kind = match *attrs {
            SensorAttrs::Gyroscope => SensorKind::Gyroscope,
            SensorAttrs::Accelerometer => SensorKind::Accelerometer {
                last_velocity: Vector3::zeros(),
                acceleration: Vector3::zeros(),
            },
            SensorAttrs::Collision => {
                let hits = Rc::new(Cell::new(0u32));
                // Contacts on any of the parent's geoms feed the counter.
                for &geom in body_geoms {
                    let hits = Rc::clone(&hits);
                    self.sim.world.register_observer(
                        geom,
                        Box::new(move |_event| hits.set(hits.get() + 1)),
                    );
                }
                SensorKind::Collision { hits }
            }
            SensorAttrs::SingleDistance { min, max } => SensorKind::SingleDistance { min, max },
            SensorAttrs::ApproxDistance {
                min,
                max,
                angle_x,
                angle_y,
            } => SensorKind::ApproxDistance {
                min,
                max,
                angle_x,
                angle_y,
            },
            SensorAttrs::Camera {
                width,
                height,
                angle_x,
                angle_y,
            } => SensorKind::Camera {
                width,
                height,
                angle_x,
                angle_y,
            },
            SensorAttrs::DepthImage {
                width,
                height,
                angle_x,
                angle_y,
                projection,
            } => SensorKind::DepthImage {
                width,
                height,
                angle_x,
                angle_y,
                spherical: projection == Projection::Spherical,
            },
        };

        let port = SensorPort::new(element.name.clone(), body, offset, kind);
        if let Some(name) = &element.name {
            self.sim
                .sensor_names
                .insert(name.clone(), self.sim.sensors.len());
        }
        self.sim.sensors.push(port);

        // Sensor-shape drawing matrix.
        let (marker_mesh, marker_surface) = self.marker();
        let lookup = Self::pose_lookup(&self.sim.world);
        let builder = match body {
            Some(body) => MatrixBuilder::new().push_body(body).push_pose(&offset),
            None => MatrixBuilder::new().push_pose(&offset),
        };
        let matrix = self
            .sim
            .matrices
            .insert(builder, UsageClass::SensorDrawing, &lookup);
        self.sim.bindings[class_index(UsageClass::SensorDrawing)].push(DrawBinding {
            mesh: marker_mesh,
            matrix,
            surface: marker_surface,
        });
    }

    fn compile_user_input(&mut self, id: ElementId) {
        let element = self.tree.get(id);
        let ElementData::UserInput(attrs) = &element.data else {
            return;
        };
        let port = UserInputPort::new(element.name.clone(), attrs.min, attrs.max, attrs.default);
        if let Some(name) = &element.name {
            self.sim
                .user_input_names
                .insert(name.clone(), self.sim.user_inputs.len());
        }
        self.sim.user_inputs.push(port);
    }

    // -- helpers ------------------------------------------------------------

    /// Recursively aggregate a mass element and its children into the
    /// parent frame (parallel-axis combination happens in `combine`).
    fn aggregate_mass(&self, id: ElementId) -> MassProperties {
        let element = self.tree.get(id);
        let ElementData::Mass(own) = &element.data else {
            return MassProperties::zero();
        };
        let mut total = *own;
        for &child in self.tree.children(id) {
            if self.tree.get(child).kind.is_mass() {
                total = total.combine(&self.aggregate_mass(child));
            }
        }
        let local = self.local_pose(id);
        total.transformed(&local.position.coords, &local.rotation)
    }

    /// The fixed local pose of an element: its optional translation child
    /// applied first, then its optional rotation child.
    fn local_pose(&self, id: ElementId) -> Pose {
        let translation = self
            .tree
            .child_of_kind(id, ElementKind::Translation)
            .and_then(|t| match self.tree.get(t).data {
                ElementData::Translation(v) => Some(v),
                _ => None,
            })
            .unwrap_or_else(Vector3::zeros);
        let rotation = self
            .tree
            .child_of_kind(id, ElementKind::Rotation)
            .and_then(|r| match self.tree.get(r).data {
                ElementData::Rotation(q) => Some(q),
                _ => None,
            })
            .unwrap_or_else(nalgebra::UnitQuaternion::identity);
        Pose {
            position: Point3::from(translation),
            rotation,
        }
    }

    /// Mesh payload of a complex geometry/appearance: vertices plus
    /// triangulated faces (quads split along 0-2).
    fn mesh_payload(&self, id: ElementId) -> (Vec<Point3<f64>>, Vec<u32>) {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for &child in self.tree.children(id) {
            match &self.tree.get(child).data {
                ElementData::Vertices(points) => vertices.extend_from_slice(points),
                ElementData::Faces(FacesAttrs {
                    indices: raw,
                    quads,
                }) => {
                    if *quads {
                        for quad in raw.chunks_exact(4) {
                            indices.extend_from_slice(&[quad[0], quad[1], quad[2]]);
                            indices.extend_from_slice(&[quad[0], quad[2], quad[3]]);
                        }
                    } else {
                        indices.extend_from_slice(raw);
                    }
                }
                _ => {}
            }
        }
        (vertices, indices)
    }

    fn mesh_extras(&self, id: ElementId) -> (Vec<Vector3<f64>>, Vec<[f64; 2]>) {
        let mut normals = Vec::new();
        let mut tex_coords = Vec::new();
        for &child in self.tree.children(id) {
            match &self.tree.get(child).data {
                ElementData::Normals(n) => normals.extend_from_slice(n),
                ElementData::TexCoords(t) => tex_coords.extend_from_slice(t),
                _ => {}
            }
        }
        (normals, tex_coords)
    }

    /// Render mesh of a collision shape for physics-shape drawing.
    fn shape_mesh(&mut self, shape: &GeometryShape, id: ElementId) -> MeshHandle {
        let data = match shape {
            GeometryShape::Box {
                width,
                depth,
                height,
            } => meshes::box_mesh(*width, *depth, *height),
            GeometryShape::Sphere { radius } => meshes::sphere_mesh(*radius, 12, 6),
            GeometryShape::Cylinder { radius, height }
            | GeometryShape::Capsule { radius, height } => {
                meshes::cylinder_mesh(*radius, *height, 12)
            }
            GeometryShape::Complex => {
                let (vertices, indices) = self.mesh_payload(id);
                MeshData {
                    vertices,
                    normals: Vec::new(),
                    tex_coords: Vec::new(),
                    indices,
                }
            }
        };
        self.register_mesh(data)
    }

    fn register_mesh(&mut self, data: MeshData) -> MeshHandle {
        let handle = MeshHandle(self.sim.meshes.len() as u32);
        self.sim.meshes.push(data);
        handle
    }

    fn register_surface(&mut self, attrs: &SurfaceAttrs) -> SurfaceHandle {
        let handle = SurfaceHandle(self.sim.surfaces.len() as u32);
        self.sim.surfaces.push(SurfaceData {
            diffuse: attrs.diffuse,
            ambient: attrs.ambient.unwrap_or(attrs.diffuse),
            specular: attrs.specular.unwrap_or(gantry_types::Rgba::BLACK),
            shininess: attrs.shininess,
            texture: attrs.texture.clone(),
        });
        handle
    }

    fn plain_surface(&mut self) -> SurfaceHandle {
        if let Some(handle) = self.plain_surface {
            return handle;
        }
        let handle = self.register_surface(&SurfaceAttrs {
            diffuse: gantry_types::Rgba::WHITE,
            ambient: None,
            specular: None,
            shininess: 0.0,
            texture: None,
        });
        self.plain_surface = Some(handle);
        handle
    }

    fn marker(&mut self) -> (MeshHandle, SurfaceHandle) {
        if let Some(marker) = self.marker {
            return marker;
        }
        let mesh = self.register_mesh(meshes::marker_mesh(0.02));
        let surface = self.plain_surface();
        let marker = (mesh, surface);
        self.marker = Some(marker);
        marker
    }

    fn pose_lookup(world: &World) -> impl Fn(BodyHandle) -> Pose + '_ {
        move |body| world.body(body).pose
    }
}

/// Re-express a local pose relative to the body's center of mass.
fn shift_by_com(local: &Pose, com: &Vector3<f64>) -> Pose {
    Pose {
        position: local.position - com,
        rotation: local.rotation,
    }
}

/// Build a joint limit, falling back to the scene stop parameters.
fn joint_limit(attrs: &DeflectionAttrs, config: &ContactConfig) -> gantry_phys::JointLimit {
    gantry_phys::JointLimit {
        min: attrs.min,
        max: attrs.max,
        stop_erp: attrs.stop_erp.unwrap_or(config.stop_erp),
        stop_cfm: attrs.stop_cfm.unwrap_or(config.stop_cfm),
    }
}
