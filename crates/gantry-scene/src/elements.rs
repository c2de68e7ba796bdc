//! The typed scene element model.
//!
//! Replaying macros produces a tree of [`Element`] nodes held in a
//! [`SceneTree`] arena. Every node carries a closed [`ElementKind`] tag and
//! a per-kind [`ElementData`] payload; cross-references are arena indices,
//! so teardown is a single drop and sharing constant elements is just
//! linking the same index under several parents.
//!
//! Child-structure rules (which child classes are required, which may occur
//! once, which repeat) are data in the [`ElementSpec`] registry rather than
//! code in each handler.

use gantry_types::{ElementId, MassProperties, Rgba};
use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::problems::ProblemList;
use crate::values::AttributeMap;

/// Child-class bitmask values.
pub mod class {
    /// The root scene element.
    pub const SCENE: u32 = 1;
    /// Movable rigid bodies.
    pub const BODY: u32 = 1 << 1;
    /// Static compounds.
    pub const COMPOUND: u32 = 1 << 2;
    /// Collision geometries.
    pub const GEOMETRY: u32 = 1 << 3;
    /// Mass elements.
    pub const MASS: u32 = 1 << 4;
    /// Fixed translation offsets.
    pub const TRANSLATION: u32 = 1 << 5;
    /// Fixed rotation offsets.
    pub const ROTATION: u32 = 1 << 6;
    /// Joints (hinge, slider).
    pub const JOINT: u32 = 1 << 7;
    /// Joint axes.
    pub const AXIS: u32 = 1 << 8;
    /// Axis travel limits.
    pub const DEFLECTION: u32 = 1 << 9;
    /// Motors attached to axes.
    pub const MOTOR: u32 = 1 << 10;
    /// Sensors.
    pub const SENSOR: u32 = 1 << 11;
    /// Render appearances.
    pub const APPEARANCE: u32 = 1 << 12;
    /// Lights.
    pub const LIGHT: u32 = 1 << 13;
    /// Appearance surfaces.
    pub const SURFACE: u32 = 1 << 14;
    /// Materials.
    pub const MATERIAL: u32 = 1 << 15;
    /// Sliding friction entries.
    pub const FRICTION: u32 = 1 << 16;
    /// Rolling friction entries.
    pub const ROLLING_FRICTION: u32 = 1 << 17;
    /// Vertex lists.
    pub const VERTICES: u32 = 1 << 18;
    /// Normal lists.
    pub const NORMALS: u32 = 1 << 19;
    /// Texture coordinate lists.
    pub const TEX_COORDS: u32 = 1 << 20;
    /// Triangle/quad index lists.
    pub const FACES: u32 = 1 << 21;
    /// Interactive user input ports.
    pub const USER_INPUT: u32 = 1 << 22;
}

/// Closed enumeration of element kinds (the scene description's tag set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// `<Scene>` - the simulation root.
    Scene,
    /// `<Compound>` - a static assembly in world space.
    Compound,
    /// `<Body>` - a movable rigid body.
    Body,
    /// `<Translation>` - fixed offset applied to the enclosing element.
    Translation,
    /// `<Rotation>` - fixed rotation applied to the enclosing element.
    Rotation,
    /// `<BoxGeometry>`.
    BoxGeometry,
    /// `<SphereGeometry>`.
    SphereGeometry,
    /// `<CylinderGeometry>`.
    CylinderGeometry,
    /// `<CapsuleGeometry>`.
    CapsuleGeometry,
    /// `<ComplexGeometry>` - mesh built from vertex/index children.
    ComplexGeometry,
    /// `<BoxMass>`.
    BoxMass,
    /// `<SphereMass>`.
    SphereMass,
    /// `<CylinderMass>`.
    CylinderMass,
    /// `<PointMass>`.
    PointMass,
    /// `<Hinge>` - rotational joint, owns the child body.
    Hinge,
    /// `<Slider>` - prismatic joint, owns the child body.
    Slider,
    /// `<Axis>`.
    Axis,
    /// `<Deflection>` - axis travel limits.
    Deflection,
    /// `<ServoMotor>` - PD position servo.
    ServoMotor,
    /// `<VelocityMotor>`.
    VelocityMotor,
    /// `<PT2Motor>` - second-order lag servo.
    Pt2Motor,
    /// `<Gyroscope>`.
    Gyroscope,
    /// `<Accelerometer>`.
    Accelerometer,
    /// `<CollisionSensor>`.
    CollisionSensor,
    /// `<SingleDistanceSensor>` - one precise ray.
    SingleDistanceSensor,
    /// `<ApproxDistanceSensor>` - cone sensor with bounding-radius culling.
    ApproxDistanceSensor,
    /// `<Camera>`.
    Camera,
    /// `<DepthImageSensor>`.
    DepthImageSensor,
    /// `<UserInput>` - externally settable input port.
    UserInput,
    /// `<BoxAppearance>`.
    BoxAppearance,
    /// `<SphereAppearance>`.
    SphereAppearance,
    /// `<CylinderAppearance>`.
    CylinderAppearance,
    /// `<ComplexAppearance>` - mesh appearance.
    ComplexAppearance,
    /// `<Surface>` - colors and texture of an appearance.
    Surface,
    /// `<Light>`.
    Light,
    /// `<Material>` - named contact material.
    Material,
    /// `<Friction>` - sliding friction towards another material.
    Friction,
    /// `<RollingFriction>` - rolling friction towards another material.
    RollingFriction,
    /// `<Vertices>` - textual float payload.
    Vertices,
    /// `<Normals>` - textual float payload.
    Normals,
    /// `<TexCoords>` - textual float payload.
    TexCoords,
    /// `<Triangles>` - textual index payload.
    Triangles,
    /// `<Quads>` - textual index payload.
    Quads,
}

impl ElementKind {
    /// The child-class bit this kind contributes to its parent.
    #[must_use]
    pub fn class(self) -> u32 {
        element_spec_by_kind(self).class
    }

    /// Whether this kind is a collision geometry.
    #[must_use]
    pub fn is_geometry(self) -> bool {
        self.class() == class::GEOMETRY
    }

    /// Whether this kind is a mass element.
    #[must_use]
    pub fn is_mass(self) -> bool {
        self.class() == class::MASS
    }

    /// Whether this kind is a joint.
    #[must_use]
    pub fn is_joint(self) -> bool {
        self.class() == class::JOINT
    }

    /// Whether this kind is a sensor.
    #[must_use]
    pub fn is_sensor(self) -> bool {
        self.class() == class::SENSOR
    }

    /// Whether this kind is a render appearance.
    #[must_use]
    pub fn is_appearance(self) -> bool {
        self.class() == class::APPEARANCE
    }
}

/// Static description of one element type.
#[derive(Debug)]
pub struct ElementSpec {
    /// The XML tag.
    pub tag: &'static str,
    /// The kind constructed from this tag.
    pub kind: ElementKind,
    /// The class bit this element contributes to its parent.
    pub class: u32,
    /// Child classes that must appear at least once.
    pub required_children: u32,
    /// Child classes allowed at most once (beyond the repeatable set).
    pub once_children: u32,
    /// Child classes that may repeat.
    pub repeatable_children: u32,
    /// Whether the element carries a textual number payload.
    pub textual: bool,
    /// Whether instances may be cached and shared across references.
    pub constant: bool,
}

impl ElementSpec {
    /// All child classes this element accepts.
    #[must_use]
    pub fn accepted_children(&self) -> u32 {
        self.required_children | self.once_children | self.repeatable_children
    }
}

macro_rules! spec {
    ($tag:literal, $kind:ident, $class:expr, req: $req:expr, once: $once:expr,
     many: $many:expr, textual: $textual:expr, constant: $constant:expr) => {
        ElementSpec {
            tag: $tag,
            kind: ElementKind::$kind,
            class: $class,
            required_children: $req,
            once_children: $once,
            repeatable_children: $many,
            textual: $textual,
            constant: $constant,
        }
    };
}

use class::*;

/// The element registry: one spec per tag.
static ELEMENT_SPECS: &[ElementSpec] = &[
    spec!("Scene", Scene, SCENE,
        req: 0, once: 0, many: BODY | COMPOUND | LIGHT | USER_INPUT,
        textual: false, constant: false),
    spec!("Compound", Compound, COMPOUND,
        req: 0, once: TRANSLATION | ROTATION,
        many: BODY | COMPOUND | GEOMETRY | APPEARANCE | SENSOR | USER_INPUT,
        textual: false, constant: false),
    spec!("Body", Body, BODY,
        req: MASS, once: TRANSLATION | ROTATION,
        many: GEOMETRY | APPEARANCE | MASS | JOINT | SENSOR | USER_INPUT,
        textual: false, constant: false),
    spec!("Translation", Translation, TRANSLATION,
        req: 0, once: 0, many: 0, textual: false, constant: false),
    spec!("Rotation", Rotation, ROTATION,
        req: 0, once: 0, many: 0, textual: false, constant: false),
    spec!("BoxGeometry", BoxGeometry, GEOMETRY,
        req: 0, once: TRANSLATION | ROTATION | MATERIAL, many: 0,
        textual: false, constant: true),
    spec!("SphereGeometry", SphereGeometry, GEOMETRY,
        req: 0, once: TRANSLATION | ROTATION | MATERIAL, many: 0,
        textual: false, constant: true),
    spec!("CylinderGeometry", CylinderGeometry, GEOMETRY,
        req: 0, once: TRANSLATION | ROTATION | MATERIAL, many: 0,
        textual: false, constant: true),
    spec!("CapsuleGeometry", CapsuleGeometry, GEOMETRY,
        req: 0, once: TRANSLATION | ROTATION | MATERIAL, many: 0,
        textual: false, constant: true),
    spec!("ComplexGeometry", ComplexGeometry, GEOMETRY,
        req: VERTICES | FACES, once: TRANSLATION | ROTATION | MATERIAL,
        many: FACES, textual: false, constant: true),
    spec!("BoxMass", BoxMass, MASS,
        req: 0, once: TRANSLATION | ROTATION, many: MASS,
        textual: false, constant: false),
    spec!("SphereMass", SphereMass, MASS,
        req: 0, once: TRANSLATION | ROTATION, many: MASS,
        textual: false, constant: false),
    spec!("CylinderMass", CylinderMass, MASS,
        req: 0, once: TRANSLATION | ROTATION, many: MASS,
        textual: false, constant: false),
    spec!("PointMass", PointMass, MASS,
        req: 0, once: TRANSLATION | ROTATION, many: MASS,
        textual: false, constant: false),
    spec!("Hinge", Hinge, JOINT,
        req: BODY | AXIS, once: TRANSLATION | ROTATION | BODY | AXIS, many: 0,
        textual: false, constant: false),
    spec!("Slider", Slider, JOINT,
        req: BODY | AXIS, once: TRANSLATION | ROTATION | BODY | AXIS, many: 0,
        textual: false, constant: false),
    spec!("Axis", Axis, AXIS,
        req: 0, once: DEFLECTION | MOTOR, many: 0, textual: false, constant: false),
    spec!("Deflection", Deflection, DEFLECTION,
        req: 0, once: 0, many: 0, textual: false, constant: false),
    spec!("ServoMotor", ServoMotor, MOTOR,
        req: 0, once: 0, many: 0, textual: false, constant: false),
    spec!("VelocityMotor", VelocityMotor, MOTOR,
        req: 0, once: 0, many: 0, textual: false, constant: false),
    spec!("PT2Motor", Pt2Motor, MOTOR,
        req: 0, once: 0, many: 0, textual: false, constant: false),
    spec!("Gyroscope", Gyroscope, SENSOR,
        req: 0, once: TRANSLATION | ROTATION, many: 0, textual: false, constant: false),
    spec!("Accelerometer", Accelerometer, SENSOR,
        req: 0, once: TRANSLATION | ROTATION, many: 0, textual: false, constant: false),
    spec!("CollisionSensor", CollisionSensor, SENSOR,
        req: 0, once: TRANSLATION | ROTATION, many: 0, textual: false, constant: false),
    spec!("SingleDistanceSensor", SingleDistanceSensor, SENSOR,
        req: 0, once: TRANSLATION | ROTATION, many: 0, textual: false, constant: false),
    spec!("ApproxDistanceSensor", ApproxDistanceSensor, SENSOR,
        req: 0, once: TRANSLATION | ROTATION, many: 0, textual: false, constant: false),
    spec!("Camera", Camera, SENSOR,
        req: 0, once: TRANSLATION | ROTATION, many: 0, textual: false, constant: false),
    spec!("DepthImageSensor", DepthImageSensor, SENSOR,
        req: 0, once: TRANSLATION | ROTATION, many: 0, textual: false, constant: false),
    spec!("UserInput", UserInput, USER_INPUT,
        req: 0, once: 0, many: 0, textual: false, constant: false),
    spec!("BoxAppearance", BoxAppearance, APPEARANCE,
        req: SURFACE, once: TRANSLATION | ROTATION | SURFACE, many: APPEARANCE,
        textual: false, constant: true),
    spec!("SphereAppearance", SphereAppearance, APPEARANCE,
        req: SURFACE, once: TRANSLATION | ROTATION | SURFACE, many: APPEARANCE,
        textual: false, constant: true),
    spec!("CylinderAppearance", CylinderAppearance, APPEARANCE,
        req: SURFACE, once: TRANSLATION | ROTATION | SURFACE, many: APPEARANCE,
        textual: false, constant: true),
    spec!("ComplexAppearance", ComplexAppearance, APPEARANCE,
        req: SURFACE | VERTICES | FACES,
        once: TRANSLATION | ROTATION | SURFACE | NORMALS | TEX_COORDS,
        many: APPEARANCE | FACES, textual: false, constant: true),
    spec!("Surface", Surface, SURFACE,
        req: 0, once: 0, many: 0, textual: false, constant: true),
    spec!("Light", Light, LIGHT,
        req: 0, once: 0, many: 0, textual: false, constant: false),
    spec!("Material", Material, MATERIAL,
        req: 0, once: 0, many: FRICTION | ROLLING_FRICTION,
        textual: false, constant: true),
    spec!("Friction", Friction, FRICTION,
        req: 0, once: 0, many: 0, textual: false, constant: false),
    spec!("RollingFriction", RollingFriction, ROLLING_FRICTION,
        req: 0, once: 0, many: 0, textual: false, constant: false),
    spec!("Vertices", Vertices, VERTICES,
        req: 0, once: 0, many: 0, textual: true, constant: true),
    spec!("Normals", Normals, NORMALS,
        req: 0, once: 0, many: 0, textual: true, constant: true),
    spec!("TexCoords", TexCoords, TEX_COORDS,
        req: 0, once: 0, many: 0, textual: true, constant: true),
    spec!("Triangles", Triangles, FACES,
        req: 0, once: 0, many: 0, textual: true, constant: true),
    spec!("Quads", Quads, FACES,
        req: 0, once: 0, many: 0, textual: true, constant: true),
];

/// Look up the spec for an element tag.
#[must_use]
pub fn element_spec(tag: &str) -> Option<&'static ElementSpec> {
    ELEMENT_SPECS.iter().find(|s| s.tag == tag)
}

/// Look up the spec for an element kind.
#[must_use]
#[allow(clippy::unwrap_used)] // The registry covers every kind by construction.
pub fn element_spec_by_kind(kind: ElementKind) -> &'static ElementSpec {
    ELEMENT_SPECS.iter().find(|s| s.kind == kind).unwrap()
}

/// Element tags that contribute the given child class, for error messages.
#[must_use]
pub fn tags_for_class(class: u32) -> Vec<&'static str> {
    ELEMENT_SPECS
        .iter()
        .filter(|s| s.class == class)
        .map(|s| s.tag)
        .collect()
}

// ---------------------------------------------------------------------------
// Per-kind payloads
// ---------------------------------------------------------------------------

/// Scene-wide configuration parsed from `<Scene>` attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneAttrs {
    /// Fixed step length in seconds.
    pub step_length: f64,
    /// Gravity along world Z (m/s²).
    pub gravity: f64,
    /// Contact error reduction parameter.
    pub erp: f64,
    /// Contact constraint force mixing.
    pub cfm: f64,
    /// Solver iterations for the full profile.
    pub solver_iterations: usize,
    /// Solver iterations for the quick profile.
    pub quick_solver_iterations: usize,
    /// Use the quick solver every Nth step (0 = never).
    pub quick_solver_ratio: u32,
    /// Whether movable bodies collide with each other.
    pub body_collisions: bool,
    /// Default sliding friction when no material pair resolves.
    pub default_friction: f64,
    /// Background color for render consumers.
    pub background: Rgba,
}

/// Shape dimensions of a collision geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryShape {
    /// Axis-aligned box with full extents.
    Box {
        /// Extent along X.
        width: f64,
        /// Extent along Y.
        depth: f64,
        /// Extent along Z.
        height: f64,
    },
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f64,
    },
    /// Cylinder aligned with Z.
    Cylinder {
        /// Radius.
        radius: f64,
        /// Full height.
        height: f64,
    },
    /// Capsule aligned with Z.
    Capsule {
        /// Radius.
        radius: f64,
        /// Full height including the caps.
        height: f64,
    },
    /// Mesh built from `<Vertices>`/`<Triangles>`/`<Quads>` children.
    Complex,
}

impl GeometryShape {
    /// Radius of the smallest sphere enclosing the shape (mesh shapes
    /// compute theirs at compile time from the actual vertices).
    #[must_use]
    pub fn outer_radius(&self) -> f64 {
        match *self {
            Self::Box {
                width,
                depth,
                height,
            } => 0.5 * (width * width + depth * depth + height * height).sqrt(),
            Self::Sphere { radius } => radius,
            Self::Cylinder { radius, height } => {
                (radius * radius + 0.25 * height * height).sqrt()
            }
            Self::Capsule { radius, height } => 0.5 * height.max(2.0 * radius),
            Self::Complex => 0.0,
        }
    }

    /// Radius of the largest sphere contained in the shape.
    #[must_use]
    pub fn inner_radius(&self) -> f64 {
        match *self {
            Self::Box {
                width,
                depth,
                height,
            } => 0.5 * width.min(depth).min(height),
            Self::Sphere { radius } => radius,
            Self::Cylinder { radius, height } | Self::Capsule { radius, height } => {
                radius.min(0.5 * height)
            }
            Self::Complex => 0.0,
        }
    }
}

/// Collision geometry attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryAttrs {
    /// The shape and its dimensions.
    pub shape: GeometryShape,
    /// Optional display color for physics-shape drawing.
    pub color: Option<Rgba>,
    /// Immaterial geometries take part in overlap detection and callbacks
    /// but never produce a physical contact response.
    pub immaterial: bool,
}

/// Joint axis attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisAttrs {
    /// Axis direction in the joint frame (normalized at compile).
    pub direction: Vector3<f64>,
    /// Constraint force mixing override for this axis.
    pub cfm: Option<f64>,
}

/// Axis travel limits.
#[derive(Debug, Clone, PartialEq)]
pub struct DeflectionAttrs {
    /// Minimum travel (rad for hinges, m for sliders).
    pub min: f64,
    /// Maximum travel.
    pub max: f64,
    /// Stop error reduction override.
    pub stop_erp: Option<f64>,
    /// Stop softness override.
    pub stop_cfm: Option<f64>,
}

/// Motor attributes; a motor is a sensor+actuator pair on an axis.
#[derive(Debug, Clone, PartialEq)]
pub enum MotorAttrs {
    /// PD position servo.
    Servo {
        /// Proportional gain.
        p: f64,
        /// Integral gain.
        i: f64,
        /// Derivative gain.
        d: f64,
        /// Maximum drive velocity (rad/s or m/s).
        max_velocity: f64,
        /// Maximum drive force/torque.
        max_force: f64,
    },
    /// Velocity servo.
    Velocity {
        /// Maximum drive velocity.
        max_velocity: f64,
        /// Maximum drive force/torque.
        max_force: f64,
    },
    /// Second-order lag (PT2) position servo.
    Pt2 {
        /// Time constant.
        t: f64,
        /// Damping ratio.
        d: f64,
        /// Gain.
        k: f64,
        /// Maximum drive velocity.
        max_velocity: f64,
        /// Maximum drive force/torque.
        max_force: f64,
    },
}

/// Depth image projection modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Planar perspective projection.
    Perspective,
    /// Spherical projection; only valid for single-row images.
    Spherical,
}

/// Sensor attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorAttrs {
    /// Angular velocity sensor.
    Gyroscope,
    /// Linear acceleration sensor.
    Accelerometer,
    /// Binary contact sensor over the parent's geometries.
    Collision,
    /// One precise ray along local -Z... +X convention: local X.
    SingleDistance {
        /// Minimum measured distance.
        min: f64,
        /// Maximum measured distance.
        max: f64,
    },
    /// Cone sensor with bounding-radius culling before the precise ray.
    ApproxDistance {
        /// Minimum measured distance.
        min: f64,
        /// Maximum measured distance.
        max: f64,
        /// Horizontal opening angle (rad).
        angle_x: f64,
        /// Vertical opening angle (rad).
        angle_y: f64,
    },
    /// Color camera rendering through the offscreen boundary.
    Camera {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Horizontal opening angle (rad).
        angle_x: f64,
        /// Vertical opening angle (rad).
        angle_y: f64,
    },
    /// Depth image sensor.
    DepthImage {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Horizontal opening angle (rad).
        angle_x: f64,
        /// Vertical opening angle (rad).
        angle_y: f64,
        /// Projection mode.
        projection: Projection,
    },
}

/// User input port attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct UserInputAttrs {
    /// Minimum accepted value.
    pub min: f64,
    /// Maximum accepted value.
    pub max: f64,
    /// Initial value.
    pub default: f64,
}

/// Appearance shape dimensions (render only).
#[derive(Debug, Clone, PartialEq)]
pub enum AppearanceShape {
    /// Box with full extents.
    Box {
        /// Extent along X.
        width: f64,
        /// Extent along Y.
        depth: f64,
        /// Extent along Z.
        height: f64,
    },
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f64,
    },
    /// Cylinder aligned with Z.
    Cylinder {
        /// Radius.
        radius: f64,
        /// Full height.
        height: f64,
    },
    /// Mesh from vertex/index children.
    Complex,
}

/// Surface attributes of an appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceAttrs {
    /// Diffuse color.
    pub diffuse: Rgba,
    /// Ambient color; defaults to the diffuse color.
    pub ambient: Option<Rgba>,
    /// Specular color.
    pub specular: Option<Rgba>,
    /// Shininess exponent.
    pub shininess: f64,
    /// Texture resource name.
    pub texture: Option<String>,
}

/// Light attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct LightAttrs {
    /// Light position in world space.
    pub position: Point3<f64>,
    /// Diffuse color.
    pub diffuse: Rgba,
    /// Ambient color.
    pub ambient: Rgba,
    /// Constant attenuation term.
    pub constant_attenuation: f64,
    /// Linear attenuation term.
    pub linear_attenuation: f64,
    /// Quadratic attenuation term.
    pub quadratic_attenuation: f64,
}

/// A friction entry inside a `<Material>`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrictionAttrs {
    /// The other material this entry applies against.
    pub other_material: String,
    /// The coefficient.
    pub coefficient: f64,
}

/// Face index payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacesAttrs {
    /// Vertex indices, 3 per triangle or 4 per quad.
    pub indices: Vec<u32>,
    /// Whether the indices form quads (otherwise triangles).
    pub quads: bool,
}

/// Per-kind payload of an element node.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementData {
    /// Scene configuration.
    Scene(SceneAttrs),
    /// Static compound, no attributes of its own.
    Compound,
    /// Movable body, no attributes of its own.
    Body,
    /// Fixed translation offset.
    Translation(Vector3<f64>),
    /// Fixed rotation offset.
    Rotation(UnitQuaternion<f64>),
    /// Collision geometry.
    Geometry(GeometryAttrs),
    /// Mass contribution, already evaluated to mass properties.
    Mass(MassProperties),
    /// Joint (hinge or slider per the kind tag).
    Joint,
    /// Joint axis.
    Axis(AxisAttrs),
    /// Axis travel limits.
    Deflection(DeflectionAttrs),
    /// Motor on an axis.
    Motor(MotorAttrs),
    /// Sensor.
    Sensor(SensorAttrs),
    /// User input port.
    UserInput(UserInputAttrs),
    /// Render appearance.
    Appearance(AppearanceShape),
    /// Appearance surface.
    Surface(SurfaceAttrs),
    /// Light.
    Light(LightAttrs),
    /// Named contact material (name is the element name).
    Material,
    /// Sliding or rolling friction entry per the kind tag.
    Friction(FrictionAttrs),
    /// Vertex list payload.
    Vertices(Vec<Point3<f64>>),
    /// Normal list payload.
    Normals(Vec<Vector3<f64>>),
    /// Texture coordinate payload.
    TexCoords(Vec<[f64; 2]>),
    /// Triangle/quad index payload.
    Faces(FacesAttrs),
}

/// One node of the parsed scene tree.
#[derive(Debug, Clone)]
pub struct Element {
    /// Arena index of this node.
    pub id: ElementId,
    /// Kind tag.
    pub kind: ElementKind,
    /// Element name (`name` attribute), if any.
    pub name: Option<String>,
    /// Per-kind payload.
    pub data: ElementData,
    /// Structural parent, fixed at replay time; `None` for the root.
    pub parent: Option<ElementId>,
    /// Additional parents of a shared constant element.
    pub extra_parents: Vec<ElementId>,
    /// Children in document order.
    pub children: Vec<ElementId>,
    /// Source file of the defining macro element.
    pub file: String,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl Element {
    /// Whether this element is shared by more than one parent.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        !self.extra_parents.is_empty()
    }
}

/// The complete parsed scene: an element arena plus the root `<Scene>` node.
#[derive(Debug, Clone)]
pub struct SceneTree {
    elements: Vec<Element>,
    root: ElementId,
}

impl SceneTree {
    pub(crate) fn new(elements: Vec<Element>, root: ElementId) -> Self {
        Self { elements, root }
    }

    /// The root `<Scene>` element.
    #[must_use]
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Look up an element by id.
    #[must_use]
    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.index()]
    }

    /// Iterate all elements in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Number of elements in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the tree is empty (never true for a loaded scene).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Children of a node.
    #[must_use]
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        &self.get(id).children
    }

    /// The scene configuration from the root element.
    #[must_use]
    pub fn scene_attrs(&self) -> &SceneAttrs {
        match &self.get(self.root).data {
            ElementData::Scene(attrs) => attrs,
            // The builder only ever installs a Scene element at the root.
            _ => unreachable!("root element is not a Scene"),
        }
    }

    /// Find the first child of the given kind under a node.
    #[must_use]
    pub fn child_of_kind(&self, id: ElementId, kind: ElementKind) -> Option<ElementId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.get(c).kind == kind)
    }

    /// Find the first child matching a class bit under a node.
    #[must_use]
    pub fn child_of_class(&self, id: ElementId, class: u32) -> Option<ElementId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.get(c).kind.class() == class)
    }
}

// ---------------------------------------------------------------------------
// Per-kind attribute parsing
// ---------------------------------------------------------------------------

/// Parse the payload of an element from its (merged, substituted) attributes.
///
/// Constraint violations queue problems but still yield a payload so the
/// replay can continue and report further problems.
pub(crate) fn parse_data(
    kind: ElementKind,
    attrs: &mut AttributeMap,
    problems: &mut ProblemList,
) -> ElementData {
    match kind {
        ElementKind::Scene => ElementData::Scene(SceneAttrs {
            step_length: attrs.get_time_positive("stepLength", 0.004, problems),
            gravity: attrs.get_float("gravity", -9.81, problems),
            erp: attrs.get_float_minmax("erp", 0.2, 0.0, 1.0, problems),
            cfm: attrs.get_float_minmax("cfm", 1e-5, 0.0, 1.0, problems),
            solver_iterations: attrs.get_uint("solverIterations", 32, problems) as usize,
            quick_solver_iterations: attrs.get_uint("quickSolverIterations", 8, problems)
                as usize,
            quick_solver_ratio: attrs.get_uint("quickSolverRatio", 0, problems),
            body_collisions: attrs.get_bool("bodyCollisions", true, problems),
            default_friction: attrs.get_float("defaultFriction", 0.5, problems),
            background: attrs.get_color("background", Rgba::BLACK, problems),
        }),
        ElementKind::Compound => ElementData::Compound,
        ElementKind::Body => ElementData::Body,
        ElementKind::Translation => ElementData::Translation(Vector3::new(
            attrs.get_length("x", 0.0, problems),
            attrs.get_length("y", 0.0, problems),
            attrs.get_length("z", 0.0, problems),
        )),
        ElementKind::Rotation => ElementData::Rotation(UnitQuaternion::from_euler_angles(
            attrs.get_angle("x", 0.0, problems),
            attrs.get_angle("y", 0.0, problems),
            attrs.get_angle("z", 0.0, problems),
        )),
        ElementKind::BoxGeometry => ElementData::Geometry(GeometryAttrs {
            shape: GeometryShape::Box {
                width: attrs.get_length_positive("width", 0.1, false, problems),
                depth: attrs.get_length_positive("depth", 0.1, false, problems),
                height: attrs.get_length_positive("height", 0.1, false, problems),
            },
            color: geometry_color(attrs, problems),
            immaterial: attrs.get_bool("immaterial", false, problems),
        }),
        ElementKind::SphereGeometry => ElementData::Geometry(GeometryAttrs {
            shape: GeometryShape::Sphere {
                radius: attrs.get_length_positive("radius", 0.05, false, problems),
            },
            color: geometry_color(attrs, problems),
            immaterial: attrs.get_bool("immaterial", false, problems),
        }),
        ElementKind::CylinderGeometry => ElementData::Geometry(GeometryAttrs {
            shape: GeometryShape::Cylinder {
                radius: attrs.get_length_positive("radius", 0.05, false, problems),
                height: attrs.get_length_positive("height", 0.1, false, problems),
            },
            color: geometry_color(attrs, problems),
            immaterial: attrs.get_bool("immaterial", false, problems),
        }),
        ElementKind::CapsuleGeometry => ElementData::Geometry(GeometryAttrs {
            shape: GeometryShape::Capsule {
                radius: attrs.get_length_positive("radius", 0.05, false, problems),
                height: attrs.get_length_positive("height", 0.2, false, problems),
            },
            color: geometry_color(attrs, problems),
            immaterial: attrs.get_bool("immaterial", false, problems),
        }),
        ElementKind::ComplexGeometry => ElementData::Geometry(GeometryAttrs {
            shape: GeometryShape::Complex,
            color: geometry_color(attrs, problems),
            immaterial: attrs.get_bool("immaterial", false, problems),
        }),
        ElementKind::BoxMass => {
            let value = attrs.get_mass_positive("value", 1.0, problems);
            ElementData::Mass(MassProperties::box_solid(
                value,
                Vector3::new(
                    attrs.get_length_positive("width", 0.1, false, problems),
                    attrs.get_length_positive("depth", 0.1, false, problems),
                    attrs.get_length_positive("height", 0.1, false, problems),
                ),
            ))
        }
        ElementKind::SphereMass => {
            let value = attrs.get_mass_positive("value", 1.0, problems);
            let radius = attrs.get_length_positive("radius", 0.05, false, problems);
            ElementData::Mass(MassProperties::sphere(value, radius))
        }
        ElementKind::CylinderMass => {
            let value = attrs.get_mass_positive("value", 1.0, problems);
            let radius = attrs.get_length_positive("radius", 0.05, false, problems);
            let height = attrs.get_length_positive("height", 0.1, false, problems);
            ElementData::Mass(MassProperties::cylinder(value, radius, height))
        }
        ElementKind::PointMass => {
            let value = attrs.get_mass_positive("value", 1.0, problems);
            ElementData::Mass(MassProperties::point_mass(value))
        }
        ElementKind::Hinge | ElementKind::Slider => ElementData::Joint,
        ElementKind::Axis => ElementData::Axis(AxisAttrs {
            direction: Vector3::new(
                attrs.get_float("x", 0.0, problems),
                attrs.get_float("y", 0.0, problems),
                attrs.get_float("z", 0.0, problems),
            ),
            cfm: attrs.get_string("cfm").and_then(|s| s.parse().ok()),
        }),
        ElementKind::Deflection => ElementData::Deflection(DeflectionAttrs {
            min: attrs.get_angle("min", 0.0, problems),
            max: attrs.get_angle("max", 0.0, problems),
            stop_erp: attrs.get_string("stopErp").and_then(|s| s.parse().ok()),
            stop_cfm: attrs.get_string("stopCfm").and_then(|s| s.parse().ok()),
        }),
        ElementKind::ServoMotor => ElementData::Motor(MotorAttrs::Servo {
            p: attrs.get_float("p", 1.0, problems),
            i: attrs.get_float("i", 0.0, problems),
            d: attrs.get_float("d", 0.0, problems),
            max_velocity: attrs.get_angular_velocity("maxVelocity", 10.0, problems),
            max_force: attrs.get_float("maxForce", 10.0, problems),
        }),
        ElementKind::VelocityMotor => ElementData::Motor(MotorAttrs::Velocity {
            max_velocity: attrs.get_angular_velocity("maxVelocity", 10.0, problems),
            max_force: attrs.get_float("maxForce", 10.0, problems),
        }),
        ElementKind::Pt2Motor => ElementData::Motor(MotorAttrs::Pt2 {
            t: attrs.get_time_positive("T", 0.1, problems),
            d: attrs.get_float("D", 1.0, problems),
            k: attrs.get_float("K", 1.0, problems),
            max_velocity: attrs.get_angular_velocity("maxVelocity", 10.0, problems),
            max_force: attrs.get_float("maxForce", 10.0, problems),
        }),
        ElementKind::Gyroscope => ElementData::Sensor(SensorAttrs::Gyroscope),
        ElementKind::Accelerometer => ElementData::Sensor(SensorAttrs::Accelerometer),
        ElementKind::CollisionSensor => ElementData::Sensor(SensorAttrs::Collision),
        ElementKind::SingleDistanceSensor => ElementData::Sensor(SensorAttrs::SingleDistance {
            min: attrs.get_length_positive("min", 0.0, true, problems),
            max: attrs.get_length_positive("max", 10.0, false, problems),
        }),
        ElementKind::ApproxDistanceSensor => ElementData::Sensor(SensorAttrs::ApproxDistance {
            min: attrs.get_length_positive("min", 0.0, true, problems),
            max: attrs.get_length_positive("max", 10.0, false, problems),
            angle_x: attrs.get_angle("angleX", 0.0, problems),
            angle_y: attrs.get_angle("angleY", 0.0, problems),
        }),
        ElementKind::Camera => ElementData::Sensor(SensorAttrs::Camera {
            width: attrs.get_uint("imageWidth", 320, problems),
            height: attrs.get_uint("imageHeight", 240, problems),
            angle_x: attrs.get_angle("angleX", 1.0, problems),
            angle_y: attrs.get_angle("angleY", 1.0, problems),
        }),
        ElementKind::DepthImageSensor => {
            let width = attrs.get_uint("imageWidth", 128, problems);
            let height = attrs.get_uint("imageHeight", 1, problems);
            let projection = match attrs.get_string("projection").as_deref() {
                None | Some("perspective") => Projection::Perspective,
                Some("spherical") => Projection::Spherical,
                Some(other) => {
                    let (line, column) = attrs.position();
                    problems.push(
                        attrs.file().to_string(),
                        line,
                        column,
                        format!("unknown projection \"{other}\""),
                    );
                    Projection::Perspective
                }
            };
            // Structural consistency: the spherical projection renders one
            // scanline; taller images have no defined mapping.
            if projection == Projection::Spherical && height > 1 {
                let (line, column) = attrs.position();
                problems.push(
                    attrs.file().to_string(),
                    line,
                    column,
                    format!(
                        "spherical projection requires imageHeight 1, got {height}"
                    ),
                );
            }
            ElementData::Sensor(SensorAttrs::DepthImage {
                width,
                height,
                angle_x: attrs.get_angle("angleX", 1.0, problems),
                angle_y: attrs.get_angle("angleY", 1.0, problems),
                projection,
            })
        }
        ElementKind::UserInput => {
            let min = attrs.get_float("min", 0.0, problems);
            let max = attrs.get_float("max", 1.0, problems);
            ElementData::UserInput(UserInputAttrs {
                min,
                max,
                default: attrs.get_float_minmax("default", min, min, max, problems),
            })
        }
        ElementKind::BoxAppearance => ElementData::Appearance(AppearanceShape::Box {
            width: attrs.get_length_positive("width", 0.1, false, problems),
            depth: attrs.get_length_positive("depth", 0.1, false, problems),
            height: attrs.get_length_positive("height", 0.1, false, problems),
        }),
        ElementKind::SphereAppearance => ElementData::Appearance(AppearanceShape::Sphere {
            radius: attrs.get_length_positive("radius", 0.05, false, problems),
        }),
        ElementKind::CylinderAppearance => ElementData::Appearance(AppearanceShape::Cylinder {
            radius: attrs.get_length_positive("radius", 0.05, false, problems),
            height: attrs.get_length_positive("height", 0.1, false, problems),
        }),
        ElementKind::ComplexAppearance => ElementData::Appearance(AppearanceShape::Complex),
        ElementKind::Surface => ElementData::Surface(SurfaceAttrs {
            diffuse: attrs.get_color("diffuseColor", Rgba::WHITE, problems),
            ambient: attrs
                .get_string("ambientColor")
                .and_then(|s| crate::values::parse_color(&s).ok()),
            specular: attrs
                .get_string("specularColor")
                .and_then(|s| crate::values::parse_color(&s).ok()),
            shininess: attrs.get_float_minmax("shininess", 0.0, 0.0, 128.0, problems),
            texture: attrs.get_string("diffuseTexture"),
        }),
        ElementKind::Light => ElementData::Light(LightAttrs {
            position: Point3::new(
                attrs.get_length("x", 0.0, problems),
                attrs.get_length("y", 0.0, problems),
                attrs.get_length("z", 1.0, problems),
            ),
            diffuse: attrs.get_color("diffuseColor", Rgba::WHITE, problems),
            ambient: attrs.get_color("ambientColor", Rgba::BLACK, problems),
            constant_attenuation: attrs.get_float("constantAttenuation", 1.0, problems),
            linear_attenuation: attrs.get_float("linearAttenuation", 0.0, problems),
            quadratic_attenuation: attrs.get_float("quadraticAttenuation", 0.0, problems),
        }),
        ElementKind::Material => ElementData::Material,
        ElementKind::Friction | ElementKind::RollingFriction => {
            ElementData::Friction(FrictionAttrs {
                other_material: attrs
                    .require_string("material", problems)
                    .unwrap_or_default(),
                coefficient: attrs.get_float_minmax("value", 0.0, 0.0, f64::MAX, problems),
            })
        }
        // Textual payloads are attached by the builder after attribute parse.
        ElementKind::Vertices => ElementData::Vertices(Vec::new()),
        ElementKind::Normals => ElementData::Normals(Vec::new()),
        ElementKind::TexCoords => ElementData::TexCoords(Vec::new()),
        ElementKind::Triangles => ElementData::Faces(FacesAttrs {
            indices: Vec::new(),
            quads: false,
        }),
        ElementKind::Quads => ElementData::Faces(FacesAttrs {
            indices: Vec::new(),
            quads: true,
        }),
    }
}

fn geometry_color(attrs: &mut AttributeMap, problems: &mut ProblemList) -> Option<Rgba> {
    attrs
        .get_string("color")
        .map(|s| match crate::values::parse_color(&s) {
            Ok(c) => c,
            Err(message) => {
                let (line, column) = attrs.position();
                problems.push(attrs.file().to_string(), line, column, message);
                Rgba::WHITE
            }
        })
}

/// Parse a textual payload of whitespace-separated floats. `#` starts a
/// line comment inside the payload.
pub(crate) fn parse_float_payload(text: &str, problems_ctx: &mut dyn FnMut(String)) -> Vec<f64> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("");
        for token in line.split_whitespace() {
            match token.parse::<f64>() {
                Ok(v) => out.push(v),
                Err(_) => problems_ctx(format!("invalid number \"{token}\" in payload")),
            }
        }
    }
    out
}

/// Parse a textual payload of vertex indices. Malformed entries clamp to
/// index 0 rather than failing, to tolerate slightly damaged legacy content.
pub(crate) fn parse_index_payload(text: &str) -> Vec<u32> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("");
        for token in line.split_whitespace() {
            match token.parse::<u32>() {
                Ok(v) => out.push(v),
                Err(_) => {
                    tracing::warn!("malformed vertex index \"{token}\" clamped to 0");
                    out.push(0);
                }
            }
        }
    }
    out
}
