//! The model-matrix cache.
//!
//! Every render/sensor consumer reads world transforms from this cache
//! rather than recomputing pose chains. A matrix splits into a constant
//! part, folded once at build time from the chain of fixed poses, and an
//! optional variable part: a live reference to a body pose that changes
//! every step. Matrices register under a usage class; each class carries
//! its own "last updated at step N" stamp so a consumer that only needs one
//! class never pays for the others.
//!
//! Construction-stack discipline: a by-reference pose may only be the very
//! first push on an empty builder. This guarantees at most one live
//! dependency per matrix, keeping a refresh one matrix product and
//! side-effect-free.

use gantry_types::{BodyHandle, Matrix4, Pose};

/// Consumer-purpose partition of cached matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageClass {
    /// Appearance rendering.
    Appearance,
    /// Physics collision-shape drawing.
    PhysicalDrawing,
    /// Sensor-shape drawing.
    SensorDrawing,
    /// Controller overlay drawing.
    ControllerDrawing,
    /// Coordinate-origin markers.
    Origin,
    /// The interactive drag plane.
    DragPlane,
}

impl UsageClass {
    /// All usage classes.
    pub const ALL: [Self; 6] = [
        Self::Appearance,
        Self::PhysicalDrawing,
        Self::SensorDrawing,
        Self::ControllerDrawing,
        Self::Origin,
        Self::DragPlane,
    ];

    fn index(self) -> usize {
        match self {
            Self::Appearance => 0,
            Self::PhysicalDrawing => 1,
            Self::SensorDrawing => 2,
            Self::ControllerDrawing => 3,
            Self::Origin => 4,
            Self::DragPlane => 5,
        }
    }
}

/// Identifier of a cached matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixId(u32);

impl MatrixId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A cached world transform.
#[derive(Debug, Clone)]
pub struct ModelMatrix {
    /// Product of every fixed pose pushed at construction.
    constant_part: Matrix4<f64>,
    /// Live pose dependency, evaluated at refresh time; `None` for purely
    /// constant matrices, which are fresh forever after creation.
    variable_part: Option<BodyHandle>,
    /// The current world matrix.
    current: Matrix4<f64>,
}

impl ModelMatrix {
    /// The body this matrix depends on, if any.
    #[must_use]
    pub fn variable_part(&self) -> Option<BodyHandle> {
        self.variable_part
    }

    /// The cached world matrix as of the last refresh.
    #[must_use]
    pub fn current(&self) -> &Matrix4<f64> {
        &self.current
    }
}

/// Builds one [`ModelMatrix`] from a stack of pose pushes.
#[derive(Debug)]
pub struct MatrixBuilder {
    variable: Option<BodyHandle>,
    constant: Matrix4<f64>,
    pushes: usize,
}

impl Default for MatrixBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixBuilder {
    /// Start an empty construction stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variable: None,
            constant: Matrix4::identity(),
            pushes: 0,
        }
    }

    /// Push a by-reference (variable) pose: the body's pose is re-read at
    /// every refresh.
    ///
    /// # Panics
    ///
    /// A by-reference pose must be the first push on an empty stack.
    #[must_use]
    pub fn push_body(mut self, body: BodyHandle) -> Self {
        assert!(
            self.pushes == 0,
            "by-reference pose must be the first push on the construction stack"
        );
        self.variable = Some(body);
        self.pushes += 1;
        self
    }

    /// Push a fixed pose; it is folded into the constant part immediately.
    #[must_use]
    pub fn push_pose(mut self, pose: &Pose) -> Self {
        self.constant *= pose.to_matrix();
        self.pushes += 1;
        self
    }

    fn build(self, lookup: &dyn Fn(BodyHandle) -> Pose) -> ModelMatrix {
        let current = match self.variable {
            Some(body) => lookup(body).to_matrix() * self.constant,
            None => self.constant,
        };
        ModelMatrix {
            constant_part: self.constant,
            variable_part: self.variable,
            current,
        }
    }
}

#[derive(Debug, Default)]
struct ClassSet {
    members: Vec<MatrixId>,
    last_update_step: Option<u64>,
}

/// The usage-partitioned matrix cache.
#[derive(Debug, Default)]
pub struct MatrixCache {
    matrices: Vec<ModelMatrix>,
    classes: [ClassSet; 6],
}

impl MatrixCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish a builder and register the matrix under a usage class. The
    /// initial value is computed immediately via `lookup`.
    pub fn insert(
        &mut self,
        builder: MatrixBuilder,
        class: UsageClass,
        lookup: &dyn Fn(BodyHandle) -> Pose,
    ) -> MatrixId {
        let id = MatrixId(u32::try_from(self.matrices.len()).unwrap_or(u32::MAX));
        let matrix = builder.build(lookup);
        // Purely constant matrices are fresh forever; they never join the
        // refresh walk.
        if matrix.variable_part.is_some() {
            self.classes[class.index()].members.push(id);
        }
        self.matrices.push(matrix);
        id
    }

    /// Read a cached matrix.
    #[must_use]
    pub fn matrix(&self, id: MatrixId) -> &ModelMatrix {
        &self.matrices[id.index()]
    }

    /// Number of cached matrices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// The step a class was last refreshed at.
    #[must_use]
    pub fn last_update(&self, class: UsageClass) -> Option<u64> {
        self.classes[class.index()].last_update_step
    }

    /// Refresh every matrix registered under `class` for simulation step
    /// `step`. A repeated call for the same `(class, step)` pair is a
    /// no-op unless `force` is set; forcing covers interactive dragging,
    /// where a pose changes without the step counter advancing.
    pub fn update(
        &mut self,
        class: UsageClass,
        step: u64,
        force: bool,
        lookup: &dyn Fn(BodyHandle) -> Pose,
    ) {
        let set = &mut self.classes[class.index()];
        if !force && set.last_update_step == Some(step) {
            return;
        }
        set.last_update_step = Some(step);
        for &id in &set.members {
            let matrix = &mut self.matrices[id.index()];
            // Only the single live dependency is evaluated per refresh.
            if let Some(body) = matrix.variable_part {
                matrix.current = lookup(body).to_matrix() * matrix.constant_part;
            }
        }
    }
}
