//! Collision geoms.
//!
//! A geom is a collision shape attached to a movable body (offset from the
//! body's center of mass) or placed directly in world space (static). Mesh
//! shapes collide through their bounding sphere; the exact triangles are
//! kept for ray casts and rendering consumers.

use gantry_types::{BodyHandle, ElementId, GeomHandle, Pose};
use nalgebra::{Point3, Vector3};

/// Shape of a collision geom.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f64,
    },
    /// Axis-aligned box in the geom frame.
    Box {
        /// Half extents.
        half: Vector3<f64>,
    },
    /// Capsule along the local Z axis.
    Capsule {
        /// Radius.
        radius: f64,
        /// Half length of the inner segment (without the caps).
        half_length: f64,
    },
    /// Triangle mesh; collides through its bounding sphere.
    Mesh {
        /// Vertices in the geom frame.
        vertices: Vec<Point3<f64>>,
        /// Triangle indices (3 per face).
        indices: Vec<u32>,
        /// Center of the bounding sphere in the geom frame.
        center: Vector3<f64>,
        /// Radius of the bounding sphere.
        radius: f64,
    },
}

impl Shape {
    /// Build a mesh shape, computing the bounding sphere. Out-of-range
    /// indices clamp to vertex 0, tolerating slightly damaged content.
    #[must_use]
    pub fn mesh(vertices: Vec<Point3<f64>>, mut indices: Vec<u32>) -> Self {
        let n = vertices.len() as u32;
        for index in &mut indices {
            if *index >= n {
                tracing::warn!("vertex index {} out of range, clamped to 0", *index);
                *index = 0;
            }
        }
        let center = if vertices.is_empty() {
            Vector3::zeros()
        } else {
            vertices.iter().map(|v| v.coords).sum::<Vector3<f64>>() / vertices.len() as f64
        };
        let radius = vertices
            .iter()
            .map(|v| (v.coords - center).norm())
            .fold(0.0, f64::max);
        Self::Mesh {
            vertices,
            indices,
            center,
            radius,
        }
    }

    /// Radius of the smallest enclosing sphere, centered at the geom origin
    /// (mesh shapes may be off-center; their stored center accounts for it).
    #[must_use]
    pub fn outer_radius(&self) -> f64 {
        match self {
            Self::Sphere { radius } => *radius,
            Self::Box { half } => half.norm(),
            Self::Capsule {
                radius,
                half_length,
            } => half_length + radius,
            Self::Mesh { center, radius, .. } => center.norm() + radius,
        }
    }

    /// Radius of the largest sphere contained in the shape.
    #[must_use]
    pub fn inner_radius(&self) -> f64 {
        match self {
            Self::Sphere { radius } => *radius,
            Self::Box { half } => half.x.min(half.y).min(half.z),
            Self::Capsule { radius, .. } => *radius,
            Self::Mesh { .. } => 0.0,
        }
    }
}

/// A collision geom in the world arena.
#[derive(Debug, Clone)]
pub struct Geom {
    /// Handle of this geom.
    pub handle: GeomHandle,
    /// Owning body; `None` for static geoms.
    pub body: Option<BodyHandle>,
    /// Offset from the body frame (COM), or the world pose for static geoms.
    pub offset: Pose,
    /// The collision shape.
    pub shape: Shape,
    /// Contact material name, if any.
    pub material: Option<String>,
    /// Immaterial geoms take part in overlap detection and callbacks but
    /// never generate a physical contact response.
    pub immaterial: bool,
    /// Back-pointer to the scene element this geom came from.
    pub user_data: Option<ElementId>,
}

impl Geom {
    /// World pose of the geom given its owning body's pose.
    #[must_use]
    pub fn world_pose(&self, body_pose: Option<&Pose>) -> Pose {
        match body_pose {
            Some(pose) => pose.compose(&self.offset),
            None => self.offset,
        }
    }
}

/// World-space axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Bounding box of a shape at a world pose (conservative: built from
    /// the outer bounding sphere, which is exact for spheres).
    #[must_use]
    pub fn of_shape(shape: &Shape, pose: &Pose) -> Self {
        let (center, radius) = match shape {
            Shape::Mesh { center, radius, .. } => {
                (pose.transform_point(&Point3::from(*center)), *radius)
            }
            other => (pose.position, other.outer_radius()),
        };
        let r = Vector3::new(radius, radius, radius);
        Self {
            min: center - r,
            max: center + r,
        }
    }

    /// Whether two boxes overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mesh_bounding_sphere() {
        let shape = Shape::mesh(
            vec![
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(-1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, -1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 1, 3],
        );
        let Shape::Mesh { center, radius, .. } = &shape else {
            panic!("expected mesh");
        };
        assert_relative_eq!(center.norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(*radius, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mesh_clamps_out_of_range_indices() {
        let shape = Shape::mesh(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            vec![0, 1, 7],
        );
        let Shape::Mesh { indices, .. } = &shape else {
            panic!("expected mesh");
        };
        assert_eq!(indices, &vec![0, 1, 0]);
    }

    #[test]
    fn test_aabb_overlap() {
        let sphere = Shape::Sphere { radius: 0.5 };
        let a = Aabb::of_shape(&sphere, &Pose::identity());
        let b = Aabb::of_shape(
            &sphere,
            &Pose::from_position(Point3::new(0.9, 0.0, 0.0)),
        );
        let c = Aabb::of_shape(
            &sphere,
            &Pose::from_position(Point3::new(2.0, 0.0, 0.0)),
        );
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_outer_inner_radius() {
        let capsule = Shape::Capsule {
            radius: 0.1,
            half_length: 0.2,
        };
        assert_relative_eq!(capsule.outer_radius(), 0.3, epsilon = 1e-12);
        assert_relative_eq!(capsule.inner_radius(), 0.1, epsilon = 1e-12);
    }
}
