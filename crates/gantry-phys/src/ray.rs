//! Ray casts against collision shapes.
//!
//! Used by distance sensors: spheres and boxes are exact, capsules test the
//! inner cylinder plus both caps, meshes test every triangle
//! (Möller-Trumbore). Rays report the entry distance; a ray starting inside
//! a shape reports distance zero.

use gantry_types::Pose;
use nalgebra::{Point3, Vector3};

use crate::geom::Shape;

/// Distance along a normalized ray to a shape at a world pose, if hit.
#[must_use]
pub fn ray_shape(
    shape: &Shape,
    pose: &Pose,
    origin: Point3<f64>,
    direction: Vector3<f64>,
) -> Option<f64> {
    // Work in the shape's local frame.
    let local_origin = pose.inverse_transform_point(&origin);
    let local_direction = pose.inverse_transform_vector(&direction);
    match shape {
        Shape::Sphere { radius } => ray_sphere(local_origin, local_direction, Point3::origin(), *radius),
        Shape::Box { half } => ray_box(local_origin, local_direction, *half),
        Shape::Capsule {
            radius,
            half_length,
        } => ray_capsule(local_origin, local_direction, *radius, *half_length),
        Shape::Mesh {
            vertices, indices, ..
        } => ray_mesh(local_origin, local_direction, vertices, indices),
    }
}

fn ray_sphere(
    origin: Point3<f64>,
    direction: Vector3<f64>,
    center: Point3<f64>,
    radius: f64,
) -> Option<f64> {
    let oc = origin - center;
    let b = oc.dot(&direction);
    let c = oc.norm_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let t = -b - discriminant.sqrt();
    (t >= 0.0).then_some(t)
}

fn ray_box(origin: Point3<f64>, direction: Vector3<f64>, half: Vector3<f64>) -> Option<f64> {
    let mut t_min = f64::NEG_INFINITY;
    let mut t_max = f64::INFINITY;
    for axis in 0..3 {
        if direction[axis].abs() < 1e-12 {
            if origin[axis].abs() > half[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / direction[axis];
        let mut t0 = (-half[axis] - origin[axis]) * inv;
        let mut t1 = (half[axis] - origin[axis]) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }
    if t_max < 0.0 {
        return None;
    }
    Some(t_min.max(0.0))
}

fn ray_capsule(
    origin: Point3<f64>,
    direction: Vector3<f64>,
    radius: f64,
    half_length: f64,
) -> Option<f64> {
    let mut best: Option<f64> = None;
    let mut consider = |t: Option<f64>| {
        if let Some(t) = t {
            if best.is_none_or(|b| t < b) {
                best = Some(t);
            }
        }
    };

    // Infinite cylinder around Z, clipped to the segment span.
    let ox = Vector3::new(origin.x, origin.y, 0.0);
    let dx = Vector3::new(direction.x, direction.y, 0.0);
    let a = dx.norm_squared();
    if a > 1e-12 {
        let b = ox.dot(&dx);
        let c = ox.norm_squared() - radius * radius;
        let discriminant = b * b - a * c;
        if discriminant >= 0.0 {
            let t = (-b - discriminant.sqrt()) / a;
            if t >= 0.0 {
                let z = origin.z + t * direction.z;
                if z.abs() <= half_length {
                    consider(Some(t));
                }
            } else if c <= 0.0 && origin.z.abs() <= half_length {
                consider(Some(0.0));
            }
        }
    }

    // End caps.
    for cap_z in [-half_length, half_length] {
        consider(ray_sphere(
            origin,
            direction,
            Point3::new(0.0, 0.0, cap_z),
            radius,
        ));
    }
    best
}

fn ray_mesh(
    origin: Point3<f64>,
    direction: Vector3<f64>,
    vertices: &[Point3<f64>],
    indices: &[u32],
) -> Option<f64> {
    let mut best: Option<f64> = None;
    for triangle in indices.chunks_exact(3) {
        let a = vertices.get(triangle[0] as usize)?;
        let b = vertices.get(triangle[1] as usize)?;
        let c = vertices.get(triangle[2] as usize)?;
        if let Some(t) = ray_triangle(origin, direction, a, b, c) {
            if best.is_none_or(|best_t| t < best_t) {
                best = Some(t);
            }
        }
    }
    best
}

/// Möller-Trumbore ray/triangle intersection.
fn ray_triangle(
    origin: Point3<f64>,
    direction: Vector3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<f64> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = direction.cross(&edge2);
    let det = edge1.dot(&p);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&edge1);
    let v = direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(&q) * inv_det;
    (t >= 0.0).then_some(t)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_sphere() {
        let shape = Shape::Sphere { radius: 0.5 };
        let pose = Pose::from_position(Point3::new(3.0, 0.0, 0.0));
        let t = ray_shape(&shape, &pose, Point3::origin(), Vector3::x()).unwrap();
        assert_relative_eq!(t, 2.5, epsilon = 1e-12);

        assert!(ray_shape(&shape, &pose, Point3::origin(), Vector3::y()).is_none());
    }

    #[test]
    fn test_ray_box_rotated() {
        use nalgebra::UnitQuaternion;
        let shape = Shape::Box {
            half: Vector3::new(0.5, 0.5, 0.5),
        };
        // 45 degrees around Z: the corner faces the ray.
        let pose = Pose::new(
            Point3::new(2.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_4),
        );
        let t = ray_shape(&shape, &pose, Point3::origin(), Vector3::x()).unwrap();
        let expected = 2.0 - 0.5 * 2.0_f64.sqrt();
        assert_relative_eq!(t, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_ray_capsule_side_and_cap() {
        let shape = Shape::Capsule {
            radius: 0.2,
            half_length: 0.5,
        };
        // Side hit.
        let t = ray_shape(
            &shape,
            &Pose::from_position(Point3::new(1.0, 0.0, 0.0)),
            Point3::origin(),
            Vector3::x(),
        )
        .unwrap();
        assert_relative_eq!(t, 0.8, epsilon = 1e-12);

        // Cap hit from above.
        let t = ray_shape(
            &shape,
            &Pose::identity(),
            Point3::new(0.0, 0.0, 2.0),
            -Vector3::z(),
        )
        .unwrap();
        assert_relative_eq!(t, 1.3, epsilon = 1e-12);
    }

    #[test]
    fn test_ray_mesh_triangle() {
        let shape = Shape::mesh(
            vec![
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
        );
        let t = ray_shape(
            &shape,
            &Pose::identity(),
            Point3::new(0.0, 0.0, 2.0),
            -Vector3::z(),
        )
        .unwrap();
        assert_relative_eq!(t, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ray_inside_reports_zero() {
        let shape = Shape::Sphere { radius: 1.0 };
        let t = ray_shape(&shape, &Pose::identity(), Point3::origin(), Vector3::x()).unwrap();
        assert_relative_eq!(t, 0.0, epsilon = 1e-12);
    }
}
