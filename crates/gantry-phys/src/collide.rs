//! Narrow-phase collision: shape pair tests producing contact points.
//!
//! Shapes reduce to three canonical primitives (sphere, box, capsule); mesh
//! geoms collide through their bounding sphere. Contact normals point from
//! the first shape towards the second.

use gantry_types::Pose;
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

use crate::geom::Shape;

/// One narrow-phase contact point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// Contact position in world space.
    pub position: Point3<f64>,
    /// Contact normal in world space, pointing from the first geom to the
    /// second.
    pub normal: Vector3<f64>,
    /// Penetration depth (positive when overlapping).
    pub depth: f64,
}

/// Contact point buffer; most pairs produce at most four points.
pub type Contacts = SmallVec<[ContactPoint; 4]>;

/// Canonical primitive for pair dispatch.
enum Canonical {
    Sphere { center: Point3<f64>, radius: f64 },
    Box { pose: Pose, half: Vector3<f64> },
    Capsule { a: Point3<f64>, b: Point3<f64>, radius: f64 },
}

fn canonicalize(shape: &Shape, pose: &Pose) -> Canonical {
    match shape {
        Shape::Sphere { radius } => Canonical::Sphere {
            center: pose.position,
            radius: *radius,
        },
        Shape::Box { half } => Canonical::Box {
            pose: *pose,
            half: *half,
        },
        Shape::Capsule {
            radius,
            half_length,
        } => {
            let axis = pose.transform_vector(&Vector3::z());
            Canonical::Capsule {
                a: pose.position - axis * *half_length,
                b: pose.position + axis * *half_length,
                radius: *radius,
            }
        }
        Shape::Mesh { center, radius, .. } => Canonical::Sphere {
            center: pose.transform_point(&Point3::from(*center)),
            radius: *radius,
        },
    }
}

/// Collide two shapes at their world poses.
#[must_use]
pub fn collide(shape_a: &Shape, pose_a: &Pose, shape_b: &Shape, pose_b: &Pose) -> Contacts {
    let a = canonicalize(shape_a, pose_a);
    let b = canonicalize(shape_b, pose_b);
    collide_canonical(&a, &b)
}

fn collide_canonical(a: &Canonical, b: &Canonical) -> Contacts {
    use Canonical::{Box, Capsule, Sphere};
    match (a, b) {
        (
            Sphere {
                center: ca,
                radius: ra,
            },
            Sphere {
                center: cb,
                radius: rb,
            },
        ) => sphere_sphere(*ca, *ra, *cb, *rb),
        (Sphere { center, radius }, Box { pose, half }) => sphere_box(*center, *radius, pose, *half),
        (Box { pose, half }, Sphere { center, radius }) => {
            flip(sphere_box(*center, *radius, pose, *half))
        }
        (
            Capsule { a: p, b: q, radius },
            Sphere {
                center,
                radius: rb,
            },
        ) => {
            let closest = closest_on_segment(*p, *q, *center);
            sphere_sphere(closest, *radius, *center, *rb)
        }
        (
            Sphere {
                center,
                radius: ra,
            },
            Capsule { a: p, b: q, radius },
        ) => {
            let closest = closest_on_segment(*p, *q, *center);
            sphere_sphere(*center, *ra, closest, *radius)
        }
        (
            Capsule {
                a: p1,
                b: q1,
                radius: r1,
            },
            Capsule {
                a: p2,
                b: q2,
                radius: r2,
            },
        ) => {
            let (c1, c2) = closest_segment_segment(*p1, *q1, *p2, *q2);
            sphere_sphere(c1, *r1, c2, *r2)
        }
        (Capsule { a: p, b: q, radius }, Box { pose, half }) => {
            capsule_box(*p, *q, *radius, pose, *half)
        }
        (Box { pose, half }, Capsule { a: p, b: q, radius }) => {
            flip(capsule_box(*p, *q, *radius, pose, *half))
        }
        (
            Box {
                pose: pa,
                half: ha,
            },
            Box {
                pose: pb,
                half: hb,
            },
        ) => box_box(pa, *ha, pb, *hb),
    }
}

fn flip(mut contacts: Contacts) -> Contacts {
    for c in &mut contacts {
        c.normal = -c.normal;
    }
    contacts
}

fn sphere_sphere(ca: Point3<f64>, ra: f64, cb: Point3<f64>, rb: f64) -> Contacts {
    let mut contacts = Contacts::new();
    let delta = cb - ca;
    let distance = delta.norm();
    let depth = ra + rb - distance;
    if depth > 0.0 {
        let normal = if distance > 1e-12 {
            delta / distance
        } else {
            Vector3::z()
        };
        contacts.push(ContactPoint {
            position: ca + normal * (ra - 0.5 * depth),
            normal,
            depth,
        });
    }
    contacts
}

fn sphere_box(center: Point3<f64>, radius: f64, pose: &Pose, half: Vector3<f64>) -> Contacts {
    let mut contacts = Contacts::new();
    let local = pose.inverse_transform_point(&center);
    let clamped = Point3::new(
        local.x.clamp(-half.x, half.x),
        local.y.clamp(-half.y, half.y),
        local.z.clamp(-half.z, half.z),
    );
    let delta = local - clamped;
    let distance = delta.norm();

    if distance > 1e-12 {
        // Sphere center outside the box.
        let depth = radius - distance;
        if depth > 0.0 {
            let normal_local = -delta / distance;
            contacts.push(ContactPoint {
                position: pose.transform_point(&clamped),
                normal: pose.transform_vector(&normal_local),
                depth,
            });
        }
    } else {
        // Center inside: push out along the face with least penetration.
        let face_depths = [
            half.x - local.x.abs(),
            half.y - local.y.abs(),
            half.z - local.z.abs(),
        ];
        let (axis, &face_depth) = face_depths
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .unwrap_or((2, &face_depths[2]));
        let mut normal_local = Vector3::zeros();
        normal_local[axis] = if local[axis] >= 0.0 { -1.0 } else { 1.0 };
        contacts.push(ContactPoint {
            position: pose.transform_point(&local),
            normal: pose.transform_vector(&normal_local),
            depth: face_depth + radius,
        });
    }
    contacts
}

fn capsule_box(
    p: Point3<f64>,
    q: Point3<f64>,
    radius: f64,
    pose: &Pose,
    half: Vector3<f64>,
) -> Contacts {
    // Sample the segment against the box at the endpoints and at the point
    // closest to the box center, keeping every penetrating candidate.
    let closest = closest_on_segment(p, q, pose.position);
    let mut contacts = Contacts::new();
    for candidate in [p, closest, q] {
        for contact in sphere_box(candidate, radius, pose, half) {
            if !contacts
                .iter()
                .any(|c: &ContactPoint| (c.position - contact.position).norm() < 1e-9)
            {
                contacts.push(contact);
            }
        }
    }
    contacts
}

fn box_box(pose_a: &Pose, half_a: Vector3<f64>, pose_b: &Pose, half_b: Vector3<f64>) -> Contacts {
    let mut contacts = Contacts::new();
    // Corners of A tested against B, then the reverse with flipped normals.
    corner_contacts(pose_a, half_a, pose_b, half_b, false, &mut contacts);
    corner_contacts(pose_b, half_b, pose_a, half_a, true, &mut contacts);
    contacts
}

/// Contacts from the corners of box 1 penetrating box 2.
fn corner_contacts(
    pose_1: &Pose,
    half_1: Vector3<f64>,
    pose_2: &Pose,
    half_2: Vector3<f64>,
    flipped: bool,
    contacts: &mut Contacts,
) {
    for sx in [-1.0, 1.0] {
        for sy in [-1.0, 1.0] {
            for sz in [-1.0, 1.0] {
                let corner = pose_1.transform_point(&Point3::new(
                    sx * half_1.x,
                    sy * half_1.y,
                    sz * half_1.z,
                ));
                let local = pose_2.inverse_transform_point(&corner);
                if local.x.abs() > half_2.x
                    || local.y.abs() > half_2.y
                    || local.z.abs() > half_2.z
                {
                    continue;
                }
                let face_depths = [
                    half_2.x - local.x.abs(),
                    half_2.y - local.y.abs(),
                    half_2.z - local.z.abs(),
                ];
                let (axis, &depth) = face_depths
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| a.total_cmp(b))
                    .unwrap_or((2, &face_depths[2]));
                let mut normal_local = Vector3::zeros();
                // Corner-in-2 pushes 1 out along the nearest face of 2; the
                // reported normal always points from the first collide()
                // argument to the second.
                normal_local[axis] = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
                let mut normal = pose_2.transform_vector(&normal_local);
                if !flipped {
                    normal = -normal;
                }
                contacts.push(ContactPoint {
                    position: corner,
                    normal,
                    depth,
                });
            }
        }
    }
}

/// Closest point on the segment `ab` to `p`.
fn closest_on_segment(a: Point3<f64>, b: Point3<f64>, p: Point3<f64>) -> Point3<f64> {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < 1e-18 {
        return a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest points between two segments.
fn closest_segment_segment(
    p1: Point3<f64>,
    q1: Point3<f64>,
    p2: Point3<f64>,
    q2: Point3<f64>,
) -> (Point3<f64>, Point3<f64>) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let (s, t);
    if a < 1e-18 && e < 1e-18 {
        return (p1, p2);
    }
    if a < 1e-18 {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(&r);
        if e < 1e-18 {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let s_raw = if denom > 1e-18 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t_raw = (b * s_raw + f) / e;
            if t_raw < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t_raw > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            } else {
                t = t_raw;
                s = s_raw;
            }
        }
    }
    (p1 + d1 * s, p2 + d2 * t)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_sphere_overlap() {
        let a = Shape::Sphere { radius: 0.5 };
        let contacts = collide(
            &a,
            &Pose::identity(),
            &a,
            &Pose::from_position(Point3::new(0.8, 0.0, 0.0)),
        );
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].depth, 0.2, epsilon = 1e-12);
        assert_relative_eq!(contacts[0].normal.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_sphere_separated() {
        let a = Shape::Sphere { radius: 0.5 };
        let contacts = collide(
            &a,
            &Pose::identity(),
            &a,
            &Pose::from_position(Point3::new(1.5, 0.0, 0.0)),
        );
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_sphere_resting_on_box() {
        // Box top at z=0, sphere center at z=0.4 with radius 0.5.
        let floor = Shape::Box {
            half: Vector3::new(5.0, 5.0, 0.5),
        };
        let sphere = Shape::Sphere { radius: 0.5 };
        let contacts = collide(
            &sphere,
            &Pose::from_position(Point3::new(0.0, 0.0, 0.4)),
            &floor,
            &Pose::from_position(Point3::new(0.0, 0.0, -0.5)),
        );
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].depth, 0.1, epsilon = 1e-12);
        // Normal points from the sphere into the floor (downward).
        assert_relative_eq!(contacts[0].normal.z, -1.0, epsilon = 1e-12);
        assert_relative_eq!(contacts[0].position.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_capsule_sphere() {
        let capsule = Shape::Capsule {
            radius: 0.1,
            half_length: 0.5,
        };
        let sphere = Shape::Sphere { radius: 0.2 };
        // Sphere next to the capsule's side midsection.
        let contacts = collide(
            &capsule,
            &Pose::identity(),
            &sphere,
            &Pose::from_position(Point3::new(0.25, 0.0, 0.2)),
        );
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].depth, 0.05, epsilon = 1e-12);
        assert_relative_eq!(contacts[0].normal.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_box_corner_in_box() {
        let big = Shape::Box {
            half: Vector3::new(1.0, 1.0, 1.0),
        };
        let small = Shape::Box {
            half: Vector3::new(0.2, 0.2, 0.2),
        };
        // Small box overlapping the top face of the big box.
        let contacts = collide(
            &small,
            &Pose::from_position(Point3::new(0.0, 0.0, 1.1)),
            &big,
            &Pose::identity(),
        );
        assert!(!contacts.is_empty());
        for c in &contacts {
            // Normal from the small box towards the big one: downward.
            assert!(c.normal.z < 0.0, "normal {:?}", c.normal);
            assert!(c.depth > 0.0);
        }
    }

    #[test]
    fn test_mesh_collides_as_bounding_sphere() {
        let mesh = Shape::mesh(
            vec![
                Point3::new(0.5, 0.0, 0.0),
                Point3::new(-0.5, 0.0, 0.0),
                Point3::new(0.0, 0.5, 0.0),
            ],
            vec![0, 1, 2],
        );
        let sphere = Shape::Sphere { radius: 0.2 };
        let contacts = collide(
            &mesh,
            &Pose::identity(),
            &sphere,
            &Pose::from_position(Point3::new(0.6, 0.1, 0.0)),
        );
        assert!(!contacts.is_empty());
    }

    #[test]
    fn test_segment_segment_closest() {
        let (c1, c2) = closest_segment_segment(
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.3, 1.0, -1.0),
            Point3::new(0.3, 1.0, 1.0),
        );
        assert_relative_eq!(c1.x, 0.3, epsilon = 1e-12);
        assert_relative_eq!(c2.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c2.z, 0.0, epsilon = 1e-12);
    }
}
