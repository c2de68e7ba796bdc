//! Sensor ports.
//!
//! Sensors read from body state and from ray casts against the collision
//! world. The approximate distance sensor culls candidate geoms with
//! bounding-sphere and cone early-exits before paying for a precise ray
//! cast; controllers tuned against it rely on the exact threshold
//! arithmetic at grazing angles, so keep it stable.

use std::cell::Cell;
use std::rc::Rc;

use gantry_phys::{Shape, World};
use gantry_types::{BodyHandle, Pose, Vector3};
use nalgebra::Point3;

use crate::render::CameraView;

/// A value read from a sensor port.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    /// A scalar reading (distances, joint positions).
    Scalar(f64),
    /// A vector reading (angular velocity, acceleration).
    Vector(Vector3<f64>),
    /// A row or grid of distances.
    Distances(Vec<f64>),
    /// A count of events this step (collision sensor).
    Count(u32),
}

/// Per-kind sensor state.
#[derive(Debug, Clone)]
pub enum SensorKind {
    /// Angular velocity in the sensor frame.
    Gyroscope,
    /// Linear acceleration in the sensor frame, from per-step velocity
    /// differencing.
    Accelerometer {
        /// Body velocity at the previous step.
        last_velocity: Vector3<f64>,
        /// Acceleration computed at the last step.
        acceleration: Vector3<f64>,
    },
    /// Contact counter fed by collision observers on the parent's geoms.
    Collision {
        /// Contacts seen this step; shared with the registered observers.
        hits: Rc<Cell<u32>>,
    },
    /// One precise ray along the sensor's +X axis.
    SingleDistance {
        /// Minimum measured distance.
        min: f64,
        /// Maximum measured distance.
        max: f64,
    },
    /// Cone sensor with bounding-sphere and cone culling.
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
    /// Color camera; the image itself renders through the offscreen
    /// boundary, the port provides the view.
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
    /// Depth image from a ray grid.
    DepthImage {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Horizontal opening angle (rad).
        angle_x: f64,
        /// Vertical opening angle (rad).
        angle_y: f64,
        /// Spherical projection (single-row) instead of perspective.
        spherical: bool,
    },
}

/// A sensor port attached to a body (or to static space).
#[derive(Debug, Clone)]
pub struct SensorPort {
    /// Port name, for controller lookups.
    pub name: Option<String>,
    /// Parent body; `None` for sensors on static compounds.
    pub body: Option<BodyHandle>,
    /// Offset from the body frame (COM), or the world pose when static.
    pub offset: Pose,
    /// Per-kind state.
    pub kind: SensorKind,
}

impl SensorPort {
    /// Create a sensor port.
    #[must_use]
    pub fn new(
        name: Option<String>,
        body: Option<BodyHandle>,
        offset: Pose,
        kind: SensorKind,
    ) -> Self {
        Self {
            name,
            body,
            offset,
            kind,
        }
    }

    /// World pose of the sensor.
    #[must_use]
    pub fn world_pose(&self, world: &World) -> Pose {
        match self.body {
            Some(body) => world.body(body).pose.compose(&self.offset),
            None => self.offset,
        }
    }

    /// Reset per-step counters. The driver calls this before collision
    /// detection so observer hits recount from zero.
    pub fn begin_step(&mut self) {
        if let SensorKind::Collision { hits } = &self.kind {
            hits.set(0);
        }
    }

    /// Update state that needs per-step history (accelerometer).
    pub fn update(&mut self, world: &World, dt: f64) {
        if let SensorKind::Accelerometer {
            last_velocity,
            acceleration,
        } = &mut self.kind
        {
            let velocity = self
                .body
                .map_or_else(Vector3::zeros, |b| world.body(b).twist.linear);
            *acceleration = (velocity - *last_velocity) / dt;
            *last_velocity = velocity;
        }
    }

    /// Read the sensor.
    #[must_use]
    pub fn read(&self, world: &World) -> SensorValue {
        let pose = self.world_pose(world);
        let root = self.body.map(|b| world.body(b).root);
        match &self.kind {
            SensorKind::Gyroscope => {
                let angular = self
                    .body
                    .map_or_else(Vector3::zeros, |b| world.body(b).twist.angular);
                SensorValue::Vector(pose.inverse_transform_vector(&angular))
            }
            SensorKind::Accelerometer { acceleration, .. } => {
                SensorValue::Vector(pose.inverse_transform_vector(acceleration))
            }
            SensorKind::Collision { hits } => SensorValue::Count(hits.get()),
            SensorKind::SingleDistance { min, max } => {
                let forward = pose.transform_vector(&Vector3::x());
                let distance = world
                    .ray_cast(pose.position, forward, *max, root)
                    .map_or(*max, |(_, d)| d);
                SensorValue::Scalar(distance.clamp(*min, *max))
            }
            SensorKind::ApproxDistance {
                min,
                max,
                angle_x,
                angle_y,
            } => SensorValue::Scalar(approx_distance(
                world, &pose, *min, *max, *angle_x, *angle_y, root,
            )),
            SensorKind::Camera { .. } => SensorValue::Distances(Vec::new()),
            SensorKind::DepthImage {
                width,
                height,
                angle_x,
                angle_y,
                spherical,
            } => SensorValue::Distances(depth_image(
                world, &pose, *width, *height, *angle_x, *angle_y, *spherical, root,
            )),
        }
    }

    /// Camera view for offscreen rendering, when this is a camera sensor.
    #[must_use]
    pub fn camera_view(&self, world: &World) -> Option<(CameraView, u32, u32)> {
        match self.kind {
            SensorKind::Camera {
                width,
                height,
                angle_x,
                angle_y,
            } => Some((
                CameraView {
                    pose: self.world_pose(world),
                    angle_x,
                    angle_y,
                },
                width,
                height,
            )),
            _ => None,
        }
    }
}

/// Approximate distance measurement with early-exit culling.
///
/// Per candidate geom, in order:
/// 1. bounding-sphere reject: `distance - outer_radius > best` skips the
///    geom without any angle math;
/// 2. cone reject: a geom whose bounding sphere lies entirely outside the
///    opening half-angle (widened by the sphere's angular spread
///    `asin(outer/distance)`) is skipped;
/// 3. survivors get one precise ray cast towards their bounding-sphere
///    center.
///
/// The central axis ray is always cast as well, so a wall dead ahead is
/// measured even when its bounding sphere covers the sensor.
fn approx_distance(
    world: &World,
    pose: &Pose,
    min: f64,
    max: f64,
    angle_x: f64,
    angle_y: f64,
    skip_root: Option<BodyHandle>,
) -> f64 {
    let origin = pose.position;
    let forward = pose.transform_vector(&Vector3::x());
    let half_angle = 0.5 * angle_x.max(angle_y);
    let mut best = max;

    for geom in world.geoms() {
        if let (Some(skip), Some(body)) = (skip_root, geom.body) {
            if world.body(body).root == skip {
                continue;
            }
        }
        let geom_pose = world.geom_pose(geom.handle);
        let (center, outer) = bounding_sphere(&geom.shape, &geom_pose);
        let to_center = center - origin;
        let distance = to_center.norm();

        if distance - outer > best {
            continue;
        }
        if distance > outer {
            let direction = to_center / distance;
            let spread = (outer / distance).min(1.0).asin();
            if direction.dot(&forward).clamp(-1.0, 1.0).acos() - spread > half_angle {
                continue;
            }
            if let Some((_, d)) = world.ray_cast(origin, direction, best, skip_root) {
                best = best.min(d);
            }
        }
    }

    if let Some((_, d)) = world.ray_cast(origin, forward, best, skip_root) {
        best = best.min(d);
    }
    best.clamp(min, max)
}

fn bounding_sphere(shape: &Shape, pose: &Pose) -> (Point3<f64>, f64) {
    match shape {
        Shape::Mesh { center, radius, .. } => {
            (pose.transform_point(&Point3::from(*center)), *radius)
        }
        other => (pose.position, other.outer_radius()),
    }
}

/// Depth image as a row-major distance grid.
#[allow(clippy::too_many_arguments)]
fn depth_image(
    world: &World,
    pose: &Pose,
    width: u32,
    height: u32,
    angle_x: f64,
    angle_y: f64,
    spherical: bool,
    skip_root: Option<BodyHandle>,
) -> Vec<f64> {
    let mut distances = Vec::with_capacity((width * height) as usize);
    let max = f64::MAX;
    for row in 0..height.max(1) {
        let pitch = if height > 1 {
            ((f64::from(row) + 0.5) / f64::from(height) - 0.5) * angle_y
        } else {
            0.0
        };
        for col in 0..width {
            let yaw = ((f64::from(col) + 0.5) / f64::from(width) - 0.5) * angle_x;
            let direction = if spherical {
                // Even angular spacing across the scan line.
                Vector3::new(yaw.cos(), -yaw.sin(), 0.0)
            } else {
                Vector3::new(1.0, -yaw.tan(), -pitch.tan()).normalize()
            };
            let world_dir = pose.transform_vector(&direction);
            let distance = world
                .ray_cast(pose.position, world_dir, max, skip_root)
                .map_or(f64::INFINITY, |(_, d)| d);
            distances.push(distance);
        }
    }
    distances
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gantry_types::{ContactConfig, MassProperties};

    fn world_with_wall() -> World {
        let mut world = World::new(Vector3::zeros(), ContactConfig::default());
        world.add_geom(
            None,
            Pose::from_position(Point3::new(3.0, 0.0, 0.0)),
            Shape::Box {
                half: Vector3::new(0.1, 2.0, 2.0),
            },
            None,
            false,
            None,
        );
        world
    }

    #[test]
    fn test_single_distance_hits_wall() {
        let world = world_with_wall();
        let port = SensorPort::new(
            None,
            None,
            Pose::identity(),
            SensorKind::SingleDistance { min: 0.0, max: 10.0 },
        );
        let SensorValue::Scalar(d) = port.read(&world) else {
            panic!("expected scalar");
        };
        assert_relative_eq!(d, 2.9, epsilon = 1e-9);
    }

    #[test]
    fn test_single_distance_no_hit_reports_max() {
        let world = World::new(Vector3::zeros(), ContactConfig::default());
        let port = SensorPort::new(
            None,
            None,
            Pose::identity(),
            SensorKind::SingleDistance { min: 0.0, max: 5.0 },
        );
        assert_eq!(port.read(&world), SensorValue::Scalar(5.0));
    }

    #[test]
    fn test_approx_distance_culls_outside_cone() {
        let mut world = world_with_wall();
        // A sphere far off to the side, outside the cone.
        world.add_geom(
            None,
            Pose::from_position(Point3::new(0.0, 5.0, 0.0)),
            Shape::Sphere { radius: 0.2 },
            None,
            false,
            None,
        );
        let port = SensorPort::new(
            None,
            None,
            Pose::identity(),
            SensorKind::ApproxDistance {
                min: 0.0,
                max: 10.0,
                angle_x: 0.5,
                angle_y: 0.5,
            },
        );
        let SensorValue::Scalar(d) = port.read(&world) else {
            panic!("expected scalar");
        };
        assert_relative_eq!(d, 2.9, epsilon = 1e-9);
    }

    #[test]
    fn test_approx_distance_sees_off_axis_sphere() {
        let mut world = World::new(Vector3::zeros(), ContactConfig::default());
        // Slightly off the axis but inside the cone.
        world.add_geom(
            None,
            Pose::from_position(Point3::new(2.0, 0.3, 0.0)),
            Shape::Sphere { radius: 0.2 },
            None,
            false,
            None,
        );
        let port = SensorPort::new(
            None,
            None,
            Pose::identity(),
            SensorKind::ApproxDistance {
                min: 0.0,
                max: 10.0,
                angle_x: 0.6,
                angle_y: 0.6,
            },
        );
        let SensorValue::Scalar(d) = port.read(&world) else {
            panic!("expected scalar");
        };
        assert!(d < 2.2, "sphere should be detected, got {d}");
    }

    #[test]
    fn test_gyroscope_reads_local_frame() {
        let mut world = World::new(Vector3::zeros(), ContactConfig::default());
        let body = world.add_body(Pose::identity(), MassProperties::sphere(1.0, 0.1), None);
        world.body_mut(body).twist.angular = Vector3::new(0.0, 0.0, 2.0);

        let port = SensorPort::new(None, Some(body), Pose::identity(), SensorKind::Gyroscope);
        let SensorValue::Vector(v) = port.read(&world) else {
            panic!("expected vector");
        };
        assert_relative_eq!(v.z, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_accelerometer_differences_velocity() {
        let mut world = World::new(Vector3::zeros(), ContactConfig::default());
        let body = world.add_body(Pose::identity(), MassProperties::sphere(1.0, 0.1), None);

        let mut port = SensorPort::new(
            None,
            Some(body),
            Pose::identity(),
            SensorKind::Accelerometer {
                last_velocity: Vector3::zeros(),
                acceleration: Vector3::zeros(),
            },
        );

        world.body_mut(body).twist.linear = Vector3::new(0.5, 0.0, 0.0);
        port.update(&world, 0.01);
        let SensorValue::Vector(a) = port.read(&world) else {
            panic!("expected vector");
        };
        assert_relative_eq!(a.x, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_depth_image_row() {
        let world = world_with_wall();
        let port = SensorPort::new(
            None,
            None,
            Pose::identity(),
            SensorKind::DepthImage {
                width: 3,
                height: 1,
                angle_x: 0.2,
                angle_y: 0.2,
                spherical: true,
            },
        );
        let SensorValue::Distances(row) = port.read(&world) else {
            panic!("expected distances");
        };
        assert_eq!(row.len(), 3);
        // The central ray hits the wall straight on.
        assert_relative_eq!(row[1], 2.9, epsilon = 1e-6);
    }
}
