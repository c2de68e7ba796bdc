//! Rigid bodies.
//!
//! The body arena stores every movable object. A body's local frame sits at
//! its center of mass (the compiler shifts geometry offsets accordingly), so
//! the mass matrix reduces to a scalar mass plus an inertia tensor about the
//! origin. A body whose aggregate mass is zero is physically inert: it
//! ignores forces and never moves, a latent configuration error rather than
//! a rejection.

use gantry_types::{BodyHandle, MassProperties, Pose, Twist};
use nalgebra::{Matrix3, Point3, Vector3};

/// A movable rigid body.
#[derive(Debug, Clone)]
pub struct RigidBody {
    /// Handle of this body in the world arena.
    pub handle: BodyHandle,
    /// Optional name for lookups and diagnostics.
    pub name: Option<String>,
    /// World pose of the body frame (origin at the center of mass).
    pub pose: Pose,
    /// World-frame velocities.
    pub twist: Twist,
    /// Aggregate mass properties (COM offset already folded into the pose).
    pub mass: MassProperties,
    /// First movable ancestor in the kinematic chain (possibly self).
    /// Geoms of bodies sharing a root never collide with each other.
    pub root: BodyHandle,
    /// Accumulated force for this step, world frame, applied at the COM.
    pub force: Vector3<f64>,
    /// Accumulated torque for this step, world frame.
    pub torque: Vector3<f64>,
    inv_mass: f64,
    inv_inertia_local: Matrix3<f64>,
}

impl RigidBody {
    /// Create a body at the given pose with aggregate mass properties.
    #[must_use]
    pub fn new(handle: BodyHandle, pose: Pose, mass: MassProperties) -> Self {
        let inv_mass = mass.inverse_mass();
        let inv_inertia_local = if inv_mass == 0.0 {
            Matrix3::zeros()
        } else {
            mass.inverse_inertia().unwrap_or_else(Matrix3::zeros)
        };
        Self {
            handle,
            name: None,
            pose,
            twist: Twist::zero(),
            mass,
            root: handle,
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            inv_mass,
            inv_inertia_local,
        }
    }

    /// Set the body name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the kinematic-chain root.
    #[must_use]
    pub fn with_root(mut self, root: BodyHandle) -> Self {
        self.root = root;
        self
    }

    /// Inverse mass; zero for inert bodies.
    #[must_use]
    pub fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    /// Whether the body ignores forces (zero mass matrix).
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.inv_mass == 0.0
    }

    /// Inverse inertia tensor in world coordinates.
    #[must_use]
    pub fn inv_inertia_world(&self) -> Matrix3<f64> {
        let r = self.pose.rotation.to_rotation_matrix();
        r.matrix() * self.inv_inertia_local * r.matrix().transpose()
    }

    /// Apply a force at the center of mass.
    pub fn apply_force(&mut self, force: Vector3<f64>) {
        self.force += force;
    }

    /// Apply a force at a world-space point.
    pub fn apply_force_at_point(&mut self, force: Vector3<f64>, point: Point3<f64>) {
        self.force += force;
        self.torque += (point - self.pose.position).cross(&force);
    }

    /// Apply a torque.
    pub fn apply_torque(&mut self, torque: Vector3<f64>) {
        self.torque += torque;
    }

    /// Clear the force and torque accumulators.
    pub fn clear_forces(&mut self) {
        self.force = Vector3::zeros();
        self.torque = Vector3::zeros();
    }

    /// Velocity of a world-space point attached to the body.
    #[must_use]
    pub fn velocity_at(&self, point: Point3<f64>) -> Vector3<f64> {
        self.twist
            .velocity_at_point(&(point - self.pose.position))
    }

    /// Apply an impulse at a world-space point.
    pub fn apply_impulse_at(&mut self, impulse: Vector3<f64>, point: Point3<f64>) {
        self.twist.linear += impulse * self.inv_mass;
        self.twist.angular +=
            self.inv_inertia_world() * (point - self.pose.position).cross(&impulse);
    }

    /// Apply an angular impulse.
    pub fn apply_angular_impulse(&mut self, impulse: Vector3<f64>) {
        self.twist.angular += self.inv_inertia_world() * impulse;
    }

    /// Integrate accumulated forces into velocity (semi-implicit Euler).
    pub fn integrate_velocity(&mut self, gravity: Vector3<f64>, dt: f64) {
        if self.is_inert() {
            return;
        }
        self.twist.linear += (self.force * self.inv_mass + gravity) * dt;
        self.twist.angular += self.inv_inertia_world() * self.torque * dt;
    }

    /// Integrate velocity into the pose.
    pub fn integrate_pose(&mut self, dt: f64) {
        if self.is_inert() {
            return;
        }
        self.pose.position += self.twist.linear * dt;
        let omega = self.twist.angular;
        let angle = omega.norm() * dt;
        if angle > 1e-12 {
            let axis = nalgebra::Unit::new_normalize(omega);
            self.pose.rotation =
                nalgebra::UnitQuaternion::from_axis_angle(&axis, angle) * self.pose.rotation;
        }
    }

    /// Whether the body state is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.twist.is_finite()
    }
}
