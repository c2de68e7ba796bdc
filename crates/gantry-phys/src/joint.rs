//! Hinge and slider joints.
//!
//! A joint connects a child body to its parent body (or to the static world)
//! around an axis fixed at creation time. Local anchor and axis frames are
//! captured from the composed world poses when the joint is created; travel
//! limits and a motor attach to the single degree of freedom.

use gantry_types::{BodyHandle, JointHandle, Pose, SimError};
use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

use crate::body::RigidBody;
use crate::contact::{apply_pair_impulse, effective_mass, point_velocity, resolve_pair};

/// Joint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    /// One rotational degree of freedom.
    Hinge,
    /// One translational degree of freedom.
    Slider,
}

/// Travel limits on a joint's degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimit {
    /// Minimum travel (rad or m).
    pub min: f64,
    /// Maximum travel (rad or m).
    pub max: f64,
    /// Error reduction parameter at the stops.
    pub stop_erp: f64,
    /// Softness at the stops.
    pub stop_cfm: f64,
}

/// A one-degree-of-freedom joint between a parent (or the world) and a child.
#[derive(Debug, Clone)]
pub struct Joint {
    /// Handle of this joint.
    pub handle: JointHandle,
    /// Optional name for lookups.
    pub name: Option<String>,
    /// Hinge or slider.
    pub kind: JointKind,
    /// Parent body; `None` anchors the joint to the world.
    pub parent: Option<BodyHandle>,
    /// Child body.
    pub child: BodyHandle,
    /// Optional travel limits.
    pub limit: Option<JointLimit>,
    /// Softness of the locked directions.
    pub axis_cfm: f64,
    /// Commanded axis velocity for this step (set by the motor port).
    pub motor_velocity: f64,
    /// Maximum motor force/torque; zero disables the motor row.
    pub motor_max_force: f64,

    anchor_parent: Point3<f64>,
    anchor_child: Point3<f64>,
    axis_parent: Vector3<f64>,
    axis_child: Vector3<f64>,
    ref_parent: Vector3<f64>,
    ref_child: Vector3<f64>,
    rel_rotation: UnitQuaternion<f64>,
    motor_impulse: f64,
}

impl Joint {
    /// Create a joint anchored and axis-aligned at world coordinates.
    ///
    /// The parent/child local frames are captured from the bodies' current
    /// world poses, so the joint must be created after both bodies hold
    /// their composed initial poses.
    #[must_use]
    pub fn new(
        handle: JointHandle,
        kind: JointKind,
        parent: Option<&RigidBody>,
        child: &RigidBody,
        anchor_world: Point3<f64>,
        axis_world: Vector3<f64>,
    ) -> Self {
        let axis_world = axis_world
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::z);
        let reference = orthogonal(&axis_world);

        let parent_pose = parent.map_or_else(Pose::identity, |p| p.pose);
        let parent_inv = parent_pose.inverse();
        let child_inv = child.pose.inverse();

        Self {
            handle,
            name: None,
            kind,
            parent: parent.map(|p| p.handle),
            child: child.handle,
            limit: None,
            axis_cfm: 0.0,
            motor_velocity: 0.0,
            motor_max_force: 0.0,
            anchor_parent: parent_inv.transform_point(&anchor_world),
            anchor_child: child_inv.transform_point(&anchor_world),
            axis_parent: parent_inv.transform_vector(&axis_world),
            axis_child: child_inv.transform_vector(&axis_world),
            ref_parent: parent_inv.transform_vector(&reference),
            ref_child: child_inv.transform_vector(&reference),
            rel_rotation: parent_pose.rotation.inverse() * child.pose.rotation,
            motor_impulse: 0.0,
        }
    }

    /// Set the joint name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach travel limits.
    #[must_use]
    pub fn with_limit(mut self, limit: JointLimit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Current joint position: the hinge angle (rad) or slider
    /// displacement (m).
    #[must_use]
    pub fn position(&self, bodies: &[RigidBody]) -> f64 {
        let parent_pose = self.parent_pose(bodies);
        let child = &bodies[self.child.index()];
        let axis = parent_pose.transform_vector(&self.axis_parent);
        match self.kind {
            JointKind::Hinge => {
                let ref_p = parent_pose.transform_vector(&self.ref_parent);
                let ref_c = child.pose.transform_vector(&self.ref_child);
                let ref_p = (ref_p - axis * ref_p.dot(&axis)).normalize();
                let ref_c = (ref_c - axis * ref_c.dot(&axis)).normalize();
                let sin = axis.dot(&ref_p.cross(&ref_c));
                let cos = ref_p.dot(&ref_c);
                sin.atan2(cos)
            }
            JointKind::Slider => {
                let anchor_p = parent_pose.transform_point(&self.anchor_parent);
                let anchor_c = child.pose.transform_point(&self.anchor_child);
                (anchor_c - anchor_p).dot(&axis)
            }
        }
    }

    /// Current joint velocity along the free axis.
    #[must_use]
    pub fn velocity(&self, bodies: &[RigidBody]) -> f64 {
        let parent_pose = self.parent_pose(bodies);
        let axis = parent_pose.transform_vector(&self.axis_parent);
        let child = &bodies[self.child.index()];
        let parent = self.parent.map(|p| &bodies[p.index()]);
        match self.kind {
            JointKind::Hinge => {
                let w_parent = parent.map_or_else(Vector3::zeros, |p| p.twist.angular);
                (child.twist.angular - w_parent).dot(&axis)
            }
            JointKind::Slider => {
                let v_parent = parent.map_or_else(Vector3::zeros, |p| p.twist.linear);
                (child.twist.linear - v_parent).dot(&axis)
            }
        }
    }

    /// Reset the per-step motor impulse accumulator.
    pub fn begin_step(&mut self) {
        self.motor_impulse = 0.0;
    }

    /// One projected Gauss-Seidel iteration over this joint's rows.
    pub fn solve(&mut self, bodies: &mut [RigidBody], dt: f64, erp: f64, cfm: f64) {
        // Joint state needed before splitting the borrow.
        let position = self.position(bodies);
        let parent_pose = self.parent_pose(bodies);
        let child_pose = bodies[self.child.index()].pose;

        let axis = parent_pose.transform_vector(&self.axis_parent);
        let anchor_p = parent_pose.transform_point(&self.anchor_parent);
        let anchor_c = child_pose.transform_point(&self.anchor_child);
        let cfm = cfm.max(self.axis_cfm);

        let (mut a, mut b) = resolve_pair(bodies, self.parent, Some(self.child));

        match self.kind {
            JointKind::Hinge => {
                self.solve_point_rows(&mut a, &mut b, anchor_p, anchor_c, dt, erp, cfm);
                self.solve_hinge_angular(&mut a, &mut b, &parent_pose, &child_pose, dt, erp, cfm);
            }
            JointKind::Slider => {
                self.solve_slider_rotation(&mut a, &mut b, &parent_pose, &child_pose, dt, erp, cfm);
                self.solve_slider_lateral(&mut a, &mut b, anchor_p, anchor_c, &axis, dt, erp, cfm);
            }
        }

        self.solve_limit(&mut a, &mut b, anchor_c, &axis, position, dt);
        self.solve_motor(&mut a, &mut b, anchor_c, &axis, dt);
    }

    fn parent_pose(&self, bodies: &[RigidBody]) -> Pose {
        self.parent
            .map_or_else(Pose::identity, |p| bodies[p.index()].pose)
    }

    /// Pin the two anchor points together (3 rows, block solve).
    #[allow(clippy::too_many_arguments)]
    fn solve_point_rows(
        &mut self,
        a: &mut Option<&mut RigidBody>,
        b: &mut Option<&mut RigidBody>,
        anchor_p: Point3<f64>,
        anchor_c: Point3<f64>,
        dt: f64,
        erp: f64,
        cfm: f64,
    ) {
        let error = anchor_c - anchor_p;
        let midpoint = Point3::from(0.5 * (anchor_p.coords + anchor_c.coords));
        let v_rel = point_velocity(b, midpoint) - point_velocity(a, midpoint);
        let target = -(erp / dt) * error;

        let mut k = Matrix3::from_diagonal_element(cfm / dt);
        for body in [a.as_deref(), b.as_deref()].into_iter().flatten() {
            let r = midpoint - body.pose.position;
            let rx = skew(&r);
            k += Matrix3::from_diagonal_element(body.inv_mass())
                - rx * body.inv_inertia_world() * rx;
        }
        if let Some(inverse) = k.try_inverse() {
            let impulse = inverse * (target - v_rel);
            apply_pair_impulse(a, b, midpoint, impulse);
        }
    }

    /// Keep the child's axis aligned with the parent's (2 angular rows).
    #[allow(clippy::too_many_arguments)]
    fn solve_hinge_angular(
        &mut self,
        a: &mut Option<&mut RigidBody>,
        b: &mut Option<&mut RigidBody>,
        parent_pose: &Pose,
        child_pose: &Pose,
        dt: f64,
        erp: f64,
        cfm: f64,
    ) {
        let axis_p = parent_pose.transform_vector(&self.axis_parent);
        let axis_c = child_pose.transform_vector(&self.axis_child);
        // Rotating the child along this vector brings its axis back onto
        // the parent's.
        let correction = axis_c.cross(&axis_p);

        let t1 = orthogonal(&axis_p);
        let t2 = axis_p.cross(&t1);
        for u in [t1, t2] {
            let w_rel = angular_velocity(b) - angular_velocity(a);
            let cdot = u.dot(&w_rel);
            let target = (erp / dt) * u.dot(&correction);
            let k = angular_effective_mass(a, b, &u) + cfm / dt;
            if k > 0.0 {
                let lambda = (target - cdot) / k;
                apply_angular_pair_impulse(a, b, u * lambda);
            }
        }
    }

    /// Lock relative rotation entirely (3 angular rows, block solve).
    #[allow(clippy::too_many_arguments)]
    fn solve_slider_rotation(
        &mut self,
        a: &mut Option<&mut RigidBody>,
        b: &mut Option<&mut RigidBody>,
        parent_pose: &Pose,
        child_pose: &Pose,
        dt: f64,
        erp: f64,
        cfm: f64,
    ) {
        let desired = parent_pose.rotation * self.rel_rotation;
        let delta = desired * child_pose.rotation.inverse();
        let correction = delta.scaled_axis();

        let w_rel = angular_velocity(b) - angular_velocity(a);
        let target = (erp / dt) * correction;

        let mut k = Matrix3::from_diagonal_element(cfm / dt);
        for body in [a.as_deref(), b.as_deref()].into_iter().flatten() {
            k += body.inv_inertia_world();
        }
        if let Some(inverse) = k.try_inverse() {
            let impulse = inverse * (target - w_rel);
            apply_angular_pair_impulse(a, b, impulse);
        }
    }

    /// Remove anchor drift perpendicular to the slider axis (2 rows).
    #[allow(clippy::too_many_arguments)]
    fn solve_slider_lateral(
        &mut self,
        a: &mut Option<&mut RigidBody>,
        b: &mut Option<&mut RigidBody>,
        anchor_p: Point3<f64>,
        anchor_c: Point3<f64>,
        axis: &Vector3<f64>,
        dt: f64,
        erp: f64,
        cfm: f64,
    ) {
        let error = anchor_c - anchor_p;
        let t1 = orthogonal(axis);
        let t2 = axis.cross(&t1);
        for u in [t1, t2] {
            let v_rel = point_velocity(b, anchor_c) - point_velocity(a, anchor_p);
            let cdot = u.dot(&v_rel);
            let target = -(erp / dt) * u.dot(&error);
            let k = effective_mass(a, b, anchor_c, &u) + cfm / dt;
            if k > 0.0 {
                let lambda = (target - cdot) / k;
                apply_pair_impulse(a, b, anchor_c, u * lambda);
            }
        }
    }

    /// One-sided stop row when the joint is outside its travel range.
    fn solve_limit(
        &mut self,
        a: &mut Option<&mut RigidBody>,
        b: &mut Option<&mut RigidBody>,
        anchor_c: Point3<f64>,
        axis: &Vector3<f64>,
        position: f64,
        dt: f64,
    ) {
        let Some(limit) = self.limit else {
            return;
        };
        // Direction along which the joint must push to re-enter the range.
        let (violation, sign) = if position < limit.min {
            (limit.min - position, 1.0)
        } else if position > limit.max {
            (position - limit.max, -1.0)
        } else {
            return;
        };

        let (cdot, k) = self.axis_rate(a, b, anchor_c, axis);
        let k = k + limit.stop_cfm / dt;
        if k <= 0.0 {
            return;
        }
        let target = sign * (limit.stop_erp / dt) * violation;
        let lambda = (target - cdot) / k;
        // Stops only push back into the range.
        let lambda = if sign > 0.0 {
            lambda.max(0.0)
        } else {
            lambda.min(0.0)
        };
        self.apply_axis_impulse(a, b, anchor_c, axis, lambda);
    }

    /// Motor row: drive the axis rate towards the commanded velocity,
    /// clamped by the motor's force budget for this step.
    fn solve_motor(
        &mut self,
        a: &mut Option<&mut RigidBody>,
        b: &mut Option<&mut RigidBody>,
        anchor_c: Point3<f64>,
        axis: &Vector3<f64>,
        dt: f64,
    ) {
        if self.motor_max_force <= 0.0 {
            return;
        }
        let (cdot, k) = self.axis_rate(a, b, anchor_c, axis);
        if k <= 0.0 {
            return;
        }
        let lambda = (self.motor_velocity - cdot) / k;
        let budget = self.motor_max_force * dt;
        let new_total = (self.motor_impulse + lambda).clamp(-budget, budget);
        let applied = new_total - self.motor_impulse;
        self.motor_impulse = new_total;
        self.apply_axis_impulse(a, b, anchor_c, axis, applied);
    }

    /// Rate and effective mass of the free axis.
    fn axis_rate(
        &self,
        a: &Option<&mut RigidBody>,
        b: &Option<&mut RigidBody>,
        anchor_c: Point3<f64>,
        axis: &Vector3<f64>,
    ) -> (f64, f64) {
        match self.kind {
            JointKind::Hinge => {
                let w_rel = angular_velocity(b) - angular_velocity(a);
                (w_rel.dot(axis), angular_effective_mass(a, b, axis))
            }
            JointKind::Slider => {
                let v_rel = point_velocity(b, anchor_c) - point_velocity(a, anchor_c);
                (v_rel.dot(axis), effective_mass(a, b, anchor_c, axis))
            }
        }
    }

    fn apply_axis_impulse(
        &self,
        a: &mut Option<&mut RigidBody>,
        b: &mut Option<&mut RigidBody>,
        anchor_c: Point3<f64>,
        axis: &Vector3<f64>,
        lambda: f64,
    ) {
        match self.kind {
            JointKind::Hinge => apply_angular_pair_impulse(a, b, axis * lambda),
            JointKind::Slider => apply_pair_impulse(a, b, anchor_c, axis * lambda),
        }
    }

    /// Validate that both body handles exist in the arena.
    pub fn validate(&self, body_count: usize) -> gantry_types::Result<()> {
        if self.child.index() >= body_count {
            return Err(SimError::InvalidBody(self.child.0));
        }
        if let Some(parent) = self.parent {
            if parent.index() >= body_count {
                return Err(SimError::InvalidBody(parent.0));
            }
        }
        Ok(())
    }
}

fn angular_velocity(body: &Option<&mut RigidBody>) -> Vector3<f64> {
    body.as_ref()
        .map_or_else(Vector3::zeros, |b| b.twist.angular)
}

fn angular_effective_mass(
    a: &Option<&mut RigidBody>,
    b: &Option<&mut RigidBody>,
    direction: &Vector3<f64>,
) -> f64 {
    let mut k = 0.0;
    for body in [a.as_deref(), b.as_deref()].into_iter().flatten() {
        k += direction.dot(&(body.inv_inertia_world() * direction));
    }
    k
}

fn apply_angular_pair_impulse(
    a: &mut Option<&mut RigidBody>,
    b: &mut Option<&mut RigidBody>,
    impulse: Vector3<f64>,
) {
    if let Some(a) = a {
        a.apply_angular_impulse(-impulse);
    }
    if let Some(b) = b {
        b.apply_angular_impulse(impulse);
    }
}

fn orthogonal(v: &Vector3<f64>) -> Vector3<f64> {
    let candidate = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&candidate).normalize()
}

fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}
