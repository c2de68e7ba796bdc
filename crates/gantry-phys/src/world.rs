//! The physics world.
//!
//! Owns the body, geom and joint arenas, the static and movable collision
//! spaces, the per-step contact group and the material table. The step
//! driver calls [`World::collide`] and then [`World::step`] once per tick;
//! contacts never survive a step.

use gantry_types::{
    BodyHandle, ContactConfig, ElementId, GeomHandle, JointHandle, MassProperties, Pose, SimError,
    Twist,
};
use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};

use crate::body::RigidBody;
use crate::collide::collide;
use crate::contact::{ContactConstraint, MaterialTable};
use crate::geom::{Aabb, Geom, Shape};
use crate::joint::{Joint, JointKind};

/// Which solver profile to run for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverProfile {
    /// Fewer iterations; used every Nth step when configured.
    Quick,
    /// The regular iteration count.
    Full,
}

/// A collision reported to a registered observer.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent {
    /// The geom the observer is registered on.
    pub geom: GeomHandle,
    /// The other geom of the pair.
    pub other: GeomHandle,
    /// Contact position in world space.
    pub position: Point3<f64>,
    /// Contact normal, pointing away from the observed geom.
    pub normal: Vector3<f64>,
    /// Penetration depth.
    pub depth: f64,
}

/// Collision observer callback, registered per geom.
pub type CollisionObserver = Box<dyn FnMut(&CollisionEvent)>;

/// The physics world.
pub struct World {
    /// Gravity acceleration (world frame).
    pub gravity: Vector3<f64>,
    /// Contact and solver configuration.
    pub config: ContactConfig,
    /// The material friction table.
    pub materials: MaterialTable,
    bodies: Vec<RigidBody>,
    geoms: Vec<Geom>,
    joints: Vec<Joint>,
    static_space: Vec<GeomHandle>,
    movable_space: Vec<GeomHandle>,
    contacts: Vec<ContactConstraint>,
    observers: HashMap<GeomHandle, Vec<CollisionObserver>>,
    collision_count: u32,
    contact_count: u32,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("bodies", &self.bodies.len())
            .field("geoms", &self.geoms.len())
            .field("joints", &self.joints.len())
            .field("contacts", &self.contacts.len())
            .finish_non_exhaustive()
    }
}

impl World {
    /// Create a world with the given gravity and contact configuration.
    #[must_use]
    pub fn new(gravity: Vector3<f64>, config: ContactConfig) -> Self {
        Self {
            gravity,
            config,
            materials: MaterialTable::new(),
            bodies: Vec::new(),
            geoms: Vec::new(),
            joints: Vec::new(),
            static_space: Vec::new(),
            movable_space: Vec::new(),
            contacts: Vec::new(),
            observers: HashMap::new(),
            collision_count: 0,
            contact_count: 0,
        }
    }

    // -- bodies -------------------------------------------------------------

    /// Create a rigid body. The pose is the world pose of the body's center
    /// of mass; `mass` must already be aggregated about that point.
    pub fn add_body(
        &mut self,
        pose: Pose,
        mass: MassProperties,
        name: Option<String>,
    ) -> BodyHandle {
        let handle = BodyHandle::new(self.bodies.len() as u32);
        let mut body = RigidBody::new(handle, pose, mass);
        body.name = name;
        self.bodies.push(body);
        handle
    }

    /// Set the kinematic-chain root of a body. Geoms of bodies sharing a
    /// root never collide with each other.
    pub fn set_body_root(&mut self, body: BodyHandle, root: BodyHandle) {
        self.bodies[body.index()].root = root;
    }

    /// Borrow a body.
    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> &RigidBody {
        &self.bodies[handle.index()]
    }

    /// Borrow a body mutably.
    pub fn body_mut(&mut self, handle: BodyHandle) -> &mut RigidBody {
        &mut self.bodies[handle.index()]
    }

    /// All bodies in creation order.
    #[must_use]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    /// Number of bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    // -- geoms --------------------------------------------------------------

    /// Attach a geom to a body (movable space) or to the world (static
    /// space when `body` is `None`).
    pub fn add_geom(
        &mut self,
        body: Option<BodyHandle>,
        offset: Pose,
        shape: Shape,
        material: Option<String>,
        immaterial: bool,
        user_data: Option<ElementId>,
    ) -> GeomHandle {
        let handle = GeomHandle::new(self.geoms.len() as u32);
        self.geoms.push(Geom {
            handle,
            body,
            offset,
            shape,
            material,
            immaterial,
            user_data,
        });
        if body.is_some() {
            self.movable_space.push(handle);
        } else {
            self.static_space.push(handle);
        }
        handle
    }

    /// Borrow a geom.
    #[must_use]
    pub fn geom(&self, handle: GeomHandle) -> &Geom {
        &self.geoms[handle.index()]
    }

    /// All geoms in creation order.
    #[must_use]
    pub fn geoms(&self) -> &[Geom] {
        &self.geoms
    }

    /// World pose of a geom.
    #[must_use]
    pub fn geom_pose(&self, handle: GeomHandle) -> Pose {
        let geom = &self.geoms[handle.index()];
        geom.world_pose(geom.body.map(|b| &self.bodies[b.index()].pose))
    }

    /// Register a collision observer on a geom. Observer lists are mutated
    /// only during scene construction and teardown, never during a
    /// collision pass.
    pub fn register_observer(&mut self, geom: GeomHandle, observer: CollisionObserver) {
        self.observers.entry(geom).or_default().push(observer);
    }

    // -- joints -------------------------------------------------------------

    /// Create a hinge between a parent (or the world) and a child body.
    /// Both bodies must already hold their composed world poses.
    pub fn add_hinge(
        &mut self,
        parent: Option<BodyHandle>,
        child: BodyHandle,
        anchor: Point3<f64>,
        axis: Vector3<f64>,
        name: Option<String>,
    ) -> JointHandle {
        self.add_joint(JointKind::Hinge, parent, child, anchor, axis, name)
    }

    /// Create a slider between a parent (or the world) and a child body.
    pub fn add_slider(
        &mut self,
        parent: Option<BodyHandle>,
        child: BodyHandle,
        anchor: Point3<f64>,
        axis: Vector3<f64>,
        name: Option<String>,
    ) -> JointHandle {
        self.add_joint(JointKind::Slider, parent, child, anchor, axis, name)
    }

    fn add_joint(
        &mut self,
        kind: JointKind,
        parent: Option<BodyHandle>,
        child: BodyHandle,
        anchor: Point3<f64>,
        axis: Vector3<f64>,
        name: Option<String>,
    ) -> JointHandle {
        let handle = JointHandle::new(self.joints.len() as u32);
        let parent_body = parent.map(|p| &self.bodies[p.index()]);
        let mut joint = Joint::new(
            handle,
            kind,
            parent_body,
            &self.bodies[child.index()],
            anchor,
            axis,
        );
        joint.name = name;
        self.joints.push(joint);
        handle
    }

    /// Borrow a joint.
    #[must_use]
    pub fn joint(&self, handle: JointHandle) -> &Joint {
        &self.joints[handle.index()]
    }

    /// Borrow a joint mutably (motor commands, limits).
    pub fn joint_mut(&mut self, handle: JointHandle) -> &mut Joint {
        &mut self.joints[handle.index()]
    }

    /// Current position of a joint's degree of freedom.
    #[must_use]
    pub fn joint_position(&self, handle: JointHandle) -> f64 {
        self.joints[handle.index()].position(&self.bodies)
    }

    /// Current velocity of a joint's degree of freedom.
    #[must_use]
    pub fn joint_velocity(&self, handle: JointHandle) -> f64 {
        self.joints[handle.index()].velocity(&self.bodies)
    }

    /// Number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    // -- collision ----------------------------------------------------------

    /// Geom pairs that passed the narrow phase in the last collision pass.
    #[must_use]
    pub fn collision_count(&self) -> u32 {
        self.collision_count
    }

    /// Contact constraints created in the last collision pass.
    #[must_use]
    pub fn contact_count(&self) -> u32 {
        self.contact_count
    }

    /// The current contact group.
    #[must_use]
    pub fn contacts(&self) -> &[ContactConstraint] {
        &self.contacts
    }

    /// Run broad and narrow phase collision detection, rebuilding the
    /// contact group from scratch: static-vs-movable first, then
    /// movable-vs-movable when `body_collisions` is enabled. Observer
    /// callbacks fire for every contacting pair; immaterial geoms
    /// short-circuit contact creation but still receive callbacks, and
    /// rolling friction shrinks body velocities directly.
    pub fn collide(&mut self, body_collisions: bool) {
        self.collision_count = 0;
        self.contact_count = 0;
        self.contacts.clear();

        let aabbs: Vec<Aabb> = self
            .geoms
            .iter()
            .map(|g| {
                let pose = g.world_pose(g.body.map(|b| &self.bodies[b.index()].pose));
                Aabb::of_shape(&g.shape, &pose)
            })
            .collect();

        let mut hits: Vec<(GeomHandle, GeomHandle)> = Vec::new();

        // Static vs movable.
        for &m in &self.movable_space {
            for &s in &self.static_space {
                if aabbs[m.index()].overlaps(&aabbs[s.index()]) {
                    hits.push((m, s));
                }
            }
        }

        // Movable vs movable; geoms sharing a kinematic-chain root are
        // never tested against each other.
        if body_collisions {
            for (i, &ga) in self.movable_space.iter().enumerate() {
                for &gb in &self.movable_space[i + 1..] {
                    let root_a = self.geoms[ga.index()]
                        .body
                        .map(|b| self.bodies[b.index()].root);
                    let root_b = self.geoms[gb.index()]
                        .body
                        .map(|b| self.bodies[b.index()].root);
                    if root_a == root_b {
                        continue;
                    }
                    if aabbs[ga.index()].overlaps(&aabbs[gb.index()]) {
                        hits.push((ga, gb));
                    }
                }
            }
        }

        for (ha, hb) in hits {
            let (points, body_a, body_b, immaterial) = {
                let ga = &self.geoms[ha.index()];
                let gb = &self.geoms[hb.index()];
                let pose_a = ga.world_pose(ga.body.map(|b| &self.bodies[b.index()].pose));
                let pose_b = gb.world_pose(gb.body.map(|b| &self.bodies[b.index()].pose));
                let points = collide(&ga.shape, &pose_a, &gb.shape, &pose_b);
                (
                    points,
                    ga.body,
                    gb.body,
                    ga.immaterial || gb.immaterial,
                )
            };
            if points.is_empty() {
                continue;
            }
            self.collision_count += 1;

            let material_a = self.geoms[ha.index()].material.clone();
            let material_b = self.geoms[hb.index()].material.clone();
            let friction = self
                .materials
                .resolve_sliding(material_a.as_deref(), material_b.as_deref())
                .unwrap_or(self.config.default_friction);
            let rolling = self
                .materials
                .resolve_rolling(material_a.as_deref(), material_b.as_deref());

            for point in &points {
                self.notify_observers(ha, hb, point.position, point.normal, point.depth);
                self.notify_observers(hb, ha, point.position, -point.normal, point.depth);
            }

            if immaterial {
                continue;
            }

            // Rolling friction damps the linear velocity of the movable
            // bodies directly, once per contacting pair.
            if let Some(rolling) = rolling {
                let factor = (1.0 - rolling).max(0.0);
                for body in [body_a, body_b].into_iter().flatten() {
                    self.bodies[body.index()].twist.linear *= factor;
                }
            }

            for point in points {
                self.contacts.push(ContactConstraint::new(
                    body_a,
                    body_b,
                    ha,
                    hb,
                    point.position,
                    point.normal,
                    point.depth,
                    friction,
                    self.config.erp,
                    self.config.cfm,
                ));
                self.contact_count += 1;
            }
        }
    }

    fn notify_observers(
        &mut self,
        geom: GeomHandle,
        other: GeomHandle,
        position: Point3<f64>,
        normal: Vector3<f64>,
        depth: f64,
    ) {
        if let Some(observers) = self.observers.get_mut(&geom) {
            let event = CollisionEvent {
                geom,
                other,
                position,
                normal,
                depth,
            };
            for observer in observers {
                observer(&event);
            }
        }
    }

    // -- stepping -----------------------------------------------------------

    /// Advance the world by one step of `dt` seconds, consuming the current
    /// contact group. Runs: velocity integration (forces + gravity), the
    /// selected solver profile over joints and contacts, pose integration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Diverged`] if any body state stops being finite.
    pub fn step(&mut self, dt: f64, profile: SolverProfile) -> gantry_types::Result<()> {
        debug_assert!(dt > 0.0);
        self.validate()?;

        for body in &mut self.bodies {
            body.integrate_velocity(self.gravity, dt);
        }

        let iterations = match profile {
            SolverProfile::Quick => self.config.quick_iterations,
            SolverProfile::Full => self.config.full_iterations,
        };
        for joint in &mut self.joints {
            joint.begin_step();
        }
        for _ in 0..iterations {
            for joint in &mut self.joints {
                joint.solve(&mut self.bodies, dt, self.config.erp, self.config.cfm);
            }
            for contact in &mut self.contacts {
                contact.solve(&mut self.bodies, dt);
            }
        }

        for body in &mut self.bodies {
            body.integrate_pose(dt);
            body.clear_forces();
        }

        // Contacts are regenerated from scratch next step.
        self.contacts.clear();

        self.validate()
    }

    /// Check every body for `NaN`/`Inf` state.
    pub fn validate(&self) -> gantry_types::Result<()> {
        for body in &self.bodies {
            if !body.is_finite() {
                let name = body
                    .name
                    .clone()
                    .unwrap_or_else(|| body.handle.to_string());
                return Err(SimError::diverged(format!(
                    "non-finite state on body {name}"
                )));
            }
        }
        Ok(())
    }

    /// Cast a ray against every geom, returning the closest hit distance
    /// within `max_distance`, optionally skipping geoms of one root body.
    #[must_use]
    pub fn ray_cast(
        &self,
        origin: Point3<f64>,
        direction: Vector3<f64>,
        max_distance: f64,
        skip_root: Option<BodyHandle>,
    ) -> Option<(GeomHandle, f64)> {
        let direction = direction.try_normalize(1e-12)?;
        let mut best: Option<(GeomHandle, f64)> = None;
        for geom in &self.geoms {
            if let (Some(skip), Some(body)) = (skip_root, geom.body) {
                if self.bodies[body.index()].root == skip {
                    continue;
                }
            }
            let pose = geom.world_pose(geom.body.map(|b| &self.bodies[b.index()].pose));
            if let Some(distance) = crate::ray::ray_shape(&geom.shape, &pose, origin, direction) {
                if distance <= max_distance && best.is_none_or(|(_, d)| distance < d) {
                    best = Some((geom.handle, distance));
                }
            }
        }
        best
    }

    /// Reset a body's velocities (interactive drag support).
    pub fn reset_velocity(&mut self, body: BodyHandle) {
        self.bodies[body.index()].twist = Twist::zero();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn falling_sphere_world() -> (World, BodyHandle) {
        let mut world = World::new(Vector3::new(0.0, 0.0, -9.8), ContactConfig::default());
        let body = world.add_body(
            Pose::from_position(Point3::new(0.0, 0.0, 1.0)),
            MassProperties::sphere(1.0, 0.1),
            Some("ball".into()),
        );
        world.add_geom(
            Some(body),
            Pose::identity(),
            Shape::Sphere { radius: 0.1 },
            None,
            false,
            None,
        );
        (world, body)
    }

    #[test]
    fn test_free_fall_velocity() {
        let (mut world, body) = falling_sphere_world();
        for _ in 0..100 {
            world.collide(true);
            world.step(0.01, SolverProfile::Full).unwrap();
        }
        assert_relative_eq!(world.body(body).twist.linear.z, -9.8, epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_rests_on_static_box() {
        let (mut world, body) = falling_sphere_world();
        // Floor top surface at z = 0.
        world.add_geom(
            None,
            Pose::from_position(Point3::new(0.0, 0.0, -0.5)),
            Shape::Box {
                half: Vector3::new(5.0, 5.0, 0.5),
            },
            None,
            false,
            None,
        );
        for _ in 0..500 {
            world.collide(true);
            world.step(0.01, SolverProfile::Full).unwrap();
        }
        let z = world.body(body).pose.position.z;
        assert!(
            (0.05..=0.15).contains(&z),
            "sphere should rest near z = 0.1, got {z}"
        );
        assert!(world.body(body).twist.linear.norm() < 0.5);
    }

    #[test]
    fn test_contacts_regenerated_each_step() {
        let (mut world, _) = falling_sphere_world();
        world.body_mut(BodyHandle::new(0)).pose.position = Point3::new(0.0, 0.0, 0.05);
        world.add_geom(
            None,
            Pose::from_position(Point3::new(0.0, 0.0, -0.5)),
            Shape::Box {
                half: Vector3::new(5.0, 5.0, 0.5),
            },
            None,
            false,
            None,
        );

        world.collide(true);
        let first = world.contact_count();
        assert!(first > 0);
        world.step(0.01, SolverProfile::Full).unwrap();
        // The contact group is consumed by the step.
        assert!(world.contacts().is_empty());

        world.collide(true);
        assert_eq!(world.contact_count(), first);
    }

    #[test]
    fn test_immaterial_geom_callbacks_without_contacts() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut world = World::new(Vector3::zeros(), ContactConfig::default());
        let body = world.add_body(
            Pose::from_position(Point3::new(0.0, 0.0, 0.05)),
            MassProperties::sphere(1.0, 0.1),
            None,
        );
        let sensor_geom = world.add_geom(
            Some(body),
            Pose::identity(),
            Shape::Sphere { radius: 0.1 },
            None,
            true, // immaterial
            None,
        );
        world.add_geom(
            None,
            Pose::from_position(Point3::new(0.0, 0.0, -0.5)),
            Shape::Box {
                half: Vector3::new(5.0, 5.0, 0.5),
            },
            None,
            false,
            None,
        );

        let hits = Rc::new(RefCell::new(0));
        let hits_clone = Rc::clone(&hits);
        world.register_observer(
            sensor_geom,
            Box::new(move |_event| {
                *hits_clone.borrow_mut() += 1;
            }),
        );

        world.collide(true);
        assert!(*hits.borrow() > 0, "observer should have fired");
        assert_eq!(world.contact_count(), 0, "immaterial pair makes no contacts");
    }

    #[test]
    fn test_same_root_bodies_do_not_collide() {
        let mut world = World::new(Vector3::zeros(), ContactConfig::default());
        let a = world.add_body(
            Pose::identity(),
            MassProperties::sphere(1.0, 0.1),
            None,
        );
        let b = world.add_body(
            Pose::from_position(Point3::new(0.05, 0.0, 0.0)),
            MassProperties::sphere(1.0, 0.1),
            None,
        );
        world.set_body_root(b, a);
        world.add_geom(Some(a), Pose::identity(), Shape::Sphere { radius: 0.1 }, None, false, None);
        world.add_geom(Some(b), Pose::identity(), Shape::Sphere { radius: 0.1 }, None, false, None);

        world.collide(true);
        assert_eq!(world.collision_count(), 0);

        // Different roots: the overlapping pair collides.
        world.set_body_root(b, b);
        world.collide(true);
        assert_eq!(world.collision_count(), 1);
    }

    #[test]
    fn test_material_friction_reaches_contacts() {
        let mut world = World::new(Vector3::new(0.0, 0.0, -9.8), ContactConfig::default());
        world.materials.set_sliding("rubber", "floor", 1.0);
        world.materials.set_sliding("floor", "rubber", 0.5);

        let body = world.add_body(
            Pose::from_position(Point3::new(0.0, 0.0, 0.05)),
            MassProperties::sphere(1.0, 0.1),
            None,
        );
        world.add_geom(
            Some(body),
            Pose::identity(),
            Shape::Sphere { radius: 0.1 },
            Some("rubber".into()),
            false,
            None,
        );
        world.add_geom(
            None,
            Pose::from_position(Point3::new(0.0, 0.0, -0.5)),
            Shape::Box {
                half: Vector3::new(5.0, 5.0, 0.5),
            },
            Some("floor".into()),
            false,
            None,
        );

        world.collide(true);
        assert!(world.contact_count() > 0);
        assert_relative_eq!(world.contacts()[0].friction, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_friction_shrinks_velocity() {
        let mut world = World::new(Vector3::zeros(), ContactConfig::default());
        world.materials.set_rolling("ball", "floor", 0.1);

        let body = world.add_body(
            Pose::from_position(Point3::new(0.0, 0.0, 0.05)),
            MassProperties::sphere(1.0, 0.1),
            None,
        );
        world.body_mut(body).twist.linear = Vector3::new(1.0, 0.0, 0.0);
        world.add_geom(
            Some(body),
            Pose::identity(),
            Shape::Sphere { radius: 0.1 },
            Some("ball".into()),
            false,
            None,
        );
        world.add_geom(
            None,
            Pose::from_position(Point3::new(0.0, 0.0, -0.5)),
            Shape::Box {
                half: Vector3::new(5.0, 5.0, 0.5),
            },
            Some("floor".into()),
            false,
            None,
        );

        world.collide(true);
        assert_relative_eq!(world.body(body).twist.linear.x, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_divergence_detected() {
        let (mut world, body) = falling_sphere_world();
        world.body_mut(body).pose.position.x = f64::NAN;
        let err = world.step(0.01, SolverProfile::Full).unwrap_err();
        assert!(err.is_diverged());
    }

    #[test]
    fn test_hinge_pendulum_stays_on_anchor() {
        let mut world = World::new(Vector3::new(0.0, 0.0, -9.8), ContactConfig::default());
        let bob = world.add_body(
            Pose::from_position(Point3::new(0.5, 0.0, 0.0)),
            MassProperties::sphere(1.0, 0.05),
            None,
        );
        world.add_hinge(None, bob, Point3::origin(), Vector3::y(), None);

        let mut min_z = f64::MAX;
        for _ in 0..500 {
            world.collide(true);
            world.step(0.005, SolverProfile::Full).unwrap();
            min_z = min_z.min(world.body(bob).pose.position.z);
        }

        // The bob must stay at arm's length from the pivot and have swung
        // well below its starting height at some point.
        let p = world.body(bob).pose.position;
        let arm = p.coords.norm();
        assert!((arm - 0.5).abs() < 0.05, "arm length drifted to {arm}");
        assert!(min_z < -0.3, "pendulum should have swung down, min z = {min_z}");
    }

    #[test]
    fn test_quick_profile_uses_fewer_iterations() {
        // Both profiles must at least hold a resting contact; the quick
        // profile just converges less tightly.
        let (mut world, body) = falling_sphere_world();
        world.add_geom(
            None,
            Pose::from_position(Point3::new(0.0, 0.0, -0.5)),
            Shape::Box {
                half: Vector3::new(5.0, 5.0, 0.5),
            },
            None,
            false,
            None,
        );
        for step in 0..400 {
            world.collide(true);
            let profile = if step % 3 == 0 {
                SolverProfile::Quick
            } else {
                SolverProfile::Full
            };
            world.step(0.01, profile).unwrap();
        }
        let z = world.body(body).pose.position.z;
        assert!((0.02..=0.2).contains(&z), "sphere at z = {z}");
    }

    #[test]
    fn test_ray_cast_hits_closest() {
        let mut world = World::new(Vector3::zeros(), ContactConfig::default());
        world.add_geom(
            None,
            Pose::from_position(Point3::new(2.0, 0.0, 0.0)),
            Shape::Sphere { radius: 0.5 },
            None,
            false,
            None,
        );
        world.add_geom(
            None,
            Pose::from_position(Point3::new(5.0, 0.0, 0.0)),
            Shape::Sphere { radius: 0.5 },
            None,
            false,
            None,
        );
        let hit = world.ray_cast(Point3::origin(), Vector3::x(), 10.0, None);
        let (_, distance) = hit.unwrap();
        assert_relative_eq!(distance, 1.5, epsilon = 1e-9);
    }
}
