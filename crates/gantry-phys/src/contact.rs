//! Contact constraints and the material friction table.
//!
//! Contacts live for exactly one step: the collision pass rebuilds the
//! contact group from current geometry overlap, the solver consumes it, and
//! the step discards it. Friction coefficients resolve through the material
//! table (averaging the two cross-referenced entries when both materials
//! define one) before falling back to the scene default.

use gantry_types::{BodyHandle, GeomHandle};
use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};

use crate::body::RigidBody;

/// One contact constraint for the current step.
#[derive(Debug, Clone)]
pub struct ContactConstraint {
    /// First body; `None` when the first geom is static.
    pub body_a: Option<BodyHandle>,
    /// Second body; `None` when the second geom is static.
    pub body_b: Option<BodyHandle>,
    /// Geom that produced the first side of the contact.
    pub geom_a: GeomHandle,
    /// Geom that produced the second side of the contact.
    pub geom_b: GeomHandle,
    /// Contact position in world space.
    pub point: Point3<f64>,
    /// Contact normal, pointing from the first geom to the second.
    pub normal: Vector3<f64>,
    /// Penetration depth.
    pub depth: f64,
    /// Resolved sliding friction coefficient.
    pub friction: f64,
    /// Error reduction parameter for this contact.
    pub erp: f64,
    /// Softness for this contact.
    pub cfm: f64,
    normal_impulse: f64,
    tangents: [Vector3<f64>; 2],
    tangent_impulse: [f64; 2],
}

impl ContactConstraint {
    /// Create a contact constraint.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        body_a: Option<BodyHandle>,
        body_b: Option<BodyHandle>,
        geom_a: GeomHandle,
        geom_b: GeomHandle,
        point: Point3<f64>,
        normal: Vector3<f64>,
        depth: f64,
        friction: f64,
        erp: f64,
        cfm: f64,
    ) -> Self {
        let t1 = orthonormal(&normal);
        let t2 = normal.cross(&t1);
        Self {
            body_a,
            body_b,
            geom_a,
            geom_b,
            point,
            normal,
            depth,
            friction,
            erp,
            cfm,
            normal_impulse: 0.0,
            tangents: [t1, t2],
            tangent_impulse: [0.0, 0.0],
        }
    }

    /// One projected Gauss-Seidel iteration over this contact.
    pub fn solve(&mut self, bodies: &mut [RigidBody], dt: f64) {
        let (mut a, mut b) = resolve_pair(bodies, self.body_a, self.body_b);

        // Normal row: keep separation velocity at or above the Baumgarte
        // push-out target.
        let v_rel = point_velocity(&b, self.point) - point_velocity(&a, self.point);
        let vn = v_rel.dot(&self.normal);
        let target = self.erp / dt * self.depth;
        let k = effective_mass(&a, &b, self.point, &self.normal) + self.cfm / dt;
        if k > 0.0 {
            let lambda = (target - vn) / k;
            let new_total = (self.normal_impulse + lambda).max(0.0);
            let applied = new_total - self.normal_impulse;
            self.normal_impulse = new_total;
            apply_pair_impulse(&mut a, &mut b, self.point, self.normal * applied);
        }

        // Friction rows, clamped to the friction cone.
        let max_tangent = self.friction * self.normal_impulse;
        for (i, tangent) in self.tangents.into_iter().enumerate() {
            let v_rel = point_velocity(&b, self.point) - point_velocity(&a, self.point);
            let vt = v_rel.dot(&tangent);
            let k = effective_mass(&a, &b, self.point, &tangent);
            if k <= 0.0 {
                continue;
            }
            let lambda = -vt / k;
            let new_total = (self.tangent_impulse[i] + lambda).clamp(-max_tangent, max_tangent);
            let applied = new_total - self.tangent_impulse[i];
            self.tangent_impulse[i] = new_total;
            apply_pair_impulse(&mut a, &mut b, self.point, tangent * applied);
        }
    }
}

/// A unit vector orthogonal to `n`.
fn orthonormal(n: &Vector3<f64>) -> Vector3<f64> {
    let candidate = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    n.cross(&candidate).normalize()
}

/// Mutable access to both sides of a constraint; either side may be static.
pub(crate) fn resolve_pair(
    bodies: &mut [RigidBody],
    a: Option<BodyHandle>,
    b: Option<BodyHandle>,
) -> (Option<&mut RigidBody>, Option<&mut RigidBody>) {
    match (a, b) {
        (None, None) => (None, None),
        (Some(a), None) => (Some(&mut bodies[a.index()]), None),
        (None, Some(b)) => (None, Some(&mut bodies[b.index()])),
        (Some(a), Some(b)) => {
            debug_assert_ne!(a, b, "constraint connects a body to itself");
            let (first, second) = if a.index() < b.index() {
                let (left, right) = bodies.split_at_mut(b.index());
                (&mut left[a.index()], &mut right[0])
            } else {
                let (left, right) = bodies.split_at_mut(a.index());
                let (a_ref, b_ref) = (&mut right[0], &mut left[b.index()]);
                (a_ref, b_ref)
            };
            (Some(first), Some(second))
        }
    }
}

/// Velocity of a world point on one constraint side (zero for static).
pub(crate) fn point_velocity(body: &Option<&mut RigidBody>, point: Point3<f64>) -> Vector3<f64> {
    body.as_ref()
        .map_or_else(Vector3::zeros, |b| b.velocity_at(point))
}

/// Effective mass of the pair along a direction at a point.
pub(crate) fn effective_mass(
    a: &Option<&mut RigidBody>,
    b: &Option<&mut RigidBody>,
    point: Point3<f64>,
    direction: &Vector3<f64>,
) -> f64 {
    let mut k = 0.0;
    for body in [a.as_deref(), b.as_deref()].into_iter().flatten() {
        let r = point - body.pose.position;
        let rn = r.cross(direction);
        k += body.inv_mass() + rn.dot(&(body.inv_inertia_world() * rn));
    }
    k
}

/// Apply an impulse to both sides: `-impulse` to A, `+impulse` to B.
pub(crate) fn apply_pair_impulse(
    a: &mut Option<&mut RigidBody>,
    b: &mut Option<&mut RigidBody>,
    point: Point3<f64>,
    impulse: Vector3<f64>,
) {
    if let Some(a) = a {
        a.apply_impulse_at(-impulse, point);
    }
    if let Some(b) = b {
        b.apply_impulse_at(impulse, point);
    }
}

/// Per-material friction entries towards other materials.
#[derive(Debug, Clone, Default)]
pub struct MaterialEntry {
    sliding: HashMap<String, f64>,
    rolling: HashMap<String, f64>,
}

/// The scene's material table.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    entries: HashMap<String, MaterialEntry>,
}

impl MaterialTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sliding friction entry of `material` towards `other`.
    pub fn set_sliding(&mut self, material: &str, other: &str, coefficient: f64) {
        self.entries
            .entry(material.to_string())
            .or_default()
            .sliding
            .insert(other.to_string(), coefficient);
    }

    /// Record a rolling friction entry of `material` towards `other`.
    pub fn set_rolling(&mut self, material: &str, other: &str, coefficient: f64) {
        self.entries
            .entry(material.to_string())
            .or_default()
            .rolling
            .insert(other.to_string(), coefficient);
    }

    /// Resolve the sliding friction between two materials: the average of
    /// the cross-referenced entries when both exist, one alone otherwise,
    /// `None` when neither is defined.
    #[must_use]
    pub fn resolve_sliding(&self, a: Option<&str>, b: Option<&str>) -> Option<f64> {
        Self::resolve(&self.entries, a, b, |e| &e.sliding)
    }

    /// Resolve the rolling friction between two materials.
    #[must_use]
    pub fn resolve_rolling(&self, a: Option<&str>, b: Option<&str>) -> Option<f64> {
        Self::resolve(&self.entries, a, b, |e| &e.rolling)
    }

    fn resolve(
        entries: &HashMap<String, MaterialEntry>,
        a: Option<&str>,
        b: Option<&str>,
        table: impl Fn(&MaterialEntry) -> &HashMap<String, f64>,
    ) -> Option<f64> {
        let lookup = |from: Option<&str>, to: Option<&str>| -> Option<f64> {
            let entry = entries.get(from?)?;
            table(entry).get(to?).copied()
        };
        match (lookup(a, b), lookup(b, a)) {
            (Some(x), Some(y)) => Some(0.5 * (x + y)),
            (Some(x), None) | (None, Some(x)) => Some(x),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_friction_averaging() {
        let mut table = MaterialTable::new();
        table.set_sliding("rubber", "steel", 0.8);
        table.set_sliding("steel", "rubber", 0.4);

        let resolved = table
            .resolve_sliding(Some("rubber"), Some("steel"))
            .unwrap();
        assert_relative_eq!(resolved, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_friction_one_sided() {
        let mut table = MaterialTable::new();
        table.set_sliding("rubber", "steel", 0.8);
        let resolved = table
            .resolve_sliding(Some("steel"), Some("rubber"))
            .unwrap();
        assert_relative_eq!(resolved, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_friction_undefined() {
        let table = MaterialTable::new();
        assert!(table.resolve_sliding(Some("wood"), Some("ice")).is_none());
        assert!(table.resolve_sliding(None, Some("ice")).is_none());
    }

    #[test]
    fn test_rolling_separate_from_sliding() {
        let mut table = MaterialTable::new();
        table.set_sliding("rubber", "steel", 0.8);
        table.set_rolling("rubber", "steel", 0.05);
        assert_relative_eq!(
            table.resolve_rolling(Some("rubber"), Some("steel")).unwrap(),
            0.05,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_tangent_basis_orthogonal() {
        let n = Vector3::new(0.3, -0.5, 0.8).normalize();
        let c = ContactConstraint::new(
            None,
            None,
            GeomHandle::new(0),
            GeomHandle::new(1),
            Point3::origin(),
            n,
            0.01,
            0.5,
            0.2,
            1e-5,
        );
        assert_relative_eq!(c.tangents[0].dot(&n), 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.tangents[1].dot(&n), 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.tangents[0].dot(&c.tangents[1]), 0.0, epsilon = 1e-12);
    }
}
