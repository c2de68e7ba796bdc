//! Mass properties and aggregation.
//!
//! A body's effective mass is assembled from the `Mass` elements declared in
//! its scene subtree: each contribution is expressed in its own local frame
//! and folded into the parent frame with a parallel-axis correction before
//! the aggregate is handed to the physics backend.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mass, center of mass and inertia of a rigid body or mass element.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// Total mass in kg.
    pub mass: f64,
    /// Center of mass offset from the local origin.
    pub center_of_mass: Vector3<f64>,
    /// Inertia tensor about the center of mass (kg·m²).
    pub inertia: Matrix3<f64>,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self::zero()
    }
}

impl MassProperties {
    /// Create mass properties from raw values.
    #[must_use]
    pub const fn new(mass: f64, center_of_mass: Vector3<f64>, inertia: Matrix3<f64>) -> Self {
        Self {
            mass,
            center_of_mass,
            inertia,
        }
    }

    /// Zero mass. A body left with zero mass is physically inert: the
    /// backend treats it as having a zero mass matrix rather than
    /// rejecting it.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            mass: 0.0,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::zeros(),
        }
    }

    /// A point mass at the local origin.
    #[must_use]
    pub fn point_mass(mass: f64) -> Self {
        Self {
            mass,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::zeros(),
        }
    }

    /// A solid sphere: I = (2/5) m r².
    #[must_use]
    pub fn sphere(mass: f64, radius: f64) -> Self {
        let i = 0.4 * mass * radius * radius;
        Self {
            mass,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::from_diagonal(&Vector3::new(i, i, i)),
        }
    }

    /// A solid box with full extents (x, y, z):
    /// Ixx = (1/12) m (y² + z²), and cyclic.
    #[must_use]
    pub fn box_solid(mass: f64, extents: Vector3<f64>) -> Self {
        let x2 = extents.x * extents.x;
        let y2 = extents.y * extents.y;
        let z2 = extents.z * extents.z;
        Self {
            mass,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::from_diagonal(&Vector3::new(
                mass * (y2 + z2) / 12.0,
                mass * (x2 + z2) / 12.0,
                mass * (x2 + y2) / 12.0,
            )),
        }
    }

    /// A solid cylinder aligned with Z:
    /// Ixx = Iyy = (1/12) m (3r² + h²), Izz = (1/2) m r².
    #[must_use]
    pub fn cylinder(mass: f64, radius: f64, height: f64) -> Self {
        let r2 = radius * radius;
        let h2 = height * height;
        let ixx = mass * (3.0 * r2 + h2) / 12.0;
        Self {
            mass,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::from_diagonal(&Vector3::new(ixx, ixx, 0.5 * mass * r2)),
        }
    }

    /// Inverse mass; 0 for zero (inert) mass.
    #[must_use]
    pub fn inverse_mass(&self) -> f64 {
        if self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// Inverse inertia tensor; `None` if the tensor is singular.
    #[must_use]
    pub fn inverse_inertia(&self) -> Option<Matrix3<f64>> {
        self.inertia.try_inverse()
    }

    /// Whether this mass is inert (zero mass matrix).
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.mass <= 0.0
    }

    /// Express these properties in a parent frame: the local frame sits at
    /// `translation` with orientation `rotation` inside the parent.
    ///
    /// The inertia tensor is rotated into the parent frame; the center of
    /// mass moves with the frame. The parallel-axis shift is applied by
    /// [`MassProperties::combine`] when contributions are summed about a
    /// common origin.
    #[must_use]
    pub fn transformed(&self, translation: &Vector3<f64>, rotation: &UnitQuaternion<f64>) -> Self {
        let r = rotation.to_rotation_matrix();
        Self {
            mass: self.mass,
            center_of_mass: translation + r * self.center_of_mass,
            inertia: r.matrix() * self.inertia * r.matrix().transpose(),
        }
    }

    /// Combine two mass contributions expressed about the same local origin.
    ///
    /// The combined center of mass is the mass-weighted mean, and each
    /// inertia tensor picks up the parallel-axis correction for its COM
    /// offset from the combined COM.
    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        let total = self.mass + other.mass;
        if total <= 0.0 {
            return Self::zero();
        }
        let com = (self.center_of_mass * self.mass + other.center_of_mass * other.mass) / total;
        let inertia = shift_inertia(&self.inertia, self.mass, &(self.center_of_mass - com))
            + shift_inertia(&other.inertia, other.mass, &(other.center_of_mass - com));
        Self {
            mass: total,
            center_of_mass: com,
            inertia,
        }
    }

    /// Validate that the properties are physically meaningful.
    pub fn validate(&self) -> crate::Result<()> {
        if self.mass < 0.0 || !self.mass.is_finite() {
            return Err(crate::SimError::invalid_mass("mass must be finite and >= 0"));
        }
        if !self.center_of_mass.iter().all(|x| x.is_finite()) {
            return Err(crate::SimError::invalid_mass(
                "center of mass must be finite",
            ));
        }
        let eigenvalues = self.inertia.symmetric_eigenvalues();
        if eigenvalues.iter().any(|&e| e < -1e-10) {
            return Err(crate::SimError::invalid_mass(
                "inertia tensor must be positive semi-definite",
            ));
        }
        Ok(())
    }
}

/// Parallel-axis theorem: inertia about a point offset `d` from the COM.
fn shift_inertia(inertia: &Matrix3<f64>, mass: f64, d: &Vector3<f64>) -> Matrix3<f64> {
    let d2 = d.norm_squared();
    inertia + mass * (Matrix3::identity() * d2 - d * d.transpose())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_inertia() {
        let m = MassProperties::sphere(1.0, 1.0);
        assert_relative_eq!(m.inertia[(0, 0)], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_box_inertia() {
        // Unit cube of mass 12: I = (1/12) * 12 * (1 + 1) = 2 on each axis
        let m = MassProperties::box_solid(12.0, Vector3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(m.inertia[(2, 2)], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_combine_point_masses() {
        // Two 1 kg point masses at ±1 on X: COM at origin, Iyy = Izz = 2.
        let a = MassProperties::point_mass(1.0).transformed(
            &Vector3::new(1.0, 0.0, 0.0),
            &UnitQuaternion::identity(),
        );
        let b = MassProperties::point_mass(1.0).transformed(
            &Vector3::new(-1.0, 0.0, 0.0),
            &UnitQuaternion::identity(),
        );
        let combined = a.combine(&b);
        assert_relative_eq!(combined.mass, 2.0, epsilon = 1e-12);
        assert_relative_eq!(combined.center_of_mass, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(combined.inertia[(1, 1)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(combined.inertia[(2, 2)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(combined.inertia[(0, 0)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_combine_preserves_total_mass() {
        let a = MassProperties::sphere(2.0, 0.3);
        let b = MassProperties::cylinder(0.5, 0.1, 0.4).transformed(
            &Vector3::new(0.0, 0.0, 0.5),
            &UnitQuaternion::from_euler_angles(0.1, 0.0, 0.0),
        );
        let c = a.combine(&b);
        assert_relative_eq!(c.mass, 2.5, epsilon = 1e-12);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_rotated_inertia_stays_symmetric() {
        let m = MassProperties::box_solid(3.0, Vector3::new(0.2, 0.4, 0.6)).transformed(
            &Vector3::zeros(),
            &UnitQuaternion::from_euler_angles(0.3, 0.5, 0.7),
        );
        assert_relative_eq!(m.inertia, m.inertia.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_mass_is_inert() {
        let m = MassProperties::zero();
        assert!(m.is_inert());
        assert_relative_eq!(m.inverse_mass(), 0.0, epsilon = 1e-12);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_negative_mass_rejected() {
        let m = MassProperties::new(-1.0, Vector3::zeros(), Matrix3::identity());
        assert!(m.validate().is_err());
    }
}
