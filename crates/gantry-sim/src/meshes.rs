//! Primitive mesh tessellation for render consumers.
//!
//! Appearances and physics-shape drawing need triangle meshes; these
//! generators produce modest fixed tessellations. Consumers that want
//! smoother primitives can re-tessellate from the shape parameters.

use std::f64::consts::TAU;

use nalgebra::{Point3, Vector3};

use crate::render::MeshData;

/// A box mesh with full extents (width, depth, height).
#[must_use]
pub fn box_mesh(width: f64, depth: f64, height: f64) -> MeshData {
    let (hx, hy, hz) = (0.5 * width, 0.5 * depth, 0.5 * height);
    let mut vertices = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    let faces: [(Vector3<f64>, [Point3<f64>; 4]); 6] = [
        (
            Vector3::x(),
            [
                Point3::new(hx, -hy, -hz),
                Point3::new(hx, hy, -hz),
                Point3::new(hx, hy, hz),
                Point3::new(hx, -hy, hz),
            ],
        ),
        (
            -Vector3::x(),
            [
                Point3::new(-hx, hy, -hz),
                Point3::new(-hx, -hy, -hz),
                Point3::new(-hx, -hy, hz),
                Point3::new(-hx, hy, hz),
            ],
        ),
        (
            Vector3::y(),
            [
                Point3::new(hx, hy, -hz),
                Point3::new(-hx, hy, -hz),
                Point3::new(-hx, hy, hz),
                Point3::new(hx, hy, hz),
            ],
        ),
        (
            -Vector3::y(),
            [
                Point3::new(-hx, -hy, -hz),
                Point3::new(hx, -hy, -hz),
                Point3::new(hx, -hy, hz),
                Point3::new(-hx, -hy, hz),
            ],
        ),
        (
            Vector3::z(),
            [
                Point3::new(-hx, -hy, hz),
                Point3::new(hx, -hy, hz),
                Point3::new(hx, hy, hz),
                Point3::new(-hx, hy, hz),
            ],
        ),
        (
            -Vector3::z(),
            [
                Point3::new(-hx, hy, -hz),
                Point3::new(hx, hy, -hz),
                Point3::new(hx, -hy, -hz),
                Point3::new(-hx, -hy, -hz),
            ],
        ),
    ];

    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for corner in corners {
            vertices.push(corner);
            normals.push(normal);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData {
        vertices,
        normals,
        tex_coords: Vec::new(),
        indices,
    }
}

/// A UV sphere mesh.
#[must_use]
pub fn sphere_mesh(radius: f64, segments: u32, rings: u32) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut vertices = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let phi = std::f64::consts::PI * f64::from(ring) / f64::from(rings);
        for segment in 0..=segments {
            let theta = TAU * f64::from(segment) / f64::from(segments);
            let normal = Vector3::new(
                phi.sin() * theta.cos(),
                phi.sin() * theta.sin(),
                phi.cos(),
            );
            vertices.push(Point3::from(normal * radius));
            normals.push(normal);
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    MeshData {
        vertices,
        normals,
        tex_coords: Vec::new(),
        indices,
    }
}

/// A closed cylinder mesh along Z.
#[must_use]
pub fn cylinder_mesh(radius: f64, height: f64, segments: u32) -> MeshData {
    let segments = segments.max(3);
    let hz = 0.5 * height;
    let mut vertices = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    // Side quads.
    for segment in 0..=segments {
        let theta = TAU * f64::from(segment) / f64::from(segments);
        let normal = Vector3::new(theta.cos(), theta.sin(), 0.0);
        vertices.push(Point3::new(radius * normal.x, radius * normal.y, -hz));
        normals.push(normal);
        vertices.push(Point3::new(radius * normal.x, radius * normal.y, hz));
        normals.push(normal);
    }
    for segment in 0..segments {
        let a = 2 * segment;
        indices.extend_from_slice(&[a, a + 2, a + 1, a + 1, a + 2, a + 3]);
    }

    // Caps as triangle fans around center vertices.
    for (cap_z, normal) in [(-hz, -Vector3::z()), (hz, Vector3::z())] {
        let center = vertices.len() as u32;
        vertices.push(Point3::new(0.0, 0.0, cap_z));
        normals.push(normal);
        let ring_base = vertices.len() as u32;
        for segment in 0..=segments {
            let theta = TAU * f64::from(segment) / f64::from(segments);
            vertices.push(Point3::new(
                radius * theta.cos(),
                radius * theta.sin(),
                cap_z,
            ));
            normals.push(normal);
        }
        for segment in 0..segments {
            let a = ring_base + segment;
            if normal.z > 0.0 {
                indices.extend_from_slice(&[center, a, a + 1]);
            } else {
                indices.extend_from_slice(&[center, a + 1, a]);
            }
        }
    }

    MeshData {
        vertices,
        normals,
        tex_coords: Vec::new(),
        indices,
    }
}

/// A small cube used to mark origins and sensor positions.
#[must_use]
pub fn marker_mesh(size: f64) -> MeshData {
    box_mesh(size, size, size)
}
