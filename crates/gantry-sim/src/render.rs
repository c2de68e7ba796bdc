//! The render boundary.
//!
//! The kernel never talks to a GPU. Per usage class it exposes a final list
//! of (mesh, matrix snapshot, surface) draw tuples, and camera-type sensors
//! consume a synchronous offscreen-render primitive through the
//! [`OffscreenRenderer`] trait. A windowed viewer, a software rasterizer or
//! a test double all plug in the same way.

use gantry_types::{Matrix4, Pose, Rgba};
use nalgebra::{Point3, Vector3};

/// Handle to a registered render mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Handle to a registered surface (colors, texture name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u32);

/// Triangle mesh data for render consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,
    /// Vertex normals; empty when the consumer should generate them.
    pub normals: Vec<Vector3<f64>>,
    /// Texture coordinates; empty when untextured.
    pub tex_coords: Vec<[f64; 2]>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

/// Surface data for render consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceData {
    /// Diffuse color.
    pub diffuse: Rgba,
    /// Ambient color.
    pub ambient: Rgba,
    /// Specular color.
    pub specular: Rgba,
    /// Shininess exponent.
    pub shininess: f64,
    /// Texture resource name, if textured.
    pub texture: Option<String>,
}

impl Default for SurfaceData {
    fn default() -> Self {
        Self {
            diffuse: Rgba::WHITE,
            ambient: Rgba::WHITE,
            specular: Rgba::BLACK,
            shininess: 0.0,
            texture: None,
        }
    }
}

/// A light for render consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct LightInfo {
    /// World position.
    pub position: Point3<f64>,
    /// Diffuse color.
    pub diffuse: Rgba,
    /// Ambient color.
    pub ambient: Rgba,
    /// Constant, linear and quadratic attenuation.
    pub attenuation: [f64; 3],
}

/// One draw call: a mesh at a matrix snapshot with a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    /// The mesh to draw.
    pub mesh: MeshHandle,
    /// World transform snapshot taken from the matrix cache.
    pub matrix: Matrix4<f64>,
    /// The surface to draw with.
    pub surface: SurfaceHandle,
}

/// Camera parameters for an offscreen render.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraView {
    /// Camera pose; the camera looks along local +X with +Z up.
    pub pose: Pose,
    /// Horizontal opening angle (rad).
    pub angle_x: f64,
    /// Vertical opening angle (rad).
    pub angle_y: f64,
}

/// Synchronous offscreen rendering, consumed by camera-type sensors.
pub trait OffscreenRenderer {
    /// Render an RGBA8 buffer of `width * height * 4` bytes.
    fn render(
        &mut self,
        width: u32,
        height: u32,
        view: &CameraView,
        items: &[DrawItem],
        lights: &[LightInfo],
    ) -> Vec<u8>;
}

/// A renderer stub producing flat buffers; useful for headless runs and
/// tests that only need the camera plumbing exercised.
#[derive(Debug, Default)]
pub struct NullRenderer {
    /// Number of render calls served.
    pub calls: u32,
}

impl OffscreenRenderer for NullRenderer {
    fn render(
        &mut self,
        width: u32,
        height: u32,
        _view: &CameraView,
        _items: &[DrawItem],
        _lights: &[LightInfo],
    ) -> Vec<u8> {
        self.calls += 1;
        vec![0; (width * height * 4) as usize]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_null_renderer_buffer_size() {
        let mut renderer = NullRenderer::default();
        let view = CameraView {
            pose: Pose::identity(),
            angle_x: 1.0,
            angle_y: 0.8,
        };
        let buffer = renderer.render(4, 3, &view, &[], &[]);
        assert_eq!(buffer.len(), 48);
        assert_eq!(renderer.calls, 1);
    }
}
