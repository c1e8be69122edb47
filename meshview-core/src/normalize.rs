/// Re-centering and up-axis correction of loaded meshes
use std::f32::consts::FRAC_PI_2;

use crate::bounds::GeometryBounds;
use crate::geometry::Mesh;

/// Parameters for [`ModelNormalizer`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeParams {
    /// Rotation about X (radians) taking the source up axis to +Y.
    /// The default turns a Z-up, Y-forward model upright.
    pub up_rotation_x: f32,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            up_rotation_x: -FRAC_PI_2,
        }
    }
}

/// Moves a mesh so its bounds center on the origin with +Y up.
///
/// Only the transform is touched; vertex data stays in source coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelNormalizer {
    pub params: NormalizeParams,
}

impl ModelNormalizer {
    pub fn new(params: NormalizeParams) -> Self {
        Self { params }
    }

    pub fn normalize(&self, mesh: &mut Mesh) {
        let native = GeometryBounds::compute(mesh);
        mesh.transform.translate(&-native.center);

        // Same correction for every input, whatever its format
        mesh.transform.rotation.x = self.params.up_rotation_x;

        // Axis-aligned bounds shift under rotation, so center once more
        let rotated = GeometryBounds::compute(mesh);
        mesh.transform.translate(&-rotated.center);
    }
}
