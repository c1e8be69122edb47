/// Rendering surface the session attaches meshes to
use nalgebra::Point3;

use crate::camera::{Camera, OrbitControls};

/// Identifier of a mesh installed by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u64);

/// Camera, orbit controls and the attached mesh slot.
///
/// A headless scene has no camera, so framing is skipped.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub camera: Option<Camera>,
    pub controls: Option<OrbitControls>,
    attached: Option<MeshId>,
}

impl Scene {
    pub fn headless() -> Self {
        Self::default()
    }

    /// Perspective camera at (5, 5, 5) looking at the origin, with damped orbit controls
    pub fn with_viewport(width: u32, height: u32) -> Self {
        let camera = Camera::new(width, height);
        let controls = OrbitControls::new(Point3::origin());
        Self {
            camera: Some(camera),
            controls: Some(controls),
            attached: None,
        }
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn attached(&self) -> Option<MeshId> {
        self.attached
    }

    /// Attach `id`, returning whatever was attached before
    pub fn attach(&mut self, id: MeshId) -> Option<MeshId> {
        self.attached.replace(id)
    }

    pub fn detach(&mut self) -> Option<MeshId> {
        self.attached.take()
    }

    /// Mutable camera and controls together, for framing
    pub fn camera_and_controls(&mut self) -> (Option<&mut Camera>, Option<&mut OrbitControls>) {
        (self.camera.as_mut(), self.controls.as_mut())
    }
}
