/// Placing the camera so a bounding volume fills the view
use nalgebra::{Point3, Vector3};

use crate::bounds::BoundingVolume;
use crate::camera::{Camera, OrbitControls};

/// Parameters for [`CameraFramer`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramingParams {
    /// Multiplier on the tight-fit distance
    pub margin: f32,
    /// Direction from the origin toward the camera; need not be unit length
    pub view_direction: Vector3<f32>,
    /// Fallback distance for zero-size bounds or a non-finite fit
    pub min_distance: f32,
}

impl Default for FramingParams {
    fn default() -> Self {
        Self {
            margin: 1.5,
            view_direction: Vector3::new(1.0, 0.7, 1.0),
            min_distance: 0.1,
        }
    }
}

/// Distance at which `max_dimension` spans a `fov_degrees` frustum, times `margin`
pub fn framing_distance(max_dimension: f32, fov_degrees: f32, margin: f32) -> f32 {
    let fov = fov_degrees.to_radians();
    max_dimension / (2.0 * (fov / 2.0).tan()) * margin
}

/// Camera position at `distance` along `direction` from the origin
pub fn camera_position(direction: &Vector3<f32>, distance: f32) -> Point3<f32> {
    let unit = direction
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3::z);
    Point3::from(unit * distance)
}

/// Near plane at `distance / CLIP_RATIO`, far plane at `distance * CLIP_RATIO`
const CLIP_RATIO: f32 = 100.0;

/// Frames normalized meshes from a fixed elevated diagonal
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraFramer {
    pub params: FramingParams,
}

impl CameraFramer {
    pub fn new(params: FramingParams) -> Self {
        Self { params }
    }

    /// Camera distance for `bounds` under a `fov_degrees` field of view
    pub fn distance_for(&self, bounds: &BoundingVolume, fov_degrees: f32) -> f32 {
        let distance = framing_distance(bounds.max_dimension(), fov_degrees, self.params.margin);
        if distance.is_finite() && distance > 0.0 {
            distance
        } else {
            self.params.min_distance
        }
    }

    /// Move the camera onto the viewing diagonal and aim it and the orbit
    /// pivot at the origin. The clip planes follow the distance so the mesh
    /// stays inside the frustum at any scale. Without a camera this does nothing.
    ///
    /// Returns the distance the camera was placed at.
    pub fn frame(
        &self,
        bounds: &BoundingVolume,
        camera: Option<&mut Camera>,
        controls: Option<&mut OrbitControls>,
    ) -> Option<f32> {
        let camera = camera?;

        let distance = self.distance_for(bounds, camera.fov_degrees);
        camera.position = camera_position(&self.params.view_direction, distance);
        camera.look_at(Point3::origin());
        camera.near = distance / CLIP_RATIO;
        camera.far = distance * CLIP_RATIO;

        if let Some(controls) = controls {
            controls.target = Point3::origin();
            controls.update(camera);
        }

        Some(distance)
    }
}
