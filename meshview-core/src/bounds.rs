/// World-space axis-aligned bounds of a mesh
use nalgebra::Vector3;

use crate::geometry::Mesh;

/// Axis-aligned box described by its center and full extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    pub center: Vector3<f32>,
    pub size: Vector3<f32>,
}

impl BoundingVolume {
    pub fn from_min_max(min: &Vector3<f32>, max: &Vector3<f32>) -> Self {
        Self {
            center: (min + max) * 0.5,
            size: max - min,
        }
    }

    /// Zero-size volume at `point`
    pub fn empty_at(point: Vector3<f32>) -> Self {
        Self {
            center: point,
            size: Vector3::zeros(),
        }
    }

    pub fn min(&self) -> Vector3<f32> {
        self.center - self.size * 0.5
    }

    pub fn max(&self) -> Vector3<f32> {
        self.center + self.size * 0.5
    }

    pub fn max_dimension(&self) -> f32 {
        self.size.max()
    }

    pub fn is_degenerate(&self) -> bool {
        self.max_dimension() <= 0.0
    }
}

/// Computes bounding volumes from current vertex data and transform
pub struct GeometryBounds;

impl GeometryBounds {
    /// Bounds of every vertex after the mesh's world transform.
    ///
    /// A mesh with no vertices yields a zero-size volume at its position.
    pub fn compute(mesh: &Mesh) -> BoundingVolume {
        let world = mesh.transform.matrix();
        let mut points = mesh
            .vertices()
            .map(|v| world.transform_point(&v.position).coords);

        let Some(first) = points.next() else {
            return BoundingVolume::empty_at(mesh.transform.position);
        };

        let (min, max) = points.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p)));
        BoundingVolume::from_min_max(&min, &max)
    }
}
