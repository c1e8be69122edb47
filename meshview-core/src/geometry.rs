/// Geometry primitives: vertices, triangle buffers and meshes
use nalgebra::{Point3, Vector3};

use crate::resources::ResourceLease;
use crate::transform::ModelTransform;

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }

    /// Vertex with no normal information
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z, 0.0, 0.0, 0.0)
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding order, or zero for a degenerate face
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1
            .cross(&edge2)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// One vertex buffer of non-indexed triangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub triangles: Vec<Triangle>,
    /// Whether the source supplied per-vertex normals
    pub has_normals: bool,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
            has_normals: false,
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn vertex_count(&self) -> usize {
        self.triangles.len() * 3
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.triangles.iter().flat_map(|t| t.vertices.iter())
    }

    /// Replace every vertex normal with its face normal.
    ///
    /// Triangles are not indexed, so no vertices are shared between faces and
    /// the face normal is the vertex normal.
    pub fn compute_vertex_normals(&mut self) {
        for triangle in &mut self.triangles {
            let normal = triangle.calculate_normal();
            for vertex in &mut triangle.vertices {
                vertex.normal = normal;
            }
        }
        self.has_normals = true;
    }

    /// True when any vertex normal is missing (zero length)
    pub fn lacks_normals(&self) -> bool {
        !self.has_normals || self.vertices().any(|v| v.normal.norm_squared() == 0.0)
    }
}

/// Which faces a material renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
    Double,
}

/// Phong-style surface material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// 0xRRGGBB
    pub color: u32,
    pub shininess: f32,
    pub side: Side,
}

impl Material {
    pub fn phong(color: u32, shininess: f32, side: Side) -> Self {
        Self {
            color,
            shininess,
            side,
        }
    }

    /// Color as linear 0..1 RGB components
    pub fn rgb(&self) -> [f32; 3] {
        [
            ((self.color >> 16) & 0xff) as f32 / 255.0,
            ((self.color >> 8) & 0xff) as f32 / 255.0,
            (self.color & 0xff) as f32 / 255.0,
        ]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::phong(0x7c9cb0, 30.0, Side::Double)
    }
}

/// A renderable model: geometry buffers, a material and a spatial transform
#[derive(Debug, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub geometries: Vec<Geometry>,
    pub material: Option<Material>,
    pub transform: ModelTransform,
    lease: Option<ResourceLease>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_geometry(geometry: Geometry) -> Self {
        Self {
            geometries: vec![geometry],
            ..Self::default()
        }
    }

    pub fn add_geometry(&mut self, geometry: Geometry) {
        self.geometries.push(geometry);
    }

    pub fn triangle_count(&self) -> usize {
        self.geometries.iter().map(|g| g.triangles.len()).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.geometries.iter().map(Geometry::vertex_count).sum()
    }

    /// All vertices across every geometry buffer, in local space
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.geometries.iter().flat_map(Geometry::vertices)
    }

    pub(crate) fn set_lease(&mut self, lease: ResourceLease) {
        if let Some(mut previous) = self.lease.replace(lease) {
            previous.release();
        }
    }

    pub fn is_leased(&self) -> bool {
        self.lease.as_ref().is_some_and(|l| !l.is_released())
    }

    /// Release geometry buffers and the material, returning the lease to its ledger
    pub fn dispose(&mut self) {
        self.geometries.clear();
        self.geometries.shrink_to_fit();
        self.material = None;
        if let Some(mut lease) = self.lease.take() {
            lease.release();
        }
    }

    /// A single point, the smallest possible mesh
    pub fn point(x: f32, y: f32, z: f32) -> Self {
        let v = Vertex::at(x, y, z);
        Self::from_geometry(Geometry {
            triangles: vec![Triangle::new(v, v, v)],
            has_normals: false,
        })
    }

    /// Axis-aligned box with the given extents, centered at `center`
    pub fn cuboid(center: Point3<f32>, size: Vector3<f32>) -> Self {
        let h = size / 2.0;
        let c = center;
        let corner = |sx: f32, sy: f32, sz: f32| Point3::new(c.x + sx * h.x, c.y + sy * h.y, c.z + sz * h.z);

        // Each face: outward normal, then four corners counter-clockwise
        let faces: [([f32; 3], [(f32, f32, f32); 4]); 6] = [
            ([0.0, 0.0, 1.0], [(-1.0, -1.0, 1.0), (1.0, -1.0, 1.0), (1.0, 1.0, 1.0), (-1.0, 1.0, 1.0)]),
            ([0.0, 0.0, -1.0], [(1.0, -1.0, -1.0), (-1.0, -1.0, -1.0), (-1.0, 1.0, -1.0), (1.0, 1.0, -1.0)]),
            ([0.0, 1.0, 0.0], [(-1.0, 1.0, 1.0), (1.0, 1.0, 1.0), (1.0, 1.0, -1.0), (-1.0, 1.0, -1.0)]),
            ([0.0, -1.0, 0.0], [(-1.0, -1.0, -1.0), (1.0, -1.0, -1.0), (1.0, -1.0, 1.0), (-1.0, -1.0, 1.0)]),
            ([1.0, 0.0, 0.0], [(1.0, -1.0, 1.0), (1.0, -1.0, -1.0), (1.0, 1.0, -1.0), (1.0, 1.0, 1.0)]),
            ([-1.0, 0.0, 0.0], [(-1.0, -1.0, -1.0), (-1.0, -1.0, 1.0), (-1.0, 1.0, 1.0), (-1.0, 1.0, -1.0)]),
        ];

        let mut geometry = Geometry::with_capacity(12);
        for (n, quad) in faces {
            let v = quad.map(|(sx, sy, sz)| {
                let p = corner(sx, sy, sz);
                Vertex::new(p.x, p.y, p.z, n[0], n[1], n[2])
            });
            geometry.add_triangle(Triangle::new(v[0], v[1], v[2]));
            geometry.add_triangle(Triangle::new(v[0], v[2], v[3]));
        }
        geometry.has_normals = true;

        Self::from_geometry(geometry)
    }

    /// Create a simple cube mesh centered at the origin
    pub fn cube(size: f32) -> Self {
        Self::cuboid(Point3::origin(), Vector3::repeat(size))
    }
}

impl Clone for Mesh {
    /// Clones share no resource lease; the copy is unaccounted until leased
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            geometries: self.geometries.clone(),
            material: self.material,
            transform: self.transform,
            lease: None,
        }
    }
}
