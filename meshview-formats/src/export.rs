/// Writers for exporting meshes back to STL or OBJ
use std::fmt::Write as _;

use meshview_core::{Mesh, ModelFormat};

const STL_HEADER: &[u8] = b"meshview binary STL export";

/// Encode `mesh` in `format`, in the coordinates it was loaded with
pub fn export(mesh: &Mesh, format: ModelFormat) -> Vec<u8> {
    match format {
        ModelFormat::Stl => write_binary_stl(mesh),
        ModelFormat::Obj => write_obj(mesh).into_bytes(),
    }
}

/// Binary STL with one facet per triangle and winding-order normals
pub fn write_binary_stl(mesh: &Mesh) -> Vec<u8> {
    let triangle_count = mesh.triangle_count();
    let mut data = Vec::with_capacity(84 + triangle_count * 50);

    let mut header = [0u8; 80];
    header[..STL_HEADER.len()].copy_from_slice(STL_HEADER);
    data.extend_from_slice(&header);
    data.extend_from_slice(&(triangle_count as u32).to_le_bytes());

    for triangle in mesh.geometries.iter().flat_map(|g| g.triangles.iter()) {
        let normal = triangle.calculate_normal();
        for value in normal.iter() {
            data.extend_from_slice(&value.to_le_bytes());
        }
        for vertex in &triangle.vertices {
            for value in vertex.position.coords.iter() {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }

    data
}

/// OBJ text with one group per geometry buffer
pub fn write_obj(mesh: &Mesh) -> String {
    let mut out = String::from("# meshview OBJ export\n");
    if let Some(name) = &mesh.name {
        let _ = writeln!(out, "o {}", name);
    }

    // OBJ indices are global and 1-based
    let mut base = 1;
    for (index, geometry) in mesh.geometries.iter().enumerate() {
        let _ = writeln!(out, "g group{}", index);
        for vertex in geometry.vertices() {
            let p = vertex.position;
            let _ = writeln!(out, "v {} {} {}", p.x, p.y, p.z);
        }
        if geometry.has_normals {
            for vertex in geometry.vertices() {
                let n = vertex.normal;
                let _ = writeln!(out, "vn {} {} {}", n.x, n.y, n.z);
            }
        }
        for t in 0..geometry.triangles.len() {
            let a = base + t * 3;
            let (b, c) = (a + 1, a + 2);
            if geometry.has_normals {
                let _ = writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}");
            } else {
                let _ = writeln!(out, "f {a} {b} {c}");
            }
        }
        base += geometry.vertex_count();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{obj, stl};
    use meshview_core::GeometryBounds;
    use nalgebra::{Point3, Vector3};

    fn bracket() -> Mesh {
        let mut mesh = Mesh::cuboid(Point3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0));
        mesh.add_geometry(Mesh::cube(1.0).geometries.remove(0));
        mesh.name = Some("bracket".to_string());
        mesh
    }

    #[test]
    fn test_stl_export_reads_back() {
        let mesh = bracket();
        let data = export(&mesh, ModelFormat::Stl);
        assert_eq!(data.len(), 84 + 24 * 50);

        let geometry = stl::parse_stl(&data).unwrap();
        assert_eq!(geometry.triangles.len(), 24);
        assert_eq!(
            GeometryBounds::compute(&Mesh::from_geometry(geometry)),
            GeometryBounds::compute(&mesh)
        );
    }

    #[test]
    fn test_obj_export_reads_back() {
        let mesh = bracket();
        let data = export(&mesh, ModelFormat::Obj);

        let parsed = obj::parse_obj(&data).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("bracket"));
        assert_eq!(parsed.geometries.len(), 2);
        assert_eq!(parsed.triangle_count(), 24);
        assert!(parsed.geometries[1].has_normals);
        assert_eq!(parsed.geometries, mesh.geometries);
    }
}
