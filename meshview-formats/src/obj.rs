/// Wavefront OBJ parser
///
/// Reads `v`, `vn` and `f` records. Polygons are fan-triangulated and each
/// `o`/`g` record starts a new geometry buffer. Texture coordinates,
/// materials and smoothing groups are skipped.
use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::take_till1,
    character::complete::{char, i64 as integer, space0, space1},
    combinator::{opt, rest},
    multi::many1,
    number::complete::float,
    sequence::{preceded, tuple},
    IResult,
};

use meshview_core::{Geometry, Mesh, Triangle, Vertex};

use crate::FormatError;

/// Indices of one face corner; the texture coordinate is skipped
#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceRef {
    position: i64,
    normal: Option<i64>,
}

fn keyword(input: &str) -> IResult<&str, &str> {
    preceded(space0, take_till1(|c: char| c.is_whitespace()))(input)
}

fn vec3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    tuple((preceded(space1, float), preceded(space1, float), preceded(space1, float)))(input)
}

fn face_ref(input: &str) -> IResult<&str, FaceRef> {
    let (input, position) = integer(input)?;
    let (input, _texcoord) = opt(preceded(char('/'), opt(integer)))(input)?;
    let (input, normal) = opt(preceded(char('/'), opt(integer)))(input)?;
    Ok((
        input,
        FaceRef {
            position,
            normal: normal.flatten(),
        },
    ))
}

fn face(input: &str) -> IResult<&str, Vec<FaceRef>> {
    many1(preceded(space1, face_ref))(input)
}

fn name(input: &str) -> IResult<&str, &str> {
    preceded(space0, rest)(input)
}

/// Resolve a 1-based (or negative, end-relative) OBJ index
fn resolve(index: i64, len: usize, line: usize, what: &str) -> Result<usize, FormatError> {
    let resolved = if index > 0 {
        index - 1
    } else {
        len as i64 + index
    };

    if index == 0 || resolved < 0 || resolved >= len as i64 {
        return Err(FormatError::Obj {
            line,
            message: format!("{} index {} out of range (have {})", what, index, len),
        });
    }
    Ok(resolved as usize)
}

#[derive(Default)]
struct ObjBuilder {
    positions: Vec<Point3<f32>>,
    normals: Vec<Vector3<f32>>,
    mesh: Mesh,
    current: Geometry,
    all_faces_have_normals: bool,
}

impl ObjBuilder {
    fn new() -> Self {
        Self {
            all_faces_have_normals: true,
            ..Self::default()
        }
    }

    fn flush(&mut self) {
        if self.current.triangles.is_empty() {
            return;
        }
        let mut geometry = std::mem::take(&mut self.current);
        geometry.has_normals = self.all_faces_have_normals;
        self.mesh.add_geometry(geometry);
        self.all_faces_have_normals = true;
    }

    fn add_face(&mut self, refs: &[FaceRef], line: usize) -> Result<(), FormatError> {
        if refs.len() < 3 {
            return Err(FormatError::Obj {
                line,
                message: "face must have at least 3 vertices".to_string(),
            });
        }

        let mut corners = Vec::with_capacity(refs.len());
        for r in refs {
            let position = self.positions[resolve(r.position, self.positions.len(), line, "vertex")?];
            let normal = match r.normal {
                Some(n) => self.normals[resolve(n, self.normals.len(), line, "normal")?],
                None => {
                    self.all_faces_have_normals = false;
                    Vector3::zeros()
                }
            };
            corners.push(Vertex { position, normal });
        }

        for i in 1..corners.len() - 1 {
            self.current
                .add_triangle(Triangle::new(corners[0], corners[i], corners[i + 1]));
        }
        Ok(())
    }

    fn finish(mut self) -> Mesh {
        self.flush();
        self.mesh
    }
}

fn malformed(line: usize, record: &str) -> FormatError {
    FormatError::Obj {
        line,
        message: format!("malformed '{}' record", record),
    }
}

/// Logical records with their starting line number; a trailing `\`
/// joins the next physical line
fn records(text: &str) -> Vec<(usize, String)> {
    let mut records = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, raw) in text.lines().enumerate() {
        let (line, mut record) = pending.take().unwrap_or_else(|| (index + 1, String::new()));
        match raw.strip_suffix('\\') {
            Some(head) => {
                record.push_str(head);
                record.push(' ');
                pending = Some((line, record));
            }
            None => {
                record.push_str(raw);
                records.push((line, record));
            }
        }
    }
    records.extend(pending);
    records
}

/// Parse an OBJ file into a mesh with one geometry per object or group
pub fn parse_obj(data: &[u8]) -> Result<Mesh, FormatError> {
    let text = String::from_utf8_lossy(data);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let mut builder = ObjBuilder::new();

    for (line, raw) in records(text) {
        let content = raw.split('#').next().unwrap_or("").trim_end();
        if content.trim().is_empty() {
            continue;
        }

        let (args, record) = keyword(content).map_err(|_| malformed(line, content))?;
        match record {
            "v" => {
                let (_, (x, y, z)) = vec3(args).map_err(|_| malformed(line, record))?;
                builder.positions.push(Point3::new(x, y, z));
            }
            "vn" => {
                let (_, (x, y, z)) = vec3(args).map_err(|_| malformed(line, record))?;
                builder.normals.push(Vector3::new(x, y, z));
            }
            "f" => {
                let (_, refs) = face(args).map_err(|_| malformed(line, record))?;
                builder.add_face(&refs, line)?;
            }
            "o" | "g" => {
                builder.flush();
                if record == "o" && builder.mesh.name.is_none() {
                    if let Ok((_, object)) = name(args) {
                        if !object.is_empty() {
                            builder.mesh.name = Some(object.to_string());
                        }
                    }
                }
            }
            _ => {
                // vt, vp, s, usemtl, mtllib, l, p
            }
        }
    }

    let mesh = builder.finish();
    if mesh.geometries.is_empty() {
        log::debug!("OBJ contained no faces");
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_triangle() {
        let obj = r#"
# Simple triangle
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
f 1//1 2//1 3//1
"#;
        let mesh = parse_obj(obj.as_bytes()).unwrap();
        assert_eq!(mesh.geometries.len(), 1);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.geometries[0].has_normals);
        assert_eq!(mesh.geometries[0].triangles[0].vertices[0].normal, Vector3::z());
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = parse_obj(obj.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert!(!mesh.geometries[0].has_normals);
    }

    #[test]
    fn test_texture_coords_and_negative_indices() {
        let obj = "v 0 0 0\nv 2 0 0\nv 0 3 0\nvt 0 0\nvt 1 0\nvt 0 1\nf -3/1 -2/2 -1/3\n";
        let mesh = parse_obj(obj.as_bytes()).unwrap();
        let triangle = &mesh.geometries[0].triangles[0];
        assert_eq!(triangle.vertices[1].position, Point3::new(2.0, 0.0, 0.0));
        assert_eq!(triangle.vertices[2].position, Point3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn test_objects_become_separate_geometries() {
        let obj = "o first\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\ng second\nf 3 2 1\nusemtl steel\n";
        let mesh = parse_obj(obj.as_bytes()).unwrap();
        assert_eq!(mesh.name.as_deref(), Some("first"));
        assert_eq!(mesh.geometries.len(), 2);
    }

    #[test]
    fn test_bad_index_reports_line() {
        let obj = "v 0 0 0\nv 1 0 0\nf 1 2 7\n";
        match parse_obj(obj.as_bytes()) {
            Err(FormatError::Obj { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected OBJ error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_vertex() {
        assert!(parse_obj(b"v 1.0 oops 2.0\n").is_err());
        assert!(parse_obj(b"v 0 0 0\nf 1 1\n").is_err());
    }

    #[test]
    fn test_leading_byte_order_mark() {
        let obj = "\u{feff}v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = parse_obj(obj.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.geometries[0].triangles[0].vertices[0].position, Point3::origin());
    }

    #[test]
    fn test_continuation_lines() {
        let obj = "v 0 0 \\\n 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 \\\n  4 3\n";
        let mesh = parse_obj(obj.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.geometries[0].triangles[0].vertices[0].position, Point3::origin());

        // Joined records report the line they start on
        let obj = "v 0 0 0\nv 1 0 0\nf 1 \\\n 2 9\n";
        match parse_obj(obj.as_bytes()) {
            Err(FormatError::Obj { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected OBJ error, got {:?}", other),
        }
    }

    #[test]
    fn test_no_faces_is_empty_mesh() {
        let mesh = parse_obj(b"# nothing here\nv 1 2 3\n").unwrap();
        assert!(mesh.geometries.is_empty());
    }
}
