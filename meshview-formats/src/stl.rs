/// STL file parser for binary and ASCII formats
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, tuple},
    IResult,
};

use meshview_core::{Geometry, Triangle, Vertex};

use crate::FormatError;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Geometry, FormatError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(FormatError::Stl("file too small to be a valid STL".to_string()));
    }

    let (body, _header) = take::<_, _, ()>(HEADER_LEN)(data).map_err(|_| FormatError::Truncated)?;
    let (body, triangle_count) = le_u32::<_, ()>(body).map_err(|_| FormatError::Truncated)?;
    let triangle_count = triangle_count as usize;

    if body.len() / FACET_LEN < triangle_count {
        return Err(FormatError::Stl(format!(
            "header declares {} triangles but only {} bytes follow",
            triangle_count,
            body.len()
        )));
    }

    let (_, triangles) = count(binary_facet, triangle_count)(body).map_err(|_| FormatError::Truncated)?;

    let mut geometry = Geometry::with_capacity(triangles.len());
    for triangle in triangles {
        geometry.add_triangle(triangle);
    }
    geometry.has_normals = true;
    Ok(geometry)
}

fn binary_vec3(input: &[u8]) -> IResult<&[u8], (f32, f32, f32)> {
    tuple((le_f32, le_f32, le_f32))(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, (nx, ny, nz)) = binary_vec3(input)?;
    let (input, corners) = count(binary_vec3, 3)(input)?;
    // Attribute byte count, unused
    let (input, _) = le_u16(input)?;

    let v = |(x, y, z): (f32, f32, f32)| Vertex::new(x, y, z, nx, ny, nz);
    Ok((input, Triangle::new(v(corners[0]), v(corners[1]), v(corners[2]))))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Geometry, FormatError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, geometry)) => Ok(geometry),
        Err(e) => Err(FormatError::Stl(format!("failed to parse ASCII STL: {:?}", e))),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Geometry> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = not_line_ending(input)?;

    let mut geometry = Geometry::with_capacity(triangles.len());
    for triangle in triangles {
        geometry.add_triangle(triangle);
    }
    geometry.has_normals = true;

    Ok((input, geometry))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Vertex::new(x, y, z, normal.0, normal.1, normal.2)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Geometry, FormatError> {
    // Binary exporters often start the header with "solid" too
    let start = data.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(data.len());
    if !data[start..].starts_with(b"solid") {
        return parse_binary_stl(data);
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return parse_binary_stl(data);
    };

    match parse_ascii_stl(text) {
        Ok(geometry) => Ok(geometry),
        // Text that is not a valid binary file either was meant as ASCII
        Err(ascii_err) => parse_binary_stl(data).map_err(|_| ascii_err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_stl(facets: &[[f32; 12]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&(facets.len() as u32).to_le_bytes());
        for facet in facets {
            for value in facet {
                data.extend_from_slice(&value.to_le_bytes());
            }
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_parse_binary_header() {
        let data = binary_stl(&[]);
        let geometry = parse_binary_stl(&data).unwrap();
        assert_eq!(geometry.triangles.len(), 0);
    }

    #[test]
    fn test_parse_binary_facet() {
        let data = binary_stl(&[[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]]);
        let geometry = parse_stl(&data).unwrap();
        assert_eq!(geometry.triangles.len(), 1);
        let v = geometry.triangles[0].vertices[1];
        assert_eq!((v.position.x, v.position.y, v.position.z), (1.0, 0.0, 0.0));
        assert_eq!(v.normal.z, 1.0);
    }

    #[test]
    fn test_truncated_binary() {
        let mut data = binary_stl(&[[0.0; 12]]);
        data.truncate(data.len() - 10);
        assert!(parse_binary_stl(&data).is_err());
        assert!(parse_binary_stl(&[0u8; 20]).is_err());
    }

    #[test]
    fn test_parse_named_ascii() {
        let text = "solid bracket\n\
            facet normal 0 0 1\n\
              outer loop\n\
                vertex 0 0 0\n\
                vertex 1 0 0\n\
                vertex 0 1 0\n\
              endloop\n\
            endfacet\n\
            endsolid bracket\n";
        let geometry = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(geometry.triangles.len(), 1);
        assert_eq!(geometry.triangles[0].vertices[2].position.y, 1.0);
    }

    #[test]
    fn test_malformed_ascii_reports_ascii_error() {
        let text = "solid part\n\
            facet normal 0 0 1\n\
              outer loop\n\
                vertex 0 0 0\n\
                vertex 1 zero 0\n\
                vertex 0 1 0\n\
              endloop\n\
            endfacet\n\
            endsolid part\n";
        match parse_stl(text.as_bytes()) {
            Err(FormatError::Stl(message)) => assert!(message.contains("ASCII"), "{}", message),
            other => panic!("expected ASCII STL error, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_with_solid_header() {
        let mut data = binary_stl(&[[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]]);
        data[..5].copy_from_slice(b"solid");
        let geometry = parse_stl(&data).unwrap();
        assert_eq!(geometry.triangles.len(), 1);
    }
}
