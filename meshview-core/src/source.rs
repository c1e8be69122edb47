/// Format detection and dispatch to the mesh parser
use crate::error::{LoadError, LoadResult};
use crate::geometry::{Geometry, Mesh};

/// Mesh file formats the viewer can display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Obj,
    Stl,
}

impl ModelFormat {
    /// Detect the format from a URL or path suffix, ignoring case,
    /// query string and fragment.
    pub fn from_url(url: &str) -> LoadResult<Self> {
        let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
        let lower = path.to_ascii_lowercase();

        if lower.ends_with(".obj") {
            Ok(ModelFormat::Obj)
        } else if lower.ends_with(".stl") {
            Ok(ModelFormat::Stl)
        } else {
            Err(LoadError::UnsupportedFormat(path.to_string()))
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ModelFormat::Obj => "obj",
            ModelFormat::Stl => "stl",
        }
    }
}

/// Decoder for the raw bytes of each supported format
pub trait MeshParser {
    fn parse_obj(&self, bytes: &[u8]) -> LoadResult<Mesh>;
    fn parse_stl(&self, bytes: &[u8]) -> LoadResult<Geometry>;
}

/// Fetched bytes tagged with their format
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Obj(Vec<u8>),
    Stl(Vec<u8>),
}

impl ModelSource {
    pub fn new(format: ModelFormat, bytes: Vec<u8>) -> Self {
        match format {
            ModelFormat::Obj => ModelSource::Obj(bytes),
            ModelFormat::Stl => ModelSource::Stl(bytes),
        }
    }

    pub fn format(&self) -> ModelFormat {
        match self {
            ModelSource::Obj(_) => ModelFormat::Obj,
            ModelSource::Stl(_) => ModelFormat::Stl,
        }
    }

    pub fn parse<P: MeshParser + ?Sized>(&self, parser: &P) -> LoadResult<Mesh> {
        match self {
            ModelSource::Obj(bytes) => parser.parse_obj(bytes),
            ModelSource::Stl(bytes) => parser.parse_stl(bytes).map(Mesh::from_geometry),
        }
    }
}
