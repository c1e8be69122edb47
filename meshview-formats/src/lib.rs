/// Meshview Formats - STL and OBJ decoding and encoding
///
/// Provides the parser the viewport session dispatches to, plus writers
/// for exporting a model back out in either format.

pub mod export;
pub mod obj;
pub mod stl;

use meshview_core::{Geometry, LoadError, LoadResult, Mesh, MeshParser};
use thiserror::Error;

pub use export::export;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("STL: {0}")]
    Stl(String),

    #[error("STL: unexpected end of file")]
    Truncated,

    #[error("OBJ line {line}: {message}")]
    Obj { line: usize, message: String },
}

impl From<FormatError> for LoadError {
    fn from(err: FormatError) -> Self {
        LoadError::Parse(err.to_string())
    }
}

/// Parser backed by this crate's STL and OBJ readers
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatParsers;

impl MeshParser for FormatParsers {
    fn parse_obj(&self, bytes: &[u8]) -> LoadResult<Mesh> {
        Ok(obj::parse_obj(bytes)?)
    }

    fn parse_stl(&self, bytes: &[u8]) -> LoadResult<Geometry> {
        Ok(stl::parse_stl(bytes)?)
    }
}
