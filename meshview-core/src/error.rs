/// Failures a model load can end in
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("Failed to fetch model: {0}")]
    Fetch(String),

    #[error("Unsupported file format: {0}. Only OBJ and STL are supported.")]
    UnsupportedFormat(String),

    #[error("Error parsing model: {0}")]
    Parse(String),

    /// A newer load superseded this one
    #[error("Load cancelled")]
    Cancelled,
}

impl LoadError {
    pub fn fetch<T: ToString>(msg: T) -> Self {
        LoadError::Fetch(msg.to_string())
    }

    pub fn parse<T: ToString>(msg: T) -> Self {
        LoadError::Parse(msg.to_string())
    }

    /// Whether the error should reach the user
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, LoadError::Cancelled)
    }
}

/// Result type alias for load operations
pub type LoadResult<T> = Result<T, LoadError>;
