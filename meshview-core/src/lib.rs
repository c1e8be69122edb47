/// Meshview Core Library - model normalization and camera framing
///
/// Takes parsed meshes of unknown scale, orientation and origin and presents
/// them centered, upright and framed. Parsing, fetching and drawing are left
/// to the caller.

pub mod bounds;
pub mod camera;
pub mod cancel;
pub mod config;
pub mod error;
pub mod framing;
pub mod geometry;
pub mod normalize;
pub mod resources;
pub mod scene;
pub mod session;
pub mod source;
pub mod transform;

// Re-export commonly used types
pub use bounds::{BoundingVolume, GeometryBounds};
pub use camera::{Camera, OrbitControls, ProjectionMode};
pub use cancel::CancelToken;
pub use config::{ConfigError, ViewerConfig};
pub use error::{LoadError, LoadResult};
pub use framing::{CameraFramer, FramingParams};
pub use geometry::{Geometry, Material, Mesh, Side, Triangle, Vertex};
pub use normalize::{ModelNormalizer, NormalizeParams};
pub use resources::ResourceLedger;
pub use scene::{MeshId, Scene};
pub use session::{LoadOutcome, LoadTicket, SessionPhase, ViewportSession};
pub use source::{MeshParser, ModelFormat, ModelSource};
pub use transform::{ModelTransform, RotationState, Transform};
