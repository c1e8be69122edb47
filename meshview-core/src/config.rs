/// Viewer configuration loaded from JSON
use std::path::Path;

use nalgebra::{Point3, Vector3};
use serde::Deserialize;

use crate::camera::Camera;
use crate::framing::FramingParams;
use crate::geometry::{Material, Side};
use crate::normalize::NormalizeParams;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub up_rotation_x_degrees: f32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            up_rotation_x_degrees: -90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    pub margin: f32,
    pub view_direction: [f32; 3],
    pub min_distance: f32,
}

impl Default for FramingConfig {
    fn default() -> Self {
        let params = FramingParams::default();
        let d = params.view_direction;
        Self {
            margin: params.margin,
            view_direction: [d.x, d.y, d.z],
            min_distance: params.min_distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub color: u32,
    pub shininess: f32,
    pub double_sided: bool,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            color: 0x7c9cb0,
            shininess: 30.0,
            double_sided: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            position: [5.0, 5.0, 5.0],
        }
    }
}

/// Tunables for normalization, framing, the display material and the camera
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub normalize: NormalizeConfig,
    pub framing: FramingConfig,
    pub material: MaterialConfig,
    pub camera: CameraConfig,
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn normalize_params(&self) -> NormalizeParams {
        NormalizeParams {
            up_rotation_x: self.normalize.up_rotation_x_degrees.to_radians(),
        }
    }

    pub fn framing_params(&self) -> FramingParams {
        FramingParams {
            margin: self.framing.margin,
            view_direction: Vector3::from(self.framing.view_direction),
            min_distance: self.framing.min_distance,
        }
    }

    pub fn material(&self) -> Material {
        let side = if self.material.double_sided {
            Side::Double
        } else {
            Side::Front
        };
        Material::phong(self.material.color, self.material.shininess, side)
    }

    /// Camera for a `width` x `height` viewport
    pub fn camera(&self, width: u32, height: u32) -> Camera {
        let mut camera = Camera::new(width, height);
        camera.fov_degrees = self.camera.fov_degrees;
        camera.position = Point3::from(self.camera.position);
        camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_builtin_params() {
        let config = ViewerConfig::default();
        assert_eq!(config.framing_params(), FramingParams::default());
        assert!((config.normalize_params().up_rotation_x - NormalizeParams::default().up_rotation_x).abs() < 1e-6);
        assert_eq!(config.material(), Material::default());
    }

    #[test]
    fn test_partial_json() {
        let config = ViewerConfig::from_json_str(
            r#"{ "framing": { "margin": 2.0 }, "camera": { "fov_degrees": 60.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.framing.margin, 2.0);
        assert_eq!(config.framing.view_direction, [1.0, 0.7, 1.0]);
        assert_eq!(config.camera(800, 600).fov_degrees, 60.0);
        assert_eq!(config.normalize, NormalizeConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ViewerConfig::from_json_str("{ \"framing\": 3 }"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ViewerConfig::load("/nonexistent/meshview.json"),
            Err(ConfigError::Read { .. })
        ));
    }
}
