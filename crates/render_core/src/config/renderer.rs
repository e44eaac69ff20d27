//! # Renderer Configuration
//!
//! Window, asset, projection and lighting settings consumed by the frame renderer.
//! Every section has defaults so a config file only needs to name what it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::foundation::math::Vec3;
use crate::render::lighting::{DirectionalLight, LightingParams};
use crate::render::shader::ShaderType;

/// Window creation parameters handed to the window collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Client area width in pixels
    pub width: u32,
    /// Client area height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "render_core".to_string(),
            width: 1024,
            height: 768,
        }
    }
}

/// Perspective projection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clip plane distance
    pub near: f32,
    /// Far clip plane distance
    pub far: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 50.0,
            near: 25.0,
            far: 10000.0,
        }
    }
}

/// Initial lighting parameters, applied when the renderer loads its data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Ambient light color
    pub ambient: [f32; 3],
    /// Directional light direction
    pub direction: [f32; 3],
    /// Directional light diffuse color
    pub diffuse: [f32; 3],
    /// Directional light specular color
    pub specular: [f32; 3],
    /// Specular exponent
    pub specular_power: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: [0.35, 0.35, 0.35],
            direction: [0.3, 0.3, 0.8],
            diffuse: [0.78, 0.88, 1.0],
            specular: [0.8, 0.8, 0.8],
            specular_power: 300.0,
        }
    }
}

impl From<LightingConfig> for LightingParams {
    fn from(config: LightingConfig) -> Self {
        Self {
            ambient_color: Vec3::from(config.ambient),
            directional: DirectionalLight {
                direction: Vec3::from(config.direction),
                diffuse_color: Vec3::from(config.diffuse),
                specular_color: Vec3::from(config.specular),
            },
            specular_power: config.specular_power,
        }
    }
}

/// Top-level renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Directory the shader sources are resolved against
    pub asset_base_path: PathBuf,
    /// Clear color (RGBA)
    pub background_color: [f32; 4],
    /// Program used for the opaque mesh pass
    pub mesh_shader: ShaderType,
    /// Program used for the sprite pass; `None` draws sprites with the mesh program
    pub sprite_shader: Option<ShaderType>,
    // Tables last so TOML output stays valid
    /// Window settings
    pub window: WindowConfig,
    /// Perspective projection
    pub projection: ProjectionConfig,
    /// Initial lighting
    pub lighting: LightingConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            asset_base_path: PathBuf::from("assets"),
            background_color: [0.2, 0.2, 0.2, 1.0],
            mesh_shader: ShaderType::Phong,
            sprite_shader: Some(ShaderType::Sprite),
            window: WindowConfig::default(),
            projection: ProjectionConfig::default(),
            lighting: LightingConfig::default(),
        }
    }
}

impl RendererConfig {
    /// Set the asset base path
    pub fn with_asset_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.asset_base_path = path.into();
        self
    }

    /// Set window size
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Set the mesh pass program
    pub fn with_mesh_shader(mut self, shader: ShaderType) -> Self {
        self.mesh_shader = shader;
        self
    }

    /// Set (or disable) the sprite pass program
    pub fn with_sprite_shader(mut self, shader: Option<ShaderType>) -> Self {
        self.sprite_shader = shader;
        self
    }

    /// Set the clear color
    pub fn with_background_color(mut self, color: [f32; 4]) -> Self {
        self.background_color = color;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        let p = &self.projection;
        if !(p.near > 0.0 && p.far > p.near) {
            return Err(ConfigError::Invalid(format!(
                "projection planes must satisfy 0 < near < far, got near={} far={}",
                p.near, p.far
            )));
        }
        if !(p.fov_degrees > 0.0 && p.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "field of view must be in (0, 180) degrees, got {}",
                p.fov_degrees
            )));
        }

        Ok(())
    }
}

impl Config for RendererConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mesh_shader, ShaderType::Phong);
        assert_eq!(config.sprite_shader, Some(ShaderType::Sprite));
    }

    #[test]
    fn test_validate_rejects_bad_projection() {
        let mut config = RendererConfig::default();
        config.projection.near = 100.0;
        config.projection.far = 10.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = RendererConfig::default().with_window_size(0, 600);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.toml");

        let config = RendererConfig::default()
            .with_asset_base_path("data/shaders")
            .with_mesh_shader(ShaderType::Basic)
            .with_window_size(800, 600);
        config.save_to_file(&path).unwrap();

        let loaded = RendererConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.ron");
        std::fs::write(
            &path,
            "(mesh_shader: Basic, background_color: (0.0, 0.0, 0.0, 1.0))",
        )
        .unwrap();

        let loaded = RendererConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.mesh_shader, ShaderType::Basic);
        assert_eq!(loaded.background_color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(loaded.window, WindowConfig::default());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = RendererConfig::load_from_file("renderer.json");
        // The file does not exist, so IO fails before the format check
        assert!(matches!(result, Err(ConfigError::Io(_))));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(
            RendererConfig::load_from_file(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
