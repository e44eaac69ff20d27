//! Lighting parameters pushed to the active program once per frame

use crate::foundation::math::Vec3;

/// Uniform names written by [`LightingParams`]; shaders may omit any of them
pub mod uniforms {
    /// Ambient light color
    pub const AMBIENT_LIGHT: &str = "uAmbientLight";
    /// Directional light direction
    pub const DIR_LIGHT_DIRECTION: &str = "uDirLight.mDirection";
    /// Directional light diffuse color
    pub const DIR_LIGHT_DIFFUSE: &str = "uDirLight.mDiffuseColor";
    /// Directional light specular color
    pub const DIR_LIGHT_SPECULAR: &str = "uDirLight.mSpecColor";
    /// Specular exponent
    pub const SPEC_POWER: &str = "uSpecPower";
}

/// Directional light (like sunlight)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels
    pub direction: Vec3,
    /// Diffuse color
    pub diffuse_color: Vec3,
    /// Specular color
    pub specular_color: Vec3,
}

/// Frame-global lighting state: ambient term, one directional light, specular power
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingParams {
    /// Ambient light color
    pub ambient_color: Vec3,
    /// The scene's directional light
    pub directional: DirectionalLight,
    /// Specular exponent
    pub specular_power: f32,
}

impl Default for LightingParams {
    /// Everything black, matching a renderer that has not loaded its data yet
    fn default() -> Self {
        Self {
            ambient_color: Vec3::zeros(),
            directional: DirectionalLight {
                direction: Vec3::zeros(),
                diffuse_color: Vec3::zeros(),
                specular_color: Vec3::zeros(),
            },
            specular_power: 0.0,
        }
    }
}

impl LightingParams {
    /// Set ambient lighting
    pub fn with_ambient(mut self, color: Vec3) -> Self {
        self.ambient_color = color;
        self
    }

    /// Replace the directional light
    pub fn with_directional(mut self, light: DirectionalLight) -> Self {
        self.directional = light;
        self
    }

    /// Set the specular exponent
    pub fn with_specular_power(mut self, power: f32) -> Self {
        self.specular_power = power;
        self
    }
}
