//! # Render Core
//!
//! Rendering and resource-caching core for a small real-time 3D engine.
//!
//! ## Features
//!
//! - **Explicit render context**: every GPU call goes through a `&mut dyn GraphicsDevice`
//! - **Resource caching**: meshes and textures load once per path and are released together
//! - **Shader programs**: closed set of stock programs, compiled and linked with full cleanup
//!   on failure
//! - **Ordered frames**: opaque meshes with depth testing, then alpha-blended sprites
//! - **Headless backend**: a recording device and window for tests and offline runs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_core::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     render_core::foundation::logging::init();
//!
//!     let config = RendererConfig::load_from_file("renderer.toml").unwrap_or_default();
//!     let mut renderer = FrameRenderer::new(config, Box::new(HeadlessWindow::new()));
//!     renderer.initialize()?;
//!     renderer.load_data()?;
//!
//!     if let Some(ship) = renderer.get_mesh("assets/Ship.obj") {
//!         renderer.add_mesh_component(MeshComponent::new(ship));
//!     }
//!     renderer.draw()?;
//!
//!     renderer.shutdown()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod resources;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, GeometrySource, ImageSource, ObjGeometrySource, ImageCrateSource},
        config::{Config, ConfigError, RendererConfig},
        foundation::math::{Mat4, Mat4Ext, Vec3},
        render::{
            device::GraphicsDevice, FrameRenderer, HeadlessWindow, LightingParams, MeshComponent,
            MeshComponentId, RenderError, RendererState, ShaderType, SpriteComponent,
            SpriteComponentId, WindowSystem,
        },
        resources::{MeshId, TextureId},
    };

    #[cfg(feature = "glfw")]
    pub use crate::render::GlfwWindow;
}
