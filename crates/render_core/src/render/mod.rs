//! # Rendering System
//!
//! The frame renderer and everything it drives directly.
//!
//! ## Architecture
//!
//! - **Device**: [`device::GraphicsDevice`] is the explicit render context; every GPU call
//!   in the crate takes it as `&mut dyn GraphicsDevice`
//! - **Shaders**: [`shader::ShaderProgram`] compiles and links one stock program
//! - **Components**: mesh and sprite components live in slot-map arenas owned by the
//!   renderer; the scene holds their ids
//! - **Renderer**: [`FrameRenderer`] owns the caches, the programs and the draw lists and
//!   submits a frame in a fixed order
//! - **Window**: [`window::WindowSystem`] creates the window and the context
//!
//! ## Frame order
//!
//! Clear, activate, frame-global uniforms, opaque meshes with depth testing, then
//! alpha-blended sprites without depth testing, then present.

pub mod components;
pub mod device;
pub mod lighting;
pub mod renderer;
pub mod shader;
pub mod vertex;
pub mod window;

pub use components::{MeshComponent, MeshComponentId, SpriteComponent, SpriteComponentId};
pub use lighting::{DirectionalLight, LightingParams};
pub use renderer::{FrameRenderer, RendererState};
pub use shader::{ShaderProgram, ShaderType};
pub use vertex::Vertex;
pub use window::{HeadlessWindow, WindowSystem};

#[cfg(feature = "glfw")]
pub use window::GlfwWindow;

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use device::DeviceError;

/// Errors that abort renderer startup or reject a call
#[derive(Debug, Error)]
pub enum RenderError {
    /// The window or graphics context could not be created
    #[error("Failed to initialize graphics context: {0}")]
    ContextInit(String),

    /// A shader source could not be read or failed to compile
    #[error("Failed to compile shader {path:?}: {log}")]
    ShaderCompile {
        /// Source file
        path: PathBuf,
        /// Compiler output or IO error text
        log: String,
    },

    /// Both stages compiled but the program failed to link
    #[error("Failed to link {shader_type} shader program: {log}")]
    ShaderLink {
        /// Program being linked
        shader_type: ShaderType,
        /// Linker output
        log: String,
    },

    /// The call is not valid in the renderer's current state
    #[error("Cannot {operation} while renderer is {state:?}")]
    InvalidState {
        /// Rejected operation
        operation: &'static str,
        /// State at the time of the call
        state: RendererState,
    },

    /// A device object could not be created
    #[error("Graphics device error: {0}")]
    Device(#[from] DeviceError),

    /// The renderer configuration was rejected
    #[error("Invalid renderer configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;
