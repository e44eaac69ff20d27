//! Graphics device abstraction
//!
//! The graphics API is a stateful, single-threaded machine: binding a program changes
//! where the following uniform writes land, enabling blending changes how the following
//! draws composite. Instead of hiding that state behind globals, every GPU operation in
//! this crate takes an explicit `&mut dyn GraphicsDevice`, so the ordering dependencies
//! are visible at each call site and can be observed in tests.
//!
//! # Backends
//!
//! - [`RecordingDevice`]: headless backend that hands out handles and records every
//!   command; used by the test suite and for offline runs.
//! - `GlDevice` (feature `opengl`): OpenGL 3.3 core through `glow`.
//!
//! # Threading
//!
//! Implementations are not required to be `Send`. All calls must happen on the thread
//! that owns the context.

mod recording;

#[cfg(feature = "opengl")]
mod gl;

pub use recording::{DeviceCommand, DeviceLog, RecordingDevice};

#[cfg(feature = "opengl")]
pub use gl::GlDevice;

use thiserror::Error;

use crate::render::vertex::Vertex;

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

/// Compiled shader stage object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Linked program object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Vertex array with its vertex and index buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub u32);

/// 2D texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Resolved uniform slot within a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Fixed-function state toggled between draw passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth testing
    DepthTest,
    /// Color blending
    Blend,
}

/// Blend factors used by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// Source alpha
    SrcAlpha,
    /// One minus source alpha
    OneMinusSrcAlpha,
}

/// Device level failures
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The API refused to create an object
    #[error("Failed to create {object}: {message}")]
    CreationFailed {
        /// Kind of object being created
        object: &'static str,
        /// Driver message
        message: String,
    },

    /// Data that cannot be uploaded as given
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Explicit render context
///
/// Mirrors the subset of a GL-style API the renderer uses. Handles are plain
/// identifiers; the device never owns higher level resources, and callers are
/// responsible for deleting what they create.
pub trait GraphicsDevice {
    /// Create an empty shader object for a stage
    fn create_shader(&mut self, stage: ShaderStage) -> DeviceResult<ShaderHandle>;

    /// Upload source text and compile it
    fn compile_shader(&mut self, shader: ShaderHandle, source: &str);

    /// Compile status query for the last compile
    fn shader_compile_status(&mut self, shader: ShaderHandle) -> bool;

    /// Driver log for the last compile
    fn shader_info_log(&mut self, shader: ShaderHandle) -> String;

    /// Delete a shader object
    fn delete_shader(&mut self, shader: ShaderHandle);

    /// Create an empty program object
    fn create_program(&mut self) -> DeviceResult<ProgramHandle>;

    /// Attach a compiled stage to a program
    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    /// Link the attached stages
    fn link_program(&mut self, program: ProgramHandle);

    /// Link status query for the last link
    fn program_link_status(&mut self, program: ProgramHandle) -> bool;

    /// Driver log for the last link
    fn program_info_log(&mut self, program: ProgramHandle) -> String;

    /// Delete a program object
    fn delete_program(&mut self, program: ProgramHandle);

    /// Make a program current, or unbind with `None`
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// Resolve a uniform by name; `None` when the program does not declare it
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Write a 4x4 matrix given in column-major order
    fn set_uniform_mat4(&mut self, location: UniformLocation, column_major: &[f32; 16]);

    /// Write a 3-component vector
    fn set_uniform_vec3(&mut self, location: UniformLocation, value: [f32; 3]);

    /// Write a scalar
    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32);

    /// Write an integer (sampler units)
    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32);

    /// Upload vertices and triangle indices into a new vertex array
    fn create_vertex_array(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> DeviceResult<VertexArrayHandle>;

    /// Bind a vertex array for drawing
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Delete a vertex array and the buffers it owns
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Upload tightly packed RGBA8 pixels as a 2D texture
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> DeviceResult<TextureHandle>;

    /// Bind a texture to unit 0, or unbind with `None`
    fn bind_texture(&mut self, texture: Option<TextureHandle>);

    /// Delete a texture object
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Clear color and depth buffers
    fn clear(&mut self, color: [f32; 4]);

    /// Enable a capability
    fn enable(&mut self, capability: Capability);

    /// Disable a capability
    fn disable(&mut self, capability: Capability);

    /// Set the blend equation factors
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);

    /// Draw indexed triangles from the bound vertex array
    fn draw_indexed(&mut self, index_count: u32);
}
