//! Window and context collaborator
//!
//! The renderer never talks to a window system directly. It asks a [`WindowSystem`] for a
//! window, then for a graphics context (handed back as the [`GraphicsDevice`] every GPU
//! call goes through), presents through it once per frame and tears both down at
//! shutdown.
//!
//! Event polling and input belong to the application; this interface only covers what the
//! renderer needs.

mod headless;

#[cfg(feature = "glfw")]
mod glfw_window;

pub use headless::HeadlessWindow;

#[cfg(feature = "glfw")]
pub use glfw_window::GlfwWindow;

use crate::config::WindowConfig;
use crate::render::device::GraphicsDevice;
use crate::render::RenderError;

/// Creates the window and context the renderer draws into
///
/// Calls arrive in lifecycle order: `create_window`, `create_context`, any number of
/// `swap_buffers`, then `destroy_context` and `destroy_window`. Implementations are used
/// from a single thread.
pub trait WindowSystem {
    /// Open the window described by `config`
    fn create_window(&mut self, config: &WindowConfig) -> Result<(), RenderError>;

    /// Create a graphics context for the window and make it current
    fn create_context(&mut self) -> Result<Box<dyn GraphicsDevice>, RenderError>;

    /// Drawable size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// Present the back buffer
    fn swap_buffers(&mut self);

    /// Release the context; the device it produced must already be dropped
    fn destroy_context(&mut self);

    /// Close the window
    fn destroy_window(&mut self);
}
