//! Window management using GLFW
//!
//! Opens a window with an OpenGL 3.3 core context and hands the renderer a
//! [`GlDevice`] loaded through GLFW's proc address lookup.

#![allow(unsafe_code)]

use glfw::Context;

use crate::config::WindowConfig;
use crate::render::device::{GlDevice, GraphicsDevice};
use crate::render::RenderError;

/// GLFW window wrapper implementing [`WindowSystem`](super::WindowSystem)
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: Option<(glfw::PWindow, glfw::GlfwReceiver<(f64, glfw::WindowEvent)>)>,
}

impl GlfwWindow {
    /// Initialize GLFW
    pub fn new() -> Result<Self, RenderError> {
        let glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| RenderError::ContextInit(format!("GLFW initialization failed: {:?}", e)))?;
        Ok(Self { glfw, window: None })
    }

    /// Process pending window system events
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Check if the window should close
    pub fn should_close(&self) -> bool {
        self.window.as_ref().map_or(true, |(window, _)| window.should_close())
    }
}

impl super::WindowSystem for GlfwWindow {
    fn create_window(&mut self, config: &WindowConfig) -> Result<(), RenderError> {
        self.glfw.window_hint(glfw::WindowHint::ContextVersion(3, 3));
        self.glfw
            .window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        self.glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        self.glfw.window_hint(glfw::WindowHint::DepthBits(Some(24)));
        self.glfw.window_hint(glfw::WindowHint::Resizable(false));

        let (mut window, events) = self
            .glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or_else(|| RenderError::ContextInit("window creation failed".to_string()))?;

        window.set_close_polling(true);
        window.set_key_polling(true);

        log::info!("Created window '{}' {}x{}", config.title, config.width, config.height);
        self.window = Some((window, events));
        Ok(())
    }

    fn create_context(&mut self) -> Result<Box<dyn GraphicsDevice>, RenderError> {
        let (window, _) = self.window.as_mut().ok_or_else(|| {
            RenderError::ContextInit("no window to attach a context to".to_string())
        })?;

        window.make_current();
        self.glfw.set_swap_interval(glfw::SwapInterval::Sync(1));

        // SAFETY: the window's context was made current on this thread just above
        let device =
            unsafe { GlDevice::from_loader(|name| window.get_proc_address(name) as *const _) };
        Ok(Box::new(device))
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.window.as_ref().map_or((0, 0), |(window, _)| {
            let (width, height) = window.get_framebuffer_size();
            (width.max(0) as u32, height.max(0) as u32)
        })
    }

    fn swap_buffers(&mut self) {
        if let Some((window, _)) = self.window.as_mut() {
            window.swap_buffers();
        }
    }

    fn destroy_context(&mut self) {
        glfw::make_context_current(None);
    }

    fn destroy_window(&mut self) {
        if self.window.take().is_some() {
            log::info!("Window destroyed");
        }
    }
}
