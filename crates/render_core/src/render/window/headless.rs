//! Offscreen window backed by the recording device

use crate::config::WindowConfig;
use crate::render::device::{DeviceCommand, DeviceLog, GraphicsDevice, RecordingDevice};
use crate::render::RenderError;

/// [`WindowSystem`](super::WindowSystem) with no display
///
/// Contexts are [`RecordingDevice`]s sharing this window's [`DeviceLog`], and presents are
/// recorded as [`DeviceCommand::SwapBuffers`], so the whole frame sequence can be inspected
/// from one log.
#[derive(Debug, Default)]
pub struct HeadlessWindow {
    log: DeviceLog,
    size: Option<(u32, u32)>,
    context_alive: bool,
    fail_context: bool,
    fail_links: bool,
    minimized: bool,
}

impl HeadlessWindow {
    /// Create a headless window system with a fresh log
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_context` fail, as a machine without a usable driver would
    pub fn with_failing_context(mut self) -> Self {
        self.fail_context = true;
        self
    }

    /// Hand out devices whose program links always fail
    pub fn with_failing_links(mut self) -> Self {
        self.fail_links = true;
        self
    }

    /// Report a zero-sized framebuffer while open, as a minimized window does
    pub fn with_minimized(mut self) -> Self {
        self.minimized = true;
        self
    }

    /// Shared command log of every device this window creates
    pub fn log(&self) -> DeviceLog {
        self.log.clone()
    }

    /// Whether a window is currently open
    pub fn is_open(&self) -> bool {
        self.size.is_some()
    }

    /// Whether a context is currently alive
    pub fn has_context(&self) -> bool {
        self.context_alive
    }
}

impl super::WindowSystem for HeadlessWindow {
    fn create_window(&mut self, config: &WindowConfig) -> Result<(), RenderError> {
        if config.width == 0 || config.height == 0 {
            return Err(RenderError::ContextInit(format!(
                "invalid window size {}x{}",
                config.width, config.height
            )));
        }
        log::info!("Headless window '{}' {}x{}", config.title, config.width, config.height);
        self.size = Some((config.width, config.height));
        Ok(())
    }

    fn create_context(&mut self) -> Result<Box<dyn GraphicsDevice>, RenderError> {
        if self.size.is_none() {
            return Err(RenderError::ContextInit(
                "no window to attach a context to".to_string(),
            ));
        }
        if self.fail_context {
            return Err(RenderError::ContextInit("no graphics driver available".to_string()));
        }
        self.context_alive = true;
        let device = RecordingDevice::with_log(self.log.clone()).fail_links(self.fail_links);
        Ok(Box::new(device))
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        match self.size {
            Some(size) if !self.minimized => size,
            _ => (0, 0),
        }
    }

    fn swap_buffers(&mut self) {
        self.log.push(DeviceCommand::SwapBuffers);
    }

    fn destroy_context(&mut self) {
        self.context_alive = false;
    }

    fn destroy_window(&mut self) {
        self.size = None;
    }
}
