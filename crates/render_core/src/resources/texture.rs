//! 2D texture resource

use std::path::Path;

use super::cache::Resource;
use crate::assets::{AssetError, ImageSource};
use crate::render::device::{GraphicsDevice, TextureHandle};

/// What a texture load needs besides its path
pub struct TextureLoadContext<'a> {
    /// Device the pixels are uploaded to
    pub device: &'a mut dyn GraphicsDevice,
    /// Image decoder
    pub images: &'a dyn ImageSource,
}

/// A decoded image living on the GPU
#[derive(Debug)]
pub struct Texture {
    handle: TextureHandle,
    width: u32,
    height: u32,
}

impl Texture {
    /// GPU texture handle
    pub const fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Bind to texture unit 0
    pub fn bind(&self, device: &mut dyn GraphicsDevice) {
        device.bind_texture(Some(self.handle));
    }
}

impl Resource for Texture {
    const KIND: &'static str = "texture";
    type Context<'a> = TextureLoadContext<'a>;

    fn load(path: &Path, ctx: &mut Self::Context<'_>) -> Result<Self, AssetError> {
        let image = ctx.images.decode(path)?;
        let handle = ctx
            .device
            .create_texture(image.width, image.height, &image.data)
            .map_err(|source| AssetError::Upload {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!(
            "Uploaded texture {:?} {}x{} ({} bytes)",
            path,
            image.width,
            image.height,
            image.size_bytes()
        );

        Ok(Self {
            handle,
            width: image.width,
            height: image.height,
        })
    }

    fn unload(self, device: &mut dyn GraphicsDevice) {
        device.delete_texture(self.handle);
    }
}
