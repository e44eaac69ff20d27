//! Image collaborator for texture data
//!
//! Provides PNG and JPEG loading through the `image` crate for use with the texture system.

use std::path::Path;

use super::AssetError;

/// Decoded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let data = color.iter().copied().cycle().take(pixel_count * 4).collect();

        Self { data, width, height }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Decodes an image file into RGBA8 pixels
pub trait ImageSource {
    /// Decode the file at `path`
    fn decode(&self, path: &Path) -> Result<ImageData, AssetError>;
}

/// [`ImageSource`] backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateSource;

impl ImageSource for ImageCrateSource {
    fn decode(&self, path: &Path) -> Result<ImageData, AssetError> {
        log::debug!("Loading image from: {:?}", path);

        let img = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(source) => AssetError::Io {
                path: path.to_path_buf(),
                source,
            },
            // Undecodable and unsupported files are IO failures for textures
            other => AssetError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
            },
        })?;

        // Convert to RGBA8 format (standard for GPU upload)
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        log::info!("Loaded image {}x{} from {:?}", width, height, path);

        Ok(ImageData {
            data: rgba_img.into_raw(),
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert_eq!(img.size_bytes(), 4 * 4 * 4); // 4x4 pixels, 4 bytes each

        // Check first pixel is red
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");
        let mut img = image::RgbaImage::new(2, 3);
        img.put_pixel(1, 2, image::Rgba([10, 20, 30, 40]));
        img.save(&path).unwrap();

        let decoded = ImageCrateSource.decode(&path).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 3));
        assert_eq!(&decoded.data[(2 * 2 + 1) * 4..(2 * 2 + 2) * 4], &[10, 20, 30, 40]);
    }

    #[test]
    fn test_missing_image_is_io_error() {
        let result = ImageCrateSource.decode(Path::new("no/such/texture.png"));
        assert!(matches!(result, Err(AssetError::Io { .. })));
        assert_eq!(result.unwrap_err().path(), Path::new("no/such/texture.png"));
    }

    #[test]
    fn test_garbage_image_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let result = ImageCrateSource.decode(&path);
        assert!(matches!(result, Err(AssetError::Io { .. })));
    }
}
