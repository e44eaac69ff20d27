//! Asset collaborators
//!
//! File parsing lives behind two small traits so the resource layer never depends on a
//! particular file format:
//!
//! - [`GeometrySource`] turns a model file into polygons with per-corner normals and UVs
//! - [`ImageSource`] turns an image file into RGBA8 pixels
//!
//! Reference implementations are provided for Wavefront OBJ ([`ObjGeometrySource`]) and
//! for the formats the `image` crate decodes ([`ImageCrateSource`]).

pub mod image_loader;
pub mod obj_loader;

pub use image_loader::{ImageCrateSource, ImageData, ImageSource};
pub use obj_loader::{GeometrySource, ObjGeometrySource, ParsedGeometry, Polygon, PolygonVertex};

use std::path::PathBuf;

use thiserror::Error;

use crate::render::device::DeviceError;

/// Per-resource load failures
///
/// These never abort a frame: the resource cache logs them and reports the resource
/// as absent.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The file is missing or unreadable
    #[error("Cannot read asset {path:?}: {source}")]
    Io {
        /// Asset path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The file was read but its contents are malformed or unsupported
    #[error("Malformed asset {path:?}: {message}")]
    Parse {
        /// Asset path
        path: PathBuf,
        /// What was wrong
        message: String,
    },

    /// The decoded data could not be uploaded to the GPU
    #[error("Failed to upload asset {path:?}: {source}")]
    Upload {
        /// Asset path
        path: PathBuf,
        /// Device failure
        #[source]
        source: DeviceError,
    },
}

impl AssetError {
    /// Build a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Path of the asset that failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. } | Self::Parse { path, .. } | Self::Upload { path, .. } => path,
        }
    }
}
