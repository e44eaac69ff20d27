//! GPU resources and their path-keyed caches
//!
//! Meshes and textures are loaded once per distinct path, shared through [`MeshId`] and
//! [`TextureId`] keys, and released together at shutdown.

pub mod cache;
pub mod mesh;
pub mod texture;

pub use cache::{Resource, ResourceCache};
pub use mesh::{Mesh, MeshData, MeshLoadContext};
pub use texture::{Texture, TextureLoadContext};

slotmap::new_key_type! {
    /// Key of a cached [`Mesh`]
    pub struct MeshId;

    /// Key of a cached [`Texture`]
    pub struct TextureId;
}

/// Cache of loaded meshes
pub type MeshCache = ResourceCache<MeshId, Mesh>;

/// Cache of loaded textures
pub type TextureCache = ResourceCache<TextureId, Texture>;
