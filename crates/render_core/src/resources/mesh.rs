//! Mesh resource: deduplicated vertex/index buffers for one model file
//!
//! Loading runs in two phases. [`MeshData::from_polygons`] is pure CPU work: it
//! fan-triangulates the parsed polygons, merges identical corners and measures the bounding
//! radius. [`Mesh::load`] then uploads the result and resolves the model's diffuse texture
//! through the shared texture cache.
//!
//! # Vertex deduplication
//!
//! Corners are merged when position, normal and texture coordinate are exactly equal. The
//! first occurrence keeps its index and later ones reuse it. Lookups hash the bit patterns of
//! the components after normalizing `-0.0` to `0.0`, so the two signed zeros merge; corners
//! containing NaN are never merged, matching float equality.

use std::collections::HashMap;
use std::path::Path;

use super::cache::{Resource, ResourceCache};
use super::texture::{Texture, TextureLoadContext};
use super::TextureId;
use crate::assets::{AssetError, GeometrySource, ImageSource, Polygon, PolygonVertex};
use crate::render::device::{GraphicsDevice, VertexArrayHandle};
use crate::render::vertex::Vertex;

/// Shader a mesh is drawn with when the model does not name one
pub const DEFAULT_SHADER_NAME: &str = "Phong";

/// Triangulated, deduplicated geometry ready for upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Unique vertices in first-seen order
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
    /// Largest distance of any position from the model origin
    pub radius: f32,
}

/// Hashable identity of a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey([u32; Vertex::FLOATS]);

impl VertexKey {
    /// `None` when any component is NaN
    fn of(vertex: &Vertex) -> Option<Self> {
        let mut bits = [0u32; Vertex::FLOATS];
        let components = vertex.position.iter().chain(&vertex.normal).chain(&vertex.tex_coord);
        for (slot, &value) in bits.iter_mut().zip(components) {
            if value.is_nan() {
                return None;
            }
            // -0.0 + 0.0 == +0.0
            *slot = (value + 0.0).to_bits();
        }
        Some(Self(bits))
    }
}

impl MeshData {
    /// Build index/vertex buffers from parsed polygons
    ///
    /// Polygons with fewer than three corners are skipped with a warning. Fails when no
    /// triangle remains or the vertex count exceeds the index range.
    pub fn from_polygons(polygons: &[Polygon], path: &Path) -> Result<Self, AssetError> {
        let mut data = Self::default();
        let mut lookup: HashMap<VertexKey, u32> = HashMap::new();
        let mut skipped = 0usize;

        for polygon in polygons {
            let corners = &polygon.vertices;
            if corners.len() < 3 {
                skipped += 1;
                continue;
            }

            // Fan around the first corner: (0, i, i + 1)
            for i in 1..corners.len() - 1 {
                for corner in [&corners[0], &corners[i], &corners[i + 1]] {
                    let index = data.push_corner(corner, &mut lookup, path)?;
                    data.indices.push(index);
                }
            }
        }

        if skipped > 0 {
            log::warn!("{:?}: skipped {} degenerate polygon(s)", path, skipped);
        }
        if data.indices.is_empty() {
            return Err(AssetError::parse(path, "model contains no triangles"));
        }

        data.radius = data
            .vertices
            .iter()
            .map(|v| {
                let [x, y, z] = v.position;
                (x * x + y * y + z * z).sqrt()
            })
            .fold(0.0, f32::max);

        log::debug!(
            "{:?}: {} unique vertices, {} indices, radius {:.3}",
            path,
            data.vertices.len(),
            data.indices.len(),
            data.radius
        );
        Ok(data)
    }

    fn push_corner(
        &mut self,
        corner: &PolygonVertex,
        lookup: &mut HashMap<VertexKey, u32>,
        path: &Path,
    ) -> Result<u32, AssetError> {
        let vertex = Vertex::new(corner.position, corner.normal, corner.uv);
        let key = VertexKey::of(&vertex);

        if let Some(&index) = key.as_ref().and_then(|k| lookup.get(k)) {
            return Ok(index);
        }

        let index = u32::try_from(self.vertices.len())
            .map_err(|_| AssetError::parse(path, "too many vertices for 32-bit indices"))?;
        self.vertices.push(vertex);
        if let Some(key) = key {
            lookup.insert(key, index);
        }
        Ok(index)
    }
}

/// What a mesh load needs besides its path
pub struct MeshLoadContext<'a> {
    /// Device the buffers are uploaded to
    pub device: &'a mut dyn GraphicsDevice,
    /// Model file parser
    pub geometry: &'a dyn GeometrySource,
    /// Shared texture cache the model's diffuse texture is requested from
    pub textures: &'a mut ResourceCache<TextureId, Texture>,
    /// Image decoder for that texture
    pub images: &'a dyn ImageSource,
}

/// A model uploaded to the GPU
#[derive(Debug)]
pub struct Mesh {
    vertex_array: VertexArrayHandle,
    index_count: u32,
    vertex_count: usize,
    texture: Option<TextureId>,
    radius: f32,
    shader_name: String,
}

impl Mesh {
    /// Vertex array holding this mesh's buffers
    pub const fn vertex_array(&self) -> VertexArrayHandle {
        self.vertex_array
    }

    /// Number of indices in the triangle list
    pub const fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Number of unique vertices after deduplication
    pub const fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Diffuse texture, owned by the texture cache
    pub const fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    /// Bounding sphere radius around the model origin
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Shader this mesh asks to be drawn with
    pub fn shader_name(&self) -> &str {
        &self.shader_name
    }

    /// Bind the vertex array and issue the indexed draw
    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        device.bind_vertex_array(self.vertex_array);
        device.draw_indexed(self.index_count);
    }
}

impl Resource for Mesh {
    const KIND: &'static str = "mesh";
    type Context<'a> = MeshLoadContext<'a>;

    fn load(path: &Path, ctx: &mut Self::Context<'_>) -> Result<Self, AssetError> {
        let geometry = ctx.geometry.parse(path)?;
        let data = MeshData::from_polygons(&geometry.polygons, path)?;

        let index_count = u32::try_from(data.indices.len())
            .map_err(|_| AssetError::parse(path, "too many indices"))?;
        let vertex_array = ctx
            .device
            .create_vertex_array(&data.vertices, &data.indices)
            .map_err(|source| AssetError::Upload {
                path: path.to_path_buf(),
                source,
            })?;

        let texture = geometry.texture.as_deref().and_then(|texture_path| {
            let mut texture_ctx = TextureLoadContext {
                device: &mut *ctx.device,
                images: ctx.images,
            };
            let key = ctx.textures.get_or_load(texture_path, &mut texture_ctx);
            if key.is_none() {
                log::warn!("{:?}: drawing untextured, {:?} did not load", path, texture_path);
            }
            key
        });

        Ok(Self {
            vertex_array,
            index_count,
            vertex_count: data.vertices.len(),
            texture,
            radius: data.radius,
            shader_name: geometry.shader_hint.unwrap_or_else(|| DEFAULT_SHADER_NAME.to_string()),
        })
    }

    fn unload(self, device: &mut dyn GraphicsDevice) {
        device.delete_vertex_array(self.vertex_array);
    }
}
