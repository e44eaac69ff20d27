//! Vertex layout shared by the mesh loader and every device backend

use bytemuck::{Pod, Zeroable};

/// 3D vertex data structure for rendering
///
/// Position, normal and texture coordinate, tightly packed. Attribute locations
/// are fixed: 0 = position, 1 = normal, 2 = texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Number of floats in one vertex record
    pub const FLOATS: usize = 8;

    /// Byte stride between consecutive vertices
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    /// Create a new vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }

    /// Attribute layout as `(location, component count, byte offset)`
    pub const fn attributes() -> [(u32, i32, i32); 3] {
        [(0, 3, 0), (1, 3, 12), (2, 2, 24)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(Vertex::STRIDE, Vertex::FLOATS * 4);

        let v = Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.25]);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 0.5, 0.25]);
    }
}
