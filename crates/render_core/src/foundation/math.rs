//! Math utilities and types
//!
//! Provides the fundamental math types used by the renderer. All matrices follow
//! nalgebra's column-vector convention (`clip = projection * view * world * v`) and are
//! stored column-major, which is the layout OpenGL expects for `glUniformMatrix4fv`
//! with `transpose = GL_FALSE`.

pub use nalgebra::{Matrix4, Point3 as NPoint3, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = NPoint3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with the camera and projection builders the renderer needs
pub trait Mat4Ext {
    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Create an OpenGL perspective projection (clip z in [-1, 1])
    ///
    /// # Arguments
    /// * `fov_y` - Vertical field of view in radians
    /// * `width`, `height` - Viewport size used for the aspect ratio
    /// * `near`, `far` - Clip plane distances
    fn perspective_fov(fov_y: f32, width: f32, height: f32, near: f32, far: f32) -> Mat4;

    /// Create the screen-space view-projection used for sprites
    ///
    /// Maps pixel units centered on the screen to normalized device coordinates,
    /// so a sprite scaled to its texture size appears at its native resolution.
    fn simple_view_projection(width: f32, height: f32) -> Mat4;

    /// Column-major copy of the matrix, ready for a uniform upload
    fn to_column_major(&self) -> [f32; 16];
}

impl Mat4Ext for Mat4 {
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn perspective_fov(fov_y: f32, width: f32, height: f32, near: f32, far: f32) -> Mat4 {
        let aspect = width / height;
        nalgebra::Perspective3::new(aspect, fov_y, near, far).to_homogeneous()
    }

    fn simple_view_projection(width: f32, height: f32) -> Mat4 {
        Mat4::new_nonuniform_scaling(&Vec3::new(2.0 / width, 2.0 / height, 1.0))
    }

    fn to_column_major(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.as_slice());
        out
    }
}
