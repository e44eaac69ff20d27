//! OpenGL 3.3 core device built on `glow`
//!
//! # Safety
//!
//! Every `glow` call is `unsafe` because it requires a current context on the calling
//! thread. `GlDevice` is only ever constructed by a window collaborator right after it
//! made its context current, and it is neither `Send` nor `Sync`, so all calls stay on
//! that thread for the device's whole lifetime.

#![allow(unsafe_code)]

use std::collections::HashMap;
use std::num::NonZeroU32;

use glow::HasContext;

use super::{
    BlendFactor, Capability, DeviceError, DeviceResult, GraphicsDevice, ProgramHandle,
    ShaderHandle, ShaderStage, TextureHandle, UniformLocation, VertexArrayHandle,
};
use crate::render::vertex::Vertex;

/// [`GraphicsDevice`] backed by a live OpenGL context
pub struct GlDevice {
    gl: glow::Context,
    // Buffers owned by each vertex array: (vertex buffer, index buffer)
    buffers: HashMap<VertexArrayHandle, (glow::NativeBuffer, glow::NativeBuffer)>,
}

impl GlDevice {
    /// Wrap a loaded `glow` context
    pub fn new(gl: glow::Context) -> Self {
        log::info!("OpenGL device created: {:?}", gl.version());
        Self {
            gl,
            buffers: HashMap::new(),
        }
    }

    /// Load GL entry points through the window system's proc address lookup
    ///
    /// # Safety
    /// The context the loader belongs to must be current on this thread.
    pub unsafe fn from_loader<F>(loader: F) -> Self
    where
        F: FnMut(&str) -> *const std::os::raw::c_void,
    {
        Self::new(glow::Context::from_loader_function(loader))
    }

    fn shader(handle: ShaderHandle) -> Option<glow::NativeShader> {
        NonZeroU32::new(handle.0).map(glow::NativeShader)
    }

    fn program(handle: ProgramHandle) -> Option<glow::NativeProgram> {
        NonZeroU32::new(handle.0).map(glow::NativeProgram)
    }

    fn vertex_array(handle: VertexArrayHandle) -> Option<glow::NativeVertexArray> {
        NonZeroU32::new(handle.0).map(glow::NativeVertexArray)
    }

    fn texture(handle: TextureHandle) -> Option<glow::NativeTexture> {
        NonZeroU32::new(handle.0).map(glow::NativeTexture)
    }

    const fn location(location: UniformLocation) -> glow::NativeUniformLocation {
        glow::NativeUniformLocation(location.0)
    }

    const fn capability(capability: Capability) -> u32 {
        match capability {
            Capability::DepthTest => glow::DEPTH_TEST,
            Capability::Blend => glow::BLEND,
        }
    }

    const fn blend_factor(factor: BlendFactor) -> u32 {
        match factor {
            BlendFactor::SrcAlpha => glow::SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        }
    }

    fn creation_failed(object: &'static str, message: String) -> DeviceError {
        DeviceError::CreationFailed { object, message }
    }

    /// Create and fill the vertex array and its two buffers
    ///
    /// Every object is pushed to `created` as soon as it exists, so the caller can
    /// delete them if a later step fails.
    unsafe fn upload_vertex_array(
        gl: &glow::Context,
        vertices: &[Vertex],
        indices: &[u32],
        created: &mut Unwind<GlObject>,
    ) -> DeviceResult<(glow::NativeVertexArray, glow::NativeBuffer, glow::NativeBuffer)> {
        let vao = gl
            .create_vertex_array()
            .map_err(|e| Self::creation_failed("vertex array", e))?;
        created.push(GlObject::VertexArray(vao));
        gl.bind_vertex_array(Some(vao));

        let vbo = gl
            .create_buffer()
            .map_err(|e| Self::creation_failed("vertex buffer", e))?;
        created.push(GlObject::Buffer(vbo));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(vertices),
            glow::STATIC_DRAW,
        );

        let ibo = gl
            .create_buffer()
            .map_err(|e| Self::creation_failed("index buffer", e))?;
        created.push(GlObject::Buffer(ibo));
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
        gl.buffer_data_u8_slice(
            glow::ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(indices),
            glow::STATIC_DRAW,
        );

        for (location, components, offset) in Vertex::attributes() {
            gl.enable_vertex_attrib_array(location);
            gl.vertex_attrib_pointer_f32(
                location,
                components,
                glow::FLOAT,
                false,
                Vertex::STRIDE as i32,
                offset,
            );
        }

        gl.bind_vertex_array(None);
        Ok((vao, vbo, ibo))
    }
}

/// A GL object created during a multi-step upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlObject {
    VertexArray(glow::NativeVertexArray),
    Buffer(glow::NativeBuffer),
}

/// Objects created so far by an upload that may still fail
#[derive(Debug)]
struct Unwind<T> {
    created: Vec<T>,
}

impl<T> Default for Unwind<T> {
    fn default() -> Self {
        Self { created: Vec::new() }
    }
}

impl<T> Unwind<T> {
    fn push(&mut self, object: T) {
        self.created.push(object);
    }

    /// Hand every created object to `delete`, newest first
    fn unwind(self, mut delete: impl FnMut(T)) {
        for object in self.created.into_iter().rev() {
            delete(object);
        }
    }
}

impl GraphicsDevice for GlDevice {
    fn create_shader(&mut self, stage: ShaderStage) -> DeviceResult<ShaderHandle> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let shader = unsafe { self.gl.create_shader(kind) }
            .map_err(|e| Self::creation_failed("shader", e))?;
        Ok(ShaderHandle(shader.0.get()))
    }

    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) {
        if let Some(shader) = Self::shader(shader) {
            unsafe {
                self.gl.shader_source(shader, source);
                self.gl.compile_shader(shader);
            }
        }
    }

    fn shader_compile_status(&mut self, shader: ShaderHandle) -> bool {
        Self::shader(shader).is_some_and(|s| unsafe { self.gl.get_shader_compile_status(s) })
    }

    fn shader_info_log(&mut self, shader: ShaderHandle) -> String {
        Self::shader(shader)
            .map(|s| unsafe { self.gl.get_shader_info_log(s) })
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if let Some(shader) = Self::shader(shader) {
            unsafe { self.gl.delete_shader(shader) };
        }
    }

    fn create_program(&mut self) -> DeviceResult<ProgramHandle> {
        let program = unsafe { self.gl.create_program() }
            .map_err(|e| Self::creation_failed("program", e))?;
        Ok(ProgramHandle(program.0.get()))
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let (Some(program), Some(shader)) = (Self::program(program), Self::shader(shader)) {
            unsafe { self.gl.attach_shader(program, shader) };
        }
    }

    fn link_program(&mut self, program: ProgramHandle) {
        if let Some(program) = Self::program(program) {
            unsafe { self.gl.link_program(program) };
        }
    }

    fn program_link_status(&mut self, program: ProgramHandle) -> bool {
        Self::program(program).is_some_and(|p| unsafe { self.gl.get_program_link_status(p) })
    }

    fn program_info_log(&mut self, program: ProgramHandle) -> String {
        Self::program(program)
            .map(|p| unsafe { self.gl.get_program_info_log(p) })
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if let Some(program) = Self::program(program) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        let program = program.and_then(Self::program);
        unsafe { self.gl.use_program(program) };
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let program = Self::program(program)?;
        unsafe { self.gl.get_uniform_location(program, name) }.map(|l| UniformLocation(l.0))
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, column_major: &[f32; 16]) {
        let location = Self::location(location);
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(&location), false, column_major);
        }
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: [f32; 3]) {
        let location = Self::location(location);
        unsafe { self.gl.uniform_3_f32(Some(&location), value[0], value[1], value[2]) };
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        let location = Self::location(location);
        unsafe { self.gl.uniform_1_f32(Some(&location), value) };
    }

    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32) {
        let location = Self::location(location);
        unsafe { self.gl.uniform_1_i32(Some(&location), value) };
    }

    fn create_vertex_array(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> DeviceResult<VertexArrayHandle> {
        let mut created = Unwind::default();
        let result =
            unsafe { Self::upload_vertex_array(&self.gl, vertices, indices, &mut created) };

        match result {
            Ok((vao, vbo, ibo)) => {
                let handle = VertexArrayHandle(vao.0.get());
                self.buffers.insert(handle, (vbo, ibo));
                Ok(handle)
            }
            Err(e) => {
                let gl = &self.gl;
                unsafe {
                    gl.bind_vertex_array(None);
                    gl.bind_buffer(glow::ARRAY_BUFFER, None);
                    created.unwind(|object| match object {
                        GlObject::VertexArray(vao) => gl.delete_vertex_array(vao),
                        GlObject::Buffer(buffer) => gl.delete_buffer(buffer),
                    });
                }
                Err(e)
            }
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        let vao = Self::vertex_array(vertex_array);
        unsafe { self.gl.bind_vertex_array(vao) };
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        unsafe {
            if let Some((vbo, ibo)) = self.buffers.remove(&vertex_array) {
                self.gl.delete_buffer(vbo);
                self.gl.delete_buffer(ibo);
            }
            if let Some(vao) = Self::vertex_array(vertex_array) {
                self.gl.delete_vertex_array(vao);
            }
        }
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> DeviceResult<TextureHandle> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(DeviceError::InvalidUpload(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                expected,
                width,
                height,
                rgba.len()
            )));
        }

        let gl = &self.gl;
        unsafe {
            let texture = gl
                .create_texture()
                .map_err(|e| Self::creation_failed("texture", e))?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(rgba),
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            Ok(TextureHandle(texture.0.get()))
        }
    }

    fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        let texture = texture.and_then(Self::texture);
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, texture);
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(texture) = Self::texture(texture) {
            unsafe { self.gl.delete_texture(texture) };
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        unsafe {
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn enable(&mut self, capability: Capability) {
        unsafe { self.gl.enable(Self::capability(capability)) };
    }

    fn disable(&mut self, capability: Capability) {
        unsafe { self.gl.disable(Self::capability(capability)) };
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        unsafe { self.gl.blend_func(Self::blend_factor(src), Self::blend_factor(dst)) };
    }

    fn draw_indexed(&mut self, index_count: u32) {
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, index_count as i32, glow::UNSIGNED_INT, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(id: u32) -> GlObject {
        GlObject::Buffer(glow::NativeBuffer(NonZeroU32::new(id).unwrap()))
    }

    fn vertex_array(id: u32) -> GlObject {
        GlObject::VertexArray(glow::NativeVertexArray(NonZeroU32::new(id).unwrap()))
    }

    #[test]
    fn test_failed_index_buffer_deletes_vertex_array_and_vertex_buffer() {
        // Vertex array and vertex buffer exist, index buffer creation failed
        let mut created = Unwind::default();
        created.push(vertex_array(1));
        created.push(buffer(2));

        let mut deleted = Vec::new();
        created.unwind(|object| deleted.push(object));
        assert_eq!(deleted, vec![buffer(2), vertex_array(1)]);
    }

    #[test]
    fn test_failed_vertex_buffer_deletes_vertex_array() {
        let mut created = Unwind::default();
        created.push(vertex_array(1));

        let mut deleted = Vec::new();
        created.unwind(|object| deleted.push(object));
        assert_eq!(deleted, vec![vertex_array(1)]);
    }

    #[test]
    fn test_nothing_created_deletes_nothing() {
        let created: Unwind<GlObject> = Unwind::default();
        let mut deleted = Vec::new();
        created.unwind(|object| deleted.push(object));
        assert!(deleted.is_empty());
    }
}
