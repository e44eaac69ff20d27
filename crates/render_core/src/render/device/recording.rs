//! Headless recording device
//!
//! Hands out fresh handles, tracks which objects are alive and records every command
//! into a shared [`DeviceLog`], so tests can assert on exact call ordering after the
//! device has been moved into a renderer.
//!
//! Compilation and linking are simulated well enough to exercise error paths:
//! a stage whose source contains a `#error` directive fails to compile (as it would
//! on a real driver), and uniforms are discovered from `uniform <type> <name>;`
//! declarations in the attached sources.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::{
    BlendFactor, Capability, DeviceError, DeviceResult, GraphicsDevice, ProgramHandle, ShaderHandle,
    ShaderStage, TextureHandle, UniformLocation, VertexArrayHandle,
};
use crate::render::vertex::Vertex;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Shader object created
    CreateShader(ShaderHandle, ShaderStage),
    /// Shader compiled
    CompileShader(ShaderHandle),
    /// Shader deleted
    DeleteShader(ShaderHandle),
    /// Program created
    CreateProgram(ProgramHandle),
    /// Stage attached
    AttachShader(ProgramHandle, ShaderHandle),
    /// Program linked
    LinkProgram(ProgramHandle),
    /// Program deleted
    DeleteProgram(ProgramHandle),
    /// Program bound
    UseProgram(Option<ProgramHandle>),
    /// Matrix uniform written (name resolved from the location)
    SetUniformMat4(String, [f32; 16]),
    /// Vector uniform written
    SetUniformVec3(String, [f32; 3]),
    /// Scalar uniform written
    SetUniformF32(String, f32),
    /// Integer uniform written
    SetUniformI32(String, i32),
    /// Vertex array uploaded with its vertex and index counts
    CreateVertexArray(VertexArrayHandle, usize, usize),
    /// Vertex array bound
    BindVertexArray(VertexArrayHandle),
    /// Vertex array deleted
    DeleteVertexArray(VertexArrayHandle),
    /// Texture uploaded with its dimensions
    CreateTexture(TextureHandle, u32, u32),
    /// Texture bound
    BindTexture(Option<TextureHandle>),
    /// Texture deleted
    DeleteTexture(TextureHandle),
    /// Color and depth cleared
    Clear([f32; 4]),
    /// Capability enabled
    Enable(Capability),
    /// Capability disabled
    Disable(Capability),
    /// Blend factors set
    BlendFunc(BlendFactor, BlendFactor),
    /// Indexed draw issued
    DrawIndexed(u32),
    /// Back buffer presented (recorded by the headless window)
    SwapBuffers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ObjectKind {
    Shader,
    Program,
    VertexArray,
    Texture,
}

#[derive(Debug, Default)]
struct LogState {
    commands: Vec<DeviceCommand>,
    live: HashSet<(ObjectKind, u32)>,
}

/// Shared view of everything a [`RecordingDevice`] has done
#[derive(Debug, Clone, Default)]
pub struct DeviceLog {
    state: Rc<RefCell<LogState>>,
}

impl DeviceLog {
    /// Snapshot of the recorded commands
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state.borrow().commands.clone()
    }

    /// Forget recorded commands (live object tracking is kept)
    pub fn clear(&self) {
        self.state.borrow_mut().commands.clear();
    }

    /// Number of GPU objects created and not yet deleted
    pub fn live_object_count(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Number of recorded draw calls
    pub fn draw_count(&self) -> usize {
        self.state
            .borrow()
            .commands
            .iter()
            .filter(|c| matches!(c, DeviceCommand::DrawIndexed(_)))
            .count()
    }

    pub(crate) fn push(&self, command: DeviceCommand) {
        self.state.borrow_mut().commands.push(command);
    }

    fn created(&self, kind: ObjectKind, id: u32) {
        self.state.borrow_mut().live.insert((kind, id));
    }

    fn deleted(&self, kind: ObjectKind, id: u32) {
        let removed = self.state.borrow_mut().live.remove(&(kind, id));
        if !removed {
            log::warn!("RecordingDevice: delete of unknown {:?} {}", kind, id);
        }
    }
}

#[derive(Debug, Default)]
struct ShaderRecord {
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    attached: Vec<ShaderHandle>,
    linked: bool,
    uniforms: HashMap<String, UniformLocation>,
}

/// Headless [`GraphicsDevice`] that records its command stream
#[derive(Debug, Default)]
pub struct RecordingDevice {
    log: DeviceLog,
    next_id: u32,
    shaders: HashMap<ShaderHandle, ShaderRecord>,
    programs: HashMap<ProgramHandle, ProgramRecord>,
    uniform_names: HashMap<UniformLocation, String>,
    fail_links: bool,
}

impl RecordingDevice {
    /// Create a device with its own log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device that appends to an existing log
    pub fn with_log(log: DeviceLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Make every subsequent link fail, as a driver would on mismatched stage interfaces
    pub fn fail_links(mut self, fail: bool) -> Self {
        self.fail_links = fail;
        self
    }

    /// Shared command log
    pub fn log(&self) -> DeviceLog {
        self.log.clone()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn uniform_name(&self, location: UniformLocation) -> String {
        self.uniform_names
            .get(&location)
            .cloned()
            .unwrap_or_else(|| format!("<location {}>", location.0))
    }

    fn declared_uniforms(source: &str) -> impl Iterator<Item = &str> {
        source.lines().filter_map(|line| {
            let mut parts = line.split_whitespace();
            if parts.next()? != "uniform" {
                return None;
            }
            let _ty = parts.next()?;
            let name = parts.next()?.trim_end_matches(';');
            // Arrays declare their base name
            Some(name.split('[').next().unwrap_or(name))
        })
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_shader(&mut self, stage: ShaderStage) -> DeviceResult<ShaderHandle> {
        let shader = ShaderHandle(self.next());
        self.shaders.insert(shader, ShaderRecord::default());
        self.log.created(ObjectKind::Shader, shader.0);
        self.log.push(DeviceCommand::CreateShader(shader, stage));
        Ok(shader)
    }

    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) {
        if let Some(record) = self.shaders.get_mut(&shader) {
            record.source = source.to_string();
            record.compiled = !source.lines().any(|l| l.trim_start().starts_with("#error"));
        }
        self.log.push(DeviceCommand::CompileShader(shader));
    }

    fn shader_compile_status(&mut self, shader: ShaderHandle) -> bool {
        self.shaders.get(&shader).is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&mut self, shader: ShaderHandle) -> String {
        match self.shaders.get(&shader) {
            Some(s) if !s.compiled => "0:1: #error directive encountered".to_string(),
            _ => String::new(),
        }
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader);
        self.log.deleted(ObjectKind::Shader, shader.0);
        self.log.push(DeviceCommand::DeleteShader(shader));
    }

    fn create_program(&mut self) -> DeviceResult<ProgramHandle> {
        let program = ProgramHandle(self.next());
        self.programs.insert(program, ProgramRecord::default());
        self.log.created(ObjectKind::Program, program.0);
        self.log.push(DeviceCommand::CreateProgram(program));
        Ok(program)
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.attached.push(shader);
        }
        self.log.push(DeviceCommand::AttachShader(program, shader));
    }

    fn link_program(&mut self, program: ProgramHandle) {
        self.log.push(DeviceCommand::LinkProgram(program));

        let Some(record) = self.programs.get(&program) else {
            return;
        };
        let all_compiled = record
            .attached
            .iter()
            .all(|s| self.shaders.get(s).is_some_and(|r| r.compiled));
        let linked = all_compiled && record.attached.len() >= 2 && !self.fail_links;

        let names: Vec<String> = record
            .attached
            .iter()
            .filter_map(|s| self.shaders.get(s))
            .flat_map(|r| {
                Self::declared_uniforms(&r.source)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut uniforms = HashMap::new();
        if linked {
            for name in names {
                if !uniforms.contains_key(&name) {
                    let location = UniformLocation(self.next());
                    self.uniform_names.insert(location, name.clone());
                    uniforms.insert(name, location);
                }
            }
        }

        if let Some(record) = self.programs.get_mut(&program) {
            record.linked = linked;
            record.uniforms = uniforms;
        }
    }

    fn program_link_status(&mut self, program: ProgramHandle) -> bool {
        self.programs.get(&program).is_some_and(|p| p.linked)
    }

    fn program_info_log(&mut self, program: ProgramHandle) -> String {
        match self.programs.get(&program) {
            Some(p) if !p.linked => "error: program failed to link".to_string(),
            _ => String::new(),
        }
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.log.deleted(ObjectKind::Program, program.0);
        self.log.push(DeviceCommand::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.log.push(DeviceCommand::UseProgram(program));
    }

    fn uniform_location(
        &mut self,
        program: ProgramHandle,
        name: &str,
    ) -> Option<UniformLocation> {
        let record = self.programs.get(&program)?;
        if let Some(&location) = record.uniforms.get(name) {
            return Some(location);
        }

        // Struct members resolve when their block is declared in this program
        let base = name.split('.').next().unwrap_or(name);
        if base == name || !record.uniforms.contains_key(base) {
            return None;
        }

        let location = UniformLocation(self.next());
        self.uniform_names.insert(location, name.to_string());
        self.programs
            .get_mut(&program)?
            .uniforms
            .insert(name.to_string(), location);
        Some(location)
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, column_major: &[f32; 16]) {
        let name = self.uniform_name(location);
        self.log.push(DeviceCommand::SetUniformMat4(name, *column_major));
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: [f32; 3]) {
        let name = self.uniform_name(location);
        self.log.push(DeviceCommand::SetUniformVec3(name, value));
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        let name = self.uniform_name(location);
        self.log.push(DeviceCommand::SetUniformF32(name, value));
    }

    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32) {
        let name = self.uniform_name(location);
        self.log.push(DeviceCommand::SetUniformI32(name, value));
    }

    fn create_vertex_array(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> DeviceResult<VertexArrayHandle> {
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(DeviceError::InvalidUpload(format!(
                "index {} out of range for {} vertices",
                bad,
                vertices.len()
            )));
        }
        let vertex_array = VertexArrayHandle(self.next());
        self.log.created(ObjectKind::VertexArray, vertex_array.0);
        self.log
            .push(DeviceCommand::CreateVertexArray(vertex_array, vertices.len(), indices.len()));
        Ok(vertex_array)
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.log.push(DeviceCommand::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.log.deleted(ObjectKind::VertexArray, vertex_array.0);
        self.log.push(DeviceCommand::DeleteVertexArray(vertex_array));
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
        let texture = TextureHandle(self.next());
        self.log.created(ObjectKind::Texture, texture.0);
        self.log.push(DeviceCommand::CreateTexture(texture, width, height));
        Ok(texture)
    }

    fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        self.log.push(DeviceCommand::BindTexture(texture));
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.log.deleted(ObjectKind::Texture, texture.0);
        self.log.push(DeviceCommand::DeleteTexture(texture));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.log.push(DeviceCommand::Clear(color));
    }

    fn enable(&mut self, capability: Capability) {
        self.log.push(DeviceCommand::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        self.log.push(DeviceCommand::Disable(capability));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.log.push(DeviceCommand::BlendFunc(src, dst));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.log.push(DeviceCommand::DrawIndexed(index_count));
    }
}
