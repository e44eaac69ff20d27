//! Shader program management
//!
//! A [`ShaderProgram`] is one vertex + fragment pair compiled from GLSL text files and
//! linked into a program. Loading either produces a fully linked program or an error
//! with every intermediate object already deleted; there is no half-built state a
//! caller could accidentally activate.
//!
//! Source files are resolved from the program's [`ShaderType`] through a closed
//! lookup table: `<base>/<Type>Vert.glsl` and `<base>/<Type>Frag.glsl`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::device::{GraphicsDevice, ProgramHandle, ShaderHandle, ShaderStage};
use crate::render::RenderError;

/// Uniform names shared by the renderer and the stock shaders
pub mod uniforms {
    /// Combined view-projection matrix
    pub const VIEW_PROJECTION: &str = "uViewProjection";
    /// Per-object world transform
    pub const WORLD_TRANSFORM: &str = "uWorldTransform";
    /// Camera position in world space
    pub const CAMERA_POS: &str = "uCameraPos";
    /// Diffuse texture sampler
    pub const TEXTURE: &str = "uTexture";
}

/// The stock shader programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderType {
    /// Unlit, textured
    Basic,
    /// Screen-space sprites
    Sprite,
    /// Per-pixel Phong lighting
    Phong,
}

impl ShaderType {
    /// All variants, in declaration order
    pub const ALL: [Self; 3] = [Self::Basic, Self::Sprite, Self::Phong];

    /// Vertex and fragment source file names
    pub const fn source_files(self) -> (&'static str, &'static str) {
        match self {
            Self::Basic => ("BasicVert.glsl", "BasicFrag.glsl"),
            Self::Sprite => ("SpriteVert.glsl", "SpriteFrag.glsl"),
            Self::Phong => ("PhongVert.glsl", "PhongFrag.glsl"),
        }
    }

    /// Name used as a mesh shader hint
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Sprite => "Sprite",
            Self::Phong => "Phong",
        }
    }
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A linked vertex + fragment program
///
/// Not `Clone`: the program owns its GPU objects and [`ShaderProgram::unload`]
/// consumes it, so they are released exactly once.
#[derive(Debug)]
pub struct ShaderProgram {
    shader_type: ShaderType,
    vertex_shader: ShaderHandle,
    fragment_shader: ShaderHandle,
    program: ProgramHandle,
}

impl ShaderProgram {
    /// Compile, link and validate the program for `shader_type`
    ///
    /// # Errors
    /// - [`RenderError::ShaderCompile`] if a source file cannot be read or a stage
    ///   fails its compile-status check
    /// - [`RenderError::ShaderLink`] if the link-status check fails
    pub fn load(
        shader_type: ShaderType,
        asset_base_path: &Path,
        device: &mut dyn GraphicsDevice,
    ) -> Result<Self, RenderError> {
        let (vert_file, frag_file) = shader_type.source_files();
        log::debug!("Loading {} shader from {:?}", shader_type, asset_base_path);

        let vertex_shader =
            compile_stage(device, &asset_base_path.join(vert_file), ShaderStage::Vertex)?;
        let fragment_shader =
            match compile_stage(device, &asset_base_path.join(frag_file), ShaderStage::Fragment) {
                Ok(shader) => shader,
                Err(e) => {
                    device.delete_shader(vertex_shader);
                    return Err(e);
                }
            };

        let program = match device.create_program() {
            Ok(program) => program,
            Err(e) => {
                device.delete_shader(vertex_shader);
                device.delete_shader(fragment_shader);
                return Err(e.into());
            }
        };
        device.attach_shader(program, vertex_shader);
        device.attach_shader(program, fragment_shader);
        device.link_program(program);

        if !device.program_link_status(program) {
            let log = device.program_info_log(program);
            log::error!("{} shader failed to link: {}", shader_type, log.trim());
            device.delete_program(program);
            device.delete_shader(vertex_shader);
            device.delete_shader(fragment_shader);
            return Err(RenderError::ShaderLink { shader_type, log });
        }

        log::info!("Loaded {} shader program ({:?})", shader_type, program);
        Ok(Self {
            shader_type,
            vertex_shader,
            fragment_shader,
            program,
        })
    }

    /// Make this the active program for subsequent uniform writes and draws
    pub fn activate(&self, device: &mut dyn GraphicsDevice) {
        device.use_program(Some(self.program));
    }

    /// Write a 4x4 matrix uniform; no-op if the program does not declare `name`
    ///
    /// The matrix is uploaded in nalgebra's column-major storage order, which is what
    /// the device expects, so no transpose is applied.
    pub fn set_matrix_uniform(&self, device: &mut dyn GraphicsDevice, name: &str, matrix: &Mat4) {
        if let Some(location) = device.uniform_location(self.program, name) {
            device.set_uniform_mat4(location, &matrix.to_column_major());
        }
    }

    /// Write a 3-vector uniform; no-op if the program does not declare `name`
    pub fn set_vector_uniform(&self, device: &mut dyn GraphicsDevice, name: &str, vector: &Vec3) {
        if let Some(location) = device.uniform_location(self.program, name) {
            device.set_uniform_vec3(location, [vector.x, vector.y, vector.z]);
        }
    }

    /// Write a scalar uniform; no-op if the program does not declare `name`
    pub fn set_float_uniform(&self, device: &mut dyn GraphicsDevice, name: &str, value: f32) {
        if let Some(location) = device.uniform_location(self.program, name) {
            device.set_uniform_f32(location, value);
        }
    }

    /// Write an integer uniform (sampler unit); no-op if the program does not declare `name`
    pub fn set_int_uniform(&self, device: &mut dyn GraphicsDevice, name: &str, value: i32) {
        if let Some(location) = device.uniform_location(self.program, name) {
            device.set_uniform_i32(location, value);
        }
    }

    /// Which stock program this is
    pub const fn shader_type(&self) -> ShaderType {
        self.shader_type
    }

    /// Linked program handle
    pub const fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Release the program and both stages
    pub fn unload(self, device: &mut dyn GraphicsDevice) {
        device.delete_program(self.program);
        device.delete_shader(self.vertex_shader);
        device.delete_shader(self.fragment_shader);
        log::debug!("Unloaded {} shader program", self.shader_type);
    }
}

fn compile_stage(
    device: &mut dyn GraphicsDevice,
    path: &Path,
    stage: ShaderStage,
) -> Result<ShaderHandle, RenderError> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        log::error!("Failed to open shader {:?}: {}", path, e);
        RenderError::ShaderCompile {
            path: PathBuf::from(path),
            log: format!("cannot open source: {e}"),
        }
    })?;

    let shader = device.create_shader(stage)?;
    device.compile_shader(shader, &source);

    if !device.shader_compile_status(shader) {
        let log = device.shader_info_log(shader);
        log::error!("Failed to compile {:?}: {}", path, log.trim());
        device.delete_shader(shader);
        return Err(RenderError::ShaderCompile {
            path: PathBuf::from(path),
            log,
        });
    }

    Ok(shader)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::render::device::{DeviceCommand, RecordingDevice};

    pub(crate) const PHONG_VERT: &str = "#version 330\n\
        uniform mat4 uWorldTransform;\n\
        uniform mat4 uViewProjection;\n\
        layout(location = 0) in vec3 inPosition;\n\
        void main() { gl_Position = uViewProjection * uWorldTransform * vec4(inPosition, 1.0); }\n";

    pub(crate) const PHONG_FRAG: &str = "#version 330\n\
        struct DirectionalLight { vec3 mDirection; vec3 mDiffuseColor; vec3 mSpecColor; };\n\
        uniform sampler2D uTexture;\n\
        uniform vec3 uCameraPos;\n\
        uniform vec3 uAmbientLight;\n\
        uniform float uSpecPower;\n\
        uniform DirectionalLight uDirLight;\n\
        out vec4 outColor;\n\
        void main() { outColor = vec4(uAmbientLight, 1.0); }\n";

    pub(crate) const SPRITE_VERT: &str = "#version 330\n\
        uniform mat4 uWorldTransform;\n\
        uniform mat4 uViewProjection;\n\
        void main() {}\n";

    pub(crate) const SPRITE_FRAG: &str = "#version 330\n\
        uniform sampler2D uTexture;\n\
        void main() {}\n";

    const EMPTY_STAGE: &str = "#version 330\nvoid main() {}\n";

    /// Write the stock Phong and Sprite sources into `dir`
    pub(crate) fn write_stock_shaders(dir: &Path) {
        std::fs::write(dir.join("PhongVert.glsl"), PHONG_VERT).unwrap();
        std::fs::write(dir.join("PhongFrag.glsl"), PHONG_FRAG).unwrap();
        std::fs::write(dir.join("SpriteVert.glsl"), SPRITE_VERT).unwrap();
        std::fs::write(dir.join("SpriteFrag.glsl"), SPRITE_FRAG).unwrap();
    }

    #[test]
    fn test_source_file_table() {
        assert_eq!(ShaderType::Basic.source_files(), ("BasicVert.glsl", "BasicFrag.glsl"));
        assert_eq!(ShaderType::Sprite.source_files(), ("SpriteVert.glsl", "SpriteFrag.glsl"));
        assert_eq!(ShaderType::Phong.source_files(), ("PhongVert.glsl", "PhongFrag.glsl"));
    }

    #[test]
    fn test_every_type_names_its_own_sources() {
        for shader_type in ShaderType::ALL {
            let (vert, frag) = shader_type.source_files();
            assert_eq!(vert, format!("{shader_type}Vert.glsl"));
            assert_eq!(frag, format!("{shader_type}Frag.glsl"));
        }
    }

    #[test]
    fn test_phong_load_activate_and_set_uniforms() {
        let dir = tempfile::tempdir().unwrap();
        write_stock_shaders(dir.path());
        let mut device = RecordingDevice::new();
        let log = device.log();

        let shader = ShaderProgram::load(ShaderType::Phong, dir.path(), &mut device).unwrap();
        assert_eq!(shader.shader_type(), ShaderType::Phong);

        log.clear();
        shader.activate(&mut device);
        shader.set_matrix_uniform(&mut device, uniforms::VIEW_PROJECTION, &Mat4::identity());
        shader.set_float_uniform(&mut device, "uSpecPower", 300.0);

        let commands = log.commands();
        assert_eq!(commands[0], DeviceCommand::UseProgram(Some(shader.program())));
        assert_eq!(
            commands[1],
            DeviceCommand::SetUniformMat4(
                uniforms::VIEW_PROJECTION.to_string(),
                Mat4::identity().to_column_major()
            )
        );
        assert_eq!(commands[2], DeviceCommand::SetUniformF32("uSpecPower".to_string(), 300.0));
    }

    #[test]
    fn test_missing_uniform_is_silent_noop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("PhongVert.glsl"), EMPTY_STAGE).unwrap();
        std::fs::write(dir.path().join("PhongFrag.glsl"), EMPTY_STAGE).unwrap();
        let mut device = RecordingDevice::new();
        let log = device.log();

        let shader = ShaderProgram::load(ShaderType::Phong, dir.path(), &mut device).unwrap();
        log.clear();
        shader.activate(&mut device);
        shader.set_matrix_uniform(&mut device, uniforms::VIEW_PROJECTION, &Mat4::identity());
        shader.set_vector_uniform(&mut device, "uAmbientLight", &Vec3::new(0.1, 0.2, 0.3));

        assert_eq!(log.commands(), vec![DeviceCommand::UseProgram(Some(shader.program()))]);
    }

    #[test]
    fn test_missing_source_is_compile_error_and_leaks_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BasicVert.glsl"), EMPTY_STAGE).unwrap();
        let mut device = RecordingDevice::new();
        let log = device.log();

        let result = ShaderProgram::load(ShaderType::Basic, dir.path(), &mut device);
        match result {
            Err(RenderError::ShaderCompile { path, .. }) => {
                assert!(path.ends_with("BasicFrag.glsl"));
            }
            other => panic!("expected ShaderCompile, got {other:?}"),
        }
        assert_eq!(log.live_object_count(), 0);
    }

    #[test]
    fn test_stage_compile_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("SpriteVert.glsl"), "#version 330\n#error nope\n").unwrap();
        std::fs::write(dir.path().join("SpriteFrag.glsl"), SPRITE_FRAG).unwrap();
        let mut device = RecordingDevice::new();
        let log = device.log();

        let result = ShaderProgram::load(ShaderType::Sprite, dir.path(), &mut device);
        assert!(matches!(result, Err(RenderError::ShaderCompile { .. })));
        assert_eq!(log.live_object_count(), 0);
    }

    #[test]
    fn test_link_failure_deletes_program_and_stages() {
        let dir = tempfile::tempdir().unwrap();
        write_stock_shaders(dir.path());
        let mut device = RecordingDevice::new().fail_links(true);
        let log = device.log();

        let result = ShaderProgram::load(ShaderType::Phong, dir.path(), &mut device);
        assert!(matches!(
            result,
            Err(RenderError::ShaderLink {
                shader_type: ShaderType::Phong,
                ..
            })
        ));
        assert_eq!(log.live_object_count(), 0);
    }

    #[test]
    fn test_unload_releases_everything() {
        let dir = tempfile::tempdir().unwrap();
        write_stock_shaders(dir.path());
        let mut device = RecordingDevice::new();
        let log = device.log();

        let shader = ShaderProgram::load(ShaderType::Sprite, dir.path(), &mut device).unwrap();
        assert_eq!(log.live_object_count(), 3);
        shader.unload(&mut device);
        assert_eq!(log.live_object_count(), 0);
    }
}
