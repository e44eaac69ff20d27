//! Frame renderer
//!
//! [`FrameRenderer`] is the facade the scene talks to. It owns the window collaborator,
//! the device, both resource caches, the shader programs and the draw lists, and walks a
//! small state machine:
//!
//! ```text
//! Uninitialized --initialize--> Initialized --load_data--> Ready --shutdown--> ShutDown
//!                                     \__________________shutdown________________/
//! ```
//!
//! Calls made in the wrong state return [`RenderError::InvalidState`] instead of touching
//! the device.
//!
//! # Frame order
//!
//! 1. clear color and depth to the background color
//! 2. activate the mesh program
//! 3. view-projection and camera position
//! 4. lighting
//! 5. depth test on, blending off, then every visible mesh component in registration order
//! 6. depth test off, alpha blending on, then every visible sprite in ascending draw order
//! 7. present

use std::path::Path;

use crate::assets::{GeometrySource, ImageCrateSource, ImageSource, ObjGeometrySource};
use crate::config::{RendererConfig, WindowConfig};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::render::components::{
    DrawLists, MeshComponent, MeshComponentId, SpriteComponent, SpriteComponentId,
};
use crate::render::device::{BlendFactor, Capability, GraphicsDevice, VertexArrayHandle};
use crate::render::lighting::{uniforms as light_uniforms, LightingParams};
use crate::render::shader::{uniforms, ShaderProgram};
use crate::render::vertex::Vertex;
use crate::render::window::WindowSystem;
use crate::render::{RenderError, RenderResult};
use crate::resources::{
    Mesh, MeshCache, MeshId, MeshLoadContext, Texture, TextureCache, TextureId, TextureLoadContext,
};

/// Lifecycle state of a [`FrameRenderer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererState {
    /// Constructed; no window or context yet
    Uninitialized,
    /// Window and context exist; shaders not loaded
    Initialized,
    /// Shaders loaded and frame state set; frames can be drawn
    Ready,
    /// Everything released; the renderer cannot be used again
    ShutDown,
}

const SPRITE_QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([-0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
    Vertex::new([0.5, 0.5, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
    Vertex::new([0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
    Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
];

const SPRITE_QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Owns the graphics context, the resource caches and the draw lists, and draws frames
pub struct FrameRenderer {
    config: RendererConfig,
    state: RendererState,

    window: Box<dyn WindowSystem>,
    device: Option<Box<dyn GraphicsDevice>>,
    geometry: Box<dyn GeometrySource>,
    images: Box<dyn ImageSource>,

    meshes: MeshCache,
    textures: TextureCache,

    mesh_shader: Option<ShaderProgram>,
    sprite_shader: Option<ShaderProgram>,
    sprite_quad: Option<VertexArrayHandle>,

    draw_lists: DrawLists,

    view: Mat4,
    projection: Mat4,
    lighting: LightingParams,
    frame_count: u64,
}

impl FrameRenderer {
    /// Create a renderer that loads OBJ models and decodes images with the `image` crate
    pub fn new(config: RendererConfig, window: Box<dyn WindowSystem>) -> Self {
        Self {
            config,
            state: RendererState::Uninitialized,
            window,
            device: None,
            geometry: Box::new(ObjGeometrySource),
            images: Box::new(ImageCrateSource),
            meshes: MeshCache::new(),
            textures: TextureCache::new(),
            mesh_shader: None,
            sprite_shader: None,
            sprite_quad: None,
            draw_lists: DrawLists::new(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
            lighting: LightingParams::default(),
            frame_count: 0,
        }
    }

    /// Replace the model parser
    pub fn with_geometry_source(mut self, geometry: Box<dyn GeometrySource>) -> Self {
        self.geometry = geometry;
        self
    }

    /// Replace the image decoder
    pub fn with_image_source(mut self, images: Box<dyn ImageSource>) -> Self {
        self.images = images;
        self
    }

    fn expect_state(
        &self,
        expected: &[RendererState],
        operation: &'static str,
    ) -> RenderResult<()> {
        if expected.contains(&self.state) {
            Ok(())
        } else {
            log::error!("Rejected {} while renderer is {:?}", operation, self.state);
            Err(RenderError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Create the window and the graphics context
    ///
    /// # Errors
    /// [`RenderError::Config`] for an invalid configuration, [`RenderError::ContextInit`]
    /// when the window system fails.
    pub fn initialize(&mut self) -> RenderResult<()> {
        self.expect_state(&[RendererState::Uninitialized], "initialize")?;
        self.config.validate()?;

        self.window.create_window(&self.config.window)?;
        let device = match self.window.create_context() {
            Ok(device) => device,
            Err(e) => {
                log::error!("Graphics context creation failed: {}", e);
                self.window.destroy_window();
                return Err(e);
            }
        };

        self.device = Some(device);
        self.state = RendererState::Initialized;
        log::info!("Renderer initialized");
        Ok(())
    }

    /// Load the shader programs and set the initial view, projection and lighting
    ///
    /// On error nothing stays loaded and the renderer remains `Initialized`.
    pub fn load_data(&mut self) -> RenderResult<()> {
        self.expect_state(&[RendererState::Initialized], "load data")?;
        let Some(device) = self.device.as_deref_mut() else {
            return Err(RenderError::ContextInit("no graphics context".to_string()));
        };
        let base = self.config.asset_base_path.as_path();

        let mesh_shader = ShaderProgram::load(self.config.mesh_shader, base, device)?;

        let sprite_shader = match self.config.sprite_shader {
            Some(sprite_type) if sprite_type != self.config.mesh_shader => {
                match ShaderProgram::load(sprite_type, base, device) {
                    Ok(shader) => Some(shader),
                    Err(e) => {
                        mesh_shader.unload(device);
                        return Err(e);
                    }
                }
            }
            _ => None,
        };

        let sprite_quad =
            match device.create_vertex_array(&SPRITE_QUAD_VERTICES, &SPRITE_QUAD_INDICES) {
                Ok(quad) => quad,
                Err(e) => {
                    mesh_shader.unload(device);
                    if let Some(shader) = sprite_shader {
                        shader.unload(device);
                    }
                    return Err(e.into());
                }
            };

        self.mesh_shader = Some(mesh_shader);
        self.sprite_shader = sprite_shader;
        self.sprite_quad = Some(sprite_quad);

        self.view = Mat4::look_at(Vec3::zeros(), Vec3::z(), Vec3::y());
        let (width, height) = viewport_size(&*self.window, &self.config.window);
        let projection = &self.config.projection;
        self.projection = Mat4::perspective_fov(
            utils::deg_to_rad(projection.fov_degrees),
            width as f32,
            height as f32,
            projection.near,
            projection.far,
        );
        self.lighting = self.config.lighting.into();

        self.state = RendererState::Ready;
        log::info!("Renderer ready ({}x{})", width, height);
        Ok(())
    }

    /// Draw one frame and present it
    pub fn draw(&mut self) -> RenderResult<()> {
        self.expect_state(&[RendererState::Ready], "draw")?;

        let Self {
            config,
            window,
            device,
            meshes,
            textures,
            mesh_shader,
            sprite_shader,
            sprite_quad,
            draw_lists,
            view,
            projection,
            lighting,
            frame_count,
            ..
        } = self;
        let (Some(device), Some(mesh_shader), Some(sprite_quad)) =
            (device.as_deref_mut(), mesh_shader.as_ref(), *sprite_quad)
        else {
            return Err(RenderError::ContextInit("renderer data not loaded".to_string()));
        };

        device.clear(config.background_color);

        mesh_shader.activate(device);
        let view_projection = *projection * *view;
        mesh_shader.set_matrix_uniform(device, uniforms::VIEW_PROJECTION, &view_projection);
        mesh_shader.set_vector_uniform(device, uniforms::CAMERA_POS, &camera_position(view));
        apply_lighting(mesh_shader, device, lighting);

        device.enable(Capability::DepthTest);
        device.disable(Capability::Blend);

        for (_, component) in draw_lists.meshes() {
            if !component.visible {
                continue;
            }
            let Some(mesh) = meshes.get(component.mesh) else {
                continue;
            };
            mesh_shader.set_matrix_uniform(
                device,
                uniforms::WORLD_TRANSFORM,
                &component.world_transform,
            );
            match mesh.texture().and_then(|key| textures.get(key)) {
                Some(texture) => {
                    texture.bind(device);
                    mesh_shader.set_int_uniform(device, uniforms::TEXTURE, 0);
                }
                None => device.bind_texture(None),
            }
            mesh.draw(device);
        }

        device.disable(Capability::DepthTest);
        device.enable(Capability::Blend);
        device.blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);

        if draw_lists.sprite_count() > 0 {
            let sprite_program = match sprite_shader.as_ref() {
                Some(shader) => {
                    shader.activate(device);
                    let (width, height) = viewport_size(&**window, &config.window);
                    let screen = Mat4::simple_view_projection(width as f32, height as f32);
                    shader.set_matrix_uniform(device, uniforms::VIEW_PROJECTION, &screen);
                    shader
                }
                None => mesh_shader,
            };

            for (_, component) in draw_lists.sprites() {
                if !component.visible {
                    continue;
                }
                let Some(texture) = textures.get(component.texture) else {
                    continue;
                };
                let size = Mat4::new_nonuniform_scaling(&Vec3::new(
                    texture.width() as f32,
                    texture.height() as f32,
                    1.0,
                ));
                let world = component.world_transform * size;
                sprite_program.set_matrix_uniform(device, uniforms::WORLD_TRANSFORM, &world);
                texture.bind(device);
                sprite_program.set_int_uniform(device, uniforms::TEXTURE, 0);
                device.bind_vertex_array(sprite_quad);
                device.draw_indexed(SPRITE_QUAD_INDICES.len() as u32);
            }
        }

        window.swap_buffers();
        *frame_count += 1;
        Ok(())
    }

    /// Cached mesh for `path`, loading it on first request
    ///
    /// Returns `None` if the model fails to load or there is no context; the failure is
    /// logged.
    pub fn get_mesh(&mut self, path: impl AsRef<Path>) -> Option<MeshId> {
        let path = path.as_ref();
        let Some(device) = self.device.as_deref_mut() else {
            log::warn!("Cannot load mesh {:?} while renderer is {:?}", path, self.state);
            return None;
        };
        let mut ctx = MeshLoadContext {
            device,
            geometry: &*self.geometry,
            textures: &mut self.textures,
            images: &*self.images,
        };
        self.meshes.get_or_load(path, &mut ctx)
    }

    /// Cached texture for `path`, loading it on first request
    ///
    /// Returns `None` if the image fails to load or there is no context; the failure is
    /// logged.
    pub fn get_texture(&mut self, path: impl AsRef<Path>) -> Option<TextureId> {
        let path = path.as_ref();
        let Some(device) = self.device.as_deref_mut() else {
            log::warn!("Cannot load texture {:?} while renderer is {:?}", path, self.state);
            return None;
        };
        let mut ctx = TextureLoadContext {
            device,
            images: &*self.images,
        };
        self.textures.get_or_load(path, &mut ctx)
    }

    /// Loaded mesh by key
    pub fn mesh(&self, key: MeshId) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    /// Loaded texture by key
    pub fn texture(&self, key: TextureId) -> Option<&Texture> {
        self.textures.get(key)
    }

    /// Number of cached meshes
    pub fn mesh_cache_len(&self) -> usize {
        self.meshes.len()
    }

    /// Number of cached textures
    pub fn texture_cache_len(&self) -> usize {
        self.textures.len()
    }

    /// Register a mesh component; drawn after every mesh registered before it
    pub fn add_mesh_component(&mut self, component: MeshComponent) -> MeshComponentId {
        self.draw_lists.add_mesh(component)
    }

    /// Unregister a mesh component
    pub fn remove_mesh_component(&mut self, id: MeshComponentId) -> Option<MeshComponent> {
        self.draw_lists.remove_mesh(id)
    }

    /// Registered mesh component, for transform and visibility updates
    pub fn mesh_component_mut(&mut self, id: MeshComponentId) -> Option<&mut MeshComponent> {
        self.draw_lists.mesh_mut(id)
    }

    /// Register a sprite component at its draw order, after sprites with the same order
    pub fn add_sprite_component(&mut self, component: SpriteComponent) -> SpriteComponentId {
        self.draw_lists.add_sprite(component)
    }

    /// Unregister a sprite component
    pub fn remove_sprite_component(&mut self, id: SpriteComponentId) -> Option<SpriteComponent> {
        self.draw_lists.remove_sprite(id)
    }

    /// Registered sprite component, for transform and visibility updates
    pub fn sprite_component_mut(&mut self, id: SpriteComponentId) -> Option<&mut SpriteComponent> {
        self.draw_lists.sprite_mut(id)
    }

    /// Move a sprite to a new draw order
    pub fn set_sprite_draw_order(&mut self, id: SpriteComponentId, draw_order: i32) -> bool {
        self.draw_lists.set_sprite_draw_order(id, draw_order)
    }

    /// Component arenas and draw order
    pub fn draw_lists(&self) -> &DrawLists {
        &self.draw_lists
    }

    /// Set the camera's view matrix
    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    /// Current view matrix
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// Replace the projection matrix
    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    /// Current projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Replace the frame lighting
    pub fn set_lighting(&mut self, lighting: LightingParams) {
        self.lighting = lighting;
    }

    /// Current frame lighting
    pub fn lighting(&self) -> &LightingParams {
        &self.lighting
    }

    /// Lifecycle state
    pub fn state(&self) -> RendererState {
        self.state
    }

    /// Frames presented so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Configuration the renderer was created with
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Release every resource, then the context and the window
    pub fn shutdown(&mut self) -> RenderResult<()> {
        self.expect_state(&[RendererState::Initialized, RendererState::Ready], "shut down")?;

        if let Some(mut boxed) = self.device.take() {
            let device: &mut dyn GraphicsDevice = &mut *boxed;
            let textures = self.textures.release_all(device);
            let meshes = self.meshes.release_all(device);
            if let Some(shader) = self.mesh_shader.take() {
                shader.unload(device);
            }
            if let Some(shader) = self.sprite_shader.take() {
                shader.unload(device);
            }
            if let Some(quad) = self.sprite_quad.take() {
                device.delete_vertex_array(quad);
            }
            log::info!("Released {} texture(s) and {} mesh(es)", textures, meshes);
        }
        self.draw_lists.clear();

        self.window.destroy_context();
        self.window.destroy_window();
        self.state = RendererState::ShutDown;
        log::info!("Renderer shut down after {} frame(s)", self.frame_count);
        Ok(())
    }
}

impl Drop for FrameRenderer {
    fn drop(&mut self) {
        if matches!(self.state, RendererState::Initialized | RendererState::Ready) {
            log::warn!("FrameRenderer dropped without shutdown; GPU resources leak");
        }
    }
}

/// Framebuffer size, or the configured window size while the framebuffer is empty
///
/// A minimized window reports a zero-sized framebuffer, which has no aspect ratio.
fn viewport_size(window: &dyn WindowSystem, config: &WindowConfig) -> (u32, u32) {
    match window.framebuffer_size() {
        (width, height) if width > 0 && height > 0 => (width, height),
        _ => (config.width, config.height),
    }
}

fn camera_position(view: &Mat4) -> Vec3 {
    view.try_inverse()
        .map_or_else(Vec3::zeros, |inverse| inverse.fixed_view::<3, 1>(0, 3).into_owned())
}

fn apply_lighting(
    shader: &ShaderProgram,
    device: &mut dyn GraphicsDevice,
    lighting: &LightingParams,
) {
    let light = &lighting.directional;
    shader.set_vector_uniform(device, light_uniforms::AMBIENT_LIGHT, &lighting.ambient_color);
    shader.set_vector_uniform(device, light_uniforms::DIR_LIGHT_DIRECTION, &light.direction);
    shader.set_vector_uniform(device, light_uniforms::DIR_LIGHT_DIFFUSE, &light.diffuse_color);
    shader.set_vector_uniform(device, light_uniforms::DIR_LIGHT_SPECULAR, &light.specular_color);
    shader.set_float_uniform(device, light_uniforms::SPEC_POWER, lighting.specular_power);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetError, ImageData, ParsedGeometry, Polygon, PolygonVertex};
    use crate::render::device::{DeviceCommand, DeviceLog};
    use crate::render::lighting::DirectionalLight;
    use crate::render::shader::tests::write_stock_shaders;
    use crate::render::window::HeadlessWindow;
    use crate::render::ShaderType;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    /// Every model is one triangle; paths containing "missing" fail; "textured" models
    /// reference `skin.png`
    struct TriangleGeometry;

    impl GeometrySource for TriangleGeometry {
        fn parse(&self, path: &Path) -> Result<ParsedGeometry, AssetError> {
            if path.to_string_lossy().contains("missing") {
                return Err(AssetError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            let corner = |position| PolygonVertex {
                position,
                normal: [0.0, 0.0, 1.0],
                uv: [0.0, 0.0],
            };
            Ok(ParsedGeometry {
                polygons: vec![Polygon {
                    vertices: vec![
                        corner([0.0, 0.0, 0.0]),
                        corner([1.0, 0.0, 0.0]),
                        corner([0.0, 1.0, 0.0]),
                    ],
                }],
                texture: path
                    .to_string_lossy()
                    .contains("textured")
                    .then(|| "skin.png".into()),
                shader_hint: None,
            })
        }
    }

    /// 4x2 images for everything except paths containing "missing"
    struct SolidImages;

    impl ImageSource for SolidImages {
        fn decode(&self, path: &Path) -> Result<ImageData, AssetError> {
            if path.to_string_lossy().contains("missing") {
                return Err(AssetError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Ok(ImageData::solid_color(4, 2, [255, 255, 255, 255]))
        }
    }

    struct Fixture {
        renderer: FrameRenderer,
        log: DeviceLog,
        _shaders: TempDir,
    }

    fn fixture_with(window: HeadlessWindow, config: RendererConfig) -> Fixture {
        crate::foundation::logging::init();
        let shaders = tempfile::tempdir().unwrap();
        write_stock_shaders(shaders.path());
        let log = window.log();
        let config = config.with_asset_base_path(shaders.path());
        let renderer = FrameRenderer::new(config, Box::new(window))
            .with_geometry_source(Box::new(TriangleGeometry))
            .with_image_source(Box::new(SolidImages));
        Fixture {
            renderer,
            log,
            _shaders: shaders,
        }
    }

    fn ready() -> Fixture {
        let mut fixture = fixture_with(HeadlessWindow::new(), RendererConfig::default());
        fixture.renderer.initialize().unwrap();
        fixture.renderer.load_data().unwrap();
        fixture.log.clear();
        fixture
    }

    fn position_of(commands: &[DeviceCommand], wanted: &DeviceCommand) -> usize {
        commands
            .iter()
            .position(|c| c == wanted)
            .unwrap_or_else(|| panic!("{wanted:?} not recorded"))
    }

    #[test]
    fn test_lifecycle_states() {
        let mut fixture = fixture_with(HeadlessWindow::new(), RendererConfig::default());
        let renderer = &mut fixture.renderer;
        assert_eq!(renderer.state(), RendererState::Uninitialized);

        assert!(matches!(
            renderer.draw(),
            Err(RenderError::InvalidState {
                state: RendererState::Uninitialized,
                ..
            })
        ));
        assert!(renderer.shutdown().is_err());

        renderer.initialize().unwrap();
        assert_eq!(renderer.state(), RendererState::Initialized);
        assert!(renderer.draw().is_err());

        renderer.load_data().unwrap();
        assert_eq!(renderer.state(), RendererState::Ready);
        renderer.draw().unwrap();

        renderer.shutdown().unwrap();
        assert_eq!(renderer.state(), RendererState::ShutDown);
        assert!(renderer.draw().is_err());
        assert!(matches!(renderer.shutdown(), Err(RenderError::InvalidState { .. })));
    }

    #[test]
    fn test_context_failure_is_fatal() {
        let window = HeadlessWindow::new().with_failing_context();
        let mut fixture = fixture_with(window, RendererConfig::default());

        let result = fixture.renderer.initialize();
        assert!(matches!(result, Err(RenderError::ContextInit(_))));
        assert_eq!(fixture.renderer.state(), RendererState::Uninitialized);
    }

    #[test]
    fn test_shader_link_failure_propagates_without_leaks() {
        let window = HeadlessWindow::new().with_failing_links();
        let mut fixture = fixture_with(window, RendererConfig::default());
        fixture.renderer.initialize().unwrap();

        let result = fixture.renderer.load_data();
        assert!(matches!(result, Err(RenderError::ShaderLink { .. })));
        assert_eq!(fixture.renderer.state(), RendererState::Initialized);
        assert_eq!(fixture.log.live_object_count(), 0);

        fixture.renderer.shutdown().unwrap();
    }

    #[test]
    fn test_missing_sprite_shader_releases_mesh_shader() {
        let mut fixture = fixture_with(
            HeadlessWindow::new(),
            RendererConfig::default().with_sprite_shader(Some(ShaderType::Basic)),
        );
        fixture.renderer.initialize().unwrap();

        let result = fixture.renderer.load_data();
        assert!(matches!(result, Err(RenderError::ShaderCompile { .. })));
        assert_eq!(fixture.log.live_object_count(), 0);
        fixture.renderer.shutdown().unwrap();
    }

    #[test]
    fn test_load_data_sets_frame_state() {
        let fixture = ready();
        let renderer = &fixture.renderer;

        let lighting = renderer.lighting();
        assert_relative_eq!(lighting.ambient_color, Vec3::new(0.35, 0.35, 0.35));
        assert_relative_eq!(lighting.directional.direction, Vec3::new(0.3, 0.3, 0.8));
        assert_relative_eq!(lighting.specular_power, 300.0);

        let expected_view = Mat4::look_at(Vec3::zeros(), Vec3::z(), Vec3::y());
        assert_relative_eq!(*renderer.view_matrix(), expected_view);
    }

    #[test]
    fn test_minimized_window_uses_configured_size() {
        let mut fixture = fixture_with(
            HeadlessWindow::new().with_minimized(),
            RendererConfig::default().with_window_size(800, 600),
        );
        let renderer = &mut fixture.renderer;
        renderer.initialize().unwrap();
        renderer.load_data().unwrap();

        let expected = Mat4::perspective_fov(utils::deg_to_rad(50.0), 800.0, 600.0, 25.0, 10_000.0);
        assert!(renderer.projection_matrix().iter().all(|v| v.is_finite()));
        assert_relative_eq!(*renderer.projection_matrix(), expected);

        let hud = renderer.get_texture("hud.png").unwrap();
        renderer.add_sprite_component(SpriteComponent::new(hud, 0));
        fixture.log.clear();
        renderer.draw().unwrap();

        // The sprite pass projects with the configured size
        let screen = fixture
            .log
            .commands()
            .into_iter()
            .rev()
            .find_map(|c| match c {
                DeviceCommand::SetUniformMat4(name, m) if name == uniforms::VIEW_PROJECTION => {
                    Some(m)
                }
                _ => None,
            })
            .unwrap();
        assert_relative_eq!(screen[0], 2.0 / 800.0);
        assert_relative_eq!(screen[5], 2.0 / 600.0);
        assert_eq!(fixture.log.draw_count(), 1);
    }

    #[test]
    fn test_background_color_clears_frame() {
        let mut fixture = fixture_with(
            HeadlessWindow::new(),
            RendererConfig::default().with_background_color([0.0, 0.1, 0.4, 1.0]),
        );
        fixture.renderer.initialize().unwrap();
        fixture.renderer.load_data().unwrap();
        fixture.log.clear();

        fixture.renderer.draw().unwrap();
        assert_eq!(fixture.log.commands()[0], DeviceCommand::Clear([0.0, 0.1, 0.4, 1.0]));
    }

    #[test]
    fn test_custom_lighting_reaches_the_frame() {
        let mut fixture = ready();
        let renderer = &mut fixture.renderer;
        let lighting = LightingParams::default()
            .with_ambient(Vec3::new(0.1, 0.2, 0.3))
            .with_directional(DirectionalLight {
                direction: Vec3::new(0.0, -1.0, 0.0),
                diffuse_color: Vec3::new(1.0, 1.0, 1.0),
                specular_color: Vec3::new(0.5, 0.5, 0.5),
            })
            .with_specular_power(8.0);
        renderer.set_lighting(lighting);
        assert_eq!(renderer.lighting(), &lighting);

        renderer.draw().unwrap();
        let commands = fixture.log.commands();
        assert!(commands.contains(&DeviceCommand::SetUniformVec3(
            light_uniforms::AMBIENT_LIGHT.to_string(),
            [0.1, 0.2, 0.3],
        )));
        assert!(commands.contains(&DeviceCommand::SetUniformVec3(
            light_uniforms::DIR_LIGHT_DIRECTION.to_string(),
            [0.0, -1.0, 0.0],
        )));
        assert!(commands.contains(&DeviceCommand::SetUniformF32(
            light_uniforms::SPEC_POWER.to_string(),
            8.0,
        )));
    }

    #[test]
    fn test_frame_command_order() {
        let mut fixture = ready();
        let renderer = &mut fixture.renderer;

        let ship = renderer.get_mesh("ship.obj").unwrap();
        let hud = renderer.get_texture("hud.png").unwrap();
        renderer.add_mesh_component(MeshComponent::new(ship));
        renderer.add_sprite_component(SpriteComponent::new(hud, 100));
        fixture.log.clear();

        renderer.draw().unwrap();
        let commands = fixture.log.commands();

        assert_eq!(commands[0], DeviceCommand::Clear([0.2, 0.2, 0.2, 1.0]));
        assert!(matches!(commands[1], DeviceCommand::UseProgram(Some(_))));
        assert!(matches!(
            &commands[2],
            DeviceCommand::SetUniformMat4(name, _) if name == uniforms::VIEW_PROJECTION
        ));
        assert_eq!(commands.last(), Some(&DeviceCommand::SwapBuffers));

        let depth_on = position_of(&commands, &DeviceCommand::Enable(Capability::DepthTest));
        let blend_off = position_of(&commands, &DeviceCommand::Disable(Capability::Blend));
        let depth_off = position_of(&commands, &DeviceCommand::Disable(Capability::DepthTest));
        let blend_on = position_of(&commands, &DeviceCommand::Enable(Capability::Blend));
        let blend_func = position_of(
            &commands,
            &DeviceCommand::BlendFunc(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
        );
        let draws: Vec<usize> = commands
            .iter()
            .enumerate()
            .filter_map(|(i, c)| matches!(c, DeviceCommand::DrawIndexed(_)).then_some(i))
            .collect();
        let spec_power = commands
            .iter()
            .position(|c| {
                matches!(
                    c,
                    DeviceCommand::SetUniformF32(name, _) if name == light_uniforms::SPEC_POWER
                )
            })
            .unwrap();

        assert_eq!(draws.len(), 2);
        assert!(spec_power < depth_on);
        assert!(depth_on < blend_off && blend_off < draws[0]);
        assert!(draws[0] < depth_off && depth_off < blend_on && blend_on < blend_func);
        assert!(blend_func < draws[1]);
        assert_eq!(commands[draws[0]], DeviceCommand::DrawIndexed(3));
        assert_eq!(commands[draws[1]], DeviceCommand::DrawIndexed(6));
        assert_eq!(renderer.frame_count(), 1);
    }

    #[test]
    fn test_sprites_drawn_in_draw_order() {
        let mut fixture = ready();
        let renderer = &mut fixture.renderer;
        let texture = renderer.get_texture("a.png").unwrap();

        let offsets = [(100, 1.0), (50, 2.0), (100, 3.0), (150, 4.0)];
        for (order, x) in offsets {
            renderer.add_sprite_component(
                SpriteComponent::new(texture, order)
                    .with_transform(Mat4::new_translation(&Vec3::new(x, 0.0, 0.0))),
            );
        }
        fixture.log.clear();
        renderer.draw().unwrap();

        // The sprite world transform carries the x offset in column-major slot 12
        let xs: Vec<f32> = fixture
            .log
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::SetUniformMat4(name, m) if name == uniforms::WORLD_TRANSFORM => {
                    Some(m[12])
                }
                _ => None,
            })
            .collect();
        assert_eq!(xs, vec![2.0, 1.0, 3.0, 4.0]);
    }

    #[test]
    fn test_removed_component_is_not_drawn() {
        let mut fixture = ready();
        let renderer = &mut fixture.renderer;
        let mesh = renderer.get_mesh("rock.obj").unwrap();

        let id = renderer.add_mesh_component(MeshComponent::new(mesh));
        assert!(renderer.remove_mesh_component(id).is_some());
        assert!(renderer.mesh_component_mut(id).is_none());
        fixture.log.clear();

        renderer.draw().unwrap();
        assert_eq!(fixture.log.draw_count(), 0);
    }

    #[test]
    fn test_hidden_component_is_not_drawn() {
        let mut fixture = ready();
        let renderer = &mut fixture.renderer;
        let mesh = renderer.get_mesh("rock.obj").unwrap();
        let id = renderer.add_mesh_component(MeshComponent::new(mesh));

        renderer.mesh_component_mut(id).unwrap().visible = false;
        fixture.log.clear();
        renderer.draw().unwrap();
        assert_eq!(fixture.log.draw_count(), 0);
    }

    #[test]
    fn test_resources_are_shared_by_path() {
        let mut fixture = ready();
        let renderer = &mut fixture.renderer;

        let first = renderer.get_mesh("textured_ship.obj").unwrap();
        let second = renderer.get_mesh("textured_ship.obj").unwrap();
        let skin = renderer.get_texture("skin.png").unwrap();

        assert_eq!(first, second);
        assert_eq!(renderer.mesh_cache_len(), 1);
        assert_eq!(renderer.texture_cache_len(), 1);
        assert_eq!(renderer.mesh(first).unwrap().texture(), Some(skin));
    }

    #[test]
    fn test_missing_mesh_is_absent_and_frame_still_draws() {
        let mut fixture = ready();
        let renderer = &mut fixture.renderer;

        assert!(renderer.get_mesh("missing.fbx").is_none());
        assert!(renderer.get_texture("missing.png").is_none());
        assert_eq!(renderer.mesh_cache_len(), 0);

        renderer.draw().unwrap();
        assert_eq!(fixture.log.commands().last(), Some(&DeviceCommand::SwapBuffers));
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut fixture = ready();
        let renderer = &mut fixture.renderer;
        let mesh = renderer.get_mesh("textured_ship.obj").unwrap();
        renderer.get_mesh("rock.obj").unwrap();
        renderer.get_texture("hud.png").unwrap();
        renderer.add_mesh_component(MeshComponent::new(mesh));
        renderer.draw().unwrap();

        renderer.shutdown().unwrap();

        assert_eq!(fixture.log.live_object_count(), 0);
        assert_eq!(renderer.mesh_cache_len(), 0);
        assert_eq!(renderer.texture_cache_len(), 0);
        assert!(renderer.mesh(mesh).is_none());
        assert_eq!(renderer.draw_lists().mesh_count(), 0);
        assert!(renderer.get_mesh("rock.obj").is_none());
    }

    #[test]
    fn test_camera_position_follows_view() {
        let eye = Vec3::new(10.0, -5.0, 2.0);
        let view = Mat4::look_at(eye, Vec3::zeros(), Vec3::y());
        assert_relative_eq!(camera_position(&view), eye, epsilon = 1e-4);
    }
}
