//! Low-level 2D rendering.
//!
//! The [Renderer] owns every GPU resource the engine draws with: one vertex array, a handful of
//! shared array buffers, three shader programs, and tables of sprite and font textures. All GPU
//! calls go through a [GraphicsDevice]; frames are presented on a [RenderSurface].
//!
//! # Lifecycle
//!
//! [Renderer::new()] walks the renderer through its [startup stages](RendererStage) and leaves it
//! [Ready](RendererStage::Ready). Each frame is then bracketed by [Renderer::start_frame()] and
//! [Renderer::end_frame()], with draw calls in between:
//!
//! ```no_run
//! # use calendon::render::{FontId, Renderer, SpriteId};
//! # use calendon::render::color::Rgba8;
//! # use calendon::render::text::TextDrawParams;
//! # use nalgebra_glm::vec2;
//! # fn frame(renderer: &mut Renderer, sprite: SpriteId, font: FontId)
//! #     -> Result<(), calendon::render::RenderError> {
//! renderer.start_frame()?;
//! renderer.clear(Rgba8::TRANSPARENT);
//! renderer.draw_sprite(sprite, vec2(10.0, 10.0), vec2(64.0, 64.0))?;
//! renderer.draw_simple_text(font, &TextDrawParams::at(vec2(10.0, 100.0)), "Hello")?;
//! renderer.end_frame()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Shaders
//!
//! Programs are reflected when linked (see [program]), and must follow the naming contract in
//! [semantic]. Default shader sources are built in and served from [builtin_shaders()]; assets
//! with the same paths in the renderer's asset source take priority.

use educe::Educe;
use std::fmt::{Display, Formatter};
use tracing::{debug, error, info, warn};

use crate::font::{load_psf2, Psf2Font, Psf2Options};
use crate::image::ImageRgba8;
use crate::log::TARGET_RENDER;
use crate::render::color::{Rgb8, Rgba8};
use crate::render::device::{
    BufferData,
    BufferHandle,
    BufferUsage,
    GraphicsDevice,
    Primitive,
    RenderSurface,
    ShaderStage,
    TextureFilter,
    TextureHandle,
    VertexArrayHandle,
};
use crate::render::program::{Program, ShaderSource};
use crate::render::text::{GlyphBatch, GlyphLayout, LayoutDirection, TextDirection, TextDrawParams};
use crate::render::uniform::UniformStorage;
use crate::render::vertex_format::{glyph_block_bytes, VertexFormat, VertexFormats};
use crate::render::view::{camera_projection, matrix_from_transform, quad_model_view, Aabb2, Transform2};
use crate::resource::path::AssetPath;
use crate::resource::source::constant::ConstantAssetSource;
use crate::resource::source::list::AssetSourceList;
use crate::resource::AssetSource;

pub mod color;
pub mod debug;
pub mod device;
mod error;
pub mod program;
pub mod semantic;
pub mod text;
pub mod uniform;
pub mod vertex_format;
pub mod view;

pub use error::{gl_error_name, RenderError};

pub const FULL_SCREEN_VERT: &str = "shaders/fullscreen_textured_quad.vert";
pub const FULL_SCREEN_FRAG: &str = "shaders/uv_as_red_green.frag";
pub const SOLID_POLYGON_VERT: &str = "shaders/solid_polygon.vert";
pub const SOLID_POLYGON_FRAG: &str = "shaders/solid_polygon.frag";
pub const SPRITE_VERT: &str = "shaders/atlas_sprite.vert";
pub const SPRITE_FRAG: &str = "shaders/atlas_sprite.frag";

/// Asset source serving the built-in shader sources at their default paths.
pub fn builtin_shaders() -> ConstantAssetSource {
    ConstantAssetSource::builder()
        .asset(FULL_SCREEN_VERT, include_bytes!("shaders/fullscreen_textured_quad.vert"))
        .asset(FULL_SCREEN_FRAG, include_bytes!("shaders/uv_as_red_green.frag"))
        .asset(SOLID_POLYGON_VERT, include_bytes!("shaders/solid_polygon.vert"))
        .asset(SOLID_POLYGON_FRAG, include_bytes!("shaders/solid_polygon.frag"))
        .asset(SPRITE_VERT, include_bytes!("shaders/atlas_sprite.vert"))
        .asset(SPRITE_FRAG, include_bytes!("shaders/atlas_sprite.frag"))
        .build()
}

/// Handle to an entry in the renderer's sprite table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteId(u32);

/// Handle to an entry in the renderer's font table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(u32);

impl SpriteId {
    #[inline]
    pub fn index(self) -> usize { self.0 as usize }
}

impl FontId {
    #[inline]
    pub fn index(self) -> usize { self.0 as usize }
}

/// Asset paths of a vertex and fragment shader pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSources {
    pub vertex: AssetPath,
    pub fragment: AssetPath,
}

impl ProgramSources {
    #[inline]
    pub fn new(vertex: impl Into<AssetPath>, fragment: impl Into<AssetPath>) -> Self {
        Self { vertex: vertex.into(), fragment: fragment.into() }
    }
}

/// Shader sources for each of the renderer's programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderConfig {
    /// Full screen debug quad.
    pub full_screen: ProgramSources,
    /// Flat colored shapes.
    pub solid_polygon: ProgramSources,
    /// Textured quads: sprites and glyphs.
    pub sprite: ProgramSources,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            full_screen: ProgramSources::new(FULL_SCREEN_VERT, FULL_SCREEN_FRAG),
            solid_polygon: ProgramSources::new(SOLID_POLYGON_VERT, SOLID_POLYGON_FRAG),
            sprite: ProgramSources::new(SPRITE_VERT, SPRITE_FRAG),
        }
    }
}

/// [Renderer] configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Drawing resolution. Defaults to the surface size when unset.
    pub resolution: Option<glm::U32Vec2>,

    pub vsync: bool,

    /// Color frames are cleared to by the [driver](crate::app::driver::Driver).
    pub clear_color: Rgba8,

    pub max_sprites: usize,

    pub max_fonts: usize,

    /// Glyphs drawn per draw call; longer text is split into several calls.
    pub max_glyphs_per_draw: usize,

    /// Most vertices in a single debug shape.
    pub max_debug_points: usize,

    /// Most points in an outlined circle.
    pub max_circle_points: usize,

    /// Scale text glyphs are drawn at.
    pub text_scale: f32,

    /// Query the driver for errors after GPU work.
    ///
    /// Defaults to on in debug builds.
    pub check_gl_errors: bool,

    pub shaders: ShaderConfig,

    pub font_options: Psf2Options,

    #[doc(hidden)]
    pub _ne: crate::NonExhaustive,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            resolution: None,
            vsync: true,
            clear_color: Rgba8::TRANSPARENT,
            max_sprites: 8,
            max_fonts: 8,
            max_glyphs_per_draw: 180,
            max_debug_points: 128,
            max_circle_points: 30,
            text_scale: 3.0,
            check_gl_errors: cfg!(debug_assertions),
            shaders: ShaderConfig::default(),
            font_options: Psf2Options::default(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

/// Lifecycle stage of a [Renderer].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererStage {
    Uninitialized,
    ContextCreated,
    ResourcesInitialized,
    ShadersLoaded,
    /// Initialized, between frames.
    Ready,
    /// Between [start_frame()](Renderer::start_frame) and [end_frame()](Renderer::end_frame).
    InFrame,
    Shutdown,
}

impl RendererStage {
    /// Whether a renderer may move from this stage to `next`.
    pub fn can_transition_to(self, next: RendererStage) -> bool {
        use RendererStage::*;
        matches!(
            (self, next),
            (Uninitialized, ContextCreated)
                | (ContextCreated, ResourcesInitialized)
                | (ResourcesInitialized, ShadersLoaded)
                | (ShadersLoaded, Ready)
                | (Ready, InFrame)
                | (InFrame, Ready)
        ) || (self != Shutdown && next == Shutdown)
    }

    fn advance(&mut self, next: RendererStage) -> Result<(), RenderError> {
        if self.can_transition_to(next) {
            debug!(target: TARGET_RENDER, from = ?*self, to = ?next, "Renderer stage");
            *self = next;
            Ok(())
        } else {
            Err(RenderError::InvalidStage { from: *self, to: next })
        }
    }
}

impl Display for RendererStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy)]
struct RenderBuffers {
    sprite: BufferHandle,
    full_screen_quad: BufferHandle,
    debug: BufferHandle,
    glyphs: BufferHandle,
}

impl RenderBuffers {
    fn create(device: &mut dyn GraphicsDevice, config: &RendererConfig) -> Result<Self, RenderError> {
        // Interleaved position/UV, with the unit quad's positions doubling as its UVs.
        let sprite_vertices: [[f32; 4]; 4] = [
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 1.0],
            [1.0, 0.0, 1.0, 0.0],
            [1.0, 1.0, 1.0, 1.0],
        ];
        let full_screen_vertices: [[f32; 2]; 4] = [
            [-1.0, -1.0],
            [-1.0, 1.0],
            [1.0, -1.0],
            [1.0, 1.0],
        ];

        let sprite = create_buffer(
            device,
            BufferData::Bytes(bytemuck::cast_slice(&sprite_vertices)),
            BufferUsage::Static,
        )?;
        let full_screen_quad = create_buffer(
            device,
            BufferData::Bytes(bytemuck::cast_slice(&full_screen_vertices)),
            BufferUsage::Static,
        )?;
        let debug = create_buffer(
            device,
            BufferData::Size(config.max_debug_points * 4 * std::mem::size_of::<f32>()),
            BufferUsage::Dynamic,
        )?;
        let glyphs = create_buffer(
            device,
            BufferData::Size(2 * glyph_block_bytes(config.max_glyphs_per_draw)),
            BufferUsage::Dynamic,
        )?;
        device.bind_array_buffer(None)?;

        Ok(Self {
            sprite,
            full_screen_quad,
            debug,
            glyphs,
        })
    }

    fn delete(self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        for buffer in [self.sprite, self.full_screen_quad, self.debug, self.glyphs] {
            device.delete_buffer(buffer)?;
        }
        Ok(())
    }
}

fn create_buffer(
    device: &mut dyn GraphicsDevice,
    data: BufferData<'_>,
    usage: BufferUsage,
) -> Result<BufferHandle, RenderError> {
    let buffer = device.create_buffer()?;
    device.bind_array_buffer(Some(buffer))?;
    device.array_buffer_data(data, usage)?;
    Ok(buffer)
}

#[derive(Debug)]
struct Programs {
    full_screen: Program,
    solid_polygon: Program,
    sprite: Program,
}

impl Programs {
    fn load(
        device: &mut dyn GraphicsDevice,
        assets: &dyn AssetSource,
        config: &ShaderConfig,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            full_screen: load_program(device, assets, &config.full_screen)?,
            solid_polygon: load_program(device, assets, &config.solid_polygon)?,
            sprite: load_program(device, assets, &config.sprite)?,
        })
    }

    fn delete(&self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        for program in [&self.full_screen, &self.solid_polygon, &self.sprite] {
            device.delete_program(program.handle())?;
        }
        Ok(())
    }
}

fn load_program(
    device: &mut dyn GraphicsDevice,
    assets: &dyn AssetSource,
    sources: &ProgramSources,
) -> Result<Program, RenderError> {
    let vertex = assets.read_text(&sources.vertex)?;
    let fragment = assets.read_text(&sources.fragment)?;
    let program = Program::build(
        device,
        ShaderSource { stage: ShaderStage::Vertex, path: &sources.vertex, source: &vertex },
        ShaderSource { stage: ShaderStage::Fragment, path: &sources.fragment, source: &fragment },
    )?;
    debug!(
        target: TARGET_RENDER,
        vertex = %sources.vertex,
        fragment = %sources.fragment,
        %program,
        "Loaded program",
    );
    Ok(program)
}

fn check_gl_error(
    device: &mut dyn GraphicsDevice,
    enabled: bool,
    context: &'static str,
) -> Result<(), RenderError> {
    if !enabled {
        return Ok(())
    }
    match device.get_error() {
        glow::NO_ERROR => Ok(()),
        code => {
            error!(target: TARGET_RENDER, code, name = gl_error_name(code), context, "GL error");
            Err(RenderError::Gl { code, context })
        },
    }
}

/// Enable `program` for `format`, draw `count` vertices from the start of the bound array
/// buffer, then disable it.
fn draw_with_program(
    device: &mut dyn GraphicsDevice,
    program: &Program,
    format: &VertexFormat,
    uniforms: &UniformStorage,
    primitive: Primitive,
    count: usize,
) -> Result<(), RenderError> {
    program.enable(device, format, uniforms)?;
    device.draw_arrays(primitive, 0, count as u32);
    program.disable(device);
    Ok(())
}

fn flush_glyphs(
    device: &mut dyn GraphicsDevice,
    batch: &mut GlyphBatch,
    program: &Program,
    format: &VertexFormat,
    uniforms: &UniformStorage,
) -> Result<(), RenderError> {
    if batch.is_empty() {
        return Ok(())
    }
    device.array_buffer_sub_data(0, batch.position_bytes())?;
    device.array_buffer_sub_data(glyph_block_bytes(batch.max_glyphs()), batch.tex_coord_bytes())?;
    draw_with_program(device, program, format, uniforms, Primitive::Triangles, batch.vertex_count())?;
    batch.clear();
    Ok(())
}

struct LoadedFont {
    texture: TextureHandle,
    font: Psf2Font,
}

/// The low-level renderer.
///
/// See the [module documentation](self) for an overview.
#[derive(Educe)]
#[educe(Debug)]
pub struct Renderer {
    #[educe(Debug(ignore))]
    device: Box<dyn GraphicsDevice>,
    #[educe(Debug(ignore))]
    surface: Box<dyn RenderSurface>,
    #[educe(Debug(ignore))]
    assets: AssetSourceList,
    config: RendererConfig,
    stage: RendererStage,
    resolution: glm::U32Vec2,
    viewport: Aabb2,
    camera: Aabb2,
    #[educe(Debug(ignore))]
    uniforms: UniformStorage,
    #[educe(Debug(ignore))]
    formats: VertexFormats,
    vertex_array: VertexArrayHandle,
    buffers: RenderBuffers,
    #[educe(Debug(ignore))]
    programs: Programs,
    sprites: Vec<Option<TextureHandle>>,
    #[educe(Debug(ignore))]
    fonts: Vec<Option<LoadedFont>>,
    #[educe(Debug(ignore))]
    glyph_batch: GlyphBatch,
}

impl Renderer {
    /// Initialize a renderer.
    ///
    /// Shaders, sprites and fonts are read from `assets`, falling back to [builtin_shaders()].
    ///
    /// # Errors
    ///
    /// Errors if the surface or device fail, or if any shader is missing, fails to build, or
    /// breaks the [naming contract](semantic).
    pub fn new(
        mut device: Box<dyn GraphicsDevice>,
        mut surface: Box<dyn RenderSurface>,
        assets: impl AssetSource,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        let mut stage = RendererStage::Uninitialized;
        let check = config.check_gl_errors;

        surface.make_current()?;
        surface.set_vsync(config.vsync)?;
        info!(target: TARGET_RENDER, device = device.describe(), "Render context created");
        stage.advance(RendererStage::ContextCreated)?;

        let vertex_array = device.create_vertex_array()?;
        device.bind_vertex_array(Some(vertex_array))?;
        let formats = VertexFormats::new(config.max_glyphs_per_draw);
        let buffers = RenderBuffers::create(device.as_mut(), &config)?;
        check_gl_error(device.as_mut(), check, "resource initialization")?;
        stage.advance(RendererStage::ResourcesInitialized)?;

        let assets = AssetSourceList::new()
            .with(assets)
            .with(builtin_shaders());
        let programs = Programs::load(device.as_mut(), &assets, &config.shaders)?;
        check_gl_error(device.as_mut(), check, "shader loading")?;
        stage.advance(RendererStage::ShadersLoaded)?;

        let resolution = config.resolution.unwrap_or_else(|| surface.size());
        let canvas = Aabb2::from_size(glm::vec2(resolution.x as f32, resolution.y as f32));
        let mut uniforms = UniformStorage::new();
        uniforms.set_projection(camera_projection(&canvas));
        stage.advance(RendererStage::Ready)?;
        info!(target: TARGET_RENDER, width = resolution.x, height = resolution.y, "Renderer ready");

        Ok(Self {
            device,
            surface,
            assets,
            glyph_batch: GlyphBatch::new(config.max_glyphs_per_draw),
            sprites: Vec::with_capacity(config.max_sprites),
            fonts: Vec::with_capacity(config.max_fonts),
            config,
            stage,
            resolution,
            viewport: canvas,
            camera: canvas,
            uniforms,
            formats,
            vertex_array,
            buffers,
            programs,
        })
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig { &self.config }

    #[inline]
    pub fn stage(&self) -> RendererStage { self.stage }

    /// The source assets are loaded from, including the built-in shaders.
    #[inline]
    pub fn assets(&self) -> &dyn AssetSource { &self.assets }

    /// Drawing resolution in pixels.
    #[inline]
    pub fn resolution(&self) -> glm::U32Vec2 { self.resolution }

    /// The full drawable area, `(0, 0)` to the resolution.
    #[inline]
    pub fn backing_canvas(&self) -> Aabb2 {
        Aabb2::from_size(glm::vec2(self.resolution.x as f32, self.resolution.y as f32))
    }

    #[inline]
    pub fn viewport(&self) -> Aabb2 { self.viewport }

    /// Restrict drawing to part of the backing canvas.
    ///
    /// # Errors
    ///
    /// Errors if `viewport` is not fully contained by the [backing canvas](Self::backing_canvas).
    pub fn set_viewport(&mut self, viewport: Aabb2) -> Result<(), RenderError> {
        let canvas = self.backing_canvas();
        if !canvas.contains(&viewport, 0.0) {
            return Err(RenderError::ViewportOutOfBounds { viewport, canvas })
        }
        self.viewport = viewport;
        Ok(())
    }

    /// Area of the world currently drawn to the viewport.
    #[inline]
    pub fn camera(&self) -> Aabb2 { self.camera }

    /// Draw `area` of the world across the viewport.
    ///
    /// The center of `area` lands at the center of the viewport. Differing aspect ratios stretch
    /// the image.
    pub fn set_camera(&mut self, area: Aabb2) {
        self.camera = area;
        self.uniforms.set_projection(camera_projection(&area));
    }

    /// Begin a frame.
    pub fn start_frame(&mut self) -> Result<(), RenderError> {
        self.stage.advance(RendererStage::InFrame)?;
        self.surface.make_current()?;
        self.check_gl_error("start_frame")
    }

    /// Finish a frame and present it.
    pub fn end_frame(&mut self) -> Result<(), RenderError> {
        self.check_gl_error("end_frame")?;
        self.stage.advance(RendererStage::Ready)?;
        self.surface.swap_buffers()
    }

    /// Clear the whole frame to `color`.
    pub fn clear(&mut self, color: Rgba8) {
        self.debug_assert_in_frame();
        let color = color.to_vec4();
        self.device.clear_color([color.x, color.y, color.z, color.w]);
        self.device.clear_color_buffer();
    }

    /// Allocate an empty sprite slot.
    pub fn create_sprite(&mut self) -> Result<SpriteId, RenderError> {
        if self.sprites.len() >= self.config.max_sprites {
            return Err(RenderError::CapacityExceeded { table: "sprites", capacity: self.config.max_sprites })
        }
        self.sprites.push(None);
        Ok(SpriteId((self.sprites.len() - 1) as u32))
    }

    /// Load a PNG image into a sprite slot, replacing anything loaded there before.
    pub fn load_sprite(&mut self, id: SpriteId, path: impl Into<AssetPath>) -> Result<(), RenderError> {
        let path = path.into();
        if id.index() >= self.sprites.len() {
            return Err(RenderError::UnknownSprite(id))
        }
        let image = ImageRgba8::from_png_bytes(&self.assets.read(&path)?)?;
        let texture = self.upload_texture(&image, TextureFilter::Linear)?;
        if let Some(previous) = self.sprites[id.index()].replace(texture) {
            self.device.delete_texture(previous)?;
        }
        debug!(target: TARGET_RENDER, ?id, %path, width = image.width(), height = image.height(), "Loaded sprite");
        self.check_gl_error("load_sprite")
    }

    /// Allocate an empty font slot.
    pub fn create_font(&mut self) -> Result<FontId, RenderError> {
        if self.fonts.len() >= self.config.max_fonts {
            return Err(RenderError::CapacityExceeded { table: "fonts", capacity: self.config.max_fonts })
        }
        self.fonts.push(None);
        Ok(FontId((self.fonts.len() - 1) as u32))
    }

    /// Load a PSF2 font into a font slot, replacing anything loaded there before.
    pub fn load_psf2_font(&mut self, id: FontId, path: impl Into<AssetPath>) -> Result<(), RenderError> {
        let path = path.into();
        if id.index() >= self.fonts.len() {
            return Err(RenderError::UnknownFont(id))
        }
        let font = load_psf2(&self.assets, &path, &self.config.font_options)?;
        let mut backing = font.atlas().backing().clone();
        backing.flip_vertical();
        let texture = self.upload_texture(&backing, TextureFilter::Nearest)?;
        if let Some(previous) = self.fonts[id.index()].replace(LoadedFont { texture, font }) {
            self.device.delete_texture(previous.texture)?;
        }
        debug!(target: TARGET_RENDER, ?id, %path, "Loaded font");
        self.check_gl_error("load_psf2_font")
    }

    /// The font loaded into a slot.
    pub fn font(&self, id: FontId) -> Result<&Psf2Font, RenderError> {
        self.loaded_font(id).map(|loaded| &loaded.font)
    }

    /// Draw a sprite with its bottom left corner at `position`, stretched to `size`.
    pub fn draw_sprite(&mut self, id: SpriteId, position: glm::Vec2, size: glm::Vec2) -> Result<(), RenderError> {
        let texture = self.sprite_texture(id)?;
        self.draw_textured_quad(texture, position, size)?;
        self.check_gl_error("draw_sprite")
    }

    /// Draw a font's whole glyph atlas as a single quad.
    pub fn draw_debug_font(&mut self, id: FontId, position: glm::Vec2, size: glm::Vec2) -> Result<(), RenderError> {
        let texture = self.loaded_font(id)?.texture;
        self.draw_textured_quad(texture, position, size)?;
        self.check_gl_error("draw_debug_font")
    }

    /// Draw a line of text.
    ///
    /// Glyphs are drawn at [text_scale](RendererConfig::text_scale) times the font's glyph size.
    /// Graphemes without a glyph leave a gap. Text is batched, with one draw call per
    /// [max_glyphs_per_draw](RendererConfig::max_glyphs_per_draw) glyphs.
    pub fn draw_simple_text(
        &mut self,
        id: FontId,
        params: &TextDrawParams,
        text: &str,
    ) -> Result<(), RenderError> {
        if params.layout != LayoutDirection::Horizontal
            || params.print_direction != TextDirection::LeftToRight
        {
            return Err(RenderError::UnsupportedTextLayout)
        }
        let texture = self.loaded_font(id)?.texture;

        self.debug_assert_in_frame();
        self.apply_viewport();
        self.device.active_texture(0);
        self.device.bind_texture_2d(Some(texture))?;
        self.uniforms.set_model_view(glm::Mat4::identity());
        self.uniforms.set_texture_unit(0);
        self.uniforms.set_polygon_color(params.color.to_vec4());
        self.device.bind_array_buffer(Some(self.buffers.glyphs))?;

        let device = self.device.as_mut();
        let batch = &mut self.glyph_batch;
        // A failed flush can leave glyphs from an earlier call behind
        batch.clear();
        let font = match self.fonts.get(id.index()) {
            Some(Some(loaded)) => &loaded.font,
            _ => return Err(RenderError::FontNotLoaded(id)),
        };
        let glyph_size = glm::vec2(font.glyph_size().x as f32, font.glyph_size().y as f32)
            * self.config.text_scale;
        for placed in GlyphLayout::new(font, text, params.position, glyph_size.x) {
            if batch.is_full() {
                flush_glyphs(device, batch, &self.programs.sprite, &self.formats.glyphs, &self.uniforms)?;
            }
            batch.push(placed.position, glyph_size, &font.atlas().tex_coords(placed.glyph));
        }
        flush_glyphs(device, batch, &self.programs.sprite, &self.formats.glyphs, &self.uniforms)?;
        self.check_gl_error("draw_simple_text")
    }

    /// Fill the screen with the full screen debug program, ignoring the camera.
    pub fn draw_debug_full_screen_rect(&mut self) -> Result<(), RenderError> {
        self.debug_assert_in_frame();
        self.apply_viewport();
        self.device.bind_array_buffer(Some(self.buffers.full_screen_quad))?;
        draw_with_program(
            self.device.as_mut(),
            &self.programs.full_screen,
            &self.formats.p2,
            &self.uniforms,
            Primitive::TriangleStrip,
            4,
        )?;
        self.check_gl_error("draw_debug_full_screen_rect")
    }

    /// Filled, axis-aligned rectangle.
    pub fn draw_debug_rect(&mut self, center: glm::Vec2, dimensions: glm::Vec2, color: Rgb8) -> Result<(), RenderError> {
        let vertices = debug::rect_strip(center, dimensions);
        self.draw_solid(&vertices, Primitive::TriangleStrip, color, glm::Mat4::identity(), "draw_debug_rect")
    }

    pub fn draw_debug_line(&mut self, from: glm::Vec2, to: glm::Vec2, color: Rgb8) -> Result<(), RenderError> {
        let vertices = [[from.x, from.y], [to.x, to.y]];
        self.draw_solid(&vertices, Primitive::Lines, color, glm::Mat4::identity(), "draw_debug_line")
    }

    /// Connected line segments through `points`.
    ///
    /// # Errors
    ///
    /// Errors if there are more than [max_debug_points](RendererConfig::max_debug_points) points.
    pub fn draw_debug_line_strip(&mut self, points: &[glm::Vec2], color: Rgb8) -> Result<(), RenderError> {
        let vertices = debug::points_to_vertices(points);
        self.draw_solid(&vertices, Primitive::LineStrip, color, glm::Mat4::identity(), "draw_debug_line_strip")
    }

    /// Circle outline approximated by `num_segments + 1` points.
    ///
    /// # Errors
    ///
    /// Errors if that is more than [max_circle_points](RendererConfig::max_circle_points).
    pub fn outline_circle(
        &mut self,
        center: glm::Vec2,
        radius: f32,
        color: Rgb8,
        num_segments: u32,
    ) -> Result<(), RenderError> {
        let num_points = num_segments as usize + 1;
        if num_points > self.config.max_circle_points {
            return Err(RenderError::TooManyPoints { count: num_points, max: self.config.max_circle_points })
        }
        let vertices = debug::circle_points(radius, num_segments);
        let view_model = glm::translation(&glm::vec3(center.x, center.y, 0.0));
        self.draw_solid(&vertices, Primitive::LineLoop, color, view_model, "outline_circle")
    }

    /// Filled rectangle placed by `transform`.
    pub fn draw_rect(
        &mut self,
        center: glm::Vec2,
        dimensions: glm::Vec2,
        color: Rgb8,
        transform: &Transform2,
    ) -> Result<(), RenderError> {
        let vertices = debug::rect_strip(center, dimensions);
        self.draw_solid(&vertices, Primitive::TriangleStrip, color, matrix_from_transform(transform), "draw_rect")
    }

    /// Rectangle outline placed by `transform`.
    pub fn outline_rect(
        &mut self,
        center: glm::Vec2,
        dimensions: glm::Vec2,
        color: Rgb8,
        transform: &Transform2,
    ) -> Result<(), RenderError> {
        let vertices = debug::rect_loop(center, dimensions);
        self.draw_solid(&vertices, Primitive::LineLoop, color, matrix_from_transform(transform), "outline_rect")
    }

    /// Fill the camera's view with a solid color.
    pub fn fill_screen(&mut self, color: Rgb8) -> Result<(), RenderError> {
        let camera = self.camera;
        self.draw_rect(camera.center(), camera.dimensions(), color, &Transform2::identity())
    }

    /// Release every GPU resource.
    ///
    /// The renderer is unusable afterward. Calling this again does nothing.
    pub fn shutdown(&mut self) -> Result<(), RenderError> {
        if self.stage == RendererStage::Shutdown {
            return Ok(())
        }
        self.stage.advance(RendererStage::Shutdown)?;
        for texture in self.sprites.drain(..).flatten() {
            self.device.delete_texture(texture)?;
        }
        for font in self.fonts.drain(..).flatten() {
            self.device.delete_texture(font.texture)?;
        }
        self.programs.delete(self.device.as_mut())?;
        self.buffers.delete(self.device.as_mut())?;
        self.device.bind_vertex_array(None)?;
        self.device.delete_vertex_array(self.vertex_array)?;
        info!(target: TARGET_RENDER, "Renderer shut down");
        Ok(())
    }

    fn check_gl_error(&mut self, context: &'static str) -> Result<(), RenderError> {
        check_gl_error(self.device.as_mut(), self.config.check_gl_errors, context)
    }

    #[inline]
    fn debug_assert_in_frame(&self) {
        debug_assert_eq!(self.stage, RendererStage::InFrame, "drawing outside of a frame");
    }

    fn apply_viewport(&mut self) {
        let viewport = self.viewport;
        self.device.viewport(
            viewport.min.x as i32,
            viewport.min.y as i32,
            viewport.width() as i32,
            viewport.height() as i32,
        );
    }

    fn sprite_texture(&self, id: SpriteId) -> Result<TextureHandle, RenderError> {
        match self.sprites.get(id.index()) {
            Some(Some(texture)) => Ok(*texture),
            Some(None) => Err(RenderError::SpriteNotLoaded(id)),
            None => Err(RenderError::UnknownSprite(id)),
        }
    }

    fn loaded_font(&self, id: FontId) -> Result<&LoadedFont, RenderError> {
        match self.fonts.get(id.index()) {
            Some(Some(loaded)) => Ok(loaded),
            Some(None) => Err(RenderError::FontNotLoaded(id)),
            None => Err(RenderError::UnknownFont(id)),
        }
    }

    fn upload_texture(&mut self, image: &ImageRgba8, filter: TextureFilter) -> Result<TextureHandle, RenderError> {
        let texture = self.device.create_texture()?;
        self.device.active_texture(0);
        self.device.bind_texture_2d(Some(texture))?;
        self.device.upload_texture_2d_rgba8(image.width(), image.height(), image.as_bytes(), filter);
        Ok(texture)
    }

    fn draw_textured_quad(
        &mut self,
        texture: TextureHandle,
        position: glm::Vec2,
        size: glm::Vec2,
    ) -> Result<(), RenderError> {
        self.debug_assert_in_frame();
        self.apply_viewport();
        self.device.active_texture(0);
        self.device.bind_texture_2d(Some(texture))?;
        self.uniforms.set_model_view(quad_model_view(position, size));
        self.uniforms.set_texture_unit(0);
        self.uniforms.set_polygon_color(Rgba8::WHITE.to_vec4());
        self.device.bind_array_buffer(Some(self.buffers.sprite))?;
        draw_with_program(
            self.device.as_mut(),
            &self.programs.sprite,
            &self.formats.p2t2_interleaved,
            &self.uniforms,
            Primitive::TriangleStrip,
            4,
        )
    }

    fn draw_solid(
        &mut self,
        vertices: &[[f32; 2]],
        primitive: Primitive,
        color: Rgb8,
        view_model: glm::Mat4,
        context: &'static str,
    ) -> Result<(), RenderError> {
        if vertices.len() > self.config.max_debug_points {
            return Err(RenderError::TooManyPoints { count: vertices.len(), max: self.config.max_debug_points })
        }
        self.debug_assert_in_frame();
        self.apply_viewport();
        self.uniforms.set_model_view(view_model);
        self.uniforms.set_polygon_color(color.to_vec4());
        self.device.bind_array_buffer(Some(self.buffers.debug))?;
        self.device.array_buffer_sub_data(0, bytemuck::cast_slice(vertices))?;
        draw_with_program(
            self.device.as_mut(),
            &self.programs.solid_polygon,
            &self.formats.p2,
            &self.uniforms,
            primitive,
            vertices.len(),
        )?;
        self.check_gl_error(context)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(target: TARGET_RENDER, error = %err, "Failed to shut down renderer cleanly");
        }
    }
}
