//! Graphics device abstraction.
//!
//! The renderer issues every GPU call through the [GraphicsDevice] trait, and presents frames
//! through a [RenderSurface]. [GlowDevice] implements the device on top of an OpenGL context
//! loaded with [glow]; windowing and context creation are left to whoever provides the surface.
//!
//! GPU objects are referred to by plain handles. A device hands them out and resolves them back to
//! its own objects; passing a handle to a device that didn't create it yields
//! [RenderError::UnknownDeviceHandle].

use educe::Educe;
use glow::HasContext;
use slab::Slab;
use std::fmt::{Debug, Display, Formatter};
use tracing::trace;

use crate::log::TARGET_RENDER;
use crate::render::RenderError;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_handle!(
    /// Handle to a linked (or linkable) shader program.
    ProgramHandle
);
define_handle!(
    /// Handle to a single shader stage.
    ShaderHandle
);
define_handle!(
    /// Handle to a GPU buffer.
    BufferHandle
);
define_handle!(
    /// Handle to a 2D texture.
    TextureHandle
);
define_handle!(
    /// Handle to a vertex array object.
    VertexArrayHandle
);
define_handle!(
    /// Handle to a uniform location within a program.
    UniformLocation
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    #[inline]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Vertex => glow::VERTEX_SHADER,
            Self::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl Display for ShaderStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    Static,
    /// Rewritten before most draws.
    Dynamic,
}

impl BufferUsage {
    #[inline]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Static => glow::STATIC_DRAW,
            Self::Dynamic => glow::DYNAMIC_DRAW,
        }
    }
}

/// Initial contents of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferData<'a> {
    Bytes(&'a [u8]),
    /// Uninitialized storage of the given byte length.
    Size(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    TriangleStrip,
    Lines,
    LineStrip,
    LineLoop,
}

impl Primitive {
    #[inline]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Triangles => glow::TRIANGLES,
            Self::TriangleStrip => glow::TRIANGLE_STRIP,
            Self::Lines => glow::LINES,
            Self::LineStrip => glow::LINE_STRIP,
            Self::LineLoop => glow::LINE_LOOP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

impl TextureFilter {
    #[inline]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Nearest => glow::NEAREST,
            Self::Linear => glow::LINEAR,
        }
    }
}

/// An active attribute or uniform as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    pub name: String,
    pub gl_type: u32,
    pub size: i32,
}

/// Outcome of compiling a shader or linking a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLog {
    pub success: bool,
    pub info_log: String,
}

/// Low level GPU command interface.
///
/// Methods map closely to OpenGL entry points. Calls affecting bound state (`bind_*`,
/// `use_program`) persist until changed, as in GL.
pub trait GraphicsDevice {
    /// Driver identification, for logging.
    fn describe(&self) -> String;

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, RenderError>;
    fn bind_vertex_array(&mut self, vao: Option<VertexArrayHandle>) -> Result<(), RenderError>;
    fn delete_vertex_array(&mut self, vao: VertexArrayHandle) -> Result<(), RenderError>;

    fn create_buffer(&mut self) -> Result<BufferHandle, RenderError>;
    fn bind_array_buffer(&mut self, buffer: Option<BufferHandle>) -> Result<(), RenderError>;
    /// (Re)allocate the bound array buffer.
    fn array_buffer_data(&mut self, data: BufferData<'_>, usage: BufferUsage) -> Result<(), RenderError>;
    /// Overwrite part of the bound array buffer.
    fn array_buffer_sub_data(&mut self, offset: usize, data: &[u8]) -> Result<(), RenderError>;
    fn delete_buffer(&mut self, buffer: BufferHandle) -> Result<(), RenderError>;

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderHandle, RenderError>;
    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) -> Result<BuildLog, RenderError>;
    fn delete_shader(&mut self, shader: ShaderHandle) -> Result<(), RenderError>;

    fn create_program(&mut self) -> Result<ProgramHandle, RenderError>;
    /// Attach `shaders`, link, then detach them again.
    fn link_program(
        &mut self,
        program: ProgramHandle,
        shaders: &[ShaderHandle],
    ) -> Result<BuildLog, RenderError>;
    fn delete_program(&mut self, program: ProgramHandle) -> Result<(), RenderError>;

    fn active_attributes(&self, program: ProgramHandle) -> Result<Vec<ActiveVariable>, RenderError>;
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Result<Option<u32>, RenderError>;
    fn active_uniforms(&self, program: ProgramHandle) -> Result<Vec<ActiveVariable>, RenderError>;
    fn uniform_location(
        &mut self,
        program: ProgramHandle,
        name: &str,
    ) -> Result<Option<UniformLocation>, RenderError>;

    fn use_program(&mut self, program: Option<ProgramHandle>) -> Result<(), RenderError>;
    fn enable_vertex_attrib_array(&mut self, location: u32);
    fn disable_vertex_attrib_array(&mut self, location: u32);
    /// Point an attribute at `f32` components in the bound array buffer.
    fn vertex_attrib_pointer_f32(&mut self, location: u32, components: u8, stride: u32, offset: u32);

    fn uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]) -> Result<(), RenderError>;
    /// Column-major matrix.
    fn uniform_mat4(&mut self, location: UniformLocation, value: &[f32; 16]) -> Result<(), RenderError>;
    fn uniform_sampler(&mut self, location: UniformLocation, unit: i32) -> Result<(), RenderError>;

    fn create_texture(&mut self) -> Result<TextureHandle, RenderError>;
    /// Select texture unit `unit`, counting from zero.
    fn active_texture(&mut self, unit: u32);
    fn bind_texture_2d(&mut self, texture: Option<TextureHandle>) -> Result<(), RenderError>;
    /// Upload RGBA8 pixels into level 0 of the bound texture, with no mipmaps, edge clamping, and
    /// the given filter.
    fn upload_texture_2d_rgba8(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: TextureFilter,
    );
    fn delete_texture(&mut self, texture: TextureHandle) -> Result<(), RenderError>;

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&mut self, rgba: [f32; 4]);
    fn clear_color_buffer(&mut self);
    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32);

    /// Pop the oldest recorded error code, `glow::NO_ERROR` if there is none.
    fn get_error(&mut self) -> u32;
}

/// Something frames can be presented to, typically a window with a GL context.
pub trait RenderSurface {
    /// Make the surface's context current on the calling thread.
    fn make_current(&mut self) -> Result<(), RenderError>;
    fn swap_buffers(&mut self) -> Result<(), RenderError>;
    /// Drawable size in pixels.
    fn size(&self) -> glm::U32Vec2;
    fn set_vsync(&mut self, enabled: bool) -> Result<(), RenderError>;
}

/// [GraphicsDevice] backed by a [glow] OpenGL context.
///
/// The context must be current on the thread that uses the device.
#[derive(Educe)]
#[educe(Debug)]
pub struct GlowDevice {
    #[educe(Debug(ignore))]
    gl: glow::Context,
    vertex_arrays: Slab<glow::VertexArray>,
    buffers: Slab<glow::Buffer>,
    shaders: Slab<glow::Shader>,
    programs: Slab<glow::Program>,
    textures: Slab<glow::Texture>,
    uniform_locations: Slab<(usize, glow::UniformLocation)>,
}

fn resolve<T: Copy>(slab: &Slab<T>, index: usize, kind: &'static str) -> Result<T, RenderError> {
    slab.get(index)
        .copied()
        .ok_or(RenderError::UnknownDeviceHandle { kind, index })
}

impl GlowDevice {
    /// Wrap an already loaded context.
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            vertex_arrays: Slab::new(),
            buffers: Slab::new(),
            shaders: Slab::new(),
            programs: Slab::new(),
            textures: Slab::new(),
            uniform_locations: Slab::new(),
        }
    }

    /// The underlying [glow] context.
    #[inline]
    pub fn gl(&self) -> &glow::Context { &self.gl }

    fn program(&self, program: ProgramHandle) -> Result<glow::Program, RenderError> {
        resolve(&self.programs, program.index(), "program")
    }

    fn uniform(&self, location: UniformLocation) -> Result<&glow::UniformLocation, RenderError> {
        self.uniform_locations.get(location.index())
            .map(|(_, location)| location)
            .ok_or(RenderError::UnknownDeviceHandle { kind: "uniform location", index: location.index() })
    }

    fn variables(
        &self,
        program: ProgramHandle,
        count: impl FnOnce(&glow::Context, glow::Program) -> u32,
        get: impl Fn(&glow::Context, glow::Program, u32) -> Option<ActiveVariable>,
    ) -> Result<Vec<ActiveVariable>, RenderError> {
        let program = self.program(program)?;
        let count = count(&self.gl, program);
        Ok((0..count)
            .filter_map(|idx| get(&self.gl, program, idx))
            .collect())
    }
}

// All unsafe blocks below are plain GL calls; their safety requirement is a current context,
// which the surface guarantees for the renderer's thread.
impl GraphicsDevice for GlowDevice {
    fn describe(&self) -> String {
        unsafe {
            format!(
                "{} / {} / {}",
                self.gl.get_parameter_string(glow::VENDOR),
                self.gl.get_parameter_string(glow::RENDERER),
                self.gl.get_parameter_string(glow::VERSION),
            )
        }
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, RenderError> {
        let vao = unsafe { self.gl.create_vertex_array() }
            .map_err(RenderError::Device)?;
        Ok(VertexArrayHandle::new(self.vertex_arrays.insert(vao)))
    }

    fn bind_vertex_array(&mut self, vao: Option<VertexArrayHandle>) -> Result<(), RenderError> {
        let vao = vao
            .map(|vao| resolve(&self.vertex_arrays, vao.index(), "vertex array"))
            .transpose()?;
        unsafe { self.gl.bind_vertex_array(vao) };
        Ok(())
    }

    fn delete_vertex_array(&mut self, vao: VertexArrayHandle) -> Result<(), RenderError> {
        let vao = self.vertex_arrays.try_remove(vao.index())
            .ok_or(RenderError::UnknownDeviceHandle { kind: "vertex array", index: vao.index() })?;
        unsafe { self.gl.delete_vertex_array(vao) };
        Ok(())
    }

    fn create_buffer(&mut self) -> Result<BufferHandle, RenderError> {
        let buffer = unsafe { self.gl.create_buffer() }
            .map_err(RenderError::Device)?;
        Ok(BufferHandle::new(self.buffers.insert(buffer)))
    }

    fn bind_array_buffer(&mut self, buffer: Option<BufferHandle>) -> Result<(), RenderError> {
        let buffer = buffer
            .map(|buffer| resolve(&self.buffers, buffer.index(), "buffer"))
            .transpose()?;
        unsafe { self.gl.bind_buffer(glow::ARRAY_BUFFER, buffer) };
        Ok(())
    }

    fn array_buffer_data(&mut self, data: BufferData<'_>, usage: BufferUsage) -> Result<(), RenderError> {
        match data {
            BufferData::Bytes(bytes) => unsafe {
                self.gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytes, usage.gl_enum());
            },
            BufferData::Size(size) => {
                let size = i32::try_from(size)
                    .map_err(|_| RenderError::Device(format!("buffer size {size} too large")))?;
                unsafe { self.gl.buffer_data_size(glow::ARRAY_BUFFER, size, usage.gl_enum()) };
            },
        }
        Ok(())
    }

    fn array_buffer_sub_data(&mut self, offset: usize, data: &[u8]) -> Result<(), RenderError> {
        let offset = i32::try_from(offset)
            .map_err(|_| RenderError::Device(format!("buffer offset {offset} too large")))?;
        unsafe { self.gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, offset, data) };
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) -> Result<(), RenderError> {
        let buffer = self.buffers.try_remove(buffer.index())
            .ok_or(RenderError::UnknownDeviceHandle { kind: "buffer", index: buffer.index() })?;
        unsafe { self.gl.delete_buffer(buffer) };
        Ok(())
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderHandle, RenderError> {
        let shader = unsafe { self.gl.create_shader(stage.gl_enum()) }
            .map_err(RenderError::Device)?;
        Ok(ShaderHandle::new(self.shaders.insert(shader)))
    }

    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) -> Result<BuildLog, RenderError> {
        let shader = resolve(&self.shaders, shader.index(), "shader")?;
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            Ok(BuildLog {
                success: self.gl.get_shader_compile_status(shader),
                info_log: self.gl.get_shader_info_log(shader),
            })
        }
    }

    fn delete_shader(&mut self, shader: ShaderHandle) -> Result<(), RenderError> {
        let shader = self.shaders.try_remove(shader.index())
            .ok_or(RenderError::UnknownDeviceHandle { kind: "shader", index: shader.index() })?;
        unsafe { self.gl.delete_shader(shader) };
        Ok(())
    }

    fn create_program(&mut self) -> Result<ProgramHandle, RenderError> {
        let program = unsafe { self.gl.create_program() }
            .map_err(RenderError::Device)?;
        Ok(ProgramHandle::new(self.programs.insert(program)))
    }

    fn link_program(
        &mut self,
        program: ProgramHandle,
        shaders: &[ShaderHandle],
    ) -> Result<BuildLog, RenderError> {
        let program = self.program(program)?;
        let shaders = shaders.iter()
            .map(|shader| resolve(&self.shaders, shader.index(), "shader"))
            .collect::<Result<Vec<_>, _>>()?;
        unsafe {
            for shader in &shaders {
                self.gl.attach_shader(program, *shader);
            }
            self.gl.link_program(program);
            let log = BuildLog {
                success: self.gl.get_program_link_status(program),
                info_log: self.gl.get_program_info_log(program),
            };
            for shader in &shaders {
                self.gl.detach_shader(program, *shader);
            }
            Ok(log)
        }
    }

    fn delete_program(&mut self, program: ProgramHandle) -> Result<(), RenderError> {
        let index = program.index();
        let program = self.programs.try_remove(index)
            .ok_or(RenderError::UnknownDeviceHandle { kind: "program", index })?;
        self.uniform_locations.retain(|_, (owner, _)| *owner != index);
        unsafe { self.gl.delete_program(program) };
        Ok(())
    }

    fn active_attributes(&self, program: ProgramHandle) -> Result<Vec<ActiveVariable>, RenderError> {
        self.variables(
            program,
            |gl, program| unsafe { gl.get_active_attributes(program) },
            |gl, program, idx| unsafe { gl.get_active_attribute(program, idx) }
                .map(|attr| ActiveVariable { name: attr.name, gl_type: attr.atype, size: attr.size }),
        )
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Result<Option<u32>, RenderError> {
        let program = self.program(program)?;
        Ok(unsafe { self.gl.get_attrib_location(program, name) })
    }

    fn active_uniforms(&self, program: ProgramHandle) -> Result<Vec<ActiveVariable>, RenderError> {
        self.variables(
            program,
            |gl, program| unsafe { gl.get_active_uniforms(program) },
            |gl, program, idx| unsafe { gl.get_active_uniform(program, idx) }
                .map(|uniform| ActiveVariable { name: uniform.name, gl_type: uniform.utype, size: uniform.size }),
        )
    }

    fn uniform_location(
        &mut self,
        program: ProgramHandle,
        name: &str,
    ) -> Result<Option<UniformLocation>, RenderError> {
        let gl_program = self.program(program)?;
        Ok(unsafe { self.gl.get_uniform_location(gl_program, name) }
            .map(|location| UniformLocation::new(
                self.uniform_locations.insert((program.index(), location)),
            )))
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) -> Result<(), RenderError> {
        let program = program
            .map(|program| self.program(program))
            .transpose()?;
        unsafe { self.gl.use_program(program) };
        Ok(())
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) };
    }

    fn disable_vertex_attrib_array(&mut self, location: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(location) };
    }

    fn vertex_attrib_pointer_f32(&mut self, location: u32, components: u8, stride: u32, offset: u32) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                location,
                components as i32,
                glow::FLOAT,
                false,
                stride as i32,
                offset as i32,
            );
        }
    }

    fn uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]) -> Result<(), RenderError> {
        let location = self.uniform(location)?;
        unsafe { self.gl.uniform_4_f32_slice(Some(location), &value) };
        Ok(())
    }

    fn uniform_mat4(&mut self, location: UniformLocation, value: &[f32; 16]) -> Result<(), RenderError> {
        let location = self.uniform(location)?;
        unsafe { self.gl.uniform_matrix_4_f32_slice(Some(location), false, value) };
        Ok(())
    }

    fn uniform_sampler(&mut self, location: UniformLocation, unit: i32) -> Result<(), RenderError> {
        let location = self.uniform(location)?;
        unsafe { self.gl.uniform_1_i32(Some(location), unit) };
        Ok(())
    }

    fn create_texture(&mut self) -> Result<TextureHandle, RenderError> {
        let texture = unsafe { self.gl.create_texture() }
            .map_err(RenderError::Device)?;
        Ok(TextureHandle::new(self.textures.insert(texture)))
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) };
    }

    fn bind_texture_2d(&mut self, texture: Option<TextureHandle>) -> Result<(), RenderError> {
        let texture = texture
            .map(|texture| resolve(&self.textures, texture.index(), "texture"))
            .transpose()?;
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) };
        Ok(())
    }

    fn upload_texture_2d_rgba8(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: TextureFilter,
    ) {
        trace!(target: TARGET_RENDER, width, height, ?filter, "Uploading texture");
        unsafe {
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_BASE_LEVEL, 0);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, 0);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            );
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter.gl_enum() as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter.gl_enum() as i32);
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) -> Result<(), RenderError> {
        let texture = self.textures.try_remove(texture.index())
            .ok_or(RenderError::UnknownDeviceHandle { kind: "texture", index: texture.index() })?;
        unsafe { self.gl.delete_texture(texture) };
        Ok(())
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) };
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        unsafe { self.gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]) };
    }

    fn clear_color_buffer(&mut self) {
        unsafe { self.gl.clear(glow::COLOR_BUFFER_BIT) };
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        unsafe { self.gl.draw_arrays(primitive.gl_enum(), first as i32, count as i32) };
    }

    fn get_error(&mut self) -> u32 {
        unsafe { self.gl.get_error() }
    }
}

impl Debug for dyn GraphicsDevice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("description", &self.describe())
            .finish_non_exhaustive()
    }
}
