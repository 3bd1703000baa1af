use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::font::Psf2Error;
use crate::image::ImageError;
use crate::render::device::ShaderStage;
use crate::render::semantic::{gl_type_name, AttributeSemantic};
use crate::render::view::Aabb2;
use crate::render::{FontId, RendererStage, SpriteId};
use crate::resource::path::AssetPath;
use crate::resource::AssetLoadError;

/// Name of a GL error code.
pub fn gl_error_name(code: u32) -> &'static str {
    match code {
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "unknown GL error",
    }
}

/// Error that can occur while rendering.
#[derive(Debug)]
pub enum RenderError {
    /// The device failed to create or update a GPU object.
    Device(String),

    /// A handle was passed to a device that doesn't know it.
    UnknownDeviceHandle { kind: &'static str, index: usize },

    /// The render surface failed.
    Surface(String),

    /// The driver reported an error after a GL call.
    Gl { code: u32, context: &'static str },

    ShaderCompile { stage: ShaderStage, path: AssetPath, info_log: String },

    ProgramLink { info_log: String },

    /// A shader declared an attribute outside the naming contract.
    UnknownAttribute { name: String },

    /// A shader declared a uniform outside the naming contract.
    UnknownUniform { name: String },

    /// A known uniform was declared with a type or array size the renderer can't apply.
    UnsupportedUniform { name: String, gl_type: u32, size: i32 },

    /// The driver reported a variable as active but has no location for it.
    MissingLocation { name: String },

    /// A program was enabled with a vertex format lacking one of its attributes.
    MissingVertexAttribute { name: String, semantic: AttributeSemantic },

    TooManyAttributes { max: usize },

    TooManyUniforms { max: usize },

    NameTooLong { name: String, max: usize },

    /// A fixed-size table is full.
    CapacityExceeded { table: &'static str, capacity: usize },

    /// Too many points for a single debug draw.
    TooManyPoints { count: usize, max: usize },

    UnknownSprite(SpriteId),

    SpriteNotLoaded(SpriteId),

    UnknownFont(FontId),

    FontNotLoaded(FontId),

    UnsupportedTextLayout,

    ViewportOutOfBounds { viewport: Aabb2, canvas: Aabb2 },

    InvalidStage { from: RendererStage, to: RendererStage },

    Asset(AssetLoadError),

    Font(Psf2Error),

    Image(ImageError),
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device(msg) => write!(f, "Device error: {msg}"),
            Self::UnknownDeviceHandle { kind, index } =>
                write!(f, "Unknown {kind} handle: {index}"),
            Self::Surface(msg) => write!(f, "Surface error: {msg}"),
            Self::Gl { code, context } =>
                write!(f, "{} (0x{code:04X}) after {context}", gl_error_name(*code)),
            Self::ShaderCompile { stage, path, info_log } =>
                write!(f, "Failed to compile {stage} shader '{path}': {}", info_log.trim()),
            Self::ProgramLink { info_log } =>
                write!(f, "Failed to link program: {}", info_log.trim()),
            Self::UnknownAttribute { name } =>
                write!(f, "Unknown attribute semantic: '{name}'"),
            Self::UnknownUniform { name } =>
                write!(f, "Unknown uniform name: '{name}'"),
            Self::UnsupportedUniform { name, gl_type, size } =>
                write!(f, "Unsupported uniform '{name}': {} [{size}]", gl_type_name(*gl_type)),
            Self::MissingLocation { name } =>
                write!(f, "No location for active variable '{name}'"),
            Self::MissingVertexAttribute { name, semantic } =>
                write!(f, "Vertex format has no {semantic:?} entry for attribute '{name}'"),
            Self::TooManyAttributes { max } =>
                write!(f, "Program has more than {max} active attributes"),
            Self::TooManyUniforms { max } =>
                write!(f, "Program has more than {max} active uniforms"),
            Self::NameTooLong { name, max } =>
                write!(f, "Variable name '{name}' is longer than {max} bytes"),
            Self::CapacityExceeded { table, capacity } =>
                write!(f, "Too many {table} (capacity {capacity})"),
            Self::TooManyPoints { count, max } =>
                write!(f, "Too many points for one draw: {count} (max {max})"),
            Self::UnknownSprite(id) => write!(f, "Unknown sprite: {id:?}"),
            Self::SpriteNotLoaded(id) => write!(f, "Sprite not loaded: {id:?}"),
            Self::UnknownFont(id) => write!(f, "Unknown font: {id:?}"),
            Self::FontNotLoaded(id) => write!(f, "Font not loaded: {id:?}"),
            Self::UnsupportedTextLayout =>
                f.write_str("Only horizontal, left-to-right text is supported"),
            Self::ViewportOutOfBounds { viewport, canvas } =>
                write!(f, "Viewport {viewport} is not contained by the backing canvas {canvas}"),
            Self::InvalidStage { from, to } =>
                write!(f, "Invalid renderer stage transition: {from:?} -> {to:?}"),
            Self::Asset(err) => Display::fmt(err, f),
            Self::Font(err) => Display::fmt(err, f),
            Self::Image(err) => Display::fmt(err, f),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Asset(err) => Some(err),
            Self::Font(err) => Some(err),
            Self::Image(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AssetLoadError> for RenderError {
    #[inline]
    fn from(value: AssetLoadError) -> Self {
        Self::Asset(value)
    }
}

impl From<Psf2Error> for RenderError {
    #[inline]
    fn from(value: Psf2Error) -> Self {
        Self::Font(value)
    }
}

impl From<ImageError> for RenderError {
    #[inline]
    fn from(value: ImageError) -> Self {
        Self::Image(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::invalid_enum(glow::INVALID_ENUM, "GL_INVALID_ENUM")]
    #[case::invalid_value(glow::INVALID_VALUE, "GL_INVALID_VALUE")]
    #[case::invalid_operation(glow::INVALID_OPERATION, "GL_INVALID_OPERATION")]
    #[case::framebuffer(glow::INVALID_FRAMEBUFFER_OPERATION, "GL_INVALID_FRAMEBUFFER_OPERATION")]
    #[case::oom(glow::OUT_OF_MEMORY, "GL_OUT_OF_MEMORY")]
    #[case::underflow(glow::STACK_UNDERFLOW, "GL_STACK_UNDERFLOW")]
    #[case::overflow(glow::STACK_OVERFLOW, "GL_STACK_OVERFLOW")]
    #[case::unknown(0x1234, "unknown GL error")]
    fn test_gl_error_name(#[case] code: u32, #[case] expected: &str) {
        assert_eq!(gl_error_name(code), expected);
    }

    #[test]
    fn test_display() {
        let err = RenderError::Gl { code: glow::INVALID_VALUE, context: "draw_sprite" };
        assert_eq!(err.to_string(), "GL_INVALID_VALUE (0x0501) after draw_sprite");
    }
}
