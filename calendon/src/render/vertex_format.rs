//! Vertex layouts.
//!
//! A [VertexFormat] describes where in the bound array buffer each [AttributeSemantic] is read
//! from. Programs look up their reflected attributes in the format they are enabled with.

use std::mem::size_of;

use crate::render::semantic::AttributeSemantic;
use strum::EnumCount;

/// Layout of one attribute inside an array buffer.
///
/// All attributes are tightly packed `f32` components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexFormatEntry {
    pub components: u8,
    pub stride: u32,
    pub offset: u32,
}

impl VertexFormatEntry {
    #[inline]
    pub const fn new(components: u8, stride: u32, offset: u32) -> Self {
        Self { components, stride, offset }
    }
}

/// Per-semantic attribute layouts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexFormat {
    entries: [Option<VertexFormatEntry>; AttributeSemantic::COUNT],
}

const FLOAT_SIZE: u32 = size_of::<f32>() as u32;

impl VertexFormat {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style setter for a single semantic.
    #[inline]
    pub fn with(mut self, semantic: AttributeSemantic, entry: VertexFormatEntry) -> Self {
        self.entries[semantic.index()] = Some(entry);
        self
    }

    #[inline]
    pub fn entry(&self, semantic: AttributeSemantic) -> Option<&VertexFormatEntry> {
        self.entries[semantic.index()].as_ref()
    }

    /// Two component positions.
    pub fn p2() -> Self {
        Self::new().with(AttributeSemantic::Position, VertexFormatEntry::new(2, 0, 0))
    }

    /// Two component positions interleaved with two component texture coordinates.
    pub fn p2t2_interleaved() -> Self {
        let stride = 4 * FLOAT_SIZE;
        Self::new()
            .with(AttributeSemantic::Position, VertexFormatEntry::new(2, stride, 0))
            .with(AttributeSemantic::TexCoord2, VertexFormatEntry::new(2, stride, 2 * FLOAT_SIZE))
    }

    /// Glyph batch layout: a block of positions followed by a block of texture coordinates, each
    /// sized for `max_glyphs` quads of two triangles.
    pub fn glyphs(max_glyphs: usize) -> Self {
        Self::new()
            .with(AttributeSemantic::Position, VertexFormatEntry::new(2, 0, 0))
            .with(AttributeSemantic::TexCoord2, VertexFormatEntry::new(
                2, 0, glyph_block_bytes(max_glyphs) as u32,
            ))
    }
}

/// Vertices emitted per glyph quad.
pub const VERTICES_PER_GLYPH: usize = 6;

/// Bytes taken by one block (positions or texture coordinates) of a glyph batch.
#[inline]
pub fn glyph_block_bytes(max_glyphs: usize) -> usize {
    2 * size_of::<f32>() * VERTICES_PER_GLYPH * max_glyphs
}

/// The vertex formats the renderer draws with.
#[derive(Debug, Clone)]
pub struct VertexFormats {
    pub p2: VertexFormat,
    pub p2t2_interleaved: VertexFormat,
    pub glyphs: VertexFormat,
}

impl VertexFormats {
    pub fn new(max_glyphs: usize) -> Self {
        Self {
            p2: VertexFormat::p2(),
            p2t2_interleaved: VertexFormat::p2t2_interleaved(),
            glyphs: VertexFormat::glyphs(max_glyphs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved() {
        let format = VertexFormat::p2t2_interleaved();
        assert_eq!(
            format.entry(AttributeSemantic::Position),
            Some(&VertexFormatEntry::new(2, 16, 0)),
        );
        assert_eq!(
            format.entry(AttributeSemantic::TexCoord2),
            Some(&VertexFormatEntry::new(2, 16, 8)),
        );
    }

    #[test]
    fn test_position_only() {
        assert_eq!(VertexFormat::p2().entry(AttributeSemantic::TexCoord2), None);
        assert_eq!(
            VertexFormat::p2().entry(AttributeSemantic::Position),
            Some(&VertexFormatEntry::new(2, 0, 0)),
        );
    }

    #[test]
    fn test_glyphs() {
        let format = VertexFormat::glyphs(180);
        assert_eq!(glyph_block_bytes(180), 8640);
        assert_eq!(
            format.entry(AttributeSemantic::TexCoord2),
            Some(&VertexFormatEntry::new(2, 0, 8640)),
        );
    }
}
