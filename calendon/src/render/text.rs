//! Simple text layout and glyph batching.
//!
//! Text is laid out on a single line, one fixed-width cell per grapheme. Graphemes the font has
//! no glyph for still take up their cell but emit nothing.

use crate::font::{GlyphIndex, Psf2Font};
use crate::render::color::Rgba8;
use crate::render::vertex_format::VERTICES_PER_GLYPH;
use crate::utf8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LayoutDirection {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// How to draw a run of text.
///
/// Only horizontal, left-to-right text is currently supported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextDrawParams {
    /// Bottom left corner of the first glyph.
    pub position: glm::Vec2,
    pub color: Rgba8,
    pub layout: LayoutDirection,
    pub print_direction: TextDirection,

    #[doc(hidden)]
    pub _ne: crate::NonExhaustive,
}

impl Default for TextDrawParams {
    fn default() -> Self {
        Self {
            position: glm::Vec2::zeros(),
            color: Rgba8::WHITE,
            layout: LayoutDirection::default(),
            print_direction: TextDirection::default(),
            _ne: crate::NonExhaustive(()),
        }
    }
}

impl TextDrawParams {
    /// White, horizontal, left-to-right text at `position`.
    #[inline]
    pub fn at(position: glm::Vec2) -> Self {
        Self { position, ..Default::default() }
    }
}

/// A glyph with the position of its bottom left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub glyph: GlyphIndex,
    pub position: glm::Vec2,
}

/// Iterator placing the glyphs of a string along a horizontal line.
#[derive(Debug, Clone)]
pub struct GlyphLayout<'a> {
    font: &'a Psf2Font,
    remaining: &'a [u8],
    cursor: glm::Vec2,
    advance: f32,
}

impl<'a> GlyphLayout<'a> {
    /// Lay out `text` starting at `origin`, moving `advance` units right per grapheme.
    pub fn new(font: &'a Psf2Font, text: &'a str, origin: glm::Vec2, advance: f32) -> Self {
        Self {
            font,
            remaining: text.as_bytes(),
            cursor: origin,
            advance,
        }
    }
}

impl<'a> Iterator for GlyphLayout<'a> {
    type Item = PlacedGlyph;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&leading) = self.remaining.first() {
            let position = self.cursor;
            self.cursor.x += self.advance;
            match self.font.match_grapheme(self.remaining) {
                Some((glyph, len)) => {
                    self.remaining = &self.remaining[len..];
                    return Some(PlacedGlyph { glyph, position })
                },
                None => {
                    let len = utf8::num_bytes_in_code_point(leading).min(self.remaining.len());
                    self.remaining = &self.remaining[len..];
                },
            }
        }
        None
    }
}

impl std::iter::FusedIterator for GlyphLayout<'_> {}

/// CPU side vertex data for up to `max_glyphs` glyph quads.
///
/// Positions and texture coordinates are kept in separate blocks, matching
/// [VertexFormat::glyphs()](super::vertex_format::VertexFormat::glyphs).
#[derive(Debug, Clone)]
pub struct GlyphBatch {
    positions: Vec<[f32; 2]>,
    tex_coords: Vec<[f32; 2]>,
    max_glyphs: usize,
}

impl GlyphBatch {
    pub fn new(max_glyphs: usize) -> Self {
        Self {
            positions: Vec::with_capacity(max_glyphs * VERTICES_PER_GLYPH),
            tex_coords: Vec::with_capacity(max_glyphs * VERTICES_PER_GLYPH),
            max_glyphs,
        }
    }

    #[inline]
    pub fn max_glyphs(&self) -> usize { self.max_glyphs }

    /// Number of glyphs in the batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len() / VERTICES_PER_GLYPH
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.max_glyphs
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.tex_coords.clear();
    }

    /// Append a quad of two triangles at `position` with the given `size`, textured with the
    /// atlas corners `uv` (as produced by [TextureAtlas::tex_coords()](crate::atlas::TextureAtlas::tex_coords)).
    pub fn push(&mut self, position: glm::Vec2, size: glm::Vec2, uv: &[glm::Vec2; 4]) {
        debug_assert!(!self.is_full(), "glyph batch is full ({} glyphs)", self.max_glyphs);
        let (x, y) = (position.x, position.y);
        let (w, h) = (size.x, size.y);
        self.positions.extend_from_slice(&[
            [x, y],
            [x + w, y],
            [x, y + h],
            [x + w, y],
            [x + w, y + h],
            [x, y + h],
        ]);
        for corner in [0, 1, 2, 1, 3, 2] {
            self.tex_coords.push([uv[corner].x, uv[corner].y]);
        }
    }

    #[inline]
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    #[inline]
    pub fn tex_coord_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.tex_coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::font::psf2::tests::Psf2Builder;
    use crate::font::{parse_psf2, Psf2Options};

    fn font() -> Psf2Font {
        let bytes = Psf2Builder::new(8, 8)
            .blank_glyphs(2)
            .table(b"a\xFFb\xFF")
            .build();
        parse_psf2(&bytes, &Psf2Options::default()).unwrap()
    }

    #[test]
    fn test_layout_advances() {
        let font = font();
        let placed = GlyphLayout::new(&font, "ab", glm::vec2(10.0, 5.0), 24.0).collect::<Vec<_>>();
        assert_eq!(placed, vec![
            PlacedGlyph { glyph: 0, position: glm::vec2(10.0, 5.0) },
            PlacedGlyph { glyph: 1, position: glm::vec2(34.0, 5.0) },
        ]);
    }

    #[test]
    fn test_layout_skips_missing_glyphs() {
        let font = font();
        let placed = GlyphLayout::new(&font, "a\u{e9}?b", glm::Vec2::zeros(), 8.0).collect::<Vec<_>>();
        assert_eq!(placed, vec![
            PlacedGlyph { glyph: 0, position: glm::vec2(0.0, 0.0) },
            PlacedGlyph { glyph: 1, position: glm::vec2(24.0, 0.0) },
        ]);
    }

    #[test]
    fn test_layout_empty() {
        let font = font();
        assert_eq!(GlyphLayout::new(&font, "", glm::Vec2::zeros(), 8.0).count(), 0);
    }

    #[test]
    fn test_batch_quad() {
        let mut batch = GlyphBatch::new(2);
        let uv = [
            glm::vec2(0.0, 0.0),
            glm::vec2(0.5, 0.0),
            glm::vec2(0.0, 0.5),
            glm::vec2(0.5, 0.5),
        ];
        batch.push(glm::vec2(1.0, 2.0), glm::vec2(3.0, 4.0), &uv);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.vertex_count(), 6);
        assert!(!batch.is_full());

        let positions: &[[f32; 2]] = bytemuck::cast_slice(batch.position_bytes());
        assert_eq!(positions, &[
            [1.0, 2.0], [4.0, 2.0], [1.0, 6.0],
            [4.0, 2.0], [4.0, 6.0], [1.0, 6.0],
        ]);
        let tex_coords: &[[f32; 2]] = bytemuck::cast_slice(batch.tex_coord_bytes());
        assert_eq!(tex_coords, &[
            [0.0, 0.0], [0.5, 0.0], [0.0, 0.5],
            [0.5, 0.0], [0.5, 0.5], [0.0, 0.5],
        ]);

        batch.push(glm::vec2(0.0, 0.0), glm::vec2(1.0, 1.0), &uv);
        assert!(batch.is_full());
        batch.clear();
        assert!(batch.is_empty());
    }
}
