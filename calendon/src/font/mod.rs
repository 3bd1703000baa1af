//! Bitmap fonts.
//!
//! Fonts are loaded from PSF2 files (see [psf2]) into a [Psf2Font], which pairs a
//! [TextureAtlas] of glyph masks with a [GraphemeMap] that resolves text to glyphs.

use crate::atlas::TextureAtlas;

pub mod grapheme;
pub mod grapheme_map;
pub mod psf2;

pub use grapheme::{Grapheme, GRAPHEME_MAX_CODE_POINTS};
pub use grapheme_map::{GlyphIndex, GraphemeMap, GraphemeMapError};
pub use psf2::{load_psf2, parse_psf2, Psf2Error, Psf2Options};

/// A fixed-size bitmap font.
///
/// Every glyph occupies one cell of [Psf2Font::atlas()], at the atlas index equal to its
/// [GlyphIndex].
#[derive(Debug, Clone)]
pub struct Psf2Font {
    glyph_size: glm::U32Vec2,
    atlas: TextureAtlas,
    map: GraphemeMap,
}

impl Psf2Font {
    pub(crate) fn new(glyph_size: glm::U32Vec2, atlas: TextureAtlas, map: GraphemeMap) -> Self {
        Self {
            glyph_size,
            atlas,
            map,
        }
    }

    /// Size of a glyph cell in pixels.
    #[inline]
    pub fn glyph_size(&self) -> glm::U32Vec2 { self.glyph_size }

    #[inline]
    pub fn atlas(&self) -> &TextureAtlas { &self.atlas }

    #[inline]
    pub fn map(&self) -> &GraphemeMap { &self.map }

    /// Find the glyph for the grapheme at the start of `text`.
    ///
    /// Tries runs of 1 up to [GRAPHEME_MAX_CODE_POINTS] code points (capped by what remains of
    /// `text`) and stops at the first run that is mapped. Returns the glyph and the number of
    /// bytes the matched grapheme covers.
    pub fn match_grapheme(&self, text: &[u8]) -> Option<(GlyphIndex, usize)> {
        let mut byte_len = 0;
        for (idx, code_point) in crate::utf8::code_points(text)
            .take(GRAPHEME_MAX_CODE_POINTS)
            .enumerate()
        {
            byte_len += code_point.len();
            if let Some(glyph) = self.map.glyph_for_code_points(text, idx + 1) {
                return Some((glyph, byte_len))
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::font::psf2::tests::Psf2Builder;

    fn font() -> Psf2Font {
        let mut table = Vec::new();
        table.extend_from_slice("e\u{301}".as_bytes());
        table.push(0xFF);
        table.extend_from_slice(b"x");
        table.push(0xFF);
        table.extend_from_slice(b"y\xFEz");
        table.push(0xFF);
        let bytes = Psf2Builder::new(8, 8)
            .blank_glyphs(3)
            .table(&table)
            .build();
        parse_psf2(&bytes, &Psf2Options::default()).unwrap()
    }

    #[test]
    fn test_match_single_code_point() {
        let font = font();
        assert_eq!(font.match_grapheme(b"xy"), Some((1, 1)));
        assert_eq!(font.match_grapheme(b"y"), Some((2, 1)));
        assert_eq!(font.match_grapheme(b"z"), Some((2, 1)));
    }

    #[test]
    fn test_match_multi_code_point() {
        let font = font();
        assert_eq!(font.match_grapheme("e\u{301}x".as_bytes()), Some((0, 3)));
    }

    #[test]
    fn test_match_miss() {
        let font = font();
        assert_eq!(font.match_grapheme(b"e"), None);
        assert_eq!(font.match_grapheme(b"ex"), None);
        assert_eq!(font.match_grapheme(b"q"), None);
        assert_eq!(font.match_grapheme(b""), None);
    }
}
