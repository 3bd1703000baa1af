use std::error::Error;
use std::fmt::{Display, Formatter};
use tracing::warn;

use crate::font::grapheme::Grapheme;
use crate::log::TARGET_FONT;

/// Index of a glyph inside a font's atlas.
pub type GlyphIndex = u32;

/// Default number of mappings a [GraphemeMap] can hold.
pub const GRAPHEME_MAP_CAPACITY: usize = 512;

/// Error yielded when a [GraphemeMap] cannot take another mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphemeMapError {
    /// The map already holds `capacity` graphemes.
    CapacityExceeded { capacity: usize },
}

impl Display for GraphemeMapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityExceeded { capacity } =>
                write!(f, "Grapheme map is full ({capacity} entries)"),
        }
    }
}

impl Error for GraphemeMapError {}

/// Association from [Graphemes](Grapheme) to glyph indices.
///
/// Lookups are a linear scan in insertion order, and the first matching entry wins. Mapping a
/// grapheme that already has an entry never replaces that entry; the first glyph a grapheme was
/// mapped to is the one that stays.
#[derive(Debug, Clone)]
pub struct GraphemeMap {
    graphemes: Vec<Grapheme>,
    glyphs: Vec<GlyphIndex>,
    capacity: usize,
}

impl Default for GraphemeMap {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl GraphemeMap {
    /// Create an empty map with the default capacity of [GRAPHEME_MAP_CAPACITY].
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(GRAPHEME_MAP_CAPACITY)
    }

    /// Create an empty map that accepts at most `capacity` mappings.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            graphemes: Vec::with_capacity(capacity),
            glyphs: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Remove all mappings.
    pub fn clear(&mut self) {
        self.graphemes.clear();
        self.glyphs.clear();
    }

    #[inline]
    pub fn len(&self) -> usize { self.graphemes.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.graphemes.is_empty() }

    #[inline]
    pub fn capacity(&self) -> usize { self.capacity }

    /// Index of the entry holding the first `num_code_points` code points of `code_points`.
    pub fn grapheme_index_for_code_points(
        &self,
        code_points: &[u8],
        num_code_points: usize,
    ) -> Option<usize> {
        self.graphemes.iter()
            .position(|g| g.equals_code_points(code_points, num_code_points))
    }

    /// Glyph mapped to the first `num_code_points` code points of `code_points`.
    #[inline]
    pub fn glyph_for_code_points(
        &self,
        code_points: &[u8],
        num_code_points: usize,
    ) -> Option<GlyphIndex> {
        self.grapheme_index_for_code_points(code_points, num_code_points)
            .map(|idx| self.glyphs[idx])
    }

    /// Glyph mapped to `grapheme`.
    pub fn glyph_for_grapheme(&self, grapheme: &Grapheme) -> Option<GlyphIndex> {
        self.graphemes.iter()
            .position(|g| g == grapheme)
            .map(|idx| self.glyphs[idx])
    }

    /// Map the first `num_code_points` code points of `code_points` to `glyph`.
    ///
    /// See [GraphemeMap::map_grapheme()].
    #[inline]
    pub fn map(
        &mut self,
        code_points: &[u8],
        num_code_points: usize,
        glyph: GlyphIndex,
    ) -> Result<(), GraphemeMapError> {
        self.map_grapheme(Grapheme::from_code_points(code_points, num_code_points), glyph)
    }

    /// Map `grapheme` to `glyph`.
    ///
    /// If `grapheme` is already mapped, the existing entry is kept and a warning is logged, whether
    /// or not it points at the same glyph. Fails only when the map is full.
    pub fn map_grapheme(
        &mut self,
        grapheme: Grapheme,
        glyph: GlyphIndex,
    ) -> Result<(), GraphemeMapError> {
        if let Some(idx) = self.graphemes.iter().position(|g| g == &grapheme) {
            let existing = self.glyphs[idx];
            if existing == glyph {
                warn!(target: TARGET_FONT, %grapheme, glyph, "Duplicate grapheme mapping");
            } else {
                warn!(
                    target: TARGET_FONT,
                    %grapheme,
                    existing,
                    ignored = glyph,
                    "Grapheme already mapped to a different glyph, keeping existing mapping",
                );
            }
            return Ok(())
        }

        if self.graphemes.len() >= self.capacity {
            return Err(GraphemeMapError::CapacityExceeded { capacity: self.capacity })
        }
        self.graphemes.push(grapheme);
        self.glyphs.push(glyph);
        Ok(())
    }

    /// Iterate over all mappings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Grapheme, GlyphIndex)> + '_ {
        self.graphemes.iter().zip(self.glyphs.iter().copied())
    }
}
