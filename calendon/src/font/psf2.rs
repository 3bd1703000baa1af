//! PC Screen Font version 2 parsing.
//!
//! A PSF2 file is laid out as `[header][glyph bitmaps][unicode table]`. The header is eight
//! little-endian `u32`s, starting with the magic number. Each glyph bitmap is byte-packed, most
//! significant bit first, with every row padded to a whole byte.
//!
//! The unicode table lists, for each glyph in order, the code point sequences that render as that
//! glyph:
//! ```text
//! table := entry*
//! entry := sequence? (SEPARATOR sequence)* TERMINATOR
//! sequence := utf8-code-point+
//! ```
//! where `SEPARATOR` is the raw byte `0xFE` and `TERMINATOR` is the raw byte `0xFF`. Neither byte
//! can appear in UTF-8, so they never clash with code points.

use std::error::Error;
use std::fmt::{Display, Formatter};
use tracing::{debug, trace, warn};

use crate::atlas::{AtlasError, TextureAtlas, MASK_SET};
use crate::font::grapheme::{Grapheme, GRAPHEME_MAX_CODE_POINTS};
use crate::font::grapheme_map::{GlyphIndex, GraphemeMap, GraphemeMapError, GRAPHEME_MAP_CAPACITY};
use crate::font::Psf2Font;
use crate::image::ImageRgba8;
use crate::log::TARGET_FONT;
use crate::resource::path::AssetPath;
use crate::resource::{AssetLoadError, AssetSource};
use crate::utf8::{self, ByteValidity};
use crate::NonExhaustive;

pub const PSF2_MAGIC: [u8; 4] = [0x72, 0xB5, 0x4A, 0x86];
pub const PSF2_HEADER_LEN: usize = 32;
pub const PSF2_HAS_UNICODE_TABLE: u32 = 0x01;
pub const PSF2_SEPARATOR: u8 = 0xFE;
pub const PSF2_TERMINATOR: u8 = 0xFF;

/// Error yielded while loading a PSF2 font.
#[derive(Debug, Clone)]
pub enum Psf2Error {
    /// The file is too short to hold a header.
    TooShort { len: usize },

    /// The magic number didn't match, and strict checking was requested.
    BadMagic([u8; 4]),

    /// The header claims a bitmap offset inside the header itself.
    HeaderSizeTooSmall { header_size: u32 },

    /// Glyph cells must be a whole number of bytes in each dimension.
    GlyphSizeNotMultipleOf8 { width: u32, height: u32 },

    /// A glyph bitmap would need more than `u32::MAX` bytes.
    GlyphSizeTooLarge { width: u32, height: u32 },

    /// The header's bytes-per-glyph doesn't match the glyph size.
    BytesPerGlyphMismatch { expected: u32, actual: u32 },

    /// The glyph bitmaps run past the end of the file.
    BitmapTruncated { expected_end: u64, len: usize },

    /// The font has no unicode table, so none of its glyphs can be looked up.
    MissingUnicodeTable,

    /// The unicode table is malformed at the given file offset.
    MalformedUnicodeTable { offset: usize, reason: &'static str },

    Atlas(AtlasError),

    GraphemeMap(GraphemeMapError),

    Asset(AssetLoadError),
}

impl Display for Psf2Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { len } =>
                write!(f, "PSF2 file too short for a header ({len} bytes)"),
            Self::BadMagic(magic) =>
                write!(f, "PSF2 magic mismatch: {magic:02x?}"),
            Self::HeaderSizeTooSmall { header_size } =>
                write!(f, "PSF2 header size {header_size} is smaller than {PSF2_HEADER_LEN}"),
            Self::GlyphSizeNotMultipleOf8 { width, height } =>
                write!(f, "PSF2 glyph size {width}x{height} is not a multiple of 8"),
            Self::GlyphSizeTooLarge { width, height } =>
                write!(f, "PSF2 glyph size {width}x{height} is too large"),
            Self::BytesPerGlyphMismatch { expected, actual } =>
                write!(f, "PSF2 bytes per glyph is {actual}, expected {expected}"),
            Self::BitmapTruncated { expected_end, len } =>
                write!(f, "PSF2 glyph bitmaps end at {expected_end}, past end of file at {len}"),
            Self::MissingUnicodeTable => write!(f, "PSF2 font has no unicode table"),
            Self::MalformedUnicodeTable { offset, reason } =>
                write!(f, "PSF2 unicode table malformed at offset {offset}: {reason}"),
            Self::Atlas(err) => Display::fmt(err, f),
            Self::GraphemeMap(err) => Display::fmt(err, f),
            Self::Asset(err) => Display::fmt(err, f),
        }
    }
}

impl Error for Psf2Error {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Atlas(err) => Some(err),
            Self::GraphemeMap(err) => Some(err),
            Self::Asset(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AtlasError> for Psf2Error {
    #[inline]
    fn from(value: AtlasError) -> Self { Self::Atlas(value) }
}

impl From<GraphemeMapError> for Psf2Error {
    #[inline]
    fn from(value: GraphemeMapError) -> Self { Self::GraphemeMap(value) }
}

impl From<AssetLoadError> for Psf2Error {
    #[inline]
    fn from(value: AssetLoadError) -> Self { Self::Asset(value) }
}

/// Options for loading PSF2 fonts.
#[derive(Debug, Clone)]
pub struct Psf2Options {
    /// Reject files with the wrong magic number. When false, a mismatch is only logged.
    pub strict_magic: bool,

    /// Capacity of the font's [GraphemeMap].
    pub map_capacity: usize,

    pub _ne: NonExhaustive,
}

impl Default for Psf2Options {
    fn default() -> Self {
        Self {
            strict_magic: false,
            map_capacity: GRAPHEME_MAP_CAPACITY,
            _ne: NonExhaustive(()),
        }
    }
}

/// Fixed-size PSF2 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Psf2Header {
    pub magic: [u8; 4],
    pub version: u32,
    pub header_size: u32,
    pub flags: u32,
    pub num_glyphs: u32,
    pub bytes_per_glyph: u32,
    pub height: u32,
    pub width: u32,
}

impl Psf2Header {
    /// Read the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, Psf2Error> {
        if bytes.len() < PSF2_HEADER_LEN {
            return Err(Psf2Error::TooShort { len: bytes.len() })
        }
        let word = |idx: usize| {
            let start = idx * 4;
            u32::from_le_bytes([bytes[start], bytes[start + 1], bytes[start + 2], bytes[start + 3]])
        };
        Ok(Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: word(1),
            header_size: word(2),
            flags: word(3),
            num_glyphs: word(4),
            bytes_per_glyph: word(5),
            height: word(6),
            width: word(7),
        })
    }

    #[inline]
    pub fn has_unicode_table(&self) -> bool {
        self.flags & PSF2_HAS_UNICODE_TABLE != 0
    }

    #[inline]
    fn row_bytes(&self) -> usize {
        self.width as usize / 8
    }
}

/// Parse a PSF2 font from its file contents.
pub fn parse_psf2(bytes: &[u8], options: &Psf2Options) -> Result<Psf2Font, Psf2Error> {
    let header = Psf2Header::parse(bytes)?;
    trace!(target: TARGET_FONT, ?header, "Read PSF2 header");

    if header.magic != PSF2_MAGIC {
        if options.strict_magic {
            return Err(Psf2Error::BadMagic(header.magic))
        }
        warn!(target: TARGET_FONT, magic = ?header.magic, "PSF2 magic mismatch");
    }
    if (header.header_size as usize) < PSF2_HEADER_LEN {
        return Err(Psf2Error::HeaderSizeTooSmall { header_size: header.header_size })
    }
    if header.width % 8 != 0 || header.height % 8 != 0 {
        return Err(Psf2Error::GlyphSizeNotMultipleOf8 {
            width: header.width,
            height: header.height,
        })
    }
    let expected_bytes_per_glyph = (header.width / 8).checked_mul(header.height)
        .ok_or(Psf2Error::GlyphSizeTooLarge { width: header.width, height: header.height })?;
    if header.bytes_per_glyph != expected_bytes_per_glyph {
        return Err(Psf2Error::BytesPerGlyphMismatch {
            expected: expected_bytes_per_glyph,
            actual: header.bytes_per_glyph,
        })
    }

    let bitmap_start = header.header_size as u64;
    let bitmap_end = bitmap_start + header.num_glyphs as u64 * header.bytes_per_glyph as u64;
    if bitmap_end > bytes.len() as u64 {
        return Err(Psf2Error::BitmapTruncated { expected_end: bitmap_end, len: bytes.len() })
    }
    let bitmap = &bytes[bitmap_start as usize..bitmap_end as usize];

    let glyph_size = glm::vec2(header.width, header.height);
    let mut atlas = TextureAtlas::new(glyph_size, header.num_glyphs)?;
    decode_bitmaps(&header, bitmap, &mut atlas)?;

    if !header.has_unicode_table() {
        return Err(Psf2Error::MissingUnicodeTable)
    }
    let mut map = GraphemeMap::with_capacity(options.map_capacity);
    parse_unicode_table(bytes, bitmap_end as usize, header.num_glyphs, &mut map)?;

    debug!(
        target: TARGET_FONT,
        num_glyphs = header.num_glyphs,
        width = header.width,
        height = header.height,
        mappings = map.len(),
        "Loaded PSF2 font",
    );
    Ok(Psf2Font::new(glyph_size, atlas, map))
}

/// Read and parse a PSF2 font from an [AssetSource].
pub fn load_psf2(
    source: &dyn AssetSource,
    path: &AssetPath,
    options: &Psf2Options,
) -> Result<Psf2Font, Psf2Error> {
    let bytes = source.read(path)?;
    parse_psf2(&bytes, options)
}

fn decode_bitmaps(
    header: &Psf2Header,
    bitmap: &[u8],
    atlas: &mut TextureAtlas,
) -> Result<(), Psf2Error> {
    let row_bytes = header.row_bytes();
    let mut glyph_image = ImageRgba8::new_sized(header.width, header.height);
    for glyph in bitmap.chunks_exact(header.bytes_per_glyph as usize) {
        glyph_image.pixels_mut().fill(0);
        for (row, row_data) in glyph.chunks_exact(row_bytes).enumerate() {
            for (byte_idx, &byte) in row_data.iter().enumerate() {
                for bit in 0..8 {
                    if byte & (0x80 >> bit) != 0 {
                        glyph_image.set_pixel(row as u32, (byte_idx * 8 + bit) as u32, MASK_SET);
                    }
                }
            }
        }
        atlas.insert(&glyph_image)?;
    }
    Ok(())
}

struct SequenceBuilder {
    grapheme: Grapheme,
    overflowed: bool,
}

impl SequenceBuilder {
    fn new() -> Self {
        Self { grapheme: Grapheme::new(), overflowed: false }
    }

    fn push(&mut self, code_point: &[u8]) {
        if !self.grapheme.add_code_point(code_point) {
            self.overflowed = true;
        }
    }

    fn finish(&mut self, glyph: GlyphIndex, map: &mut GraphemeMap) -> Result<(), Psf2Error> {
        let builder = std::mem::replace(self, Self::new());
        if builder.overflowed {
            warn!(
                target: TARGET_FONT,
                glyph,
                prefix = %builder.grapheme,
                max = GRAPHEME_MAX_CODE_POINTS,
                "Skipping PSF2 sequence with too many code points",
            );
        } else if !builder.grapheme.is_empty() {
            map.map_grapheme(builder.grapheme, glyph)?;
        }
        Ok(())
    }
}

fn parse_unicode_table(
    bytes: &[u8],
    table_start: usize,
    num_glyphs: u32,
    map: &mut GraphemeMap,
) -> Result<(), Psf2Error> {
    let malformed = |offset, reason| Psf2Error::MalformedUnicodeTable { offset, reason };

    let mut glyph: GlyphIndex = 0;
    let mut sequence = SequenceBuilder::new();
    let mut offset = table_start;
    while offset < bytes.len() {
        if glyph >= num_glyphs {
            return Err(malformed(offset, "more entries than glyphs"))
        }
        match bytes[offset] {
            PSF2_TERMINATOR => {
                sequence.finish(glyph, map)?;
                glyph += 1;
                offset += 1;
            },
            PSF2_SEPARATOR => {
                sequence.finish(glyph, map)?;
                offset += 1;
            },
            leading => {
                if utf8::is_valid_byte(leading) == ByteValidity::Illegal {
                    return Err(malformed(offset, "illegal UTF-8 byte"))
                }
                if !utf8::is_leading_byte(leading) {
                    return Err(malformed(offset, "code point starts with a continuation byte"))
                }
                let len = utf8::num_bytes_in_code_point(leading);
                let code_point = bytes.get(offset..offset + len)
                    .ok_or_else(|| malformed(offset, "truncated code point"))?;
                if code_point[1..].iter().any(|&b| !utf8::is_continuation_byte(b)) {
                    return Err(malformed(offset, "code point is missing continuation bytes"))
                }
                sequence.push(code_point);
                offset += len;
            },
        }
    }

    if !sequence.grapheme.is_empty() || sequence.overflowed {
        return Err(malformed(bytes.len(), "unterminated entry"))
    }
    if glyph < num_glyphs {
        debug!(target: TARGET_FONT, entries = glyph, num_glyphs, "PSF2 unicode table is short");
    }
    Ok(())
}
