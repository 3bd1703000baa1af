//! Texture atlases for 1-bit glyph masks.
//!
//! A [TextureAtlas] packs a fixed number of equally sized sub-images into a square grid of cells
//! inside one backing [ImageRgba8]. Sub-images are placed in row-major order as they are inserted.
//!
//! Cell rows are written in inverted order inside the backing image. The renderer flips the whole
//! backing image before uploading it, which puts grid row 0 at `v = 0` with each glyph upright,
//! and that is the space [TextureAtlas::tex_coords()] works in.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::image::ImageRgba8;

/// Fully transparent mask pixel.
pub const MASK_CLEAR: u32 = 0x0000_0000;

/// Fully opaque white mask pixel.
pub const MASK_SET: u32 = 0xFFFF_FFFF;

/// Largest backing image width or height an atlas will allocate.
pub const MAX_BACKING_DIMENSION: u32 = 16384;

/// Error yielded by [TextureAtlas] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    /// Sub-images must be at least 1x1.
    ZeroSizedSubImage,

    /// An atlas must hold at least one sub-image.
    NoImages,

    /// The backing image would exceed [MAX_BACKING_DIMENSION] on some axis.
    TooLarge { width: u64, height: u64 },

    /// Every sub-image slot is already used.
    Full { total_images: u32 },

    /// An inserted image didn't have the atlas's sub-image size.
    SizeMismatch { expected: (u32, u32), actual: (u32, u32) },

    /// An inserted image had a pixel that wasn't a mask value.
    InvalidPixel { row: u32, col: u32, value: u32 },
}

impl Display for AtlasError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroSizedSubImage => write!(f, "Atlas sub-images must have a non-zero size"),
            Self::NoImages => write!(f, "Atlas must hold at least one image"),
            Self::TooLarge { width, height } => write!(
                f,
                "Atlas backing image {width}x{height} exceeds {MAX_BACKING_DIMENSION} pixels per side",
            ),
            Self::Full { total_images } =>
                write!(f, "Atlas is full ({total_images} images)"),
            Self::SizeMismatch { expected, actual } => write!(
                f,
                "Atlas sub-image must be {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1,
            ),
            Self::InvalidPixel { row, col, value } => write!(
                f,
                "Atlas sub-image pixel ({row}, {col}) is {value:#010x}, expected a mask value",
            ),
        }
    }
}

impl Error for AtlasError {}

/// Position of a cell in an atlas grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowCol {
    pub row: u32,
    pub col: u32,
}

/// A square grid of equally sized sub-images.
#[derive(Debug, Clone)]
pub struct TextureAtlas {
    backing: ImageRgba8,
    sub_image_size: glm::U32Vec2,
    grid_size: glm::U32Vec2,
    used_images: u32,
    total_images: u32,
}

impl TextureAtlas {
    /// Allocate an atlas for `num_images` sub-images of `sub_image_size` pixels.
    ///
    /// The grid is `ceil(sqrt(num_images))` cells on each side, even if that leaves cells unused.
    pub fn new(sub_image_size: glm::U32Vec2, num_images: u32) -> Result<Self, AtlasError> {
        if sub_image_size.x == 0 || sub_image_size.y == 0 {
            return Err(AtlasError::ZeroSizedSubImage)
        }
        if num_images == 0 {
            return Err(AtlasError::NoImages)
        }
        let side = grid_side(num_images);
        let width = side * sub_image_size.x as u64;
        let height = side * sub_image_size.y as u64;
        if width > MAX_BACKING_DIMENSION as u64 || height > MAX_BACKING_DIMENSION as u64 {
            return Err(AtlasError::TooLarge { width, height })
        }
        // Both fit in u32 now, and so does the side.
        let grid_size = glm::vec2(side as u32, side as u32);
        Ok(Self {
            backing: ImageRgba8::new_sized(width as u32, height as u32),
            sub_image_size,
            grid_size,
            used_images: 0,
            total_images: num_images,
        })
    }

    /// The backing image holding every sub-image.
    #[inline]
    pub fn backing(&self) -> &ImageRgba8 { &self.backing }

    #[inline]
    pub fn backing_size(&self) -> glm::U32Vec2 { self.backing.size() }

    #[inline]
    pub fn sub_image_size(&self) -> glm::U32Vec2 { self.sub_image_size }

    #[inline]
    pub fn grid_size(&self) -> glm::U32Vec2 { self.grid_size }

    #[inline]
    pub fn used_images(&self) -> u32 { self.used_images }

    #[inline]
    pub fn total_images(&self) -> u32 { self.total_images }

    /// Grid cell for a sub-image index, in row-major order.
    #[inline]
    pub fn sub_image_grid(&self, index: u32) -> RowCol {
        RowCol {
            row: index / self.grid_size.x,
            col: index % self.grid_size.x,
        }
    }

    /// Copy a mask image into the next free cell, returning its sub-image index.
    ///
    /// Every pixel must be [MASK_CLEAR] or [MASK_SET].
    pub fn insert(&mut self, sub_image: &ImageRgba8) -> Result<u32, AtlasError> {
        if self.used_images >= self.total_images {
            return Err(AtlasError::Full { total_images: self.total_images })
        }
        if sub_image.size() != self.sub_image_size {
            return Err(AtlasError::SizeMismatch {
                expected: (self.sub_image_size.x, self.sub_image_size.y),
                actual: (sub_image.width(), sub_image.height()),
            })
        }
        if let Some(offset) = sub_image.pixels().iter()
            .position(|&p| p != MASK_CLEAR && p != MASK_SET)
        {
            let width = sub_image.width() as usize;
            return Err(AtlasError::InvalidPixel {
                row: (offset / width) as u32,
                col: (offset % width) as u32,
                value: sub_image.pixels()[offset],
            })
        }

        let index = self.used_images;
        let cell = self.sub_image_grid(index);
        let dest_row = self.grid_size.y - cell.row - 1;
        let sub_w = self.sub_image_size.x as usize;
        let sub_h = self.sub_image_size.y as usize;
        let backing_w = self.backing.width() as usize;
        let dest_start = dest_row as usize * backing_w * sub_h + cell.col as usize * sub_w;

        let dest = self.backing.pixels_mut();
        for (y, src_row) in sub_image.pixels().chunks_exact(sub_w).enumerate() {
            let offset = dest_start + y * backing_w;
            dest[offset..offset + sub_w].copy_from_slice(src_row);
        }

        self.used_images += 1;
        Ok(index)
    }

    /// UV corners of a sub-image.
    ///
    /// Corners are ordered `[(left, low), (right, low), (left, high), (right, high)]`, which is the
    /// triangle strip order the renderer draws quads in.
    pub fn tex_coords(&self, sub_image_id: u32) -> [glm::Vec2; 4] {
        debug_assert!(sub_image_id < self.total_images, "sub-image {sub_image_id} out of range");
        let cell = self.sub_image_grid(sub_image_id);
        let dx = 1.0 / self.grid_size.x as f32;
        let dy = 1.0 / self.grid_size.y as f32;
        let left = cell.col as f32 * dx;
        let right = (cell.col + 1) as f32 * dx;
        let low = cell.row as f32 * dy;
        let high = (cell.row + 1) as f32 * dy;
        [
            glm::vec2(left, low),
            glm::vec2(right, low),
            glm::vec2(left, high),
            glm::vec2(right, high),
        ]
    }

    /// Consume the atlas, yielding its backing image.
    #[inline]
    pub fn into_backing(self) -> ImageRgba8 {
        self.backing
    }
}

fn grid_side(num_images: u32) -> u64 {
    let num_images = num_images as u64;
    let mut side = (num_images as f64).sqrt().ceil() as u64;
    // Guard against float rounding at perfect squares
    while side > 1 && (side - 1) * (side - 1) >= num_images {
        side -= 1;
    }
    while side * side < num_images {
        side += 1;
    }
    side
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::one((1, 1), 1, 1, (1, 1))]
    #[case::four((8, 16), 4, 2, (16, 32))]
    #[case::six((2, 3), 6, 3, (6, 9))]
    #[case::sixteen((1, 1), 16, 4, (4, 4))]
    #[case::seventeen((1, 1), 17, 5, (5, 5))]
    #[case::sixty_four((1, 1), 64, 8, (8, 8))]
    #[case::widest((16384, 1), 1, 1, (16384, 1))]
    fn test_allocate(
        #[case] sub_size: (u32, u32),
        #[case] num_images: u32,
        #[case] expected_grid: u32,
        #[case] expected_backing: (u32, u32),
    ) {
        let atlas = TextureAtlas::new(glm::vec2(sub_size.0, sub_size.1), num_images).unwrap();
        assert_eq!(atlas.grid_size(), glm::vec2(expected_grid, expected_grid));
        assert_eq!(atlas.backing_size(), glm::vec2(expected_backing.0, expected_backing.1));
        assert_eq!(atlas.used_images(), 0);
        assert_eq!(atlas.total_images(), num_images);
        assert!(atlas.backing().pixels().iter().all(|&p| p == MASK_CLEAR));
    }

    #[rstest]
    #[case::no_images((1, 1), 0, AtlasError::NoImages)]
    #[case::zero_width((0, 1), 4, AtlasError::ZeroSizedSubImage)]
    #[case::zero_height((1, 0), 4, AtlasError::ZeroSizedSubImage)]
    #[case::too_wide((16385, 1), 1, AtlasError::TooLarge { width: 16385, height: 1 })]
    #[case::too_many((8, 8), 4_194_305, AtlasError::TooLarge { width: 16392, height: 16392 })]
    #[case::huge_grid((1, 1), u32::MAX, AtlasError::TooLarge { width: 65536, height: 65536 })]
    fn test_allocate_rejects(
        #[case] sub_size: (u32, u32),
        #[case] num_images: u32,
        #[case] expected: AtlasError,
    ) {
        let err = TextureAtlas::new(glm::vec2(sub_size.0, sub_size.1), num_images).unwrap_err();
        assert_eq!(err, expected);
    }

    #[test]
    fn test_sub_image_grid() {
        let atlas = TextureAtlas::new(glm::vec2(2, 3), 6).unwrap();
        let expected = [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)];
        for (idx, (row, col)) in expected.into_iter().enumerate() {
            assert_eq!(atlas.sub_image_grid(idx as u32), RowCol { row, col });
        }
    }

    #[test]
    fn test_sub_image_grid_unique_cells() {
        let atlas = TextureAtlas::new(glm::vec2(1, 1), 16).unwrap();
        let cells: ahash::HashSet<RowCol> = (0..16).map(|i| atlas.sub_image_grid(i)).collect();
        assert_eq!(cells.len(), 16);
        assert!(cells.iter().all(|c| c.row < 4 && c.col < 4));
    }

    #[test]
    fn test_tex_coords() {
        let atlas = TextureAtlas::new(glm::vec2(2, 2), 4).unwrap();
        assert_eq!(atlas.tex_coords(0), [
            glm::vec2(0.0, 0.0),
            glm::vec2(0.5, 0.0),
            glm::vec2(0.0, 0.5),
            glm::vec2(0.5, 0.5),
        ]);
        assert_eq!(atlas.tex_coords(3), [
            glm::vec2(0.5, 0.5),
            glm::vec2(1.0, 0.5),
            glm::vec2(0.5, 1.0),
            glm::vec2(1.0, 1.0),
        ]);
    }

    #[test]
    fn test_tex_coords_in_range_and_disjoint() {
        let atlas = TextureAtlas::new(glm::vec2(3, 5), 9).unwrap();
        let rects: Vec<[glm::Vec2; 4]> = (0..9).map(|i| atlas.tex_coords(i)).collect();
        for rect in &rects {
            for uv in rect {
                assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
            }
        }
        for (a_idx, a) in rects.iter().enumerate() {
            for b in rects.iter().skip(a_idx + 1) {
                let overlap_x = a[0].x < b[3].x && b[0].x < a[3].x;
                let overlap_y = a[0].y < b[3].y && b[0].y < a[3].y;
                assert!(!(overlap_x && overlap_y));
            }
        }
    }

    fn filled(width: u32, height: u32) -> ImageRgba8 {
        ImageRgba8::from_pixels(width, height, vec![MASK_SET; (width * height) as usize]).unwrap()
    }

    #[test]
    fn test_insert_places_inverted_rows() {
        let mut atlas = TextureAtlas::new(glm::vec2(2, 2), 4).unwrap();
        assert_eq!(atlas.insert(&filled(2, 2)).unwrap(), 0);

        // Index 0 is grid row 0, which is drawn into the top cell row of the backing image
        let backing = atlas.backing();
        for row in 0..4 {
            for col in 0..4 {
                let expected = if row >= 2 && col < 2 { MASK_SET } else { MASK_CLEAR };
                assert_eq!(backing.pixel(row, col), expected, "({row}, {col})");
            }
        }

        assert_eq!(atlas.insert(&ImageRgba8::new_sized(2, 2)).unwrap(), 1);
        assert_eq!(atlas.insert(&filled(2, 2)).unwrap(), 2);
        assert_eq!(atlas.backing().pixel(0, 0), MASK_SET);
        assert_eq!(atlas.backing().pixel(1, 1), MASK_SET);
        assert_eq!(atlas.backing().pixel(0, 2), MASK_CLEAR);
        assert_eq!(atlas.used_images(), 3);
    }

    #[test]
    fn test_insert_keeps_sub_image_rows() {
        let mut atlas = TextureAtlas::new(glm::vec2(1, 2), 1).unwrap();
        let image = ImageRgba8::from_pixels(1, 2, vec![MASK_SET, MASK_CLEAR]).unwrap();
        atlas.insert(&image).unwrap();
        assert_eq!(atlas.backing().pixels(), &[MASK_SET, MASK_CLEAR]);
    }

    #[test]
    fn test_insert_full() {
        let mut atlas = TextureAtlas::new(glm::vec2(1, 1), 2).unwrap();
        atlas.insert(&filled(1, 1)).unwrap();
        atlas.insert(&filled(1, 1)).unwrap();
        assert_matches!(
            atlas.insert(&filled(1, 1)),
            Err(AtlasError::Full { total_images: 2 })
        );
    }

    #[test]
    fn test_insert_size_mismatch() {
        let mut atlas = TextureAtlas::new(glm::vec2(2, 2), 2).unwrap();
        assert_matches!(
            atlas.insert(&filled(2, 3)),
            Err(AtlasError::SizeMismatch { expected: (2, 2), actual: (2, 3) })
        );
        assert_eq!(atlas.used_images(), 0);
    }

    #[test]
    fn test_insert_rejects_non_mask_pixel() {
        let mut atlas = TextureAtlas::new(glm::vec2(2, 2), 1).unwrap();
        let mut image = filled(2, 2);
        image.set_pixel(1, 0, 0xFF00_00FF);
        assert_matches!(
            atlas.insert(&image),
            Err(AtlasError::InvalidPixel { row: 1, col: 0, value: 0xFF00_00FF })
        );
    }
}
