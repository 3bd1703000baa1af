//! RGBA8 images.
//!
//! Pixels are stored as one `u32` per pixel, holding the R, G, B and A bytes in memory order, so
//! [ImageRgba8::as_bytes()] can be handed to the GPU without conversion. Rows are stored bottom
//! to top, which is the order OpenGL expects for texture uploads.

use ::image::ImageFormat;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Error yielded when building an [ImageRgba8].
#[derive(Debug, Clone)]
pub enum ImageError {
    /// The PNG decoder rejected the data.
    Decode(Arc<dyn Error + Send + Sync + 'static>),

    /// A pixel buffer didn't match the given dimensions.
    SizeMismatch { width: u32, height: u32, len: usize },
}

impl Display for ImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "Failed to decode image: {err}"),
            Self::SizeMismatch { width, height, len } =>
                write!(f, "Pixel buffer of length {len} does not fit a {width}x{height} image"),
        }
    }
}

impl Error for ImageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<::image::ImageError> for ImageError {
    #[inline]
    fn from(value: ::image::ImageError) -> Self {
        Self::Decode(Arc::new(value))
    }
}

/// An owned RGBA8 image.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageRgba8 {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl std::fmt::Debug for ImageRgba8 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRgba8")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl ImageRgba8 {
    /// Create a fully transparent image.
    pub fn new_sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap an existing pixel buffer.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, ImageError> {
        if pixels.len() != width as usize * height as usize {
            return Err(ImageError::SizeMismatch { width, height, len: pixels.len() })
        }
        Ok(Self { width, height, pixels })
    }

    /// Decode a PNG file.
    ///
    /// PNG rows run top to bottom, so the decoded image is flipped to the bottom-up row order used
    /// by the rest of the engine.
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let decoded = ::image::load_from_memory_with_format(bytes, ImageFormat::Png)?
            .into_rgba8();
        let (width, height) = decoded.dimensions();
        let pixels = decoded.as_raw()
            .chunks_exact(4)
            .map(|rgba| u32::from_ne_bytes([rgba[0], rgba[1], rgba[2], rgba[3]]))
            .collect();
        let mut image = Self::from_pixels(width, height, pixels)?;
        image.flip_vertical();
        Ok(image)
    }

    #[inline]
    pub fn width(&self) -> u32 { self.width }

    #[inline]
    pub fn height(&self) -> u32 { self.height }

    #[inline]
    pub fn size(&self) -> glm::U32Vec2 { glm::vec2(self.width, self.height) }

    #[inline]
    pub fn pixels(&self) -> &[u32] { &self.pixels }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] { &mut self.pixels }

    /// Raw RGBA bytes, four per pixel.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    #[inline]
    pub fn pixel(&self, row: u32, col: u32) -> u32 {
        self.pixels[self.offset(row, col)]
    }

    #[inline]
    pub fn set_pixel(&mut self, row: u32, col: u32, value: u32) {
        let offset = self.offset(row, col);
        self.pixels[offset] = value;
    }

    #[inline]
    fn offset(&self, row: u32, col: u32) -> usize {
        debug_assert!(row < self.height && col < self.width, "pixel ({row}, {col}) out of bounds");
        row as usize * self.width as usize + col as usize
    }

    /// Reverse the order of the rows.
    pub fn flip_vertical(&mut self) {
        let width = self.width as usize;
        let height = self.height as usize;
        for row in 0..height / 2 {
            let (top, bottom) = self.pixels.split_at_mut((height - row - 1) * width);
            top[row * width..(row + 1) * width].swap_with_slice(&mut bottom[..width]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: u32, height: u32) -> ImageRgba8 {
        ImageRgba8::from_pixels(width, height, (0..width * height).collect()).unwrap()
    }

    #[test]
    fn test_new_sized_is_transparent() {
        let image = ImageRgba8::new_sized(3, 2);
        assert_eq!(image.pixels().len(), 6);
        assert!(image.pixels().iter().all(|&p| p == 0));
        assert_eq!(image.as_bytes().len(), 24);
    }

    #[test]
    fn test_size_mismatch() {
        assert_matches!(
            ImageRgba8::from_pixels(2, 2, vec![0; 3]),
            Err(ImageError::SizeMismatch { width: 2, height: 2, len: 3 })
        );
    }

    #[test]
    fn test_flip_vertical_odd() {
        let mut image = numbered(2, 3);
        image.flip_vertical();
        assert_eq!(image.pixels(), &[4, 5, 2, 3, 0, 1]);
    }

    #[test]
    fn test_flip_vertical_even() {
        let mut image = numbered(3, 2);
        image.flip_vertical();
        assert_eq!(image.pixels(), &[3, 4, 5, 0, 1, 2]);
        image.flip_vertical();
        assert_eq!(image, numbered(3, 2));
    }

    #[test]
    fn test_pixel_access() {
        let mut image = ImageRgba8::new_sized(4, 2);
        image.set_pixel(1, 3, 0xFFFFFFFF);
        assert_eq!(image.pixel(1, 3), 0xFFFFFFFF);
        assert_eq!(image.pixels()[7], 0xFFFFFFFF);
    }

    #[test]
    fn test_png_decode_flips() {
        // 1x2 PNG, red on top and blue on the bottom
        let mut source = ::image::RgbaImage::new(1, 2);
        source.put_pixel(0, 0, ::image::Rgba([255, 0, 0, 255]));
        source.put_pixel(0, 1, ::image::Rgba([0, 0, 255, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        source.write_to(&mut png, ImageFormat::Png).unwrap();

        let image = ImageRgba8::from_png_bytes(png.get_ref()).unwrap();
        assert_eq!(image.size(), glm::vec2(1, 2));
        assert_eq!(&image.as_bytes()[..4], &[0, 0, 255, 255]);
        assert_eq!(&image.as_bytes()[4..], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_png_decode_garbage() {
        assert_matches!(ImageRgba8::from_png_bytes(b"not a png"), Err(ImageError::Decode(_)));
    }
}
