//! 8-bit colors.

/// Opaque color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Normalized color with full alpha.
    #[inline]
    pub fn to_vec4(self) -> glm::Vec4 {
        Rgba8::from(self).to_vec4()
    }
}

/// Color with alpha.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn to_vec4(self) -> glm::Vec4 {
        glm::vec4(self.r as f32, self.g as f32, self.b as f32, self.a as f32) / 255.0
    }
}

impl From<Rgb8> for Rgba8 {
    #[inline]
    fn from(value: Rgb8) -> Self {
        Self::new(value.r, value.g, value.b, 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(Rgb8::WHITE.to_vec4(), glm::vec4(1.0, 1.0, 1.0, 1.0));
        assert_eq!(Rgba8::TRANSPARENT.to_vec4(), glm::Vec4::zeros());
        assert_eq!(Rgb8::new(255, 0, 0).to_vec4(), glm::vec4(1.0, 0.0, 0.0, 1.0));
    }
}
