//! 2D view math: areas, transforms and projections.

use std::fmt::{Display, Formatter};

/// Near plane of the orthographic projection.
pub const ORTHO_NEAR: f32 = 100.0;
/// Far plane of the orthographic projection.
pub const ORTHO_FAR: f32 = -100.0;

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb2 {
    pub min: glm::Vec2,
    pub max: glm::Vec2,
}

impl Aabb2 {
    #[inline]
    pub fn new(min: glm::Vec2, max: glm::Vec2) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y, "inverted AABB {min:?} - {max:?}");
        Self { min, max }
    }

    /// Rectangle from the origin to `size`.
    #[inline]
    pub fn from_size(size: glm::Vec2) -> Self {
        Self::new(glm::Vec2::zeros(), size)
    }

    #[inline]
    pub fn center(&self) -> glm::Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn dimensions(&self) -> glm::Vec2 {
        self.max - self.min
    }

    /// Whether `other` lies entirely inside this rectangle, allowing `tolerance` of overhang.
    pub fn contains(&self, other: &Aabb2, tolerance: f32) -> bool {
        other.min.x >= self.min.x - tolerance
            && other.min.y >= self.min.y - tolerance
            && other.max.x <= self.max.x + tolerance
            && other.max.y <= self.max.y + tolerance
    }
}

impl Display for Aabb2 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})-({}, {})", self.min.x, self.min.y, self.max.x, self.max.y)
    }
}

/// Placement of a 2D object: scaled, then rotated, then translated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2 {
    pub translation: glm::Vec2,
    /// Counter-clockwise, in radians.
    pub rotation: f32,
    pub scale: glm::Vec2,
}

impl Default for Transform2 {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2 {
    #[inline]
    pub fn identity() -> Self {
        Self {
            translation: glm::Vec2::zeros(),
            rotation: 0.0,
            scale: glm::vec2(1.0, 1.0),
        }
    }

    #[inline]
    pub fn from_translation(translation: glm::Vec2) -> Self {
        Self { translation, ..Self::identity() }
    }

    #[inline]
    pub fn from_rotation(radians: f32) -> Self {
        Self { rotation: radians, ..Self::identity() }
    }

    #[inline]
    pub fn from_uniform_scale(scale: f32) -> Self {
        Self { scale: glm::vec2(scale, scale), ..Self::identity() }
    }

    /// Model matrix for this transform.
    pub fn to_matrix(&self) -> glm::Mat4 {
        matrix_from_transform(self)
    }
}

/// Model matrix applying `transform`'s scale, rotation, then translation.
pub fn matrix_from_transform(transform: &Transform2) -> glm::Mat4 {
    glm::translation(&glm::vec3(transform.translation.x, transform.translation.y, 0.0))
        * glm::rotation(transform.rotation, &glm::vec3(0.0, 0.0, 1.0))
        * glm::scaling(&glm::vec3(transform.scale.x, transform.scale.y, 1.0))
}

/// Orthographic projection showing `area` across the whole viewport.
pub fn camera_projection(area: &Aabb2) -> glm::Mat4 {
    let center = area.center();
    let scale = glm::scaling(&glm::vec3(
        2.0 / area.width(),
        2.0 / area.height(),
        2.0 / (ORTHO_FAR - ORTHO_NEAR),
    ));
    let translate = glm::translation(&glm::vec3(
        -center.x,
        -center.y,
        -(ORTHO_FAR + ORTHO_NEAR) / 2.0,
    ));
    scale * translate
}

/// Orthographic projection mapping `(0, 0)`-`(width, height)` onto the viewport.
#[inline]
pub fn ortho(width: f32, height: f32) -> glm::Mat4 {
    camera_projection(&Aabb2::from_size(glm::vec2(width, height)))
}

/// Model matrix placing a unit quad at `position` with the given `size`.
pub fn quad_model_view(position: glm::Vec2, size: glm::Vec2) -> glm::Mat4 {
    glm::translation(&glm::vec3(position.x, position.y, 0.0))
        * glm::scaling(&glm::vec3(size.x, size.y, 1.0))
}
