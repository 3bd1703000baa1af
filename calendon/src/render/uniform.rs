//! Uniform values shared by all programs.
//!
//! Draw calls write the values they need into [UniformStorage] before enabling a program; the
//! program then applies every uniform it declares from the matching slot.

use strum::EnumCount;

use crate::render::semantic::{UniformKind, UniformSlot};

/// A value held in a uniform slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Vec4(glm::Vec4),
    Mat4(glm::Mat4),
    /// Texture unit index.
    Sampler(i32),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Vec4(_) => UniformKind::Vec4,
            Self::Mat4(_) => UniformKind::Mat4,
            Self::Sampler(_) => UniformKind::Sampler2D,
        }
    }

    fn default_for(slot: UniformSlot) -> Self {
        match slot.kind() {
            UniformKind::Vec4 => Self::Vec4(glm::vec4(1.0, 1.0, 1.0, 1.0)),
            UniformKind::Mat4 => Self::Mat4(glm::Mat4::identity()),
            UniformKind::Sampler2D => Self::Sampler(0),
        }
    }
}

/// One value per [UniformSlot].
#[derive(Debug, Clone, PartialEq)]
pub struct UniformStorage {
    values: [UniformValue; UniformSlot::COUNT],
}

impl Default for UniformStorage {
    fn default() -> Self {
        Self {
            values: [
                UniformValue::default_for(UniformSlot::Projection),
                UniformValue::default_for(UniformSlot::ModelView),
                UniformValue::default_for(UniformSlot::Texture),
                UniformValue::default_for(UniformSlot::PolygonColor),
            ],
        }
    }
}

impl UniformStorage {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, slot: UniformSlot) -> &UniformValue {
        &self.values[slot.index()]
    }

    /// Store a value.
    ///
    /// Each slot only ever holds one kind of value; storing another kind is a programming error.
    pub fn set(&mut self, slot: UniformSlot, value: UniformValue) {
        debug_assert_eq!(slot.kind(), value.kind(), "wrong value kind for {slot:?}");
        self.values[slot.index()] = value;
    }

    #[inline]
    pub fn set_projection(&mut self, projection: glm::Mat4) {
        self.set(UniformSlot::Projection, UniformValue::Mat4(projection));
    }

    #[inline]
    pub fn set_model_view(&mut self, model_view: glm::Mat4) {
        self.set(UniformSlot::ModelView, UniformValue::Mat4(model_view));
    }

    #[inline]
    pub fn set_texture_unit(&mut self, unit: i32) {
        self.set(UniformSlot::Texture, UniformValue::Sampler(unit));
    }

    #[inline]
    pub fn set_polygon_color(&mut self, color: glm::Vec4) {
        self.set(UniformSlot::PolygonColor, UniformValue::Vec4(color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use strum::IntoEnumIterator;

    #[test]
    fn test_defaults_match_slot_kinds() {
        let storage = UniformStorage::new();
        for slot in UniformSlot::iter() {
            assert_eq!(storage.get(slot).kind(), slot.kind());
        }
        assert_eq!(storage.get(UniformSlot::Projection), &UniformValue::Mat4(glm::Mat4::identity()));
    }

    #[test]
    fn test_setters() {
        let mut storage = UniformStorage::new();
        let translate = glm::translation(&glm::vec3(1.0, 2.0, 0.0));
        storage.set_model_view(translate);
        storage.set_polygon_color(glm::vec4(0.5, 0.0, 0.0, 1.0));
        storage.set_texture_unit(2);
        assert_eq!(storage.get(UniformSlot::ModelView), &UniformValue::Mat4(translate));
        assert_eq!(
            storage.get(UniformSlot::PolygonColor),
            &UniformValue::Vec4(glm::vec4(0.5, 0.0, 0.0, 1.0)),
        );
        assert_eq!(storage.get(UniformSlot::Texture), &UniformValue::Sampler(2));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_wrong_kind() {
        let mut storage = UniformStorage::new();
        storage.set(UniformSlot::Projection, UniformValue::Sampler(0));
    }
}
