//! Shader naming contract.
//!
//! Shaders used with the renderer must name their vertex inputs and uniforms after a fixed set of
//! semantics. When a program is linked, every active attribute and uniform is looked up here; a
//! name that is not part of the contract is an error.

use strum::{EnumCount, EnumIter};

/// Slot a vertex attribute is fed from in a [VertexFormat](super::vertex_format::VertexFormat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum AttributeSemantic {
    Position,
    TexCoord2,
}

/// Shader attribute names and the semantic each one binds to.
///
/// All position variants share the [Position](AttributeSemantic::Position) slot; the component
/// count comes from the vertex format in use.
pub const ATTRIBUTE_NAMES: &[(&str, AttributeSemantic)] = &[
    ("Position", AttributeSemantic::Position),
    ("Position2", AttributeSemantic::Position),
    ("Position3", AttributeSemantic::Position),
    ("Position4", AttributeSemantic::Position),
    ("TexCoord2", AttributeSemantic::TexCoord2),
];

impl AttributeSemantic {
    /// Position of this semantic in per-semantic tables.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolve a shader attribute name.
    pub fn from_shader_name(name: &str) -> Option<Self> {
        ATTRIBUTE_NAMES.iter()
            .find(|(n, _)| *n == name)
            .map(|(_, semantic)| *semantic)
    }
}

/// Slot in [UniformStorage](super::uniform::UniformStorage) a uniform reads its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum UniformSlot {
    Projection,
    ModelView,
    Texture,
    PolygonColor,
}

/// Shader uniform names and the storage slot each one reads.
///
/// `ViewModel` is an alias of `ModelView`, and `Texture2D0` of `Texture`.
pub const UNIFORM_NAMES: &[(&str, UniformSlot)] = &[
    ("Projection", UniformSlot::Projection),
    ("ModelView", UniformSlot::ModelView),
    ("ViewModel", UniformSlot::ModelView),
    ("Texture", UniformSlot::Texture),
    ("Texture2D0", UniformSlot::Texture),
    ("PolygonColor", UniformSlot::PolygonColor),
];

impl UniformSlot {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolve a shader uniform name.
    pub fn from_shader_name(name: &str) -> Option<Self> {
        UNIFORM_NAMES.iter()
            .find(|(n, _)| *n == name)
            .map(|(_, slot)| *slot)
    }

    /// The only kind of uniform that may be bound to this slot.
    pub fn kind(self) -> UniformKind {
        match self {
            Self::Projection | Self::ModelView => UniformKind::Mat4,
            Self::Texture => UniformKind::Sampler2D,
            Self::PolygonColor => UniformKind::Vec4,
        }
    }
}

/// GL uniform types the renderer knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum UniformKind {
    Vec4,
    Mat4,
    Sampler2D,
}

impl UniformKind {
    pub fn from_gl_type(gl_type: u32) -> Option<Self> {
        match gl_type {
            glow::FLOAT_VEC4 => Some(Self::Vec4),
            glow::FLOAT_MAT4 => Some(Self::Mat4),
            glow::SAMPLER_2D => Some(Self::Sampler2D),
            _ => None,
        }
    }

    #[inline]
    pub fn gl_type(self) -> u32 {
        match self {
            Self::Vec4 => glow::FLOAT_VEC4,
            Self::Mat4 => glow::FLOAT_MAT4,
            Self::Sampler2D => glow::SAMPLER_2D,
        }
    }
}

/// Human readable name of a GL data type, for diagnostics.
pub fn gl_type_name(gl_type: u32) -> &'static str {
    match gl_type {
        glow::FLOAT => "FLOAT",
        glow::FLOAT_VEC2 => "FLOAT_VEC2",
        glow::FLOAT_VEC3 => "FLOAT_VEC3",
        glow::FLOAT_VEC4 => "FLOAT_VEC4",
        glow::DOUBLE => "DOUBLE",
        glow::INT => "INT",
        glow::INT_VEC2 => "INT_VEC2",
        glow::INT_VEC3 => "INT_VEC3",
        glow::INT_VEC4 => "INT_VEC4",
        glow::UNSIGNED_INT => "UNSIGNED_INT",
        glow::UNSIGNED_INT_VEC2 => "UNSIGNED_INT_VEC2",
        glow::UNSIGNED_INT_VEC3 => "UNSIGNED_INT_VEC3",
        glow::UNSIGNED_INT_VEC4 => "UNSIGNED_INT_VEC4",
        glow::BOOL => "BOOL",
        glow::BOOL_VEC2 => "BOOL_VEC2",
        glow::BOOL_VEC3 => "BOOL_VEC3",
        glow::BOOL_VEC4 => "BOOL_VEC4",
        glow::FLOAT_MAT2 => "FLOAT_MAT2",
        glow::FLOAT_MAT3 => "FLOAT_MAT3",
        glow::FLOAT_MAT4 => "FLOAT_MAT4",
        glow::FLOAT_MAT2x3 => "FLOAT_MAT2x3",
        glow::FLOAT_MAT2x4 => "FLOAT_MAT2x4",
        glow::FLOAT_MAT3x2 => "FLOAT_MAT3x2",
        glow::FLOAT_MAT3x4 => "FLOAT_MAT3x4",
        glow::FLOAT_MAT4x2 => "FLOAT_MAT4x2",
        glow::FLOAT_MAT4x3 => "FLOAT_MAT4x3",
        glow::SAMPLER_1D => "SAMPLER_1D",
        glow::SAMPLER_2D => "SAMPLER_2D",
        glow::SAMPLER_3D => "SAMPLER_3D",
        glow::SAMPLER_CUBE => "SAMPLER_CUBE",
        glow::SAMPLER_2D_ARRAY => "SAMPLER_2D_ARRAY",
        glow::SAMPLER_2D_SHADOW => "SAMPLER_2D_SHADOW",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_attribute_semantic_is_named() {
        for semantic in AttributeSemantic::iter() {
            assert!(
                ATTRIBUTE_NAMES.iter().any(|(_, s)| *s == semantic),
                "{semantic:?} has no shader name",
            );
        }
        assert_eq!(AttributeSemantic::COUNT, 2);
    }

    #[test]
    fn test_every_uniform_slot_is_named() {
        for slot in UniformSlot::iter() {
            assert!(
                UNIFORM_NAMES.iter().any(|(_, s)| *s == slot),
                "{slot:?} has no shader name",
            );
        }
    }

    #[test]
    fn test_indices_are_dense() {
        for (idx, semantic) in AttributeSemantic::iter().enumerate() {
            assert_eq!(semantic.index(), idx);
        }
        for (idx, slot) in UniformSlot::iter().enumerate() {
            assert_eq!(slot.index(), idx);
        }
    }

    #[rstest]
    #[case::position("Position", Some(AttributeSemantic::Position))]
    #[case::position2("Position2", Some(AttributeSemantic::Position))]
    #[case::position4("Position4", Some(AttributeSemantic::Position))]
    #[case::tex_coord("TexCoord2", Some(AttributeSemantic::TexCoord2))]
    #[case::wrong_case("position2", None)]
    #[case::unknown("Normal", None)]
    fn test_attribute_lookup(#[case] name: &str, #[case] expected: Option<AttributeSemantic>) {
        assert_eq!(AttributeSemantic::from_shader_name(name), expected);
    }

    #[rstest]
    #[case::projection("Projection", Some(UniformSlot::Projection))]
    #[case::model_view("ModelView", Some(UniformSlot::ModelView))]
    #[case::view_model("ViewModel", Some(UniformSlot::ModelView))]
    #[case::texture("Texture", Some(UniformSlot::Texture))]
    #[case::texture_2d0("Texture2D0", Some(UniformSlot::Texture))]
    #[case::color("PolygonColor", Some(UniformSlot::PolygonColor))]
    #[case::unknown("Time", None)]
    fn test_uniform_lookup(#[case] name: &str, #[case] expected: Option<UniformSlot>) {
        assert_eq!(UniformSlot::from_shader_name(name), expected);
    }

    #[test]
    fn test_every_uniform_kind_has_a_slot() {
        for kind in UniformKind::iter() {
            assert!(UniformSlot::iter().any(|slot| slot.kind() == kind), "{kind:?} has no slot");
        }
    }

    #[test]
    fn test_uniform_kind_gl_types() {
        for kind in UniformKind::iter() {
            assert_eq!(UniformKind::from_gl_type(kind.gl_type()), Some(kind));
        }
        assert_eq!(UniformKind::from_gl_type(glow::FLOAT_VEC2), None);
        assert_eq!(UniformKind::from_gl_type(glow::FLOAT_VEC3), None);
        assert_eq!(gl_type_name(glow::FLOAT_MAT4), "FLOAT_MAT4");
        assert_eq!(gl_type_name(0xDEAD), "UNKNOWN");
    }
}
