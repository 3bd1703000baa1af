#[cfg(test)] #[macro_use]
extern crate assert_matches;
extern crate nalgebra_glm as glm;

pub mod app;
pub mod atlas;
pub mod font;
pub mod image;
pub mod log;
pub mod render;
pub mod resource;
pub mod utf8;
pub mod util;

/// A helper type for non-exhaustive structs.
///
/// This allows structures to be created via a constructor function or by update syntax in
/// combination with `Default::default()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NonExhaustive(pub(crate) ());
