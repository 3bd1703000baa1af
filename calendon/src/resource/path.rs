//! Paths identifying assets.

use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};
use std::ops::{Add, AddAssign};
use std::path::PathBuf;

/// Relative, `/`-separated path to an asset.
///
/// Paths are normalized when created: leading, trailing and repeated separators are dropped, as
/// are `.` and `..` components, so a path can never climb out of the root an
/// [AssetSource](super::AssetSource) serves from.
///
/// # Examples
/// ```
/// use calendon::resource::path::AssetPath;
///
/// let path = AssetPath::from("/shaders//./../sprite.vert");
/// assert_eq!(path.as_str(), "shaders/sprite.vert");
/// assert_eq!(path.name(), "sprite.vert");
/// assert_eq!(path.extension(), Some("vert"));
/// ```
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetPath {
    inner: String,
}

impl AssetPath {
    /// The character separating path components.
    pub const SEPARATOR: char = '/';

    /// Create an empty path.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(input: impl AsRef<str>) -> Self {
        let inner = input.as_ref()
            .split([Self::SEPARATOR, '\\'])
            .filter(|c| !matches!(*c, "" | "." | ".."))
            .join(&Self::SEPARATOR.to_string());
        Self { inner }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over the individual components.
    pub fn components(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.inner.split(Self::SEPARATOR).filter(|c| !c.is_empty())
    }

    /// Append further components.
    pub fn push(&mut self, other: impl Into<AssetPath>) {
        let other = other.into();
        if other.is_empty() {
            return
        }
        if !self.inner.is_empty() {
            self.inner.push(Self::SEPARATOR);
        }
        self.inner.push_str(&other.inner);
    }

    /// Yield a new path with further components appended.
    ///
    /// ```
    /// use calendon::resource::path::AssetPath;
    ///
    /// let base = AssetPath::from("fonts");
    /// assert_eq!(base.join("terminus/ter-u16n.psfu").as_str(), "fonts/terminus/ter-u16n.psfu");
    /// ```
    pub fn join(&self, other: impl Into<AssetPath>) -> AssetPath {
        let mut joined = self.clone();
        joined.push(other);
        joined
    }

    /// Path of the parent components, or an empty path if there are none.
    pub fn parent(&self) -> AssetPath {
        match self.inner.rfind(Self::SEPARATOR) {
            Some(idx) => Self { inner: self.inner[..idx].to_owned() },
            None => Self::new(),
        }
    }

    /// Final component.
    #[inline]
    pub fn name(&self) -> &str {
        self.components().next_back().unwrap_or("")
    }

    /// Text after the last `.` in the final component, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Convert to a relative [PathBuf] for filesystem access.
    pub fn to_path_buf(&self) -> PathBuf {
        self.components().collect()
    }
}

impl<I: Into<AssetPath>> Add<I> for AssetPath {
    type Output = AssetPath;

    #[inline]
    fn add(mut self, rhs: I) -> Self::Output {
        self.push(rhs);
        self
    }
}

impl<I: Into<AssetPath>> AddAssign<I> for AssetPath {
    #[inline]
    fn add_assign(&mut self, rhs: I) {
        self.push(rhs);
    }
}

impl AsRef<str> for AssetPath {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl Debug for AssetPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AssetPath").field(&self.inner).finish()
    }
}

impl Display for AssetPath {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl From<&AssetPath> for AssetPath {
    #[inline]
    fn from(value: &AssetPath) -> Self { value.clone() }
}

impl From<&str> for AssetPath {
    #[inline]
    fn from(value: &str) -> Self { Self::normalize(value) }
}

impl From<String> for AssetPath {
    #[inline]
    fn from(value: String) -> Self { Self::normalize(value) }
}

impl From<&String> for AssetPath {
    #[inline]
    fn from(value: &String) -> Self { Self::normalize(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::plain("a/b", "a/b")]
    #[case::slashes("//a///b/", "a/b")]
    #[case::dots("./a/../b/.", "a/b")]
    #[case::backslash("a\\b", "a/b")]
    #[case::empty("", "")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(AssetPath::from(input).as_str(), expected);
    }

    #[test]
    fn test_components() {
        let path = AssetPath::from("a/b/c");
        assert_eq!(path.components().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(path.components().rev().collect::<Vec<_>>(), vec!["c", "b", "a"]);
        assert_eq!(AssetPath::new().components().count(), 0);
    }

    #[test]
    fn test_push_and_add() {
        let mut path = AssetPath::new();
        path.push("shaders");
        assert_eq!(path.as_str(), "shaders");
        path += "sprite.frag";
        assert_eq!(path.as_str(), "shaders/sprite.frag");
        assert_eq!((path + "").as_str(), "shaders/sprite.frag");
    }

    #[test]
    fn test_parent_and_name() {
        let path = AssetPath::from("base/value");
        assert_eq!(path.parent(), AssetPath::from("base"));
        assert_eq!(path.parent().parent(), AssetPath::new());
        assert_eq!(path.name(), "value");
        assert_eq!(AssetPath::new().name(), "");
    }

    #[rstest]
    #[case::simple("a/b.png", Some("png"))]
    #[case::double("a/b.tar.gz", Some("gz"))]
    #[case::hidden("a/.hidden", None)]
    #[case::none("a/b", None)]
    fn test_extension(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(AssetPath::from(path).extension(), expected);
    }

    #[test]
    fn test_to_path_buf() {
        let path = AssetPath::from("a/b/c.txt");
        assert_eq!(path.to_path_buf(), PathBuf::from("a").join("b").join("c.txt"));
    }
}
