use std::fmt::{Debug, Display, Formatter};

use crate::utf8::{self, MAX_BYTES_PER_CODE_POINT};

/// Most code points a single [Grapheme] can hold.
pub const GRAPHEME_MAX_CODE_POINTS: usize = 3;

const GRAPHEME_BUFFER_LEN: usize = GRAPHEME_MAX_CODE_POINTS * MAX_BYTES_PER_CODE_POINT + 1;

/// A short run of code points that renders as one glyph.
///
/// Graphemes are small value types; they own a fixed buffer big enough for
/// [GRAPHEME_MAX_CODE_POINTS] UTF-8 code points, and any unused bytes of that buffer are zero.
/// Two graphemes are equal when they hold exactly the same code points.
///
/// A grapheme is built either in one go with [Grapheme::from_code_points()], or incrementally
/// starting from [Grapheme::new()] and calling [Grapheme::add_code_point()].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grapheme {
    code_points: [u8; GRAPHEME_BUFFER_LEN],
    code_point_length: usize,
    byte_length: usize,
}

impl Default for Grapheme {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Grapheme {
    /// Create an empty grapheme.
    #[inline]
    pub fn new() -> Self {
        Self {
            code_points: [0; GRAPHEME_BUFFER_LEN],
            code_point_length: 0,
            byte_length: 0,
        }
    }

    /// Create a grapheme from the first `num_code_points` code points of `src`.
    ///
    /// `num_code_points` must not exceed [GRAPHEME_MAX_CODE_POINTS], and `src` must hold at least
    /// that many code points.
    pub fn from_code_points(src: &[u8], num_code_points: usize) -> Self {
        debug_assert!(
            num_code_points <= GRAPHEME_MAX_CODE_POINTS,
            "too many code points for a grapheme: {num_code_points}",
        );
        let mut grapheme = Self::new();
        let mut added = 0;
        for code_point in utf8::code_points(src).take(num_code_points) {
            if !grapheme.add_code_point(code_point) {
                break;
            }
            added += 1;
        }
        debug_assert_eq!(added, num_code_points, "not enough code points in source");
        grapheme
    }

    /// Append the first code point of `code_point` to this grapheme.
    ///
    /// Returns false, leaving the grapheme untouched, if it is already full.
    pub fn add_code_point(&mut self, code_point: &[u8]) -> bool {
        if self.code_point_length >= GRAPHEME_MAX_CODE_POINTS || code_point.is_empty() {
            return false;
        }
        let copied = utf8::code_point_copy(&mut self.code_points[self.byte_length..], code_point);
        self.byte_length += copied;
        self.code_point_length += 1;
        true
    }

    /// Whether this grapheme holds exactly the first `num_code_points` code points of `src`.
    ///
    /// Runs with a different number of code points, or whose code points differ in length, never
    /// compare equal.
    pub fn equals_code_points(&self, src: &[u8], num_code_points: usize) -> bool {
        if num_code_points != self.code_point_length {
            return false;
        }
        let mut offset = 0;
        let mut iter = utf8::code_points(src);
        for _ in 0..num_code_points {
            let Some(code_point) = iter.next() else {
                return false;
            };
            let end = offset + code_point.len();
            if self.code_points.get(offset..end) != Some(code_point) {
                return false;
            }
            offset = end;
        }
        offset == self.byte_length
    }

    /// The UTF-8 bytes of this grapheme.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.code_points[..self.byte_length]
    }

    #[inline]
    pub fn code_point_length(&self) -> usize { self.code_point_length }

    #[inline]
    pub fn byte_length(&self) -> usize { self.byte_length }

    #[inline]
    pub fn is_empty(&self) -> bool { self.code_point_length == 0 }
}

impl Debug for Grapheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Grapheme")
            .field(&String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

impl Display for Grapheme {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[test]
    fn test_single_code_point() {
        let grapheme = Grapheme::from_code_points(b"a", 1);
        assert_eq!(grapheme.byte_length(), 1);
        assert_eq!(grapheme.code_point_length(), 1);
        assert_eq!(grapheme.as_bytes(), b"a");
    }

    #[test]
    fn test_multi_byte_code_points() {
        let grapheme = Grapheme::from_code_points(b"\xe2\x80\xa2\xe2\x88\x99", 2);
        assert_eq!(grapheme.byte_length(), 6);
        assert_eq!(grapheme.code_point_length(), 2);
    }

    #[test]
    fn test_incremental_matches_set() {
        let mut grapheme = Grapheme::new();
        assert!(grapheme.is_empty());
        assert!(grapheme.add_code_point(b"a"));
        assert!(grapheme.add_code_point(b"b"));
        assert!(grapheme.add_code_point(b"c"));
        assert_eq!(grapheme, Grapheme::from_code_points(b"abc", 3));
    }

    #[test]
    fn test_add_when_full() {
        let mut grapheme = Grapheme::from_code_points("a™©".as_bytes(), 3);
        assert!(!grapheme.add_code_point(b"d"));
        assert_eq!(grapheme.as_bytes(), "a™©".as_bytes());
    }

    #[test]
    fn test_only_takes_requested_code_points() {
        let grapheme = Grapheme::from_code_points(b"abc", 2);
        assert_eq!(grapheme.as_bytes(), b"ab");
        assert_ne!(grapheme, Grapheme::from_code_points(b"abc", 3));
    }

    #[rstest]
    #[case::same("a™", 2, true)]
    #[case::longer_source("a™z", 2, true)]
    #[case::fewer_code_points("a™", 1, false)]
    #[case::more_code_points("a™z", 3, false)]
    #[case::different_byte("a©", 2, false)]
    #[case::different_first("b™", 2, false)]
    fn test_equals_code_points(
        #[case] src: &str,
        #[case] num_code_points: usize,
        #[case] expected: bool,
    ) {
        let grapheme = Grapheme::from_code_points("a™".as_bytes(), 2);
        assert_eq!(grapheme.equals_code_points(src.as_bytes(), num_code_points), expected);
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn test_too_many_code_points() {
        Grapheme::from_code_points(b"abcd", 4);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_truncated_tail() {
        let grapheme = Grapheme::from_code_points(b"a\xE2\x84", 2);
        assert_eq!(grapheme.as_bytes(), b"a\xE2\x84");
        assert_eq!(grapheme.code_point_length(), 2);
    }
}
