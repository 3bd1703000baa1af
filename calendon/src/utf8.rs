//! In-place UTF-8 inspection.
//!
//! Code points are never decoded into `char`s here. Instead, each function looks at raw UTF-8
//! bytes where they sit in a buffer, which is what the font and text systems need: glyph lookups
//! compare byte runs, and the text renderer walks strings one code point at a time.
//!
//! The end of a slice acts as the string terminator.
//!
//! Bytes handed over by other engine code are expected to be well-formed. Misuse, such as asking
//! for the length of a code point starting at a continuation byte, trips a debug assertion.
//! Untrusted data should be checked with [is_string_valid()] first, which never asserts.

use std::iter::FusedIterator;

/// Most bytes a single UTF-8 encoded code point can occupy.
pub const MAX_BYTES_PER_CODE_POINT: usize = 4;

/// Classification of a single byte with respect to UTF-8 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteValidity {
    /// The byte can never appear in well-formed UTF-8.
    Illegal,

    /// The byte can appear in well-formed UTF-8.
    Valid,

    /// The byte can start an overlong or out-of-range sequence, and the bytes that follow it
    /// decide whether the sequence is well-formed.
    Possible,
}

/// Classify a byte.
///
/// `0xC0`, `0xC1` and `0xF5..=0xFF` are [Illegal](ByteValidity::Illegal). `0xE0`, `0xED`, `0xF0`
/// and `0xF4` are [Possible](ByteValidity::Possible). Everything else is
/// [Valid](ByteValidity::Valid).
#[inline]
pub fn is_valid_byte(byte: u8) -> ByteValidity {
    match byte {
        0xC0 | 0xC1 | 0xF5..=0xFF => ByteValidity::Illegal,
        0xE0 | 0xED | 0xF0 | 0xF4 => ByteValidity::Possible,
        _ => ByteValidity::Valid,
    }
}

#[inline]
fn is_illegal(byte: u8) -> bool {
    is_valid_byte(byte) == ByteValidity::Illegal
}

/// Whether a byte has the `10xxxxxx` continuation pattern.
#[inline]
pub fn is_continuation_byte(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Whether a byte starts a code point.
///
/// True for ASCII and for the 2, 3 and 4 byte lead patterns.
#[inline]
pub fn is_leading_byte(byte: u8) -> bool {
    debug_assert!(!is_illegal(byte), "illegal UTF-8 byte: {byte:#04x}");
    byte & 0x80 == 0
        || byte & 0xE0 == 0xC0
        || byte & 0xF0 == 0xE0
        || byte & 0xF8 == 0xF0
}

/// Number of bytes in the code point that starts with `leading`.
///
/// Always one of 1, 2, 3 or 4. `leading` must be a leading byte.
#[inline]
pub fn num_bytes_in_code_point(leading: u8) -> usize {
    debug_assert!(!is_illegal(leading), "illegal UTF-8 byte: {leading:#04x}");
    debug_assert!(!is_continuation_byte(leading), "continuation byte used as a leading byte: {leading:#04x}");
    match leading & 0xF0 {
        0xF0 => 4,
        0xE0 => 3,
        0xC0 | 0xD0 => 2,
        _ => 1,
    }
}

/// Advance past the code point at the start of `s`.
///
/// `s` must start at a leading byte. Advancing past a truncated code point yields an empty slice.
#[inline]
pub fn string_next(s: &[u8]) -> &[u8] {
    match s.first() {
        Some(&leading) => {
            let len = num_bytes_in_code_point(leading);
            s.get(len..).unwrap_or(&[])
        },
        None => s,
    }
}

/// Number of code points in `s`.
///
/// The final code point must not be truncated.
pub fn string_length(s: &[u8]) -> usize {
    let mut offset = 0;
    let mut length = 0;
    while offset < s.len() {
        offset += num_bytes_in_code_point(s[offset]);
        length += 1;
    }
    debug_assert_eq!(offset, s.len(), "UTF-8 string ends in the middle of a code point");
    length
}

/// Check whether `s` is made of complete, properly led code points.
///
/// Unlike the other functions in this module, this never asserts; it is the entry point for bytes
/// that came from outside the engine.
pub fn is_string_valid(s: &[u8]) -> bool {
    if s.iter().any(|&b| is_illegal(b)) {
        return false;
    }

    let mut offset = 0;
    while offset < s.len() {
        let leading = s[offset];
        if !is_leading_byte(leading) {
            return false;
        }
        let len = num_bytes_in_code_point(leading);
        let Some(code_point) = s.get(offset..offset + len) else {
            return false;
        };
        if code_point[1..].iter().any(|&b| !is_continuation_byte(b)) {
            return false;
        }
        offset += len;
    }
    true
}

/// Whether the first code points of `a` and `b` are identical.
///
/// Both must have the same byte length and the same bytes.
pub fn code_points_match(a: &[u8], b: &[u8]) -> bool {
    match (a.first(), b.first()) {
        (Some(&lead_a), Some(&lead_b)) => {
            let len_a = num_bytes_in_code_point(lead_a);
            let len_b = num_bytes_in_code_point(lead_b);
            len_a == len_b && a.get(..len_a) == b.get(..len_b)
        },
        (None, None) => true,
        _ => false,
    }
}

/// Copy the first code point of `src` to the start of `dest`, returning the number of bytes
/// copied.
///
/// A code point truncated by the end of `src` is copied as far as it goes.
pub fn code_point_copy(dest: &mut [u8], src: &[u8]) -> usize {
    let Some(&leading) = src.first() else {
        return 0;
    };
    let len = num_bytes_in_code_point(leading);
    debug_assert!(src.len() >= len, "truncated code point: {src:02x?}");
    debug_assert!(dest.len() >= len, "no room for a {len} byte code point");
    let len = len.min(src.len()).min(dest.len());
    dest[..len].copy_from_slice(&src[..len]);
    len
}

/// Whether two strings have the same code points.
pub fn string_equal(a: &[u8], b: &[u8]) -> bool {
    string_length(a) == string_length(b) && a == b
}

/// Iterate over the code points of `s`, yielding each one's bytes.
#[inline]
pub fn code_points(s: &[u8]) -> CodePoints<'_> {
    CodePoints { remaining: s }
}

/// Iterator over the code points in a byte slice.
///
/// Created by [code_points()]. A truncated final code point is yielded as whatever bytes remain.
#[derive(Debug, Clone)]
pub struct CodePoints<'a> {
    remaining: &'a [u8],
}

impl<'a> CodePoints<'a> {
    /// Bytes not yet yielded.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.remaining
    }
}

impl<'a> Iterator for CodePoints<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let &leading = self.remaining.first()?;
        let len = num_bytes_in_code_point(leading).min(self.remaining.len());
        let (code_point, rest) = self.remaining.split_at(len);
        self.remaining = rest;
        Some(code_point)
    }
}

impl FusedIterator for CodePoints<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    const CAFE: &str = "«café, caffè» ™ © Â ←";

    #[rstest]
    #[case::ascii(b'a', 1)]
    #[case::two(0xC2, 2)]
    #[case::three(0xE2, 3)]
    #[case::four(0xF0, 4)]
    #[case::nul(0x00, 1)]
    fn test_num_bytes_in_code_point(#[case] byte: u8, #[case] expected: usize) {
        assert_eq!(num_bytes_in_code_point(byte), expected);
    }

    #[rstest]
    #[case::overlong_lead(0xC0)]
    #[case::illegal_fe(0xFE)]
    #[case::illegal_ff(0xFF)]
    #[case::continuation(0x84)]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn test_num_bytes_in_code_point_rejects(#[case] byte: u8) {
        num_bytes_in_code_point(byte);
    }

    #[test]
    fn test_is_valid_byte() {
        for byte in [0xC0, 0xC1, 0xF5, 0xF8, 0xFD, 0xFE, 0xFF] {
            assert_eq!(is_valid_byte(byte), ByteValidity::Illegal, "{byte:#04x}");
        }
        for byte in [0xE0, 0xED, 0xF0, 0xF4] {
            assert_eq!(is_valid_byte(byte), ByteValidity::Possible, "{byte:#04x}");
        }
        for byte in [0x00, b'a', 0x7F, 0x80, 0xBF, 0xC2, 0xDF, 0xE1, 0xEF, 0xF1] {
            assert_eq!(is_valid_byte(byte), ByteValidity::Valid, "{byte:#04x}");
        }
    }

    #[test]
    fn test_is_leading_byte() {
        assert!(is_leading_byte(b'\0'));
        assert!(is_leading_byte(b'a'));
        assert!(is_leading_byte(0xC2));
        assert!(is_leading_byte(0xEF));
        assert!(is_leading_byte(0xF0));
        for byte in 0x80..=0xBF {
            assert!(!is_leading_byte(byte), "{byte:#04x}");
        }
    }

    #[rstest]
    #[case::overlong_lead(0xC0)]
    #[case::out_of_range(0xF5)]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn test_is_leading_byte_rejects_illegal(#[case] byte: u8) {
        is_leading_byte(byte);
    }

    #[test]
    fn test_code_points_match() {
        assert!(code_points_match(b"a", b"a"));
        assert!(!code_points_match(b"a", b"b"));
        assert!(code_points_match("™x".as_bytes(), "™y".as_bytes()));
        assert!(!code_points_match(b"\xEF\xBF\xBE", b"\xEF\xBF"));
        assert!(!code_points_match("©".as_bytes(), "™".as_bytes()));
    }

    #[rstest]
    #[case::empty("", 0)]
    #[case::ascii("test", 4)]
    #[case::mixed(CAFE, 21)]
    fn test_string_length(#[case] s: &str, #[case] expected: usize) {
        assert_eq!(string_length(s.as_bytes()), expected);
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn test_string_length_truncated() {
        string_length(b"\xEF");
    }

    #[test]
    fn test_string_next_walks_to_end() {
        let bytes = CAFE.as_bytes();
        let mut cursor = bytes;
        for _ in 0..string_length(bytes) {
            cursor = string_next(cursor);
        }
        assert!(cursor.is_empty());
    }

    #[rstest]
    #[case::empty(b"", true)]
    #[case::mixed(CAFE.as_bytes(), true)]
    #[case::truncated(b"\xEF\xEF", false)]
    #[case::leading_continuation(b"\xBF\xBE", false)]
    #[case::illegal(b"a\xFFb", false)]
    #[case::lead_inside_sequence(b"\xE2\xE2\x80", false)]
    fn test_is_string_valid(#[case] s: &[u8], #[case] expected: bool) {
        assert_eq!(is_string_valid(s), expected);
    }

    #[test]
    fn test_string_equal() {
        assert!(string_equal(CAFE.as_bytes(), CAFE.as_bytes()));
        assert!(!string_equal(b"test", b"tesT"));
        assert!(!string_equal(b"test", b"tests"));
    }

    #[test]
    fn test_code_point_copy() {
        let mut dest = [0u8; MAX_BYTES_PER_CODE_POINT];
        assert_eq!(code_point_copy(&mut dest, "™!".as_bytes()), 3);
        assert_eq!(&dest[..3], "™".as_bytes());
        assert_eq!(dest[3], 0);
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn test_code_point_copy_truncated() {
        let mut dest = [0u8; MAX_BYTES_PER_CODE_POINT];
        code_point_copy(&mut dest, b"\xE2\x84");
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_code_point_copy_truncated() {
        let mut dest = [0u8; MAX_BYTES_PER_CODE_POINT];
        assert_eq!(code_point_copy(&mut dest, b"\xE2\x84"), 2);
        assert_eq!(dest, [0xE2, 0x84, 0, 0]);

        let mut short = [0u8; 1];
        assert_eq!(code_point_copy(&mut short, "™".as_bytes()), 1);
        assert_eq!(short, [0xE2]);
    }

    #[test]
    fn test_code_points_iter() {
        let collected: Vec<&[u8]> = code_points("a©™".as_bytes()).collect();
        assert_eq!(collected, vec![b"a".as_slice(), "©".as_bytes(), "™".as_bytes()]);
        assert_eq!(code_points(CAFE.as_bytes()).count(), 21);
    }
}
