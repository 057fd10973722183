//! Unicode transcoding between UTF-8, UTF-16 and UTF-32.
//!
//! Every conversion runs through [`transcode`]: the source is walked one scalar
//! value at a time and each value is handed to a [`ScalarSink`], which
//! re-encodes it in the target form. Malformed input never aborts a
//! conversion. Each rejected group of units becomes exactly one U+FFFD and the
//! result's `had_errors` flag is raised; the `try_*` wrappers turn that flag
//! into `None`.

use crate::EncodingResult;

/// The Unicode replacement character substituted for malformed input
pub const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

mod sealed {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// A fixed-width encoding unit: a UTF-8 byte, a UTF-16 half-word or a UTF-32 word
pub trait CodeUnit: Copy + sealed::Sealed {
    /// Name of the encoding form these units belong to
    const FORM: &'static str;

    /// Decode the scalar value starting at `units[*pos]`.
    ///
    /// `pos` advances past every unit consumed, always at least one. Returns
    /// `None` when those units do not form a valid scalar value.
    ///
    /// # Panics
    ///
    /// Panics if `*pos` is out of bounds.
    fn decode_next(units: &[Self], pos: &mut usize) -> Option<char>;

    /// Append the encoding of `c`.
    fn encode_char(c: char, out: &mut Vec<Self>);
}

#[inline]
const fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Fold `count` continuation bytes into `value`, stopping at the first byte that isn't one.
fn continuation(bytes: &[u8], pos: &mut usize, mut value: u32, count: usize) -> Option<u32> {
    for _ in 0..count {
        let &byte = bytes.get(*pos).filter(|&&b| is_continuation(b))?;
        value = (value << 6) | u32::from(byte & 0x3F);
        *pos += 1;
    }
    Some(value)
}

impl CodeUnit for u8 {
    const FORM: &'static str = "UTF-8";

    fn decode_next(bytes: &[u8], pos: &mut usize) -> Option<char> {
        let lead = bytes[*pos];
        *pos += 1;

        // Lengths and minimum values per lead byte; anything below the minimum is overlong.
        let decoded = match lead {
            0x00..=0x7F => return Some(char::from(lead)),
            0x80..=0xBF => None,
            0xC0..=0xDF => {
                continuation(bytes, pos, u32::from(lead & 0x1F), 1).filter(|&v| v >= 0x80)
            }
            0xE0..=0xEF => {
                continuation(bytes, pos, u32::from(lead & 0x0F), 2).filter(|&v| v >= 0x800)
            }
            0xF0..=0xF7 => {
                continuation(bytes, pos, u32::from(lead & 0x07), 3).filter(|&v| v >= 0x1_0000)
            }
            // 5- and 6-byte forms were withdrawn from Unicode.
            0xF8..=0xFF => None,
        }
        // Surrogates and values past U+10FFFF are not scalar values.
        .and_then(char::from_u32);

        if decoded.is_none() {
            // The rest of a broken group belongs to the same malformed unit.
            while *pos < bytes.len() && is_continuation(bytes[*pos]) {
                *pos += 1;
            }
        }
        decoded
    }

    fn encode_char(c: char, out: &mut Vec<u8>) {
        out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
    }
}

impl CodeUnit for u16 {
    const FORM: &'static str = "UTF-16";

    fn decode_next(units: &[u16], pos: &mut usize) -> Option<char> {
        let unit = units[*pos];
        *pos += 1;

        match unit {
            0xD800..=0xDBFF => {
                // A follower that isn't a low surrogate stays unconsumed for the next scalar.
                let low = units
                    .get(*pos)
                    .copied()
                    .filter(|low| (0xDC00..=0xDFFF).contains(low))?;
                *pos += 1;
                let high = u32::from(unit - 0xD800);
                char::from_u32(0x1_0000 + (high << 10) + u32::from(low - 0xDC00))
            }
            0xDC00..=0xDFFF => None,
            _ => char::from_u32(u32::from(unit)),
        }
    }

    fn encode_char(c: char, out: &mut Vec<u16>) {
        out.extend_from_slice(c.encode_utf16(&mut [0; 2]));
    }
}

impl CodeUnit for u32 {
    const FORM: &'static str = "UTF-32";

    fn decode_next(units: &[u32], pos: &mut usize) -> Option<char> {
        // Units are never combined, so even a well-ordered surrogate pair is two errors.
        let unit = units[*pos];
        *pos += 1;
        char::from_u32(unit)
    }

    fn encode_char(c: char, out: &mut Vec<u32>) {
        out.push(u32::from(c));
    }
}

/// A span of source units that did not decode to a scalar value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Malformed {
    /// Unit offset of the first rejected unit
    pub offset: usize,
    /// Number of units folded into this rejection
    pub len: usize,
}

/// Iterator over the scalar values of a unit sequence.
pub(crate) struct Scalars<'a, S> {
    units: &'a [S],
    pos: usize,
}

impl<'a, S: CodeUnit> Scalars<'a, S> {
    pub(crate) fn new(units: &'a [S]) -> Self {
        Self { units, pos: 0 }
    }
}

impl<S: CodeUnit> Iterator for Scalars<'_, S> {
    type Item = std::result::Result<char, Malformed>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.units.len() {
            return None;
        }
        let offset = self.pos;
        Some(S::decode_next(self.units, &mut self.pos).ok_or(Malformed {
            offset,
            len: self.pos - offset,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.units.len() - self.pos;
        (remaining.div_ceil(4), Some(remaining))
    }
}

/// Unit offset of the first malformed group, if any.
pub(crate) fn first_malformed<S: CodeUnit>(units: &[S]) -> Option<usize> {
    Scalars::new(units).find_map(|scalar| scalar.err().map(|m| m.offset))
}

/// Destination for decoded scalar values
pub trait ScalarSink {
    /// Reserve room for about `units` more source units' worth of output.
    fn reserve_units(&mut self, units: usize);

    /// Append one scalar value.
    fn push_scalar(&mut self, c: char);
}

impl ScalarSink for String {
    fn reserve_units(&mut self, units: usize) {
        self.reserve(units);
    }

    fn push_scalar(&mut self, c: char) {
        self.push(c);
    }
}

impl ScalarSink for Vec<char> {
    fn reserve_units(&mut self, units: usize) {
        self.reserve(units);
    }

    fn push_scalar(&mut self, c: char) {
        self.push(c);
    }
}

macro_rules! unit_vec_sink {
    ($($unit:ty),*) => {$(
        impl ScalarSink for Vec<$unit> {
            fn reserve_units(&mut self, units: usize) {
                self.reserve(units);
            }

            fn push_scalar(&mut self, c: char) {
                <$unit as CodeUnit>::encode_char(c, self);
            }
        }
    )*};
}

unit_vec_sink!(u8, u16, u32);

/// Transcode `input` into `out`, returning whether any input was replaced.
pub fn transcode_into<S, O>(input: &[S], out: &mut O) -> bool
where
    S: CodeUnit,
    O: ScalarSink + ?Sized,
{
    out.reserve_units(input.len());

    let mut replaced = 0usize;
    for scalar in Scalars::new(input) {
        match scalar {
            Ok(c) => out.push_scalar(c),
            Err(_) => {
                replaced += 1;
                out.push_scalar(REPLACEMENT);
            }
        }
    }

    if replaced > 0 {
        tracing::debug!(
            form = S::FORM,
            units = input.len(),
            replaced,
            "replaced malformed input with U+FFFD"
        );
    }
    replaced > 0
}

/// Transcode a unit sequence into any sink, e.g. `transcode::<u16, String>(&units)`.
pub fn transcode<S, O>(input: &[S]) -> EncodingResult<O>
where
    S: CodeUnit,
    O: ScalarSink + Default,
{
    let mut out = O::default();
    let had_errors = transcode_into(input, &mut out);
    EncodingResult::new(out, had_errors)
}

/// Convert UTF-8 text to UTF-16, replacing malformed sequences with U+FFFD.
///
/// The output is in native endianness. No NUL terminator is added.
pub fn encode_utf16(text: impl AsRef<[u8]>) -> EncodingResult<Vec<u16>> {
    transcode(text.as_ref())
}

/// Convert UTF-8 text to UTF-32, replacing malformed sequences with U+FFFD.
pub fn encode_utf32(text: impl AsRef<[u8]>) -> EncodingResult<Vec<u32>> {
    transcode(text.as_ref())
}

/// Like [`encode_utf16`], with a trailing NUL unit for wide-string APIs.
pub fn encode_utf16_nul_terminated(text: impl AsRef<[u8]>) -> EncodingResult<Vec<u16>> {
    encode_utf16(text).nul_terminated()
}

/// Like [`encode_utf32`], with a trailing NUL unit.
pub fn encode_utf32_nul_terminated(text: impl AsRef<[u8]>) -> EncodingResult<Vec<u32>> {
    encode_utf32(text).nul_terminated()
}

/// Convert UTF-16 to UTF-8. Unpaired surrogates become U+FFFD; NULs are preserved.
pub fn decode_utf16(utf16: &[u16]) -> EncodingResult<String> {
    transcode(utf16)
}

/// Convert UTF-32 to UTF-8. Surrogates and values past U+10FFFF become U+FFFD.
pub fn decode_utf32(utf32: &[u32]) -> EncodingResult<String> {
    transcode(utf32)
}

/// Like [`encode_utf16`], but `None` if the input is not valid UTF-8.
pub fn try_encode_utf16(text: impl AsRef<[u8]>) -> Option<Vec<u16>> {
    encode_utf16(text).into_strict()
}

/// Like [`encode_utf32`], but `None` if the input is not valid UTF-8.
pub fn try_encode_utf32(text: impl AsRef<[u8]>) -> Option<Vec<u32>> {
    encode_utf32(text).into_strict()
}

/// Like [`encode_utf16_nul_terminated`], but `None` if the input is not valid UTF-8.
pub fn try_encode_utf16_nul_terminated(text: impl AsRef<[u8]>) -> Option<Vec<u16>> {
    encode_utf16_nul_terminated(text).into_strict()
}

/// Like [`encode_utf32_nul_terminated`], but `None` if the input is not valid UTF-8.
pub fn try_encode_utf32_nul_terminated(text: impl AsRef<[u8]>) -> Option<Vec<u32>> {
    encode_utf32_nul_terminated(text).into_strict()
}

/// Like [`decode_utf16`], but `None` if the input is not valid UTF-16.
pub fn try_decode_utf16(utf16: &[u16]) -> Option<String> {
    decode_utf16(utf16).into_strict()
}

/// Like [`decode_utf32`], but `None` if the input is not valid UTF-32.
pub fn try_decode_utf32(utf32: &[u32]) -> Option<String> {
    decode_utf32(utf32).into_strict()
}

/// Turn arbitrary bytes into a `String`, with the same replacement rules as [`encode_utf16`].
pub fn sanitize_utf8(bytes: impl AsRef<[u8]>) -> EncodingResult<String> {
    transcode(bytes.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    fn utf32(s: &str) -> Vec<u32> {
        s.chars().map(u32::from).collect()
    }

    fn expect_utf16(input: &[u8], expected: &str, errors: bool) {
        let result = encode_utf16(input);
        assert_eq!(result.had_errors, errors, "error flag for {:02x?}", input);
        assert_eq!(result.value, utf16(expected), "output for {:02x?}", input);
    }

    fn expect_utf32(input: &[u8], expected: &str, errors: bool) {
        let result = encode_utf32(input);
        assert_eq!(result.had_errors, errors, "error flag for {:02x?}", input);
        assert_eq!(result.value, utf32(expected), "output for {:02x?}", input);
    }

    const SAMPLES: [&str; 4] = ["foo", "Здравствуйте", "中国网络", "😺☁☄🐵"];

    #[test]
    fn test_encode_utf16() {
        for sample in SAMPLES {
            expect_utf16(sample.as_bytes(), sample, false);
        }
    }

    #[test]
    fn test_encode_utf32() {
        for sample in SAMPLES {
            expect_utf32(sample.as_bytes(), sample, false);
        }
    }

    #[test]
    fn test_disembodied_continuation_bytes() {
        for expect in [expect_utf16, expect_utf32] {
            expect(b"\x80", "\u{FFFD}", true);
            expect(b"f\xbfo", "f\u{FFFD}o", true);
            expect(b"f\xbf\x80\xb0o", "f\u{FFFD}o", true);
        }
    }

    #[test]
    fn test_missing_continuation_bytes() {
        for expect in [expect_utf16, expect_utf32] {
            expect(b"\xc2x", "\u{FFFD}x", true);
            expect(b"\xe0x", "\u{FFFD}x", true);
            expect(b"\xe0\xa0x", "\u{FFFD}x", true);
            expect(b"\xf0x", "\u{FFFD}x", true);
            expect(b"\xf0\x90x", "\u{FFFD}x", true);
            expect(b"\xf0\x90\x80x", "\u{FFFD}x", true);
            // Truncated at end of input.
            expect(b"ab\xe2\x82", "ab\u{FFFD}", true);
        }
    }

    #[test]
    fn test_truncated_sequence_followed_by_lead_byte() {
        // The interrupting lead byte starts its own, valid, sequence.
        expect_utf16(b"\xe2\x82\xc2\x80", "\u{FFFD}\u{80}", true);
        expect_utf16(b"\xf0\x9f\x98\xe2\x82\xac", "\u{FFFD}€", true);
    }

    #[test]
    fn test_overlong_sequences() {
        for expect in [expect_utf16, expect_utf32] {
            expect(b"\xc0\x80", "\u{FFFD}", true);
            expect(b"\xc1\xbf", "\u{FFFD}", true);
            expect(b"\xc2\x80", "\u{0080}", false);
            expect(b"\xdf\xbf", "\u{07FF}", false);

            expect(b"\xe0\x80\x80", "\u{FFFD}", true);
            expect(b"\xe0\x9f\xbf", "\u{FFFD}", true);
            expect(b"\xe0\xa0\x80", "\u{0800}", false);
            expect(b"\xef\xbf\xbf", "\u{FFFF}", false);

            expect(b"\xf0\x80\x80\x80", "\u{FFFD}", true);
            expect(b"\xf0\x8f\xbf\xbf", "\u{FFFD}", true);
            expect(b"\xf0\x90\x80\x80", "\u{10000}", false);
            expect(b"\xf4\x8f\xbf\xbf", "\u{10FFFF}", false);
        }
    }

    #[test]
    fn test_out_of_unicode_range() {
        for expect in [expect_utf16, expect_utf32] {
            expect(b"\xf5\x80\x80\x80", "\u{FFFD}", true);
            expect(b"\xf4\x90\x80\x80", "\u{FFFD}", true);
            expect(b"\xf8\xbf\x80\x80\x80", "\u{FFFD}", true);
            expect(b"\xfc\xbf\x80\x80\x80\x80", "\u{FFFD}", true);
            expect(b"\xfe\xbf\x80\x80\x80\x80\x80", "\u{FFFD}", true);
            expect(b"\xff\xbf\x80\x80\x80\x80\x80\x80", "\u{FFFD}", true);
        }
    }

    #[test]
    fn test_encoded_surrogates_rejected() {
        // CESU-8 style surrogate halves are not valid UTF-8.
        expect_utf16(b"\xed\xa0\x80", "\u{FFFD}", true);
        expect_utf16(b"\xed\xa0\xbd\xed\xb8\xba", "\u{FFFD}\u{FFFD}", true);
        expect_utf16(b"\xed\x9f\xbf", "\u{D7FF}", false);
    }

    #[test]
    fn test_decode_utf16() {
        for sample in SAMPLES {
            let result = decode_utf16(&utf16(sample));
            assert!(!result.had_errors);
            assert_eq!(result.value, sample);
        }
    }

    #[test]
    fn test_invalid_utf16() {
        // Surrogates in wrong order.
        let result = decode_utf16(&[0xD7FF, 0xDC00, 0xDFFF, 0xE000]);
        assert!(result.had_errors);
        assert_eq!(result.value, "\u{D7FF}\u{FFFD}\u{FFFD}\u{E000}");

        // Missing second surrogate.
        let result = decode_utf16(&[0x66, 0xD800]);
        assert!(result.had_errors);
        assert_eq!(result.value, "f\u{FFFD}");

        let result = decode_utf16(&[0x66, 0xD800, 0x78]);
        assert!(result.had_errors);
        assert_eq!(result.value, "f\u{FFFD}x");

        let result = decode_utf16(&[0x66, 0xD800, 0xD800, 0x78]);
        assert!(result.had_errors);
        assert_eq!(result.value, "f\u{FFFD}\u{FFFD}x");
    }

    #[test]
    fn test_high_surrogate_followed_by_valid_pair() {
        // The second high surrogate is re-examined and pairs with the low one.
        let result = decode_utf16(&[0xD800, 0xD83D, 0xDE3A]);
        assert!(result.had_errors);
        assert_eq!(result.value, "\u{FFFD}😺");
    }

    #[test]
    fn test_pair_followed_by_lone_low_surrogate() {
        let result = decode_utf16(&[0xD83D, 0xDE3A, 0xDE3A]);
        assert!(result.had_errors);
        assert_eq!(result.value, "😺\u{FFFD}");
    }

    #[test]
    fn test_decode_utf32() {
        for sample in SAMPLES {
            let result = decode_utf32(&utf32(sample));
            assert!(!result.had_errors);
            assert_eq!(result.value, sample);
        }
    }

    #[test]
    fn test_invalid_utf32() {
        // Surrogates rejected.
        let result = decode_utf32(&[0xD7FF, 0xDC00, 0xDFFF, 0xE000]);
        assert!(result.had_errors);
        assert_eq!(result.value, "\u{D7FF}\u{FFFD}\u{FFFD}\u{E000}");

        // Even if it would be a valid surrogate pair in UTF-16.
        let result = decode_utf32(&[0xD7FF, 0xD800, 0xDFFF, 0xE000]);
        assert!(result.had_errors);
        assert_eq!(result.value, "\u{D7FF}\u{FFFD}\u{FFFD}\u{E000}");

        let result = decode_utf32(&[0x41, 0x11_0000, u32::MAX]);
        assert!(result.had_errors);
        assert_eq!(result.value, "A\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_try_encode_decode() {
        assert_eq!(try_encode_utf16(b"\x80"), None);
        assert_eq!(try_encode_utf16("foo"), Some(utf16("foo")));

        assert_eq!(try_encode_utf32(b"\x80"), None);
        assert_eq!(try_encode_utf32("foo"), Some(utf32("foo")));

        assert_eq!(try_decode_utf16(&[0xD800]), None);
        assert_eq!(try_decode_utf16(&utf16("foo")).as_deref(), Some("foo"));
        assert_eq!(try_decode_utf32(&[0xD800]), None);
        assert_eq!(try_decode_utf32(&utf32("foo")).as_deref(), Some("foo"));
    }

    #[test]
    fn test_nul_terminated_encoding() {
        let result = encode_utf16_nul_terminated("hi😺");
        assert!(!result.had_errors);
        assert_eq!(result.value, [0x68, 0x69, 0xD83D, 0xDE3A, 0]);

        let result = encode_utf32_nul_terminated(b"a\x80");
        assert!(result.had_errors);
        assert_eq!(result.value, [0x61, 0xFFFD, 0]);

        assert_eq!(encode_utf16_nul_terminated(b"").value, [0]);
    }

    #[test]
    fn test_try_nul_terminated_encoding() {
        assert_eq!(try_encode_utf16_nul_terminated("foo"), Some(vec![0x66, 0x6F, 0x6F, 0]));
        assert_eq!(try_encode_utf32_nul_terminated("é"), Some(vec![0xE9, 0]));
        assert_eq!(try_encode_utf16_nul_terminated(b"f\xbfo"), None);
        assert_eq!(try_encode_utf32_nul_terminated(b"\xc0\x80"), None);
    }

    #[test]
    fn test_nul_preserved() {
        let result = decode_utf16(&[0x61, 0x00, 0x62]);
        assert!(!result.had_errors);
        assert_eq!(result.value, "a\0b");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(encode_utf16(b""), EncodingResult::new(Vec::new(), false));
        assert_eq!(decode_utf32(&[]), EncodingResult::new(String::new(), false));
    }

    #[test]
    fn test_generic_transcode_between_wide_forms() {
        let result: EncodingResult<Vec<u32>> = transcode(&utf16("a😺")[..]);
        assert!(!result.had_errors);
        assert_eq!(result.value, [0x61, 0x1F63A]);

        let result: EncodingResult<Vec<u16>> = transcode(&[0x1F63Au32, 0xD800][..]);
        assert!(result.had_errors);
        assert_eq!(result.value, [0xD83D, 0xDE3A, 0xFFFD]);
    }

    #[test]
    fn test_sanitize_utf8() {
        let result = sanitize_utf8(b"ok\xe2\x82\xacok\xc0");
        assert!(result.had_errors);
        assert_eq!(result.value, "ok€ok\u{FFFD}");
    }

    #[test]
    fn test_malformed_spans() {
        let spans: Vec<_> = Scalars::new(&b"a\xbf\x80b\xe0\xa0"[..])
            .filter_map(|s| s.err())
            .collect();
        assert_eq!(
            spans,
            [
                Malformed { offset: 1, len: 2 },
                Malformed { offset: 4, len: 2 },
            ]
        );
        assert_eq!(first_malformed(&b"abc\xff"[..]), Some(3));
        assert_eq!(first_malformed(&[0x61u16, 0x62]), None);
    }
}
