//! C-style escape sequences
//!
//! Encoding uses the named escapes (`\n`, `\t`, ...) where C has one and a
//! three-digit octal escape for other control bytes. Octal rather than `\x`
//! keeps the escape from running into a following hex digit.

use super::{digit_value, into_text};
use crate::EncodingResult;
use crate::utf::REPLACEMENT;

fn push_escaped(out: &mut String, byte: u8) {
    match byte {
        0x07 => out.push_str("\\a"),
        0x08 => out.push_str("\\b"),
        0x0C => out.push_str("\\f"),
        b'\n' => out.push_str("\\n"),
        b'\r' => out.push_str("\\r"),
        b'\t' => out.push_str("\\t"),
        0x0B => out.push_str("\\v"),
        b'\'' => out.push_str("\\'"),
        b'"' => out.push_str("\\\""),
        b'\\' => out.push_str("\\\\"),
        0x20..=0x7E => out.push(char::from(byte)),
        _ => {
            out.push('\\');
            for shift in [6, 3, 0] {
                out.push(char::from(b'0' + ((byte >> shift) & 0x07)));
            }
        }
    }
}

/// Escape text for a C string literal. Non-ASCII characters pass through unchanged.
pub fn encode_c_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match u8::try_from(c) {
            Ok(byte) if byte.is_ascii() => push_escaped(&mut escaped, byte),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape arbitrary bytes for a C string literal. The output is pure ASCII:
/// bytes at or above 0x80 are written as octal escapes.
pub fn encode_binary_c_escape(bytes: impl AsRef<[u8]>) -> String {
    let bytes = bytes.as_ref();
    let mut escaped = String::with_capacity(bytes.len());
    for &byte in bytes {
        push_escaped(&mut escaped, byte);
    }
    escaped
}

/// Digits read for one numeric escape
struct Digits {
    value: u32,
    count: usize,
    exceeds_byte: bool,
}

/// Read up to `max` digits in `radix` starting at `bytes[*pos]`.
fn read_digits(bytes: &[u8], pos: &mut usize, radix: u32, max: usize) -> Digits {
    let mut digits = Digits {
        value: 0,
        count: 0,
        exceeds_byte: false,
    };
    while digits.count < max {
        let Some(d) = bytes.get(*pos).and_then(|&b| digit_value(b, radix)) else {
            break;
        };
        // Wrapping keeps the low byte exact however long a \x run is.
        digits.value = digits.value.wrapping_mul(radix).wrapping_add(d);
        digits.exceeds_byte |= digits.value > 0xFF;
        digits.count += 1;
        *pos += 1;
    }
    digits
}

/// Decode C escape sequences into raw bytes.
///
/// Recognized: `\a \b \f \n \r \t \v \' \" \\ \?`, octal `\NNN` (1-3 digits),
/// hex `\xNN`, `\uXXXX` and `\UXXXXXXXX`. Damaged escapes decode as far as
/// their digits allow and set `had_errors`:
///
/// - a trailing lone backslash is dropped;
/// - a hex or octal value above 0xFF keeps its low byte;
/// - a short `\u`/`\U` escape uses the digits present;
/// - a `\u`/`\U` value that is not a scalar value becomes U+FFFD;
/// - an unknown escape keeps the escaped character.
pub fn decode_binary_c_escape(text: &str) -> EncodingResult<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut malformed = 0usize;

    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        i += 1;
        if byte != b'\\' {
            decoded.push(byte);
            continue;
        }

        let Some(&kind) = bytes.get(i) else {
            malformed += 1;
            break;
        };
        i += 1;

        match kind {
            b'a' => decoded.push(0x07),
            b'b' => decoded.push(0x08),
            b'f' => decoded.push(0x0C),
            b'n' => decoded.push(b'\n'),
            b'r' => decoded.push(b'\r'),
            b't' => decoded.push(b'\t'),
            b'v' => decoded.push(0x0B),
            b'\'' | b'"' | b'\\' | b'?' => decoded.push(kind),
            b'x' => {
                let digits = read_digits(bytes, &mut i, 16, usize::MAX);
                if digits.count == 0 || digits.exceeds_byte {
                    malformed += 1;
                }
                if digits.count > 0 {
                    decoded.push(digits.value as u8);
                }
            }
            b'0'..=b'7' => {
                // The first digit is the escape kind itself.
                i -= 1;
                let digits = read_digits(bytes, &mut i, 8, 3);
                if digits.exceeds_byte {
                    malformed += 1;
                }
                decoded.push(digits.value as u8);
            }
            b'u' | b'U' => {
                let width = if kind == b'u' { 4 } else { 8 };
                let digits = read_digits(bytes, &mut i, 16, width);
                if digits.count < width {
                    malformed += 1;
                }
                if digits.count > 0 {
                    let c = char::from_u32(digits.value).unwrap_or_else(|| {
                        malformed += 1;
                        REPLACEMENT
                    });
                    decoded.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
                }
            }
            _ => {
                malformed += 1;
                decoded.push(kind);
            }
        }
    }

    if malformed > 0 {
        tracing::debug!(malformed, "decoded damaged C escape sequences");
    }
    EncodingResult::new(decoded, malformed > 0)
}

/// Like [`decode_binary_c_escape`], with a NUL byte appended to the output.
pub fn decode_binary_c_escape_nul_terminated(text: &str) -> EncodingResult<Vec<u8>> {
    decode_binary_c_escape(text).nul_terminated()
}

/// Decode C escape sequences into text.
///
/// Same rules as [`decode_binary_c_escape`]; if the decoded bytes are not
/// UTF-8 they are replaced with U+FFFD and `had_errors` is set.
pub fn decode_c_escape(text: &str) -> EncodingResult<String> {
    into_text(decode_binary_c_escape(text))
}
