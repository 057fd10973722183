//! URI percent-encoding
//!
//! Unreserved characters are `A-Z a-z 0-9 - _ . ~`; every other byte is
//! written as `%XX` with uppercase hex digits. Decoding accepts either case.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode, percent_encode};

use super::{digit_value, into_text};
use crate::EncodingResult;

/// Everything except the RFC 3986 unreserved characters
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn is_escape(digits: Option<&[u8]>) -> bool {
    let is_hex = |byte: u8| digit_value(byte, 16).is_some();
    matches!(digits, Some(&[high, low]) if is_hex(high) && is_hex(low))
}

/// Count `%` signs not followed by two hex digits.
fn malformed_escapes(bytes: &[u8]) -> usize {
    (0..bytes.len())
        .filter(|&i| bytes[i] == b'%' && !is_escape(bytes.get(i + 1..i + 3)))
        .count()
}

fn unescape(bytes: &[u8]) -> EncodingResult<Vec<u8>> {
    let malformed = malformed_escapes(bytes);
    if malformed > 0 {
        tracing::debug!(malformed, "kept malformed percent escapes literally");
    }
    EncodingResult::new(percent_decode(bytes).collect(), malformed > 0)
}

/// Percent-encode a URI component (a path segment, query key or value).
pub fn encode_uri_component(bytes: impl AsRef<[u8]>) -> String {
    percent_encode(bytes.as_ref(), URI_COMPONENT).to_string()
}

/// Decode `%XX` escapes into raw bytes.
///
/// A `%` not followed by two hex digits is kept as-is and flags an error.
pub fn decode_binary_uri_component(text: &str) -> EncodingResult<Vec<u8>> {
    unescape(text.as_bytes())
}

/// Like [`decode_binary_uri_component`], with a NUL byte appended to the output.
pub fn decode_binary_uri_component_nul_terminated(text: &str) -> EncodingResult<Vec<u8>> {
    decode_binary_uri_component(text).nul_terminated()
}

/// Decode `%XX` escapes into text. Decoded bytes that are not UTF-8 are replaced and flagged.
pub fn decode_uri_component(text: &str) -> EncodingResult<String> {
    into_text(decode_binary_uri_component(text))
}

/// Encode for `application/x-www-form-urlencoded`: like a URI component, but space becomes `+`.
pub fn encode_www_form(bytes: impl AsRef<[u8]>) -> String {
    bytes
        .as_ref()
        .split(|&byte| byte == b' ')
        .map(|part| percent_encode(part, URI_COMPONENT).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Decode `application/x-www-form-urlencoded` text, turning `+` back into space.
pub fn decode_www_form(text: &str) -> EncodingResult<String> {
    // Literal '+' only; an escaped %2B still decodes to '+'.
    let spaced: Vec<u8> = text
        .bytes()
        .map(|byte| if byte == b'+' { b' ' } else { byte })
        .collect();
    into_text(unescape(&spaced))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(encode_uri_component("foo"), "foo");
        assert_eq!(encode_uri_component("foo bar"), "foo%20bar");
        assert_eq!(encode_uri_component(b"\xab\xba"), "%AB%BA");
        assert_eq!(encode_uri_component("foo\0bar"), "foo%00bar");
        assert_eq!(encode_uri_component("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(encode_uri_component("a/b?c=d&e"), "a%2Fb%3Fc%3Dd%26e");
        assert_eq!(encode_uri_component("é"), "%C3%A9");
    }

    #[test]
    fn test_decode_uri_component() {
        let decoded = decode_uri_component("foo%20bar");
        assert!(!decoded.had_errors);
        assert_eq!(decoded.value, "foo bar");

        let decoded = decode_binary_uri_component("%ab%BA");
        assert!(!decoded.had_errors);
        assert_eq!(decoded.value, [0xAB, 0xBA]);

        assert_eq!(decode_uri_component("%C3%A9t%C3%A9").value, "été");
        // '+' is only special in form encoding
        assert_eq!(decode_uri_component("a+b").value, "a+b");
    }

    #[test]
    fn test_binary_round_trip() {
        let bytes: [u8; 3] = [12, 34, 56];
        let decoded = decode_binary_uri_component(&encode_uri_component(bytes));
        assert_eq!(decoded.value, bytes);
    }

    #[test]
    fn test_malformed_escapes_kept_literally() {
        let decoded = decode_uri_component("100%");
        assert!(decoded.had_errors);
        assert_eq!(decoded.value, "100%");

        let decoded = decode_uri_component("%4");
        assert!(decoded.had_errors);
        assert_eq!(decoded.value, "%4");

        let decoded = decode_uri_component("%zz%41");
        assert!(decoded.had_errors);
        assert_eq!(decoded.value, "%zzA");
    }

    #[test]
    fn test_decoded_bytes_not_utf8() {
        let decoded = decode_uri_component("a%FFb");
        assert!(decoded.had_errors);
        assert_eq!(decoded.value, "a\u{FFFD}b");
    }

    #[test]
    fn test_malformed_escape_count() {
        assert_eq!(malformed_escapes(b"%41%4g%"), 2);
        assert_eq!(malformed_escapes(b"%%41"), 1);
        assert_eq!(malformed_escapes(b"plain"), 0);
    }

    #[test]
    fn test_decode_nul_terminated() {
        let decoded = decode_binary_uri_component_nul_terminated("a%20b");
        assert!(!decoded.had_errors);
        assert_eq!(decoded.value, b"a b\0");

        let decoded = decode_binary_uri_component_nul_terminated("100%");
        assert!(decoded.had_errors);
        assert_eq!(decoded.value, b"100%\0");
    }

    #[test]
    fn test_www_form_edges() {
        assert_eq!(encode_www_form(" "), "+");
        assert_eq!(encode_www_form(""), "");
        assert_eq!(encode_www_form("a  b"), "a++b");
        assert_eq!(decode_www_form("%2B+%2b").value, "+ +");
    }

    #[test]
    fn test_www_form() {
        assert_eq!(encode_www_form("a b&c=d"), "a+b%26c%3Dd");
        assert_eq!(encode_www_form("1+1"), "1%2B1");

        let decoded = decode_www_form("a+b%26c%3Dd%2B");
        assert!(!decoded.had_errors);
        assert_eq!(decoded.value, "a b&c=d+");
    }
}
