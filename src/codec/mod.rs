//! Byte-text codecs: hex, URI percent-encoding, C escapes and base64
//!
//! Each codec is a set of stateless functions. Decoders that can repair their
//! input return an [`EncodingResult`] with `had_errors` set instead of failing;
//! only hex decoding, which cannot guess half a byte, returns an error.

use crate::EncodingResult;
use crate::utf::transcode;

mod base64;
mod c_escape;
mod hex;
mod uri;

pub use self::base64::{
    Base64Alphabet, Base64Config, decode_base64, encode_base64, encode_base64_with,
};
pub use self::c_escape::{
    decode_binary_c_escape, decode_binary_c_escape_nul_terminated, decode_c_escape,
    encode_binary_c_escape, encode_c_escape,
};
pub use self::hex::{decode_hex, encode_hex};
pub use self::uri::{
    decode_binary_uri_component, decode_binary_uri_component_nul_terminated, decode_uri_component,
    decode_www_form, encode_uri_component, encode_www_form,
};

/// Value of an ASCII digit in `radix`, if it is one
fn digit_value(byte: u8, radix: u32) -> Option<u32> {
    char::from(byte).to_digit(radix)
}

/// Interpret decoded bytes as text, folding invalid UTF-8 into the error flag
///
/// Invalid groups are replaced the same way [`sanitize_utf8`](crate::sanitize_utf8) does.
fn into_text(result: EncodingResult<Vec<u8>>) -> EncodingResult<String> {
    let EncodingResult { value, had_errors } = result;
    match String::from_utf8(value) {
        Ok(text) => EncodingResult::new(text, had_errors),
        Err(err) => {
            tracing::debug!(
                valid_up_to = err.utf8_error().valid_up_to(),
                "decoded bytes are not UTF-8"
            );
            let text = transcode::<u8, String>(err.as_bytes());
            EncodingResult::new(text.value, true)
        }
    }
}
