//! Hexadecimal encoding

use crate::Result;

/// Encode bytes as lowercase hex, two digits per byte.
pub fn encode_hex(bytes: impl AsRef<[u8]>) -> String {
    ::hex::encode(bytes)
}

/// Decode hex text (either case).
///
/// Fails on an odd number of digits or on any non-hex character; there is no
/// sensible byte to substitute for half of a pair.
pub fn decode_hex(text: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    Ok(::hex::decode(text)?)
}
