//! # utf-codec - Strict Unicode Transcoding and Byte-Text Codecs
//!
//! Lossless, strictly-validated conversions between UTF-8, UTF-16 and UTF-32,
//! plus the small byte-text codecs that usually travel with them: hex, URI
//! percent-encoding, C escape sequences and base64.
//!
//! ## Features
//!
//! - **One generic transcoder** for every pair of unit widths
//! - **Replacement, not failure**: malformed input becomes U+FFFD and raises a flag
//! - **Strict variants** (`try_*`) that refuse to return damaged output
//! - **Byte-order aware** conversion of raw UTF-16/UTF-32 buffers
//! - **Thread-safe** by construction: every operation is a pure function
//!
//! ## Quick Start
//!
//! ```rust
//! use utf_codec::{decode_utf16, encode_utf16, try_encode_utf16};
//!
//! let utf16 = encode_utf16("héllo");
//! assert!(!utf16.had_errors);
//! assert_eq!(decode_utf16(&utf16).value, "héllo");
//!
//! // A stray continuation byte is replaced, or rejected outright.
//! let damaged = encode_utf16(b"f\xbfo");
//! assert!(damaged.had_errors);
//! assert_eq!(damaged.value, [0x66, 0xFFFD, 0x6F]);
//! assert_eq!(try_encode_utf16(b"f\xbfo"), None);
//! ```

#![deny(missing_docs)]

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod codec;
pub mod detection;
mod multibyte;
mod utf;

pub use codec::{
    Base64Alphabet, Base64Config, decode_base64, decode_binary_c_escape,
    decode_binary_c_escape_nul_terminated, decode_binary_uri_component,
    decode_binary_uri_component_nul_terminated, decode_c_escape, decode_hex, decode_uri_component,
    decode_www_form, encode_base64, encode_base64_with, encode_binary_c_escape, encode_c_escape,
    encode_hex, encode_uri_component, encode_www_form,
};
pub use utf::{
    CodeUnit, REPLACEMENT, ScalarSink, decode_utf16, decode_utf32, encode_utf16,
    encode_utf16_nul_terminated, encode_utf32, encode_utf32_nul_terminated, sanitize_utf8,
    transcode, transcode_into, try_decode_utf16, try_decode_utf32, try_encode_utf16,
    try_encode_utf16_nul_terminated, try_encode_utf32, try_encode_utf32_nul_terminated,
};

/// Result type for fallible codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the operations that cannot substitute their way past bad input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Hex text had an odd number of digits
    OddLength,
    /// A character outside `[0-9A-Fa-f]` appeared in hex text
    InvalidHexDigit {
        /// The offending character
        character: char,
        /// Position of the character in the input
        position: usize,
    },
    /// Input was not well-formed in its declared encoding
    MalformedInput {
        /// Name of the source encoding
        encoding: &'static str,
        /// Byte offset of the first malformed unit
        position: usize,
    },
    /// An encoding name that does not denote a UTF form
    UnknownEncoding(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OddLength => write!(f, "Hex text has an odd number of digits"),
            Error::InvalidHexDigit {
                character,
                position,
            } => {
                write!(
                    f,
                    "Invalid hex digit {:?} at position {}",
                    character, position
                )
            }
            Error::MalformedInput { encoding, position } => {
                write!(f, "Malformed {} input at byte {}", encoding, position)
            }
            Error::UnknownEncoding(name) => write!(f, "Unknown encoding: {}", name),
        }
    }
}

impl std::error::Error for Error {}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        match err {
            hex::FromHexError::InvalidHexCharacter { c, index } => Error::InvalidHexDigit {
                character: c,
                position: index,
            },
            // InvalidStringLength only comes from slice decoding.
            hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                Error::OddLength
            }
        }
    }
}

/// Output of a lenient operation together with whether any input had to be substituted.
///
/// Dereferences to the output, so it can be used wherever the output itself is expected.
/// When `had_errors` is set, malformed input was replaced (U+FFFD for the UTF
/// transcoders) or skipped; many callers simply carry on with the repaired data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EncodingResult<T> {
    /// The converted output
    pub value: T,
    /// Whether malformed input was encountered
    pub had_errors: bool,
}

impl<T> EncodingResult<T> {
    /// Pair an output with its error flag
    pub fn new(value: T, had_errors: bool) -> Self {
        Self { value, had_errors }
    }

    /// Take the output, regardless of errors
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Take the output only if the input was entirely well-formed
    pub fn into_strict(self) -> Option<T> {
        if self.had_errors {
            tracing::trace!("discarding output produced from malformed input");
            None
        } else {
            Some(self.value)
        }
    }

    /// Transform the output, keeping the error flag
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> EncodingResult<U> {
        EncodingResult::new(f(self.value), self.had_errors)
    }
}

impl<U: Default> EncodingResult<Vec<U>> {
    /// Append a zero unit, for callers handing the output to NUL-terminated string APIs
    pub fn nul_terminated(mut self) -> Self {
        self.value.push(U::default());
        self
    }
}

impl<T> Deref for EncodingResult<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Unicode encoding forms with an explicit byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// UTF-8 (variable length, 1-4 bytes)
    #[serde(rename = "UTF-8")]
    UTF8,
    /// UTF-16, little endian
    #[serde(rename = "UTF-16LE")]
    UTF16LE,
    /// UTF-16, big endian
    #[serde(rename = "UTF-16BE")]
    UTF16BE,
    /// UTF-32, little endian
    #[serde(rename = "UTF-32LE")]
    UTF32LE,
    /// UTF-32, big endian
    #[serde(rename = "UTF-32BE")]
    UTF32BE,
}

impl Encoding {
    /// Every supported encoding form
    pub const ALL: [Encoding; 5] = [
        Encoding::UTF8,
        Encoding::UTF16LE,
        Encoding::UTF16BE,
        Encoding::UTF32LE,
        Encoding::UTF32BE,
    ];

    /// Get the canonical name of this encoding
    pub fn name(self) -> &'static str {
        match self {
            Encoding::UTF8 => "UTF-8",
            Encoding::UTF16LE => "UTF-16LE",
            Encoding::UTF16BE => "UTF-16BE",
            Encoding::UTF32LE => "UTF-32LE",
            Encoding::UTF32BE => "UTF-32BE",
        }
    }

    /// Size in bytes of one code unit
    pub fn unit_size(self) -> usize {
        match self {
            Encoding::UTF8 => 1,
            Encoding::UTF16LE | Encoding::UTF16BE => 2,
            Encoding::UTF32LE | Encoding::UTF32BE => 4,
        }
    }

    /// Get the byte order mark (BOM) for this encoding
    pub fn bom(self) -> &'static [u8] {
        match self {
            Encoding::UTF8 => &[0xEF, 0xBB, 0xBF],
            Encoding::UTF16LE => &[0xFF, 0xFE],
            Encoding::UTF16BE => &[0xFE, 0xFF],
            Encoding::UTF32LE => &[0xFF, 0xFE, 0x00, 0x00],
            Encoding::UTF32BE => &[0x00, 0x00, 0xFE, 0xFF],
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let encoding = match s.to_uppercase().as_str() {
            "UTF8" | "UTF-8" => Encoding::UTF8,
            "UTF16LE" | "UTF-16LE" | "UCS-2LE" => Encoding::UTF16LE,
            "UTF16BE" | "UTF-16BE" | "UCS-2BE" => Encoding::UTF16BE,
            "UTF32LE" | "UTF-32LE" | "UCS-4LE" => Encoding::UTF32LE,
            "UTF32BE" | "UTF-32BE" | "UCS-4BE" => Encoding::UTF32BE,
            _ => return Err(Error::UnknownEncoding(s.to_string())),
        };
        Ok(encoding)
    }
}

/// Converter between two byte-serialized UTF forms
///
/// Byte order marks are treated as ordinary U+FEFF characters; use
/// [`detection::detect_bom`] to find and strip one first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transcoder {
    from: Encoding,
    to: Encoding,
}

impl Transcoder {
    /// Create a new transcoder between two encodings
    pub fn new(from: Encoding, to: Encoding) -> Self {
        Self { from, to }
    }

    /// Get source encoding
    pub fn from_encoding(&self) -> Encoding {
        self.from
    }

    /// Get target encoding
    pub fn to_encoding(&self) -> Encoding {
        self.to
    }

    /// Convert data, replacing malformed units with U+FFFD
    ///
    /// A trailing partial code unit counts as one malformed unit.
    pub fn convert(&self, input: &[u8]) -> EncodingResult<Vec<u8>> {
        multibyte::convert(input, self.from, self.to)
    }

    /// Convert data, failing at the first malformed unit
    pub fn try_convert(&self, input: &[u8]) -> Result<Vec<u8>> {
        let result = self.convert(input);
        if !result.had_errors {
            return Ok(result.value);
        }
        Err(Error::MalformedInput {
            encoding: self.from.name(),
            position: multibyte::first_malformed(input, self.from).unwrap_or(0),
        })
    }
}
