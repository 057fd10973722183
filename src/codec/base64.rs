//! Base64 (RFC 4648) encoding with optional line wrapping

use std::num::NonZeroUsize;

use ::base64::Engine as _;
use ::base64::alphabet;
use ::base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};

use crate::EncodingResult;

/// Line width used by [`encode_base64`] when line breaking is requested (RFC 2045)
const MIME_LINE_WIDTH: usize = 76;

/// Accepts unpadded input and ignores stray low bits in the final symbol.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Base64 alphabet selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Base64Alphabet {
    /// `A-Z a-z 0-9 + /`
    #[default]
    Standard,
    /// `A-Z a-z 0-9 - _`, safe in URLs and file names
    UrlSafe,
}

/// Base64 encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Base64Config {
    /// Symbol alphabet
    pub alphabet: Base64Alphabet,
    /// Whether to pad the output with `=` to a multiple of four symbols
    pub padding: bool,
    /// Break lines after this many symbols and end the output with a newline
    pub line_width: Option<NonZeroUsize>,
}

impl Default for Base64Config {
    fn default() -> Self {
        Self {
            alphabet: Base64Alphabet::Standard,
            padding: true,
            line_width: None,
        }
    }
}

impl Base64Config {
    /// Standard alphabet, padded, wrapped at 76 symbols
    pub fn mime() -> Self {
        Self::default().with_line_width(NonZeroUsize::new(MIME_LINE_WIDTH))
    }

    /// Set the alphabet
    pub fn with_alphabet(mut self, alphabet: Base64Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    /// Enable or disable `=` padding
    pub fn with_padding(mut self, padding: bool) -> Self {
        self.padding = padding;
        self
    }

    /// Set the line width; `None` disables wrapping
    pub fn with_line_width(mut self, line_width: Option<NonZeroUsize>) -> Self {
        self.line_width = line_width;
        self
    }

    fn engine(&self) -> GeneralPurpose {
        let symbols = match self.alphabet {
            Base64Alphabet::Standard => &alphabet::STANDARD,
            Base64Alphabet::UrlSafe => &alphabet::URL_SAFE,
        };
        GeneralPurpose::new(
            symbols,
            GeneralPurposeConfig::new().with_encode_padding(self.padding),
        )
    }
}

/// Encode bytes as standard, padded base64.
///
/// With `break_lines`, a newline is inserted every 76 characters and after the
/// last line.
pub fn encode_base64(bytes: impl AsRef<[u8]>, break_lines: bool) -> String {
    let config = if break_lines {
        Base64Config::mime()
    } else {
        Base64Config::default()
    };
    encode_base64_with(bytes, &config)
}

/// Encode bytes as base64 using the given settings.
pub fn encode_base64_with(bytes: impl AsRef<[u8]>, config: &Base64Config) -> String {
    let encoded = config.engine().encode(bytes);
    let Some(width) = config.line_width else {
        return encoded;
    };

    let width = width.get();
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / width + 1);
    for (i, symbol) in encoded.chars().enumerate() {
        if i > 0 && i % width == 0 {
            wrapped.push('\n');
        }
        wrapped.push(symbol);
    }
    if !encoded.is_empty() {
        wrapped.push('\n');
    }
    wrapped
}

/// Decode base64 text.
///
/// Both the standard and URL-safe alphabets are accepted, padding is optional
/// and whitespace is ignored. Any other character is skipped and sets
/// `had_errors`, as does a dangling final symbol that cannot form a byte.
pub fn decode_base64(text: &str) -> EncodingResult<Vec<u8>> {
    let mut symbols = Vec::with_capacity(text.len());
    let mut skipped = 0usize;

    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/' => symbols.push(byte),
            b'-' => symbols.push(b'+'),
            b'_' => symbols.push(b'/'),
            b'=' => {}
            _ if byte.is_ascii_whitespace() => {}
            _ => skipped += 1,
        }
    }

    // A lone symbol carries six bits, not enough for a byte.
    if symbols.len() % 4 == 1 {
        symbols.pop();
        skipped += 1;
    }

    let decoded = LENIENT.decode(&symbols).unwrap_or_else(|err| {
        tracing::debug!(%err, "base64 decoder rejected filtered input");
        skipped += 1;
        Vec::new()
    });

    if skipped > 0 {
        tracing::debug!(skipped, "ignored invalid base64 input");
    }
    EncodingResult::new(decoded, skipped > 0)
}
