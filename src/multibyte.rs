//! Byte-order handling for UTF-16 and UTF-32 buffers
//!
//! This module turns raw byte buffers into code units (and back) so that the
//! generic transcoder can work on byte-serialized UTF-16 and UTF-32 data.

use crate::utf::{self, REPLACEMENT, ScalarSink};
use crate::{Encoding, EncodingResult};

/// Split a byte buffer into 16-bit units, returning the units and the count of leftover bytes
fn units_u16(input: &[u8], encoding: Encoding) -> (Vec<u16>, usize) {
    let chunks = input.chunks_exact(2);
    let trailing = chunks.remainder().len();
    let units = chunks
        .map(|chunk| {
            let pair = [chunk[0], chunk[1]];
            match encoding {
                Encoding::UTF16BE => u16::from_be_bytes(pair),
                _ => u16::from_le_bytes(pair),
            }
        })
        .collect();
    (units, trailing)
}

/// Split a byte buffer into 32-bit units, returning the units and the count of leftover bytes
fn units_u32(input: &[u8], encoding: Encoding) -> (Vec<u32>, usize) {
    let chunks = input.chunks_exact(4);
    let trailing = chunks.remainder().len();
    let units = chunks
        .map(|chunk| {
            let quad = [chunk[0], chunk[1], chunk[2], chunk[3]];
            match encoding {
                Encoding::UTF32BE => u32::from_be_bytes(quad),
                _ => u32::from_le_bytes(quad),
            }
        })
        .collect();
    (units, trailing)
}

/// Sink that serializes scalar values straight into bytes of the target encoding
pub(crate) struct ByteSink {
    bytes: Vec<u8>,
    encoding: Encoding,
}

impl ByteSink {
    pub(crate) fn new(encoding: Encoding) -> Self {
        Self {
            bytes: Vec::new(),
            encoding,
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl ScalarSink for ByteSink {
    fn reserve_units(&mut self, units: usize) {
        self.bytes.reserve(units * self.encoding.unit_size());
    }

    fn push_scalar(&mut self, c: char) {
        match self.encoding {
            Encoding::UTF8 => {
                self.bytes
                    .extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
            }
            Encoding::UTF16LE => {
                for unit in c.encode_utf16(&mut [0; 2]).iter() {
                    self.bytes.extend_from_slice(&unit.to_le_bytes());
                }
            }
            Encoding::UTF16BE => {
                for unit in c.encode_utf16(&mut [0; 2]).iter() {
                    self.bytes.extend_from_slice(&unit.to_be_bytes());
                }
            }
            Encoding::UTF32LE => self.bytes.extend_from_slice(&u32::from(c).to_le_bytes()),
            Encoding::UTF32BE => self.bytes.extend_from_slice(&u32::from(c).to_be_bytes()),
        }
    }
}

/// Convert a byte buffer between two UTF forms
pub(crate) fn convert(input: &[u8], from: Encoding, to: Encoding) -> EncodingResult<Vec<u8>> {
    let mut sink = ByteSink::new(to);

    let (mut had_errors, trailing) = match from {
        Encoding::UTF8 => (utf::transcode_into(input, &mut sink), 0),
        Encoding::UTF16LE | Encoding::UTF16BE => {
            let (units, trailing) = units_u16(input, from);
            (utf::transcode_into(&units, &mut sink), trailing)
        }
        Encoding::UTF32LE | Encoding::UTF32BE => {
            let (units, trailing) = units_u32(input, from);
            (utf::transcode_into(&units, &mut sink), trailing)
        }
    };

    if trailing > 0 {
        tracing::debug!(
            encoding = from.name(),
            trailing,
            "input ends with a partial code unit"
        );
        sink.push_scalar(REPLACEMENT);
        had_errors = true;
    }

    EncodingResult::new(sink.into_bytes(), had_errors)
}

/// Byte offset of the first malformed unit in `input`, if any
pub(crate) fn first_malformed(input: &[u8], from: Encoding) -> Option<usize> {
    let unit_size = from.unit_size();
    let (offset, trailing) = match from {
        Encoding::UTF8 => (utf::first_malformed(input), 0),
        Encoding::UTF16LE | Encoding::UTF16BE => {
            let (units, trailing) = units_u16(input, from);
            (utf::first_malformed(&units), trailing)
        }
        Encoding::UTF32LE | Encoding::UTF32BE => {
            let (units, trailing) = units_u32(input, from);
            (utf::first_malformed(&units), trailing)
        }
    };

    offset
        .map(|unit| unit * unit_size)
        .or_else(|| (trailing > 0).then(|| input.len() - trailing))
}
