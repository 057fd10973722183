//! UTF form detection using byte order marks and heuristics
//!
//! The transcoding functions never interpret BOMs themselves. This module is
//! how a caller finds out which UTF form (and byte order) a buffer is most
//! likely to be in before handing it to a [`Transcoder`](crate::Transcoder).

use serde::Serialize;

use crate::Encoding;
use crate::utf::{CodeUnit, Malformed, Scalars};

/// Result of encoding detection with confidence score
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    /// Most likely encoding
    pub encoding: Encoding,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f64,
    /// Whether a BOM was detected
    pub bom_detected: bool,
    /// All candidate encodings with their scores
    pub candidates: Vec<(Encoding, f64)>,
}

/// Detect a byte order mark, returning the encoding it announces and its length.
///
/// UTF-32LE is checked before UTF-16LE, whose mark is a prefix of it.
pub fn detect_bom(data: &[u8]) -> Option<(Encoding, usize)> {
    [
        Encoding::UTF32LE,
        Encoding::UTF32BE,
        Encoding::UTF8,
        Encoding::UTF16LE,
        Encoding::UTF16BE,
    ]
    .into_iter()
    .find(|encoding| data.starts_with(encoding.bom()))
    .map(|encoding| (encoding, encoding.bom().len()))
}

/// UTF form detector
#[derive(Debug, Clone)]
pub struct EncodingDetector {
    /// Maximum bytes to analyze for detection
    max_sample_size: usize,
}

impl Default for EncodingDetector {
    fn default() -> Self {
        Self {
            max_sample_size: 8192,
        }
    }
}

impl EncodingDetector {
    /// Create a new encoding detector
    pub fn new() -> Self {
        Self::default()
    }

    /// Create detector with custom sample size
    pub fn with_sample_size(max_sample_size: usize) -> Self {
        Self { max_sample_size }
    }

    /// Detect the UTF form of the given data
    pub fn detect(&self, data: &[u8]) -> DetectionResult {
        let truncated = data.len() > self.max_sample_size;
        let sample = &data[..data.len().min(self.max_sample_size)];

        // A BOM is conclusive
        if let Some((encoding, _)) = detect_bom(sample) {
            return DetectionResult {
                encoding,
                confidence: 1.0,
                bom_detected: true,
                candidates: vec![(encoding, 1.0)],
            };
        }

        let mut candidates = Vec::new();
        if let Some(confidence) = self.score_utf8(sample, truncated) {
            candidates.push((Encoding::UTF8, confidence));
        }
        for encoding in [Encoding::UTF16LE, Encoding::UTF16BE] {
            if let Some(confidence) = self.score_utf16(sample, encoding, truncated) {
                candidates.push((encoding, confidence));
            }
        }
        for encoding in [Encoding::UTF32LE, Encoding::UTF32BE] {
            if let Some(confidence) = self.score_utf32(sample, encoding, truncated) {
                candidates.push((encoding, confidence));
            }
        }

        // Sort by confidence
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        // Undecodable in every form: report UTF-8 with no confidence
        let (encoding, confidence) = candidates
            .first()
            .copied()
            .unwrap_or((Encoding::UTF8, 0.0));

        DetectionResult {
            encoding,
            confidence,
            bom_detected: false,
            candidates,
        }
    }

    /// Score UTF-8: must decode cleanly, multi-byte sequences raise confidence
    fn score_utf8(&self, sample: &[u8], truncated: bool) -> Option<f64> {
        let (chars, multibyte) = count_scalars(sample, truncated, |c| c.len_utf8() > 1)?;
        let mut confidence = 0.7 + (multibyte as f64 / chars as f64) * 0.3;

        // NUL bytes are rare in UTF-8 text but common in UTF-16/32
        if sample.contains(&0) {
            confidence *= 0.5;
        }
        Some(confidence)
    }

    /// Score UTF-16: must decode cleanly, NUL high bytes on the expected side raise confidence
    fn score_utf16(&self, sample: &[u8], encoding: Encoding, truncated: bool) -> Option<f64> {
        if sample.len() < 2 || (!truncated && sample.len() % 2 != 0) {
            return None;
        }

        let units: Vec<u16> = sample
            .chunks_exact(2)
            .map(|pair| match encoding {
                Encoding::UTF16BE => u16::from_be_bytes([pair[0], pair[1]]),
                _ => u16::from_le_bytes([pair[0], pair[1]]),
            })
            .collect();
        let (chars, _) = count_scalars(&units, truncated, |_| false)?;

        let latin = units
            .iter()
            .filter(|&&unit| (0x01..=0xFF).contains(&unit))
            .count();
        Some(0.5 + (latin as f64 / chars as f64).min(1.0) * 0.4)
    }

    /// Score UTF-32: every unit must be a scalar value, BMP units raise confidence
    fn score_utf32(&self, sample: &[u8], encoding: Encoding, truncated: bool) -> Option<f64> {
        if sample.len() < 4 || (!truncated && sample.len() % 4 != 0) {
            return None;
        }

        let units: Vec<u32> = sample
            .chunks_exact(4)
            .map(|quad| {
                let quad = [quad[0], quad[1], quad[2], quad[3]];
                match encoding {
                    Encoding::UTF32BE => u32::from_be_bytes(quad),
                    _ => u32::from_le_bytes(quad),
                }
            })
            .collect();
        let (chars, bmp) = count_scalars(&units, truncated, |c| u32::from(c) <= 0xFFFF)?;
        Some(0.5 + (bmp as f64 / chars as f64) * 0.45)
    }
}

/// Count the scalar values in `units` and how many satisfy `notable`.
///
/// Fails on any malformed group, except one cut off by the end of a truncated sample.
fn count_scalars<S: CodeUnit>(
    units: &[S],
    truncated: bool,
    notable: impl Fn(char) -> bool,
) -> Option<(usize, usize)> {
    let mut chars = 0;
    let mut flagged = 0;
    for scalar in Scalars::new(units) {
        match scalar {
            Ok(c) => {
                chars += 1;
                if notable(c) {
                    flagged += 1;
                }
            }
            Err(Malformed { offset, len }) if truncated && offset + len == units.len() => break,
            Err(_) => return None,
        }
    }
    (chars > 0).then_some((chars, flagged))
}
