//! Self-describing source codec file format.
//!
//! An encoded file carries its own codebook, so the decoder needs no side
//! channel: it reads the stored `(symbol, bit_length, word)` entries and
//! matches them directly against the payload bits.
//!
//! # File Format
//!
//! ```text
//! +-------------------------+
//! | header_size (2)         |  u16 LE, total header bytes including this field
//! +-------------------------+
//! | symbol_count - 1 (1)    |  u8
//! +-------------------------+
//! | source_len (4)          |  u32 LE, number of source symbols
//! +-------------------------+
//! | symbol (1)              |  \
//! | bit_length (1)          |   } one entry per codebook symbol,
//! | word (ceil(len/8))      |  /  ascending symbol order, word LE
//! +-------------------------+
//! | payload                 |  codewords MSB-first, zero padded
//! +-------------------------+
//! ```
//!
//! An empty source encodes to an empty file (no header at all), and an empty
//! file decodes to an empty output.
//!
//! "Encoded length" always means header plus payload; [`EncodeReport`] also
//! carries the two parts separately.

use crate::error::{ParameterError, Result, StructuralError};
use crate::huffman::{Codebook, Codeword};
use crate::weights::SymbolWeights;
use std::collections::BTreeMap;
use std::path::Path;

/// Size of the fixed header fields before the codebook entries.
pub const FIXED_HEADER_SIZE: usize = 7;

/// Parsed source codec header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHeader {
    /// Number of symbols encoded in the payload
    pub source_len: u32,

    /// Codebook used for the payload
    pub codebook: Codebook,
}

impl SourceHeader {
    /// Serialize the header, including the leading `header_size` field.
    pub fn serialize(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(FIXED_HEADER_SIZE + self.codebook.len() * 3);

        // header_size is patched in once the entries are written
        header.extend_from_slice(&[0, 0]);
        // A codebook holds 1..=256 symbols
        header.push((self.codebook.len() - 1) as u8);
        header.extend_from_slice(&self.source_len.to_le_bytes());

        for (symbol, codeword) in self.codebook.iter() {
            header.push(symbol);
            header.push(codeword.bit_length());
            header.extend_from_slice(codeword.le_bytes());
        }

        // At most 7 + 256 * 34 bytes, well inside u16
        let header_size = header.len() as u16;
        header[0..2].copy_from_slice(&header_size.to_le_bytes());
        header
    }

    /// Parse a header from the start of `bytes`.
    ///
    /// # Returns
    /// The header and the number of bytes it occupies (the payload starts
    /// there).
    ///
    /// # Errors
    /// `StructuralError` if the fixed fields are missing, `header_size`
    /// doesn't fit the file, an entry is truncated, invalid or duplicated, or
    /// the entries don't exactly fill `header_size`.
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < FIXED_HEADER_SIZE {
            return Err(StructuralError::MissingHeader {
                required: FIXED_HEADER_SIZE,
                actual: bytes.len(),
            }
            .into());
        }

        let header_size = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
        if header_size < FIXED_HEADER_SIZE || header_size > bytes.len() {
            return Err(StructuralError::HeaderSize {
                declared: header_size,
                actual: bytes.len(),
            }
            .into());
        }

        let symbol_count = bytes[2] as usize + 1;
        let source_len = u32::from_le_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]);

        let header = &bytes[..header_size];
        let mut entries = BTreeMap::new();
        let mut pos = FIXED_HEADER_SIZE;

        for index in 0..symbol_count {
            let (symbol, bit_length) = match header.get(pos..pos + 2) {
                Some(&[symbol, bit_length]) => (symbol, bit_length),
                _ => return Err(StructuralError::TruncatedCodebook { index }.into()),
            };
            pos += 2;

            let word_len = (bit_length as usize).div_ceil(8);
            let word = header
                .get(pos..pos + word_len)
                .ok_or(StructuralError::TruncatedCodebook { index })?;
            pos += word_len;

            let codeword = Codeword::from_le_bytes(symbol, bit_length, word)?;
            if entries.insert(symbol, codeword).is_some() {
                return Err(StructuralError::DuplicateSymbol { symbol }.into());
            }
        }

        if pos != header_size {
            return Err(StructuralError::CodebookSize {
                consumed: pos,
                declared: header_size,
            }
            .into());
        }

        let header = Self {
            source_len,
            codebook: Codebook::from_entries(entries)?,
        };
        Ok((header, header_size))
    }
}

/// Sizes produced by one encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeReport {
    /// Source bytes consumed
    pub source_len: usize,

    /// Header bytes written (0 for an empty source)
    pub header_len: usize,

    /// Payload bytes written
    pub payload_len: usize,
}

impl EncodeReport {
    /// Total output size: header plus payload.
    pub fn encoded_len(&self) -> usize {
        self.header_len + self.payload_len
    }

    /// Source bytes per encoded byte, or `None` for an empty output.
    pub fn compression_ratio(&self) -> Option<f64> {
        crate::stats::compression_ratio(self.source_len, self.encoded_len())
    }
}

/// Sizes seen by one decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeReport {
    /// Encoded bytes read
    pub encoded_len: usize,

    /// Decoded bytes produced
    pub decoded_len: usize,
}

/// Encode `source` with a codebook built from `weights`.
///
/// The codebook reflects the assumed distribution, not `source`'s actual
/// content: any table that gives every byte of `source` a positive weight
/// round-trips, only the output size changes.
///
/// # Errors
/// - `ParameterError::EmptyWeightTable` if `weights` has no positive entry
/// - `ParameterError::SymbolNotInCodebook` if a source byte has zero weight
/// - `ParameterError::SourceTooLong` if `source` exceeds `u32::MAX` bytes
pub fn encode(weights: &SymbolWeights, source: &[u8]) -> Result<(Vec<u8>, EncodeReport)> {
    if source.is_empty() {
        return Ok((Vec::new(), EncodeReport::default()));
    }

    let source_len =
        u32::try_from(source.len()).map_err(|_| ParameterError::SourceTooLong(source.len()))?;
    let codebook = Codebook::build(weights)?;
    let payload = codebook.encode(source)?;

    let header = SourceHeader {
        source_len,
        codebook,
    }
    .serialize();

    let report = EncodeReport {
        source_len: source.len(),
        header_len: header.len(),
        payload_len: payload.len(),
    };
    tracing::debug!(
        source_len = report.source_len,
        header_len = report.header_len,
        payload_len = report.payload_len,
        "source encoded"
    );

    let mut output = header;
    output.extend_from_slice(&payload);
    Ok((output, report))
}

/// Decode a source codec file.
///
/// Decoding stops after exactly `source_len` symbols; any bits after that are
/// padding and are never read.
///
/// # Errors
/// - `StructuralError` for header problems or a payload that ends early
/// - `DecodingError` if the payload bits match no codeword
pub fn decode(encoded: &[u8]) -> Result<Vec<u8>> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    let (header, header_len) = SourceHeader::parse(encoded)?;
    let payload = &encoded[header_len..];
    let decoded = header
        .codebook
        .decode(payload, header.source_len as usize)?;

    tracing::debug!(
        header_len,
        payload_len = payload.len(),
        decoded_len = decoded.len(),
        "source decoded"
    );
    Ok(decoded)
}

/// Read the `header_size` field of an encoded file without parsing the rest.
///
/// Returns `None` for an input too short to hold the field.
pub fn header_len(encoded: &[u8]) -> Option<usize> {
    match encoded {
        [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi]) as usize),
        _ => None,
    }
}

/// Encode the file at `input` into `output`.
pub fn encode_file(weights: &SymbolWeights, input: &Path, output: &Path) -> Result<EncodeReport> {
    let source = std::fs::read(input)?;
    let (encoded, report) = encode(weights, &source)?;
    std::fs::write(output, encoded)?;
    Ok(report)
}

/// Decode the file at `input` into `output`.
pub fn decode_file(input: &Path, output: &Path) -> Result<DecodeReport> {
    let encoded = std::fs::read(input)?;
    let decoded = decode(&encoded)?;
    std::fs::write(output, &decoded)?;
    Ok(DecodeReport {
        encoded_len: encoded.len(),
        decoded_len: decoded.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodingError, Error};

    fn two_symbol_weights() -> SymbolWeights {
        SymbolWeights::from_pairs([(b'a', 3.0), (b'b', 1.0)]).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let (encoded, report) = encode(&two_symbol_weights(), b"aab").unwrap();

        // a -> "0", b -> "1"; two entries of 3 bytes each
        assert_eq!(
            encoded,
            vec![
                13, 0, // header_size
                1, // symbol_count - 1
                3, 0, 0, 0, // source_len
                b'a', 1, 0, // a: 1 bit, value 0
                b'b', 1, 1, // b: 1 bit, value 1
                0b0010_0000, // payload "001" + padding
            ]
        );
        assert_eq!(report.source_len, 3);
        assert_eq!(report.header_len, 13);
        assert_eq!(report.payload_len, 1);
        assert_eq!(report.encoded_len(), 14);
        assert_eq!(header_len(&encoded), Some(13));
    }

    #[test]
    fn test_round_trip() {
        let source = b"hello world! this is a test of the source codec.";
        let weights = SymbolWeights::from_counts(source);
        let (encoded, _) = encode(&weights, source).unwrap();
        assert_eq!(decode(&encoded).unwrap(), source);
    }

    #[test]
    fn test_mismatched_table_round_trips() {
        // Assumed distribution favours 'z', source is mostly 'a'
        let weights = SymbolWeights::from_pairs([(b'a', 1.0), (b'z', 100.0), (b'q', 5.0)]).unwrap();
        let source = b"aaaaaaaaaazq";
        let (encoded, _) = encode(&weights, source).unwrap();
        assert_eq!(decode(&encoded).unwrap(), source);
    }

    #[test]
    fn test_empty_source() {
        let (encoded, report) = encode(&two_symbol_weights(), b"").unwrap();
        assert!(encoded.is_empty());
        assert_eq!(report, EncodeReport::default());
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_symbol_source() {
        let weights = SymbolWeights::from_pairs([(0x42, 1.0)]).unwrap();
        let source = vec![0x42; 1000];
        let (encoded, report) = encode(&weights, &source).unwrap();
        assert_eq!(report.payload_len, 125);
        assert_eq!(decode(&encoded).unwrap(), source);
    }

    #[test]
    fn test_header_parse_round_trip() {
        let weights = SymbolWeights::from_counts(b"mississippi river");
        let header = SourceHeader {
            source_len: 17,
            codebook: Codebook::build(&weights).unwrap(),
        };
        let bytes = header.serialize();
        let (parsed, len) = SourceHeader::parse(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(len, bytes.len());
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            decode(&[7, 0, 0]),
            Err(Error::Structural(StructuralError::MissingHeader { .. }))
        ));
    }

    #[test]
    fn test_header_size_beyond_file() {
        let (mut encoded, _) = encode(&two_symbol_weights(), b"ab").unwrap();
        encoded[0] = 200;
        assert!(matches!(
            decode(&encoded),
            Err(Error::Structural(StructuralError::HeaderSize { .. }))
        ));
    }

    #[test]
    fn test_truncated_codebook() {
        let (mut encoded, _) = encode(&two_symbol_weights(), b"ab").unwrap();
        // Claim a third symbol that isn't there
        encoded[2] = 2;
        assert!(matches!(
            decode(&encoded),
            Err(Error::Structural(StructuralError::TruncatedCodebook { index: 2 }))
        ));
    }

    #[test]
    fn test_duplicate_symbol() {
        let (mut encoded, _) = encode(&two_symbol_weights(), b"ab").unwrap();
        encoded[10] = b'a';
        assert!(matches!(
            decode(&encoded),
            Err(Error::Structural(StructuralError::DuplicateSymbol { symbol: b'a' }))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let weights = SymbolWeights::uniform();
        let (encoded, _) = encode(&weights, b"abcdef").unwrap();
        let truncated = &encoded[..encoded.len() - 2];
        assert!(matches!(
            decode(truncated),
            Err(Error::Structural(StructuralError::PayloadExhausted {
                decoded: 4,
                expected: 6
            }))
        ));
    }

    #[test]
    fn test_incomplete_codebook_reports_decoding_error() {
        // Hand-built file: one 2-bit codeword "00", payload starts with "1"
        let file = vec![10, 0, 0, 1, 0, 0, 0, b'x', 2, 0, 0b1000_0000];
        assert!(matches!(
            decode(&file),
            Err(Error::Decoding(DecodingError::NoMatchingCodeword { position: 0, .. }))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("source.dat");
        let encoded = dir.path().join("source.hc");
        let decoded = dir.path().join("source.out");

        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        std::fs::write(&input, &data).unwrap();

        let weights = SymbolWeights::from_counts(&data);
        let report = encode_file(&weights, &input, &encoded).unwrap();
        assert_eq!(report.source_len, data.len());
        assert_eq!(
            std::fs::metadata(&encoded).unwrap().len() as usize,
            report.encoded_len()
        );

        let decode_report = decode_file(&encoded, &decoded).unwrap();
        assert_eq!(decode_report.decoded_len, data.len());
        assert_eq!(std::fs::read(&decoded).unwrap(), data);
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = decode_file(&dir.path().join("nope"), &dir.path().join("out"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
