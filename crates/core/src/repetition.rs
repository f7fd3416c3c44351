//! Repetition channel code with majority-vote decoding.
//!
//! Every source bit is sent `n` times. The decoder counts the set bits in each
//! group of `n` and outputs 1 iff they are a strict majority, so a group
//! survives any pattern of at most `floor(n/2)` flipped bits and is decoded
//! wrongly otherwise. `n` is always odd, so there are no ties.
//!
//! # File Format
//!
//! ```text
//! +-------------------------+
//! | n (1)                   |  u8, odd, 3..=9
//! +-------------------------+
//! | source_len_bytes (4)    |  u32 BE
//! +-------------------------+
//! | payload                 |  each source bit (MSB-first) repeated n times,
//! |                         |  zero padded to a byte boundary
//! +-------------------------+
//! ```
//!
//! This header is big-endian and unrelated to the source codec's header; the
//! two formats are not interchangeable.

use crate::bitio::{BitReader, BitWriter};
use crate::error::{ParameterError, Result, StructuralError};
use crate::source_codec::DecodeReport;
use std::path::Path;

/// Size of the repetition header in bytes.
pub const HEADER_SIZE: usize = 5;

/// A validated repetition length: odd, between 3 and 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepetitionCode(u8);

impl RepetitionCode {
    /// Smallest allowed repetition length.
    pub const MIN: u8 = 3;
    /// Largest allowed repetition length.
    pub const MAX: u8 = 9;

    /// Validate a repetition length.
    ///
    /// # Errors
    /// `ParameterError::RepetitionLength` if `n` is even or outside 3..=9.
    /// Invalid lengths are never rounded or clamped.
    pub fn new(n: u32) -> Result<Self> {
        match u8::try_from(n) {
            Ok(n) if Self::is_valid(n) => Ok(Self(n)),
            _ => Err(ParameterError::RepetitionLength(n).into()),
        }
    }

    fn is_valid(n: u8) -> bool {
        (Self::MIN..=Self::MAX).contains(&n) && n % 2 == 1
    }

    /// Number of copies of each bit.
    pub fn n(self) -> u8 {
        self.0
    }

    /// Largest number of flipped bits per group that still decodes correctly.
    pub fn correctable(self) -> u8 {
        self.0 / 2
    }

    /// Payload bytes needed for `source_len` source bytes.
    pub fn payload_len(self, source_len: usize) -> usize {
        (source_len * 8 * self.0 as usize).div_ceil(8)
    }

    /// Group value: all `n` bits set.
    fn ones(self) -> u64 {
        (1u64 << self.0) - 1
    }
}

impl TryFrom<u32> for RepetitionCode {
    type Error = crate::error::Error;

    fn try_from(n: u32) -> Result<Self> {
        Self::new(n)
    }
}

/// Encode `source` with repetition length `code`.
///
/// An empty source produces exactly the 5-byte header with
/// `source_len_bytes = 0`.
///
/// # Errors
/// `ParameterError::SourceTooLong` if `source` exceeds `u32::MAX` bytes.
pub fn encode(code: RepetitionCode, source: &[u8]) -> Result<Vec<u8>> {
    let source_len =
        u32::try_from(source.len()).map_err(|_| ParameterError::SourceTooLong(source.len()))?;

    let n = code.n() as usize;
    let mut writer = BitWriter::with_capacity(HEADER_SIZE + code.payload_len(source.len()));
    writer.write_bits(code.n() as u64, 8)?;
    writer.write_bits(source_len as u64, 32)?;

    for &byte in source {
        for shift in (0..8).rev() {
            let group = if (byte >> shift) & 1 == 1 { code.ones() } else { 0 };
            writer.write_bits(group, n)?;
        }
    }

    let encoded = writer.finish();
    tracing::debug!(
        n,
        source_len = source.len(),
        encoded_len = encoded.len(),
        "repetition encoded"
    );
    Ok(encoded)
}

/// Decode a repetition codec file by majority vote.
///
/// # Errors
/// - `StructuralError::MissingHeader` if `encoded` is shorter than 5 bytes
/// - `StructuralError::InvalidRepetitionLength` if the header's `n` is not an
///   odd number in 3..=9
/// - `StructuralError::PayloadMismatch` if the payload holds fewer than
///   `source_len_bytes * 8 * n` bits
pub fn decode(encoded: &[u8]) -> Result<Vec<u8>> {
    let (code, source_len) = parse_header(encoded)?;
    let n = code.n() as usize;

    let payload = &encoded[HEADER_SIZE..];
    let required_bits = source_len as u64 * 8 * n as u64;
    let actual_bits = payload.len() as u64 * 8;
    if actual_bits < required_bits {
        return Err(StructuralError::PayloadMismatch {
            required_bits,
            actual_bits,
        }
        .into());
    }

    let mut reader = BitReader::new(payload);
    let mut output = Vec::with_capacity(source_len as usize);
    let threshold = code.correctable() as u32;

    for _ in 0..source_len {
        let mut byte = 0u8;
        for _ in 0..8 {
            let group = reader.read_bits(n)?;
            byte = (byte << 1) | (group.count_ones() > threshold) as u8;
        }
        output.push(byte);
    }

    tracing::debug!(
        n,
        encoded_len = encoded.len(),
        decoded_len = output.len(),
        "repetition decoded"
    );
    Ok(output)
}

/// Parse the 5-byte header into the repetition length and source length.
pub fn parse_header(encoded: &[u8]) -> Result<(RepetitionCode, u32)> {
    let header: [u8; HEADER_SIZE] = encoded
        .get(..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or(StructuralError::MissingHeader {
            required: HEADER_SIZE,
            actual: encoded.len(),
        })?;

    let n = header[0];
    if !RepetitionCode::is_valid(n) {
        return Err(StructuralError::InvalidRepetitionLength { n }.into());
    }
    let source_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    Ok((RepetitionCode(n), source_len))
}

/// Encode the file at `input` into `output`.
///
/// # Returns
/// `(source_len, payload_len)`: payload bytes exclude the 5-byte header.
pub fn encode_file(code: RepetitionCode, input: &Path, output: &Path) -> Result<(usize, usize)> {
    let source = std::fs::read(input)?;
    let encoded = encode(code, &source)?;
    std::fs::write(output, &encoded)?;
    Ok((source.len(), encoded.len() - HEADER_SIZE))
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
    use crate::error::Error;

    fn code(n: u32) -> RepetitionCode {
        RepetitionCode::new(n).unwrap()
    }

    #[test]
    fn test_valid_lengths() {
        for n in [3, 5, 7, 9] {
            assert_eq!(code(n).n() as u32, n);
        }
        for n in [0, 1, 2, 4, 6, 8, 10, 11, 256 + 3] {
            assert!(matches!(
                RepetitionCode::new(n),
                Err(Error::InvalidParameter(ParameterError::RepetitionLength(_)))
            ));
        }
    }

    #[test]
    fn test_alternating_byte_n3() {
        let encoded = encode(code(3), &[0xAA]).unwrap();
        // 111 000 111 000 111 000 111 000
        assert_eq!(encoded, vec![0x03, 0x00, 0x00, 0x00, 0x01, 0xE3, 0x8E, 0x38]);
        assert_eq!(decode(&encoded).unwrap(), vec![0xAA]);
    }

    #[test]
    fn test_group_layout() {
        let encoded = encode(code(5), &[0x80]).unwrap();
        assert_eq!(&encoded[HEADER_SIZE..], &[0b1111_1000, 0, 0, 0, 0]);

        let encoded = encode(code(9), &[0x01]).unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE + 9);
        assert_eq!(encoded[encoded.len() - 2..], [0b0000_0001, 0xFF]);
    }

    #[test]
    fn test_empty_source() {
        let encoded = encode(code(7), &[]).unwrap();
        assert_eq!(encoded, vec![7, 0, 0, 0, 0]);
        assert!(decode(&encoded).unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_all_lengths() {
        let source: Vec<u8> = (0..=255).collect();
        for n in [3, 5, 7, 9] {
            let encoded = encode(code(n), &source).unwrap();
            assert_eq!(encoded.len(), HEADER_SIZE + code(n).payload_len(source.len()));
            assert_eq!(decode(&encoded).unwrap(), source);
        }
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            decode(&[3, 0, 0, 0]),
            Err(Error::Structural(StructuralError::MissingHeader {
                required: 5,
                actual: 4
            }))
        ));
    }

    #[test]
    fn test_invalid_header_length() {
        assert!(matches!(
            decode(&[4, 0, 0, 0, 0]),
            Err(Error::Structural(StructuralError::InvalidRepetitionLength { n: 4 }))
        ));
    }

    #[test]
    fn test_short_payload() {
        let mut encoded = encode(code(3), b"hi").unwrap();
        encoded.pop();
        assert!(matches!(
            decode(&encoded),
            Err(Error::Structural(StructuralError::PayloadMismatch {
                required_bits: 48,
                actual_bits: 40
            }))
        ));

        // Header claims data but payload is empty
        assert!(matches!(
            decode(&[3, 0, 0, 0, 1]),
            Err(Error::Structural(StructuralError::PayloadMismatch { .. }))
        ));
    }

    #[test]
    fn test_extra_payload_ignored() {
        let mut encoded = encode(code(3), b"ok").unwrap();
        encoded.extend_from_slice(&[0xFF, 0xFF]);
        assert_eq!(decode(&encoded).unwrap(), b"ok");
    }

    #[test]
    fn test_header_is_big_endian() {
        let source = vec![0u8; 0x0102];
        let encoded = encode(code(3), &source).unwrap();
        assert_eq!(&encoded[..HEADER_SIZE], &[3, 0, 0, 0x01, 0x02]);
        assert_eq!(parse_header(&encoded).unwrap(), (code(3), 0x0102));
    }

    #[test]
    fn test_single_flip_per_group_corrected() {
        let source = [0x5Cu8, 0xA3];
        let mut encoded = encode(code(3), &source).unwrap();
        // Flip the middle bit of every 3-bit group
        for group in 0..16 {
            let bit = HEADER_SIZE * 8 + group * 3 + 1;
            encoded[bit / 8] ^= 0x80 >> (bit % 8);
        }
        assert_eq!(decode(&encoded).unwrap(), source);
    }

    #[test]
    fn test_two_flips_per_group_inverts() {
        let source = [0x5Cu8, 0xA3];
        let mut encoded = encode(code(3), &source).unwrap();
        for group in 0..16 {
            for offset in [0, 2] {
                let bit = HEADER_SIZE * 8 + group * 3 + offset;
                encoded[bit / 8] ^= 0x80 >> (bit % 8);
            }
        }
        assert_eq!(decode(&encoded).unwrap(), [!0x5Cu8, !0xA3]);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.dat");
        let encoded = dir.path().join("in.rc");
        let decoded = dir.path().join("out.dat");
        std::fs::write(&input, b"repetition").unwrap();

        let (source_len, payload_len) = encode_file(code(5), &input, &encoded).unwrap();
        assert_eq!(source_len, 10);
        assert_eq!(payload_len, 50);

        let report = decode_file(&encoded, &decoded).unwrap();
        assert_eq!(report.encoded_len, 55);
        assert_eq!(std::fs::read(&decoded).unwrap(), b"repetition");
    }
}
