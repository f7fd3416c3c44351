//! Error types for chansim.
//!
//! Every operation returns a structured error instead of panicking, and every
//! error is fatal to the single call that raised it: no partial output is ever
//! produced. Empty input is never an error.

use thiserror::Error;

/// Top-level error type for all codec, channel and statistics operations.
///
/// Each variant corresponds to a failure domain:
/// - Structural: a header is missing or malformed, or declared lengths don't
///   fit the bytes actually present
/// - Decoding: source payload bits match no codebook entry
/// - InvalidParameter: a caller-supplied parameter is out of range
/// - PMF: a probability table file could not be parsed
/// - I/O: file system operations
#[derive(Debug, Error)]
pub enum Error {
    /// Header missing, malformed, or inconsistent with the file size
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Payload bits don't match any codebook entry
    #[error("decoding error: {0}")]
    Decoding(#[from] DecodingError),

    /// Caller-supplied parameter out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] ParameterError),

    /// Probability table file is malformed
    #[error("PMF table error: {0}")]
    Pmf(String),

    /// File I/O error, propagated unchanged
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bit-level I/O errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitIoError {
    /// Attempted to read past the end of the buffer
    #[error("unexpected end of bit stream")]
    UnexpectedEof,

    /// Invalid bit count (more than 64 bits in one call)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),
}

/// Header and length consistency errors.
#[derive(Debug, Error)]
pub enum StructuralError {
    /// File too short to hold the fixed header fields
    #[error("missing header: need at least {required} bytes, got {actual}")]
    MissingHeader { required: usize, actual: usize },

    /// Declared header size disagrees with the fixed layout or the file size
    #[error("header size {declared} is invalid for a {actual}-byte file")]
    HeaderSize { declared: usize, actual: usize },

    /// Codebook entry table is truncated or overruns the declared header
    #[error("codebook entry {index} is truncated")]
    TruncatedCodebook { index: usize },

    /// Codebook entries don't exactly fill the declared header
    #[error("codebook ends at byte {consumed}, header declares {declared}")]
    CodebookSize { consumed: usize, declared: usize },

    /// Codeword length of zero bits
    #[error("symbol {symbol:#04x} has a zero-length codeword")]
    ZeroLengthCodeword { symbol: u8 },

    /// Codeword value has bits set above its declared length
    #[error("symbol {symbol:#04x} codeword does not fit in {bit_length} bits")]
    CodewordOverflow { symbol: u8, bit_length: u8 },

    /// Same symbol listed twice in the codebook
    #[error("symbol {symbol:#04x} appears twice in the codebook")]
    DuplicateSymbol { symbol: u8 },

    /// Some codeword is a prefix of another, so the payload is ambiguous
    #[error("codebook is not prefix-free at symbol {symbol:#04x}")]
    NotPrefixFree { symbol: u8 },

    /// Repetition header carries a code length that is not odd in 3..=9
    #[error("repetition length {n} in header is not an odd number in 3..=9")]
    InvalidRepetitionLength { n: u8 },

    /// Payload shorter than the header requires
    #[error("payload/header mismatch: need {required_bits} bits, got {actual_bits}")]
    PayloadMismatch {
        required_bits: u64,
        actual_bits: u64,
    },

    /// Payload ran out before all declared symbols were decoded
    #[error("payload exhausted after {decoded} of {expected} symbols")]
    PayloadExhausted { decoded: usize, expected: usize },

    /// Low-level bit stream failure
    #[error("bit stream: {0}")]
    BitStream(#[from] BitIoError),
}

/// Source payload decoding errors.
#[derive(Debug, Error)]
pub enum DecodingError {
    /// No codebook entry matches the bits at this position
    #[error("no codeword matches at payload bit {position} (symbol {symbol_index})")]
    NoMatchingCodeword { position: usize, symbol_index: usize },
}

/// Invalid caller-supplied parameters.
#[derive(Debug, Error)]
pub enum ParameterError {
    /// Repetition length even or outside 3..=9
    #[error("repetition length {0} must be an odd number in 3..=9")]
    RepetitionLength(u32),

    /// No symbol has positive weight
    #[error("empty weight table: cannot build codebook")]
    EmptyWeightTable,

    /// Codebook built from an empty symbol mapping
    #[error("codebook must hold at least one symbol")]
    EmptyCodebook,

    /// Weight is negative, NaN or infinite
    #[error("weight {weight} for symbol {symbol:#04x} must be finite and nonnegative")]
    InvalidWeight { symbol: u8, weight: f64 },

    /// Source byte has no codeword in the codebook
    #[error("symbol {symbol:#04x} at offset {offset} has no codeword")]
    SymbolNotInCodebook { symbol: u8, offset: usize },

    /// Source length doesn't fit the header's u32 field
    #[error("source of {0} bytes exceeds the u32 length field")]
    SourceTooLong(usize),

    /// Noise mask is neither bit- nor byte-granular for the codeword
    #[error("noise mask of {mask_len} elements doesn't fit a {codeword_len}-byte codeword")]
    ShapeMismatch {
        codeword_len: usize,
        mask_len: usize,
    },

    /// Probability outside [0, 1]
    #[error("probability {0} must be within [0, 1]")]
    InvalidProbability(f64),
}

impl From<BitIoError> for Error {
    fn from(err: BitIoError) -> Self {
        Error::Structural(StructuralError::BitStream(err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io) => Error::Io(io),
                other => Error::Pmf(format!("{other:?}")),
            }
        } else {
            Error::Pmf(err.to_string())
        }
    }
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
