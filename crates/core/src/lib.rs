//! chansim-core: source coding, channel coding and a binary symmetric channel
//!
//! This library provides the building blocks of an information-theory
//! simulation pipeline:
//! - Builds canonical Huffman codebooks from symbol weight tables
//! - Encodes sources into a self-describing file that carries its codebook
//! - Protects data with an odd-length repetition code and majority voting
//! - Corrupts codewords with an XOR noise mask (binary symmetric channel)
//! - Measures entropy, compression ratio and error rates
//!
//! # Architecture
//!
//! - `bitio`: MSB-first bit reading/writing
//! - `weights`: Symbol weight tables and their CSV format
//! - `huffman`: Codebook construction and codeword matching
//! - `source_codec`: Self-describing source codec file format
//! - `repetition`: Repetition channel codec
//! - `noise`: Noise transform and seeded Bernoulli mask generator
//! - `dms`: Seeded discrete memoryless source
//! - `stats`: Entropy, capacity and error-rate measures
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and returned to the caller
//! - **Whole-file**: Every operation reads its input and writes its output in one call
//! - **Deterministic**: Seeded randomness makes sources and noise reproducible

pub mod bitio;
pub mod dms;
pub mod error;
pub mod huffman;
pub mod noise;
pub mod repetition;
pub mod source_codec;
pub mod stats;
pub mod weights;

pub use error::{Error, Result};
pub use huffman::{Codebook, Codeword};
pub use repetition::RepetitionCode;
pub use weights::SymbolWeights;
