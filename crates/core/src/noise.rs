//! Binary symmetric channel: XOR noise masks and a seeded mask generator.
//!
//! The channel itself is deterministic. [`apply`] XORs a codeword with a
//! caller-supplied mask, and all randomness lives in [`BernoulliNoise`], which
//! draws masks from a seeded ChaCha8 RNG. A mask can therefore be generated
//! once, saved, and replayed against several codeword streams.
//!
//! # Mask Shapes
//!
//! - **Bit-granular**: `8 * codeword_len` elements, one per codeword bit in
//!   MSB-first order. Any nonzero element counts as a flip.
//! - **Byte-granular**: `codeword_len` bytes XORed directly.
//!
//! Bit-granular wins when both match, which only happens for an empty
//! codeword (and then the output is empty either way).

use crate::bitio::pack_bits;
use crate::error::{ParameterError, Result};
use crate::weights::check_probability;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

/// How a mask lines up against a codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One element per codeword bit
    Bit,
    /// One byte per codeword byte
    Byte,
}

/// A noise mask whose shape has been checked against a codeword length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseMask<'a> {
    granularity: Granularity,
    elements: &'a [u8],
}

impl<'a> NoiseMask<'a> {
    /// Decide the granularity of `mask` for a codeword of `codeword_len` bytes.
    ///
    /// # Errors
    /// `ParameterError::ShapeMismatch` if the mask length is neither
    /// `8 * codeword_len` nor `codeword_len`.
    pub fn classify(codeword_len: usize, mask: &'a [u8]) -> Result<Self> {
        let granularity = if Some(mask.len()) == codeword_len.checked_mul(8) {
            Granularity::Bit
        } else if mask.len() == codeword_len {
            Granularity::Byte
        } else {
            return Err(ParameterError::ShapeMismatch {
                codeword_len,
                mask_len: mask.len(),
            }
            .into());
        };
        Ok(Self {
            granularity,
            elements: mask,
        })
    }

    /// Whether the mask is bit- or byte-granular.
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Mask as one byte per codeword byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.granularity {
            Granularity::Bit => pack_bits(self.elements),
            Granularity::Byte => self.elements.to_vec(),
        }
    }

    /// Number of bit flips this mask causes.
    pub fn flip_count(&self) -> u64 {
        match self.granularity {
            Granularity::Bit => self.elements.iter().filter(|&&e| e != 0).count() as u64,
            Granularity::Byte => self
                .elements
                .iter()
                .map(|&b| crate::stats::POPCOUNT[b as usize] as u64)
                .sum(),
        }
    }
}

/// XOR `codeword` with `mask`.
///
/// Pure: draws no randomness and has no side effects.
///
/// # Errors
/// `ParameterError::ShapeMismatch` if `mask` fits neither granularity.
pub fn apply(codeword: &[u8], mask: &[u8]) -> Result<Vec<u8>> {
    let mask = NoiseMask::classify(codeword.len(), mask)?;
    let packed = mask.to_bytes();
    Ok(codeword.iter().zip(&packed).map(|(c, m)| c ^ m).collect())
}

/// Apply the mask file at `noise` to the codeword file at `input`, writing
/// the corrupted codeword to `output`.
///
/// # Returns
/// Number of flipped bits.
pub fn apply_file(input: &Path, noise: &Path, output: &Path) -> Result<u64> {
    let codeword = std::fs::read(input)?;
    let mask = std::fs::read(noise)?;
    let flips = NoiseMask::classify(codeword.len(), &mask)?.flip_count();
    let corrupted = apply(&codeword, &mask)?;
    std::fs::write(output, &corrupted)?;
    tracing::debug!(
        codeword_len = codeword.len(),
        mask_len = mask.len(),
        flips,
        "noise applied"
    );
    Ok(flips)
}

/// Seeded generator of i.i.d. Bernoulli noise masks.
///
/// Every bit is flipped independently with probability `p`. Given the same
/// seed and call sequence the masks are bit-identical.
pub struct BernoulliNoise {
    p: f64,
    rng: ChaCha8Rng,
}

impl BernoulliNoise {
    /// # Errors
    /// `ParameterError::InvalidProbability` if `p` is outside [0, 1].
    pub fn new(p: f64, seed: u64) -> Result<Self> {
        check_probability(p)?;
        Ok(Self {
            p,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Crossover probability.
    pub fn p(&self) -> f64 {
        self.p
    }

    /// Bit-granular mask for a `codeword_len`-byte codeword: `8 * codeword_len`
    /// elements, each 0 or 1.
    pub fn bit_mask(&mut self, codeword_len: usize) -> Vec<u8> {
        self.bit_mask_with_clear_prefix(codeword_len, 0)
    }

    /// Like [`bit_mask`](Self::bit_mask) but the bits of the first
    /// `protected_bytes` bytes are never flipped. Used to carry a header
    /// through the channel intact.
    pub fn bit_mask_with_clear_prefix(
        &mut self,
        codeword_len: usize,
        protected_bytes: usize,
    ) -> Vec<u8> {
        let protected_bits = protected_bytes.min(codeword_len) * 8;
        let mut mask = vec![0u8; codeword_len * 8];
        for element in mask.iter_mut().skip(protected_bits) {
            *element = self.rng.gen_bool(self.p) as u8;
        }
        mask
    }

    /// Byte-granular (packed) mask for a `codeword_len`-byte codeword.
    pub fn byte_mask(&mut self, codeword_len: usize) -> Vec<u8> {
        pack_bits(&self.bit_mask(codeword_len))
    }
}
