//! Discrete memoryless source: i.i.d. bytes drawn from a weight table.
//!
//! Sampling is inverse-CDF over the normalized cumulative table, with a
//! seeded ChaCha8 RNG so generated sources are reproducible.

use crate::error::{ParameterError, Result};
use crate::weights::SymbolWeights;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

/// Seeded i.i.d. byte source.
pub struct DiscreteMemorylessSource {
    symbols: Vec<u8>,
    /// Cumulative probability up to and including each symbol
    cumulative: Vec<f64>,
    rng: ChaCha8Rng,
}

impl DiscreteMemorylessSource {
    /// # Errors
    /// `ParameterError::EmptyWeightTable` if no symbol has positive weight.
    pub fn new(weights: &SymbolWeights, seed: u64) -> Result<Self> {
        let total = weights.total();
        if weights.support_len() == 0 || total <= 0.0 {
            return Err(ParameterError::EmptyWeightTable.into());
        }

        let mut symbols = Vec::new();
        let mut cumulative = Vec::new();
        let mut running = 0.0;
        for (symbol, weight) in weights.positive() {
            running += weight / total;
            symbols.push(symbol);
            cumulative.push(running);
        }
        // Rounding can leave the last entry just under 1.0
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }

        Ok(Self {
            symbols,
            cumulative,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Draw one symbol.
    pub fn sample(&mut self) -> u8 {
        let u: f64 = self.rng.gen();
        let index = self.cumulative.partition_point(|&c| c <= u);
        self.symbols[index.min(self.symbols.len() - 1)]
    }

    /// Draw `len` symbols.
    pub fn generate(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.sample()).collect()
    }

    /// Draw `len` symbols and write them to `path`.
    pub fn generate_file(&mut self, len: usize, path: &Path) -> Result<()> {
        let data = self.generate(len);
        std::fs::write(path, &data)?;
        tracing::debug!(len, path = %path.display(), "source generated");
        Ok(())
    }
}
