//! Symbol weight tables (probability mass functions over byte values).
//!
//! A `SymbolWeights` table assigns a nonnegative weight to each of the 256
//! byte values. Only strictly positive entries take part in codebook
//! construction or sampling, and tables need not be normalized: Huffman
//! construction and inverse-CDF sampling are both scale-invariant.
//!
//! # CSV Format
//!
//! ```text
//! 0,0.81000000
//! 1,0.09000000
//! 2,0.09000000
//! 3,0.01000000
//! ```
//!
//! One `symbol,weight` record per line, no header row. Whether the weights sum
//! to one is the producer's business; the loader only requires each weight to
//! be finite and nonnegative.

use crate::error::{Error, ParameterError, Result};
use crate::stats::POPCOUNT;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Weight table over all 256 byte values.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolWeights {
    weights: [f64; 256],
}

impl SymbolWeights {
    /// Create a table with every weight zero.
    pub fn new() -> Self {
        Self {
            weights: [0.0; 256],
        }
    }

    /// Equal weight for all 256 symbols.
    pub fn uniform() -> Self {
        Self {
            weights: [1.0; 256],
        }
    }

    /// Build a table from `(symbol, weight)` pairs. Later pairs overwrite
    /// earlier ones for the same symbol.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u8, f64)>,
    {
        let mut table = Self::new();
        for (symbol, weight) in pairs {
            table.set(symbol, weight)?;
        }
        Ok(table)
    }

    /// Empirical histogram of `data` (occurrence counts as weights).
    pub fn from_counts(data: &[u8]) -> Self {
        let mut table = Self::new();
        for &byte in data {
            table.weights[byte as usize] += 1.0;
        }
        table
    }

    /// Byte distribution produced by eight independent bits, each equal to 1
    /// with probability `p1`.
    ///
    /// The weight of byte `b` is `p1^k * (1-p1)^(8-k)` where `k` is the number
    /// of set bits in `b`.
    pub fn from_bit_probability(p1: f64) -> Result<Self> {
        check_probability(p1)?;
        let mut table = Self::new();
        for (symbol, weight) in table.weights.iter_mut().enumerate() {
            let ones = POPCOUNT[symbol] as i32;
            *weight = p1.powi(ones) * (1.0 - p1).powi(8 - ones);
        }
        Ok(table)
    }

    /// Two-symbol table `{0: 1 - p1, 1: p1}`, the per-bit law of a binary
    /// symmetric channel's noise.
    pub fn binary(p1: f64) -> Result<Self> {
        check_probability(p1)?;
        Self::from_pairs([(0, 1.0 - p1), (1, p1)])
    }

    /// Set the weight of one symbol.
    ///
    /// # Errors
    /// `ParameterError::InvalidWeight` if `weight` is negative, NaN or infinite.
    pub fn set(&mut self, symbol: u8, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ParameterError::InvalidWeight { symbol, weight }.into());
        }
        self.weights[symbol as usize] = weight;
        Ok(())
    }

    /// Weight of one symbol.
    pub fn get(&self, symbol: u8) -> f64 {
        self.weights[symbol as usize]
    }

    /// Iterate over strictly positive entries in ascending symbol order.
    pub fn positive(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w > 0.0)
            .map(|(s, &w)| (s as u8, w))
    }

    /// Number of symbols with positive weight.
    pub fn support_len(&self) -> usize {
        self.positive().count()
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Copy of this table scaled to sum to one. An all-zero table is
    /// returned unchanged.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total <= 0.0 {
            return self.clone();
        }
        let mut table = self.clone();
        for weight in table.weights.iter_mut() {
            *weight /= total;
        }
        table
    }

    /// Parse `symbol,weight` records.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut table = Self::new();
        for record in csv_reader.deserialize::<(u16, f64)>() {
            let (symbol, weight) = record?;
            let symbol = u8::try_from(symbol)
                .map_err(|_| Error::Pmf(format!("symbol {symbol} is not a byte value")))?;
            table.set(symbol, weight)?;
        }
        Ok(table)
    }

    /// Load a table from a CSV file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_csv(file)
    }

    /// Write positive entries as `symbol,weight` records.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        for (symbol, weight) in self.positive() {
            csv_writer.write_record([symbol.to_string(), format!("{weight:.8}")])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Save a table to a CSV file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_csv(file)
    }
}

impl Default for SymbolWeights {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn check_probability(p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ParameterError::InvalidProbability(p).into());
    }
    Ok(())
}
