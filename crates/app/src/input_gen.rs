//! Generated inputs: PMF tables, source files and noise masks.
//!
//! Everything here is seeded, so a simulation can be re-run bit for bit.
//!
//! # Files
//!
//! - PMF: `symbol,weight` CSV of the byte distribution of eight i.i.d. bits
//! - Source: raw bytes drawn from a PMF
//! - Noise: bit-granular mask, one 0/1 byte per codeword bit

use chansim_core::dms::DiscreteMemorylessSource;
use chansim_core::noise::BernoulliNoise;
use chansim_core::{Result, SymbolWeights};
use std::path::Path;

/// Byte PMF for a source whose bits are 0 with probability `prob0`.
pub fn pmf_for_prob0(prob0: f64) -> Result<SymbolWeights> {
    SymbolWeights::from_bit_probability(1.0 - prob0)
}

/// Write the PMF for `prob0` to `path`.
pub fn write_pmf(prob0: f64, path: &Path) -> Result<SymbolWeights> {
    let weights = pmf_for_prob0(prob0)?;
    weights.save(path)?;
    tracing::debug!(prob0, path = %path.display(), "wrote PMF");
    Ok(weights)
}

/// Draw `len` source bytes from `weights` and write them to `path`.
pub fn write_source(
    weights: &SymbolWeights,
    len: usize,
    seed: u64,
    path: &Path,
) -> Result<Vec<u8>> {
    let data = DiscreteMemorylessSource::new(weights, seed)?.generate(len);
    std::fs::write(path, &data)?;
    tracing::debug!(len, seed, path = %path.display(), "wrote source");
    Ok(data)
}

/// Write a bit-granular Bernoulli(`p`) mask for a `len`-byte codeword to
/// `path`, leaving the first `protect` bytes untouched.
pub fn write_noise(p: f64, len: usize, seed: u64, protect: usize, path: &Path) -> Result<Vec<u8>> {
    let mask = BernoulliNoise::new(p, seed)?.bit_mask_with_clear_prefix(len, protect);
    std::fs::write(path, &mask)?;
    tracing::debug!(p, len, seed, protect, path = %path.display(), "wrote noise mask");
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pmf_for_prob0() {
        let weights = pmf_for_prob0(0.1).unwrap();
        // All-ones byte is the most likely
        assert!((weights.get(0xFF) - 0.9f64.powi(8)).abs() < 1e-12);
        assert!(pmf_for_prob0(2.0).is_err());
    }

    #[test]
    fn test_write_pmf_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pmf.csv");
        write_pmf(0.5, &path).unwrap();
        let loaded = SymbolWeights::load(&path).unwrap();
        assert_eq!(loaded.support_len(), 256);
        assert!((loaded.get(0x3C) - 1.0 / 256.0).abs() < 1e-8);
    }

    #[test]
    fn test_write_source_determinism() {
        let dir = tempfile::tempdir().unwrap();
        let weights = pmf_for_prob0(0.1).unwrap();
        let a = write_source(&weights, 1000, 12345, &dir.path().join("a.dat")).unwrap();
        let b = write_source(&weights, 1000, 12345, &dir.path().join("b.dat")).unwrap();
        let c = write_source(&weights, 1000, 1, &dir.path().join("c.dat")).unwrap();

        assert_eq!(a.len(), 1000);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(std::fs::read(dir.path().join("a.dat")).unwrap(), a);
    }

    #[test]
    fn test_write_noise_protects_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.dat");
        let mask = write_noise(1.0, 10, 0, 3, &path).unwrap();

        assert_eq!(mask.len(), 80);
        assert!(mask[..24].iter().all(|&e| e == 0));
        assert!(mask[24..].iter().all(|&e| e == 1));
        assert_eq!(std::fs::read(&path).unwrap(), mask);
    }
}
