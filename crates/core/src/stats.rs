//! Information-theoretic measures and file comparison.
//!
//! - Entropy of byte distributions and of the binary source
//! - BSC capacity and repetition-code residual error
//! - Compression ratio and information/data rates
//! - Byte/bit error counts between two byte strings
//!
//! All functions are pure; nothing here touches the file system.

use crate::weights::SymbolWeights;

const fn popcount_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8).count_ones() as u8;
        i += 1;
    }
    table
}

/// Number of set bits for every byte value.
pub const POPCOUNT: [u8; 256] = popcount_table();

/// Shannon entropy in bits per symbol of a weight table.
///
/// The table is normalized first; zero weights contribute nothing. An empty
/// table has entropy 0.
pub fn entropy(weights: &SymbolWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    weights
        .positive()
        .map(|(_, w)| {
            let p = w / total;
            -p * p.log2()
        })
        .sum()
}

/// Empirical entropy of `data` in bits per byte.
pub fn entropy_of(data: &[u8]) -> f64 {
    entropy(&SymbolWeights::from_counts(data))
}

/// Binary entropy function `h(p) = -p log2 p - (1-p) log2 (1-p)`.
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    -p * p.log2() - (1.0 - p) * (1.0 - p).log2()
}

/// Capacity of a binary symmetric channel with crossover probability `p`,
/// in bits per channel use.
pub fn bsc_capacity(p: f64) -> f64 {
    1.0 - binary_entropy(p)
}

/// Source bytes per encoded byte.
///
/// Returns `None` when `encoded_len` is zero.
pub fn compression_ratio(source_len: usize, encoded_len: usize) -> Option<f64> {
    if encoded_len == 0 {
        None
    } else {
        Some(source_len as f64 / encoded_len as f64)
    }
}

/// Information rate of a binary source emitting `rs` bits per second with
/// P(0) = `prob0`: `rs * h(prob0)`.
pub fn info_rate(prob0: f64, rs: f64) -> f64 {
    rs * binary_entropy(prob0)
}

/// Measured channel data rate: channel bytes per source byte, scaled by the
/// source bit rate `rs`.
///
/// Returns `None` when `source_len` is zero.
pub fn channel_data_rate(source_len: usize, channel_len: usize, rs: f64) -> Option<f64> {
    if source_len == 0 {
        None
    } else {
        Some(channel_len as f64 / source_len as f64 * rs)
    }
}

/// Expected channel data rate for an average of `avg_codeword_len` bits per
/// source byte: `avg_codeword_len / 8 * rs`.
pub fn theoretical_channel_data_rate(avg_codeword_len: f64, rs: f64) -> f64 {
    avg_codeword_len / 8.0 * rs
}

/// Information carried per channel bit time when each source byte of
/// `entropy` bits is sent as `avg_codeword_len` bits: `rs * entropy /
/// avg_codeword_len`. Returns 0.0 for a zero codeword length.
pub fn theoretical_info_rate(entropy: f64, avg_codeword_len: f64, rs: f64) -> f64 {
    if avg_codeword_len <= 0.0 {
        0.0
    } else {
        rs * entropy / avg_codeword_len
    }
}

/// Probability that a majority vote over `n` independent copies, each flipped
/// with probability `p`, decodes wrongly.
///
/// `n` is expected to be odd. The sum runs over `k > n/2` flipped copies.
pub fn repetition_residual_error(n: u32, p: f64) -> f64 {
    let mut total = 0.0;
    for k in (n / 2 + 1)..=n {
        total += binomial(n, k) * p.powi(k as i32) * (1.0 - p).powi((n - k) as i32);
    }
    total
}

fn binomial(n: u32, k: u32) -> f64 {
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Result of comparing two byte strings over their common prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Comparison {
    /// Bytes compared (the shorter of the two lengths)
    pub compared_bytes: usize,

    /// Positions whose bytes differ
    pub differing_bytes: usize,

    /// Total differing bits
    pub differing_bits: u64,

    /// Length of the first input
    pub len_a: usize,

    /// Length of the second input
    pub len_b: usize,
}

impl Comparison {
    /// Fraction of compared bytes that differ, 0.0 if nothing was compared.
    pub fn byte_error_rate(&self) -> f64 {
        if self.compared_bytes == 0 {
            0.0
        } else {
            self.differing_bytes as f64 / self.compared_bytes as f64
        }
    }

    /// Fraction of compared bits that differ, 0.0 if nothing was compared.
    pub fn bit_error_rate(&self) -> f64 {
        if self.compared_bytes == 0 {
            0.0
        } else {
            self.differing_bits as f64 / (self.compared_bytes as f64 * 8.0)
        }
    }

    /// Whether both inputs had the same length.
    pub fn lengths_match(&self) -> bool {
        self.len_a == self.len_b
    }

    /// Whether the inputs are identical.
    pub fn is_identical(&self) -> bool {
        self.lengths_match() && self.differing_bytes == 0
    }
}

/// Count differing bytes and bits between `a` and `b`.
///
/// Inputs of different length are compared over their common prefix and a
/// warning is logged.
pub fn compare(a: &[u8], b: &[u8]) -> Comparison {
    if a.len() != b.len() {
        tracing::warn!(
            len_a = a.len(),
            len_b = b.len(),
            "comparing inputs of different length over common prefix"
        );
    }

    let mut comparison = Comparison {
        compared_bytes: a.len().min(b.len()),
        len_a: a.len(),
        len_b: b.len(),
        ..Default::default()
    };
    for (&x, &y) in a.iter().zip(b) {
        let diff = x ^ y;
        if diff != 0 {
            comparison.differing_bytes += 1;
            comparison.differing_bits += POPCOUNT[diff as usize] as u64;
        }
    }
    comparison
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_popcount_table() {
        assert_eq!(POPCOUNT[0], 0);
        assert_eq!(POPCOUNT[0xFF], 8);
        assert_eq!(POPCOUNT[0xAA], 4);
        assert_eq!(POPCOUNT[0x01], 1);
    }

    #[test]
    fn test_entropy_uniform() {
        assert!(close(entropy(&SymbolWeights::uniform()), 8.0));
        let data: Vec<u8> = (0..=255).collect();
        assert!(close(entropy_of(&data), 8.0));
    }

    #[test]
    fn test_entropy_degenerate() {
        assert_eq!(entropy(&SymbolWeights::new()), 0.0);
        assert_eq!(entropy_of(&[]), 0.0);
        assert_eq!(entropy_of(&[7; 100]), 0.0);
    }

    #[test]
    fn test_entropy_scale_invariant() {
        let a = SymbolWeights::from_pairs([(0, 1.0), (1, 3.0)]).unwrap();
        let b = SymbolWeights::from_pairs([(0, 0.25), (1, 0.75)]).unwrap();
        assert!(close(entropy(&a), entropy(&b)));
        assert!(close(entropy(&a), binary_entropy(0.25)));
    }

    #[test]
    fn test_iid_bits_entropy() {
        // Eight independent bits: byte entropy is 8 * h(p)
        let table = SymbolWeights::from_bit_probability(0.1).unwrap();
        assert!(close(entropy(&table), 8.0 * binary_entropy(0.1)));
    }

    #[test]
    fn test_bsc_capacity() {
        assert!(close(bsc_capacity(0.0), 1.0));
        assert!(close(bsc_capacity(0.5), 0.0));
        assert!(close(bsc_capacity(1.0), 1.0));
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(compression_ratio(1000, 250), Some(4.0));
        assert_eq!(compression_ratio(0, 0), None);
    }

    #[test]
    fn test_rates() {
        assert!(close(info_rate(0.5, 1.0), 1.0));
        assert!(close(info_rate(0.1, 2.0), 2.0 * binary_entropy(0.1)));

        assert_eq!(channel_data_rate(100, 300, 1.0), Some(3.0));
        assert_eq!(channel_data_rate(0, 5, 1.0), None);

        // Uncoded bytes: 8 bits each, one channel byte per source byte
        assert!(close(theoretical_channel_data_rate(8.0, 1.0), 1.0));
        assert!(close(theoretical_info_rate(8.0, 8.0, 1.0), 1.0));
        assert_eq!(theoretical_info_rate(3.0, 0.0, 1.0), 0.0);

        // A Huffman code close to the entropy carries almost one bit per bit
        let table = SymbolWeights::from_bit_probability(0.9).unwrap();
        let avg = crate::huffman::Codebook::build(&table)
            .unwrap()
            .expected_length(&table);
        let h = entropy(&table);
        assert!(avg >= h);
        let rate = theoretical_info_rate(h, avg, 1.0);
        assert!(rate > 0.95 && rate <= 1.0, "rate {rate}");
    }

    #[test]
    fn test_residual_error() {
        // n = 3: 3p^2(1-p) + p^3
        let p = 0.01;
        let expected = 3.0 * p * p * (1.0 - p) + p * p * p;
        assert!(close(repetition_residual_error(3, p), expected));
        assert_eq!(repetition_residual_error(5, 0.0), 0.0);
        assert!(close(repetition_residual_error(5, 0.5), 0.5));
        assert!(repetition_residual_error(9, 0.01) < repetition_residual_error(3, 0.01));
    }

    #[test]
    fn test_compare_identical() {
        let comparison = compare(b"same", b"same");
        assert!(comparison.is_identical());
        assert_eq!(comparison.bit_error_rate(), 0.0);
    }

    #[test]
    fn test_compare_counts_bits() {
        let comparison = compare(&[0x00, 0xFF, 0x0F], &[0x01, 0xFF, 0xF0]);
        assert_eq!(comparison.compared_bytes, 3);
        assert_eq!(comparison.differing_bytes, 2);
        assert_eq!(comparison.differing_bits, 9);
        assert!(close(comparison.byte_error_rate(), 2.0 / 3.0));
        assert!(close(comparison.bit_error_rate(), 9.0 / 24.0));
    }

    #[test]
    fn test_compare_length_mismatch() {
        let comparison = compare(&[1, 2, 3, 4], &[1, 2]);
        assert_eq!(comparison.compared_bytes, 2);
        assert_eq!(comparison.differing_bytes, 0);
        assert!(!comparison.lengths_match());
        assert!(!comparison.is_identical());

        let comparison = compare(&[], &[1]);
        assert_eq!(comparison.byte_error_rate(), 0.0);
    }
}
