//! Canonical Huffman codebook construction, payload encoding and table-driven
//! payload decoding.
//!
//! # Construction
//!
//! Code lengths come from the classic bottom-up merge: the two least-weight
//! nodes are combined until one tree remains, and a symbol's code length is
//! its leaf depth. Ties between equal weights are broken by the smallest
//! symbol contained in each subtree, so a given weight table always yields the
//! same codebook.
//!
//! Code values are then assigned canonically: symbols sorted by
//! `(length, symbol)` receive consecutive values, shifted left whenever the
//! length grows. The resulting code is prefix-free and satisfies Kraft's
//! equality.
//!
//! A table with a single positive symbol gets the 1-bit codeword `0`, since a
//! zero-length codeword could never be decoded.
//!
//! # Decoding
//!
//! Decoding never rebuilds a tree. [`DecodeTable`] indexes the stored
//! `(bit_length, bits)` pairs directly, and the decoder extends a candidate one
//! payload bit at a time until it equals a stored codeword.

use crate::bitio::{BitReader, BitWriter};
use crate::error::{DecodingError, ParameterError, Result, StructuralError};
use crate::weights::SymbolWeights;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::fmt;

/// Longest codeword a 256-symbol tree can produce.
pub const MAX_CODEWORD_BITS: usize = 255;

/// A single codeword: `bit_length` bits whose integer value is stored
/// little-endian in `ceil(bit_length / 8)` bytes.
///
/// Bit 0 of the codeword (the first bit on the wire) is the most significant
/// bit of the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Codeword {
    bit_length: u8,
    word: Vec<u8>,
}

impl Codeword {
    /// Build a codeword from its bits in transmission order.
    ///
    /// `bits` must hold between 1 and 255 entries.
    fn from_bits(bits: &[bool]) -> Self {
        debug_assert!((1..=MAX_CODEWORD_BITS).contains(&bits.len()));
        let bit_length = bits.len();
        let mut word = vec![0u8; bit_length.div_ceil(8)];
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                let p = bit_length - 1 - i;
                word[p / 8] |= 1 << (p % 8);
            }
        }
        Self {
            bit_length: bit_length as u8,
            word,
        }
    }

    /// Rebuild a codeword from its on-disk form.
    ///
    /// # Errors
    /// - `StructuralError::ZeroLengthCodeword` if `bit_length` is 0
    /// - `StructuralError::TruncatedCodebook` if `word` has the wrong size
    /// - `StructuralError::CodewordOverflow` if `word` has bits set at or
    ///   above `bit_length`
    pub fn from_le_bytes(symbol: u8, bit_length: u8, word: &[u8]) -> Result<Self> {
        if bit_length == 0 {
            return Err(StructuralError::ZeroLengthCodeword { symbol }.into());
        }
        let len = bit_length as usize;
        if word.len() != len.div_ceil(8) {
            return Err(StructuralError::TruncatedCodebook {
                index: symbol as usize,
            }
            .into());
        }
        let spare = word.len() * 8 - len;
        if spare > 0 {
            let top = word[word.len() - 1];
            if top >> (8 - spare) != 0 {
                return Err(StructuralError::CodewordOverflow { symbol, bit_length }.into());
            }
        }
        Ok(Self {
            bit_length,
            word: word.to_vec(),
        })
    }

    /// Number of bits in the codeword.
    pub fn bit_length(&self) -> u8 {
        self.bit_length
    }

    /// Value bytes, little-endian, exactly as serialized in the header.
    pub fn le_bytes(&self) -> &[u8] {
        &self.word
    }

    /// Bit `index` in transmission order (0 = first bit sent).
    pub fn bit(&self, index: usize) -> bool {
        let p = self.bit_length as usize - 1 - index;
        (self.word[p / 8] >> (p % 8)) & 1 == 1
    }

    /// Iterate over the bits in transmission order.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_length as usize).map(move |i| self.bit(i))
    }

    /// Integer value, if it fits in 64 bits.
    pub fn value(&self) -> Option<u64> {
        if self.bit_length > 64 {
            return None;
        }
        Some(
            self.word
                .iter()
                .rev()
                .fold(0u64, |acc, &byte| (acc << 8) | byte as u64),
        )
    }

    /// True if `self` is a proper or improper bit-prefix of `other`.
    pub fn is_prefix_of(&self, other: &Codeword) -> bool {
        self.bit_length <= other.bit_length
            && (0..self.bit_length as usize).all(|i| self.bit(i) == other.bit(i))
    }

    /// Split into `(value, count)` pieces of at most 64 bits, in transmission
    /// order, ready for [`BitWriter::write_bits`].
    fn chunks(&self) -> Vec<(u64, usize)> {
        let len = self.bit_length as usize;
        let mut pieces = Vec::with_capacity(len.div_ceil(64));
        let mut start = 0;
        while start < len {
            let count = (len - start).min(64);
            let value = (start..start + count).fold(0u64, |acc, i| (acc << 1) | self.bit(i) as u64);
            pieces.push((value, count));
            start += count;
        }
        pieces
    }
}

impl fmt::Display for Codeword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Ordered symbol -> codeword mapping.
///
/// Iteration is always in ascending symbol order, which is also the order the
/// entries are serialized in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codebook {
    entries: BTreeMap<u8, Codeword>,
}

/// Node in the merge arena.
enum Node {
    Leaf(u8),
    Internal(usize, usize),
}

/// Heap entry for the bottom-up merge, ordered so that `BinaryHeap` pops the
/// lightest node first and, among equal weights, the one holding the smallest
/// symbol.
struct MergeCandidate {
    weight: f64,
    min_symbol: u8,
    node: usize,
}

impl PartialEq for MergeCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCandidate {}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.min_symbol.cmp(&self.min_symbol))
    }
}

impl Codebook {
    /// Build a canonical Huffman codebook from a weight table.
    ///
    /// # Errors
    /// `ParameterError::EmptyWeightTable` if no symbol has positive weight.
    pub fn build(weights: &SymbolWeights) -> Result<Self> {
        let lengths = code_lengths(weights)?;
        let codebook = Self::from_lengths(&lengths);
        tracing::trace!(
            symbols = codebook.len(),
            max_bits = codebook.max_bit_length(),
            "built codebook"
        );
        Ok(codebook)
    }

    /// Assign canonical code values to `(symbol, length)` pairs that satisfy
    /// Kraft's equality.
    fn from_lengths(lengths: &[(u8, usize)]) -> Self {
        let mut order = lengths.to_vec();
        order.sort_by_key(|&(symbol, len)| (len, symbol));

        let mut entries = BTreeMap::new();
        let mut code: Vec<bool> = Vec::with_capacity(MAX_CODEWORD_BITS);
        for (i, &(symbol, len)) in order.iter().enumerate() {
            if i > 0 {
                increment(&mut code);
            }
            code.resize(len, false);
            entries.insert(symbol, Codeword::from_bits(&code));
        }
        Self { entries }
    }

    /// Wrap an already-built mapping, e.g. one parsed from a file header.
    ///
    /// # Errors
    /// `ParameterError::EmptyCodebook` if `entries` is empty; every codebook
    /// holds at least one symbol.
    pub fn from_entries(entries: BTreeMap<u8, Codeword>) -> Result<Self> {
        if entries.is_empty() {
            return Err(ParameterError::EmptyCodebook.into());
        }
        Ok(Self { entries })
    }

    /// Codeword for `symbol`, if present.
    pub fn get(&self, symbol: u8) -> Option<&Codeword> {
        self.entries.get(&symbol)
    }

    /// Number of symbols in the codebook.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the codebook has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(symbol, codeword)` in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Codeword)> + '_ {
        self.entries.iter().map(|(&s, c)| (s, c))
    }

    /// Length of the longest codeword in bits (0 for an empty codebook).
    pub fn max_bit_length(&self) -> usize {
        self.entries
            .values()
            .map(|c| c.bit_length() as usize)
            .max()
            .unwrap_or(0)
    }

    /// Sum of `2^-len` over all codewords; exactly 1 for a complete code.
    pub fn kraft_sum(&self) -> f64 {
        self.entries
            .values()
            .map(|c| 2f64.powi(-(c.bit_length() as i32)))
            .sum()
    }

    /// True if no codeword is a prefix of another.
    pub fn is_prefix_free(&self) -> bool {
        let words: Vec<&Codeword> = self.entries.values().collect();
        words.iter().enumerate().all(|(i, a)| {
            words
                .iter()
                .enumerate()
                .all(|(j, b)| i == j || !a.is_prefix_of(b))
        })
    }

    /// Average codeword length in bits per symbol under `weights`
    /// (normalized over the symbols this codebook covers).
    pub fn expected_length(&self, weights: &SymbolWeights) -> f64 {
        let (total, weighted) = self
            .iter()
            .map(|(s, c)| (weights.get(s), weights.get(s) * c.bit_length() as f64))
            .fold((0.0, 0.0), |(t, w), (dt, dw)| (t + dt, w + dw));
        if total > 0.0 {
            weighted / total
        } else {
            0.0
        }
    }

    /// Encode `data` into a packed, zero-padded bit payload.
    ///
    /// # Errors
    /// `ParameterError::SymbolNotInCodebook` if a byte of `data` has no
    /// codeword.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut table: Vec<Option<Vec<(u64, usize)>>> = vec![None; 256];
        for (symbol, codeword) in self.iter() {
            table[symbol as usize] = Some(codeword.chunks());
        }

        let mut writer = BitWriter::with_capacity(data.len());
        for (offset, &byte) in data.iter().enumerate() {
            let pieces = table[byte as usize]
                .as_ref()
                .ok_or(ParameterError::SymbolNotInCodebook {
                    symbol: byte,
                    offset,
                })?;
            for &(value, count) in pieces {
                writer.write_bits(value, count)?;
            }
        }
        Ok(writer.finish())
    }

    /// Decode exactly `symbol_count` symbols from `payload`. Bits after the
    /// last symbol are ignored.
    pub fn decode(&self, payload: &[u8], symbol_count: usize) -> Result<Vec<u8>> {
        DecodeTable::new(self)?.decode(payload, symbol_count)
    }
}

/// Add one to a big-endian bit vector in place.
fn increment(code: &mut [bool]) {
    for bit in code.iter_mut().rev() {
        if *bit {
            *bit = false;
        } else {
            *bit = true;
            return;
        }
    }
}

/// Leaf depth of every positive-weight symbol in the merge tree.
fn code_lengths(weights: &SymbolWeights) -> Result<Vec<(u8, usize)>> {
    let mut nodes = Vec::with_capacity(512);
    let mut heap = BinaryHeap::with_capacity(256);
    for (symbol, weight) in weights.positive() {
        heap.push(MergeCandidate {
            weight,
            min_symbol: symbol,
            node: nodes.len(),
        });
        nodes.push(Node::Leaf(symbol));
    }

    match heap.len() {
        0 => return Err(ParameterError::EmptyWeightTable.into()),
        1 => {
            let only = heap.pop().map(|c| c.min_symbol).unwrap_or_default();
            return Ok(vec![(only, 1)]);
        }
        _ => {}
    }

    while let (Some(a), Some(b)) = (heap.pop(), heap.pop()) {
        let node = nodes.len();
        nodes.push(Node::Internal(a.node, b.node));
        heap.push(MergeCandidate {
            weight: a.weight + b.weight,
            min_symbol: a.min_symbol.min(b.min_symbol),
            node,
        });
        if heap.len() == 1 {
            break;
        }
    }

    let mut lengths = Vec::with_capacity(256);
    let mut stack = vec![(nodes.len() - 1, 0usize)];
    while let Some((index, depth)) = stack.pop() {
        match nodes[index] {
            Node::Leaf(symbol) => lengths.push((symbol, depth)),
            Node::Internal(left, right) => {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
    }
    Ok(lengths)
}

/// Growing MSB-first bit string used as a lookup key while scanning.
#[derive(Debug, Default)]
struct BitString {
    bytes: Vec<u8>,
    len: usize,
}

impl BitString {
    fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            self.bytes[self.len / 8] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    fn clear(&mut self) {
        self.bytes.clear();
        self.len = 0;
    }

    fn from_codeword(codeword: &Codeword) -> Self {
        let mut s = Self::default();
        for bit in codeword.bits() {
            s.push(bit);
        }
        s
    }
}

/// Explicit `(bit_length, bits) -> symbol` table built from a codebook.
#[derive(Debug)]
pub struct DecodeTable {
    /// Indexed by bit length; empty maps for lengths no codeword uses
    by_length: Vec<HashMap<Vec<u8>, u8>>,
    max_len: usize,
}

impl DecodeTable {
    /// Index a codebook for decoding.
    ///
    /// # Errors
    /// `StructuralError::NotPrefixFree` if some codeword is a prefix of
    /// another, since such a table cannot be decoded unambiguously.
    pub fn new(codebook: &Codebook) -> Result<Self> {
        let max_len = codebook.max_bit_length();
        let mut by_length = vec![HashMap::new(); max_len + 1];
        for (symbol, codeword) in codebook.iter() {
            let key = BitString::from_codeword(codeword);
            by_length[key.len].insert(key.bytes, symbol);
        }

        let table = Self { by_length, max_len };
        for (symbol, codeword) in codebook.iter() {
            let mut prefix = BitString::default();
            for bit in codeword.bits().take(codeword.bit_length() as usize - 1) {
                prefix.push(bit);
                if table.lookup(&prefix).is_some() {
                    return Err(StructuralError::NotPrefixFree { symbol }.into());
                }
            }
        }
        Ok(table)
    }

    fn lookup(&self, candidate: &BitString) -> Option<u8> {
        self.by_length
            .get(candidate.len)
            .and_then(|codes| codes.get(candidate.bytes.as_slice()))
            .copied()
    }

    /// Decode exactly `symbol_count` symbols from `payload`.
    ///
    /// # Errors
    /// - `DecodingError::NoMatchingCodeword` if the bits at some position
    ///   match no codeword up to the longest codeword length
    /// - `StructuralError::PayloadExhausted` if the payload ends first
    pub fn decode(&self, payload: &[u8], symbol_count: usize) -> Result<Vec<u8>> {
        let mut reader = BitReader::new(payload);
        // Every symbol takes at least one bit
        let mut output = Vec::with_capacity(symbol_count.min(payload.len() * 8));
        let mut candidate = BitString::default();

        while output.len() < symbol_count {
            let start = reader.position();
            candidate.clear();
            loop {
                let bit = reader
                    .read_bit()
                    .map_err(|_| StructuralError::PayloadExhausted {
                        decoded: output.len(),
                        expected: symbol_count,
                    })?;
                candidate.push(bit);

                if let Some(symbol) = self.lookup(&candidate) {
                    output.push(symbol);
                    break;
                }
                if candidate.len >= self.max_len {
                    return Err(DecodingError::NoMatchingCodeword {
                        position: start,
                        symbol_index: output.len(),
                    }
                    .into());
                }
            }
        }

        Ok(output)
    }
}
