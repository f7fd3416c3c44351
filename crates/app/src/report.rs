//! Per-case measurements and the `results.csv` table.

use chansim_core::Result;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;

/// Measured and theoretical figures for one experiment case.
///
/// Error rates are `None` when the end-to-end decode failed. Data and
/// information rates are scaled by the plan's source bit rate `rs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub case: usize,
    pub prob0: f64,
    pub source_codec: bool,
    pub channel_codec: bool,
    pub error_rate: f64,

    /// Source bytes generated
    pub source_len: usize,

    /// Entropy of the PMF, bits per byte
    pub pmf_entropy: f64,

    /// Empirical entropy of the generated source, bits per byte
    pub source_entropy: f64,

    /// Source codec header bytes (0 without source coding)
    pub header_len: usize,

    /// Bytes entering the channel coder
    pub encoded_len: usize,

    /// Source bytes per source-coded byte
    pub compression_ratio: Option<f64>,

    /// Expected bits per source byte after source coding (8 without it)
    pub avg_codeword_len: f64,

    /// Bytes sent through the channel
    pub channel_len: usize,

    /// Channel bytes per source byte, times `rs`
    pub channel_data_rate: Option<f64>,

    /// Channel data rate expected from the average codeword length and the
    /// repetition length, ignoring headers
    pub theoretical_channel_data_rate: f64,

    /// Bits the channel flipped
    pub channel_flips: u64,

    /// Fraction of channel bits flipped
    pub channel_bit_error_rate: f64,

    /// Source information rate, `rs * h(prob0)`
    pub info_rate: f64,

    /// Information bits per channel bit, times `rs`
    pub theoretical_info_rate: f64,

    /// BSC capacity at `error_rate`, bits per channel use
    pub bsc_capacity: f64,

    /// Decoded vs. source, per byte
    pub byte_error_rate: Option<f64>,

    /// Decoded vs. source, per bit
    pub bit_error_rate: Option<f64>,

    /// Expected bit error rate after channel decoding
    pub theoretical_bit_error_rate: f64,

    /// Decoder error message, if decoding failed
    pub decode_error: Option<String>,
}

impl CaseReport {
    pub fn decoded(&self) -> bool {
        self.decode_error.is_none()
    }
}

/// Append `reports` to the CSV at `path`, writing the header row only when
/// the file is new or empty.
pub fn append_results(path: &Path, reports: &[CaseReport]) -> Result<()> {
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    for report in reports {
        writer.serialize(report)?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), rows = reports.len(), "results written");
    Ok(())
}

fn format_rate(rate: Option<f64>) -> String {
    rate.map_or_else(|| "-".to_string(), |r| format!("{:.6}", r))
}

/// Print a human-readable table to stdout.
pub fn print_summary(reports: &[CaseReport]) {
    println!("\n=== Simulation Summary ===");
    println!(
        "{:>4} {:>6} {:>3} {:>3} {:>6} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "case", "p0", "SC", "CC", "p", "H(X)", "ratio", "rc", "BER(ch)", "BER", "theory"
    );
    for r in reports {
        println!(
            "{:>4} {:>6.3} {:>3} {:>3} {:>6.3} {:>8.4} {:>8} {:>8} {:>10.6} {:>10} {:>10.6}",
            r.case,
            r.prob0,
            if r.source_codec { "y" } else { "n" },
            if r.channel_codec { "y" } else { "n" },
            r.error_rate,
            r.source_entropy,
            r.compression_ratio
                .map_or_else(|| "-".to_string(), |c| format!("{:.4}", c)),
            r.channel_data_rate
                .map_or_else(|| "-".to_string(), |c| format!("{:.4}", c)),
            r.channel_bit_error_rate,
            format_rate(r.bit_error_rate),
            r.theoretical_bit_error_rate,
        );
    }
    for r in reports.iter().filter(|r| !r.decoded()) {
        if let Some(error) = &r.decode_error {
            println!("case {}: decode failed: {}", r.case, error);
        }
    }
    println!();
}
