//! Experiment runner: source -> codecs -> noisy channel -> decoders.
//!
//! Each case works in its own directory and goes through files exactly as the
//! command line tools would, so every intermediate artifact can be inspected
//! afterwards:
//!
//! ```text
//! case_<i>/
//!   source.pmf.csv   PMF derived from prob0
//!   source.dat       generated source
//!   source.hc        source codec output        (source_codec only)
//!   channel.rc       repetition codec output    (channel_codec only)
//!   noise.dat        bit-granular noise mask
//!   channel.out      channel output
//!   channel.rc.de    repetition decoder output  (channel_codec only)
//!   decoded.dat      final output
//! ```
//!
//! Headers are carried through the channel error-free: the noise mask leaves
//! the repetition header and the (repeated) source codec header untouched.

use crate::config::{CaseConfig, ExperimentPlan};
use crate::input_gen;
use crate::report::{self, CaseReport};
use chansim_core::{
    noise, repetition, source_codec, stats, Codebook, Error, RepetitionCode, Result,
};
use std::path::{Path, PathBuf};

/// File name of the aggregated results table inside the output directory.
pub const RESULTS_FILE: &str = "results.csv";

/// Paths used by one case.
struct CaseFiles {
    pmf: PathBuf,
    source: PathBuf,
    source_encoded: PathBuf,
    channel_encoded: PathBuf,
    noise: PathBuf,
    channel_out: PathBuf,
    channel_decoded: PathBuf,
    decoded: PathBuf,
}

impl CaseFiles {
    fn new(dir: &Path) -> Self {
        Self {
            pmf: dir.join("source.pmf.csv"),
            source: dir.join("source.dat"),
            source_encoded: dir.join("source.hc"),
            channel_encoded: dir.join("channel.rc"),
            noise: dir.join("noise.dat"),
            channel_out: dir.join("channel.out"),
            channel_decoded: dir.join("channel.rc.de"),
            decoded: dir.join("decoded.dat"),
        }
    }
}

/// Run every case of `plan` under `out_dir` and append the reports to
/// `out_dir/results.csv`.
pub fn run_plan(plan: &ExperimentPlan, out_dir: &Path) -> Result<Vec<CaseReport>> {
    std::fs::create_dir_all(out_dir)?;
    plan.log();

    let mut reports = Vec::with_capacity(plan.cases.len());
    for (index, case) in plan.cases.iter().enumerate() {
        let case_dir = out_dir.join(format!("case_{}", index + 1));
        let report = run_case(plan, index, case, &case_dir)?;
        tracing::info!(
            case = report.case,
            ratio = ?report.compression_ratio,
            channel_ber = report.channel_bit_error_rate,
            ber = ?report.bit_error_rate,
            "case complete"
        );
        reports.push(report);
    }

    report::append_results(&out_dir.join(RESULTS_FILE), &reports)?;
    Ok(reports)
}

/// Run one case in `case_dir`, replacing anything already there.
///
/// A decoder failure caused by channel noise is recorded in the report;
/// I/O errors and invalid parameters abort the case.
pub fn run_case(
    plan: &ExperimentPlan,
    index: usize,
    case: &CaseConfig,
    case_dir: &Path,
) -> Result<CaseReport> {
    if case_dir.exists() {
        std::fs::remove_dir_all(case_dir)?;
    }
    std::fs::create_dir_all(case_dir)?;
    let files = CaseFiles::new(case_dir);
    let (source_seed, noise_seed) = plan.case_seeds(index);
    let code = RepetitionCode::new(plan.repeat_length)?;

    // Source
    let weights = input_gen::write_pmf(case.prob0, &files.pmf)?;
    let source = input_gen::write_source(&weights, plan.msg_length, source_seed, &files.source)?;

    // Source coding
    let (source_stage, header_len, encoded_len, compression_ratio, avg_codeword_len) =
        if case.source_codec {
            let encoded =
                source_codec::encode_file(&weights, &files.source, &files.source_encoded)?;
            (
                files.source_encoded.as_path(),
                encoded.header_len,
                encoded.encoded_len(),
                encoded.compression_ratio(),
                Codebook::build(&weights)?.expected_length(&weights),
            )
        } else {
            (files.source.as_path(), 0, source.len(), None, 8.0)
        };

    // Channel coding
    let (channel_stage, protect) = if case.channel_codec {
        repetition::encode_file(code, source_stage, &files.channel_encoded)?;
        (
            files.channel_encoded.as_path(),
            repetition::HEADER_SIZE + code.n() as usize * header_len,
        )
    } else {
        (source_stage, header_len)
    };

    // Channel
    let sent = std::fs::read(channel_stage)?;
    input_gen::write_noise(case.error_rate, sent.len(), noise_seed, protect, &files.noise)?;
    let channel_flips = noise::apply_file(channel_stage, &files.noise, &files.channel_out)?;
    let received = std::fs::read(&files.channel_out)?;
    let channel = stats::compare(&sent, &received);

    // Decoding
    let decoded = decode_stages(case, &files);
    let (comparison, decode_error) = match decoded {
        Ok(path) => {
            let output = std::fs::read(path)?;
            (Some(stats::compare(&source, &output)), None)
        }
        Err(err @ (Error::Structural(_) | Error::Decoding(_))) => {
            tracing::warn!(case = index + 1, error = %err, "decode failed");
            (None, Some(err.to_string()))
        }
        Err(err) => return Err(err),
    };

    let (theoretical_bit_error_rate, channel_bits_per_byte) = if case.channel_codec {
        (
            stats::repetition_residual_error(code.n() as u32, case.error_rate),
            avg_codeword_len * code.n() as f64,
        )
    } else {
        (case.error_rate, avg_codeword_len)
    };
    let pmf_entropy = stats::entropy(&weights);

    Ok(CaseReport {
        case: index + 1,
        prob0: case.prob0,
        source_codec: case.source_codec,
        channel_codec: case.channel_codec,
        error_rate: case.error_rate,
        source_len: source.len(),
        pmf_entropy,
        source_entropy: stats::entropy_of(&source),
        header_len,
        encoded_len,
        compression_ratio,
        avg_codeword_len,
        channel_len: sent.len(),
        channel_data_rate: stats::channel_data_rate(source.len(), sent.len(), plan.rs),
        theoretical_channel_data_rate: stats::theoretical_channel_data_rate(
            channel_bits_per_byte,
            plan.rs,
        ),
        channel_flips,
        channel_bit_error_rate: channel.bit_error_rate(),
        info_rate: stats::info_rate(case.prob0, plan.rs),
        theoretical_info_rate: stats::theoretical_info_rate(
            pmf_entropy,
            channel_bits_per_byte,
            plan.rs,
        ),
        bsc_capacity: stats::bsc_capacity(case.error_rate),
        byte_error_rate: comparison.map(|c| c.byte_error_rate()),
        bit_error_rate: comparison.map(|c| c.bit_error_rate()),
        theoretical_bit_error_rate,
        decode_error,
    })
}

/// Undo the codecs in reverse order, returning the path of the final output.
fn decode_stages<'a>(case: &CaseConfig, files: &'a CaseFiles) -> Result<&'a Path> {
    let mut stage = files.channel_out.as_path();
    if case.channel_codec {
        repetition::decode_file(stage, &files.channel_decoded)?;
        stage = files.channel_decoded.as_path();
    }
    if case.source_codec {
        source_codec::decode_file(stage, &files.decoded)?;
    } else {
        std::fs::copy(stage, &files.decoded)?;
    }
    Ok(files.decoded.as_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CASES;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn small_plan() -> ExperimentPlan {
        ExperimentPlan {
            msg_length: 4096,
            seed: 42,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_channel_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let plan = small_plan();
        let report = run_case(&plan, 0, &DEFAULT_CASES[0], dir.path()).unwrap();

        assert!(report.decoded());
        assert_eq!(report.bit_error_rate, Some(0.0));
        assert_eq!(report.channel_flips, 0);
        assert!(report.compression_ratio.unwrap() > 1.0);
        assert!(report.header_len > 0);

        // Huffman stays within one bit of the entropy per source byte
        assert!(report.avg_codeword_len >= report.pmf_entropy);
        assert!(report.avg_codeword_len < report.pmf_entropy + 1.0);
        assert!(close(
            report.theoretical_channel_data_rate,
            report.avg_codeword_len / 8.0
        ));
        // Measured rate also carries the header
        let measured = report.channel_data_rate.unwrap();
        assert!(close(measured, report.channel_len as f64 / 4096.0));
        assert!(measured > report.theoretical_channel_data_rate);
        assert!(close(report.bsc_capacity, 1.0));
        assert!(close(report.info_rate, stats::binary_entropy(0.1)));
        assert_eq!(
            std::fs::read(dir.path().join("decoded.dat")).unwrap(),
            std::fs::read(dir.path().join("source.dat")).unwrap()
        );
    }

    #[test]
    fn test_uncoded_source_has_no_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_case(&small_plan(), 1, &DEFAULT_CASES[1], dir.path()).unwrap();
        assert_eq!(report.compression_ratio, None);
        assert_eq!(report.encoded_len, 4096);
        assert_eq!(report.channel_len, 4096);
        assert_eq!(report.avg_codeword_len, 8.0);
        assert_eq!(report.channel_data_rate, Some(1.0));
        assert!(close(report.theoretical_channel_data_rate, 1.0));
        assert!(close(report.theoretical_info_rate, report.pmf_entropy / 8.0));
    }

    #[test]
    fn test_channel_code_reduces_errors() {
        let dir = tempfile::tempdir().unwrap();
        let plan = ExperimentPlan {
            msg_length: 16_384,
            ..small_plan()
        };
        let coded = run_case(&plan, 2, &DEFAULT_CASES[2], &dir.path().join("coded")).unwrap();
        let uncoded = run_case(&plan, 3, &DEFAULT_CASES[3], &dir.path().join("uncoded")).unwrap();

        assert_eq!(coded.channel_len, repetition::HEADER_SIZE + 3 * 16_384);
        assert!(coded.bit_error_rate.unwrap() < uncoded.bit_error_rate.unwrap());
        assert!((uncoded.bit_error_rate.unwrap() - 0.01).abs() < 0.003);

        let expected_rate = (repetition::HEADER_SIZE + 3 * 16_384) as f64 / 16_384.0;
        assert!(close(coded.channel_data_rate.unwrap(), expected_rate));
        assert!(close(coded.theoretical_channel_data_rate, 3.0));
        assert!(close(coded.theoretical_info_rate, 1.0 / 3.0));
        assert!(close(coded.info_rate, 1.0));
        assert!(close(coded.bsc_capacity, 1.0 - stats::binary_entropy(0.01)));
        assert!(close(uncoded.bsc_capacity, coded.bsc_capacity));
    }

    #[test]
    fn test_headers_survive_channel() {
        let dir = tempfile::tempdir().unwrap();
        let case = CaseConfig {
            error_rate: 0.2,
            ..DEFAULT_CASES[4]
        };
        let report = run_case(&small_plan(), 4, &case, dir.path()).unwrap();

        let sent = std::fs::read(dir.path().join("channel.rc")).unwrap();
        let received = std::fs::read(dir.path().join("channel.out")).unwrap();
        let protect = repetition::HEADER_SIZE + 3 * report.header_len;
        assert_eq!(sent[..protect], received[..protect]);
        assert!(report.channel_flips > 0);
    }

    #[test]
    fn test_rates_scale_with_rs() {
        let dir = tempfile::tempdir().unwrap();
        let plan = ExperimentPlan {
            rs: 2.0,
            ..small_plan()
        };
        let base = run_case(&small_plan(), 6, &DEFAULT_CASES[6], &dir.path().join("a")).unwrap();
        let scaled = run_case(&plan, 6, &DEFAULT_CASES[6], &dir.path().join("b")).unwrap();

        assert!(close(scaled.info_rate, 2.0 * base.info_rate));
        assert!(close(
            scaled.channel_data_rate.unwrap(),
            2.0 * base.channel_data_rate.unwrap()
        ));
        assert!(close(
            scaled.theoretical_channel_data_rate,
            2.0 * base.theoretical_channel_data_rate
        ));
        assert!(close(scaled.theoretical_info_rate, 2.0 * base.theoretical_info_rate));
        // Capacity is per channel use
        assert!(close(scaled.bsc_capacity, base.bsc_capacity));
    }

    #[test]
    fn test_run_plan_writes_results() {
        let dir = tempfile::tempdir().unwrap();
        let plan = ExperimentPlan {
            msg_length: 1024,
            ..small_plan()
        };
        let reports = run_plan(&plan, dir.path()).unwrap();

        assert_eq!(reports.len(), 8);
        for i in 1..=8 {
            assert!(dir.path().join(format!("case_{i}")).join("noise.dat").exists());
        }
        let text = std::fs::read_to_string(dir.path().join(RESULTS_FILE)).unwrap();
        assert_eq!(text.lines().count(), 9);
    }
}
