//! Command line interface.
//!
//! Every codec, the channel and the generators are exposed as standalone
//! subcommands working on files, and `simulate` chains them over an
//! experiment plan.

use crate::config::ExperimentPlan;
use crate::{input_gen, pipeline, report};
use chansim_core::{noise, repetition, source_codec, stats, RepetitionCode, SymbolWeights};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "chansim")]
#[command(version)]
#[command(about = "Source coding, channel coding and BSC simulation", long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Huffman-encode a file with a codebook built from a PMF table
    SourceEncode(SourceEncodeArgs),
    /// Decode a source codec file
    SourceDecode(DecodeArgs),
    /// Repetition-encode a file
    RepEncode(RepEncodeArgs),
    /// Majority-vote decode a repetition codec file
    RepDecode(DecodeArgs),
    /// Pass a file through the channel with a noise mask
    Channel(ChannelArgs),
    /// Write the byte PMF of i.i.d. bits with P(0) = prob0
    GenPmf(GenPmfArgs),
    /// Generate a source file from a PMF table
    GenSource(GenSourceArgs),
    /// Generate a bit-granular Bernoulli noise mask
    GenNoise(GenNoiseArgs),
    /// Count differing bytes and bits between two files
    Compare(CompareArgs),
    /// Empirical entropy of files, in bits per byte
    Entropy(EntropyArgs),
    /// Run an experiment plan end to end
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
pub struct SourceEncodeArgs {
    /// PMF table (symbol,weight CSV)
    pub pmf: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct RepEncodeArgs {
    /// Repetition length (odd, 3..=9)
    pub n: u32,
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct ChannelArgs {
    pub input: PathBuf,
    /// Noise mask, bit- or byte-granular
    pub noise: PathBuf,
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct GenPmfArgs {
    /// Probability that a bit is 0
    #[arg(long)]
    pub prob0: f64,
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct GenSourceArgs {
    pub pmf: PathBuf,
    pub output: PathBuf,
    /// Number of bytes to generate
    #[arg(long)]
    pub len: usize,
    #[arg(long, default_value = "0")]
    pub seed: u64,
}

#[derive(Args, Debug)]
pub struct GenNoiseArgs {
    /// Crossover probability
    #[arg(long)]
    pub p: f64,
    /// Codeword length in bytes
    #[arg(long)]
    pub len: usize,
    pub output: PathBuf,
    #[arg(long, default_value = "0")]
    pub seed: u64,
    /// Leading bytes to leave error-free
    #[arg(long, default_value = "0")]
    pub protect: usize,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    pub a: PathBuf,
    pub b: PathBuf,
}

#[derive(Args, Debug)]
pub struct EntropyArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Experiment plan (TOML); the built-in eight cases when omitted
    #[arg(long)]
    pub plan: Option<PathBuf>,
    #[arg(long, default_value = "data")]
    pub out_dir: PathBuf,
    /// Overrides the plan's seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Execute one subcommand.
pub fn execute(command: Command) -> CliResult {
    match command {
        Command::SourceEncode(args) => {
            let weights = SymbolWeights::load(&args.pmf)?;
            let report = source_codec::encode_file(&weights, &args.input, &args.output)?;
            info!(
                source_len = report.source_len,
                header_len = report.header_len,
                payload_len = report.payload_len,
                encoded_len = report.encoded_len(),
                ratio = ?report.compression_ratio(),
                "source encoded"
            );
        }
        Command::SourceDecode(args) => {
            let report = source_codec::decode_file(&args.input, &args.output)?;
            info!(
                encoded_len = report.encoded_len,
                decoded_len = report.decoded_len,
                "source decoded"
            );
        }
        Command::RepEncode(args) => {
            let code = RepetitionCode::new(args.n)?;
            let (source_len, payload_len) =
                repetition::encode_file(code, &args.input, &args.output)?;
            info!(n = code.n(), source_len, payload_len, "repetition encoded");
        }
        Command::RepDecode(args) => {
            let report = repetition::decode_file(&args.input, &args.output)?;
            info!(
                encoded_len = report.encoded_len,
                decoded_len = report.decoded_len,
                "repetition decoded"
            );
        }
        Command::Channel(args) => {
            let flips = noise::apply_file(&args.input, &args.noise, &args.output)?;
            info!(flips, "channel applied");
        }
        Command::GenPmf(args) => {
            let weights = input_gen::write_pmf(args.prob0, &args.output)?;
            info!(
                prob0 = args.prob0,
                entropy = stats::entropy(&weights),
                "PMF written"
            );
        }
        Command::GenSource(args) => {
            let weights = SymbolWeights::load(&args.pmf)?;
            let data = input_gen::write_source(&weights, args.len, args.seed, &args.output)?;
            info!(len = data.len(), entropy = stats::entropy_of(&data), "source written");
        }
        Command::GenNoise(args) => {
            let mask =
                input_gen::write_noise(args.p, args.len, args.seed, args.protect, &args.output)?;
            let flips = mask.iter().filter(|&&e| e != 0).count();
            info!(elements = mask.len(), flips, "noise mask written");
        }
        Command::Compare(args) => {
            let a = std::fs::read(&args.a)?;
            let b = std::fs::read(&args.b)?;
            let comparison = stats::compare(&a, &b);
            println!("compared bytes:   {}", comparison.compared_bytes);
            println!(
                "differing bytes:  {} ({:.6})",
                comparison.differing_bytes,
                comparison.byte_error_rate()
            );
            println!(
                "differing bits:   {} ({:.6})",
                comparison.differing_bits,
                comparison.bit_error_rate()
            );
            if !comparison.lengths_match() {
                println!(
                    "length mismatch:  {} vs {}",
                    comparison.len_a, comparison.len_b
                );
            }
        }
        Command::Entropy(args) => {
            for path in &args.files {
                let data = std::fs::read(path)?;
                println!(
                    "{}: {:.6} bits/byte ({} bytes)",
                    path.display(),
                    stats::entropy_of(&data),
                    data.len()
                );
            }
        }
        Command::Simulate(args) => {
            let mut plan = match &args.plan {
                Some(path) => ExperimentPlan::load(path)?,
                None => ExperimentPlan::default(),
            };
            if let Some(seed) = args.seed {
                plan.seed = seed;
            }
            let reports = pipeline::run_plan(&plan, &args.out_dir)?;
            report::print_summary(&reports);
        }
    }
    Ok(())
}
