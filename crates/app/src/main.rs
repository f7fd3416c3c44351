//! chansim: information-theory pipeline simulator
//!
//! ## Usage
//!
//! ```bash
//! # Run the built-in eight-case experiment into ./data
//! chansim simulate
//!
//! # Custom plan, reproducible seed
//! chansim simulate --plan plan.toml --out-dir results --seed 7
//!
//! # Individual stages
//! chansim gen-pmf --prob0 0.1 pmf.csv
//! chansim gen-source pmf.csv source.dat --len 102400
//! chansim source-encode pmf.csv source.dat source.hc
//! chansim rep-encode 3 source.hc source.rc
//! chansim gen-noise --p 0.01 --len 98765 noise.dat --protect 5
//! chansim channel source.rc noise.dat received.rc
//! chansim rep-decode received.rc received.hc
//! chansim source-decode received.hc received.dat
//! chansim compare source.dat received.dat
//! ```

mod cli;
mod config;
mod input_gen;
mod pipeline;
mod report;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() {
    let cli = cli::Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if let Err(e) = cli::execute(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
