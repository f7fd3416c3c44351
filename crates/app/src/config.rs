//! Experiment plan for the `simulate` command.
//!
//! A plan lists the cases to run (source distribution, which codecs to use,
//! channel error rate) plus the shared message length, repetition length,
//! source bit rate and seed. Plans are read from TOML; every field has a default, so an empty
//! file (or no file at all) yields the built-in eight-case plan.
//!
//! ```toml
//! msg_length = 102400
//! repeat_length = 3
//! rs = 1.0
//! seed = 7
//!
//! [[cases]]
//! prob0 = 0.1
//! source_codec = true
//! channel_codec = true
//! error_rate = 0.01
//! ```

use chansim_core::RepetitionCode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One experiment case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaseConfig {
    /// Probability that a source bit is 0
    pub prob0: f64,

    /// Whether to Huffman-encode the source
    pub source_codec: bool,

    /// Whether to repetition-encode before the channel
    pub channel_codec: bool,

    /// BSC crossover probability
    pub error_rate: f64,
}

impl CaseConfig {
    const fn new(prob0: f64, source_codec: bool, channel_codec: bool, error_rate: f64) -> Self {
        Self {
            prob0,
            source_codec,
            channel_codec,
            error_rate,
        }
    }
}

/// Default cases: a skewed source with and without each codec, an
/// equiprobable source over a noisy channel, and the clean-channel baselines.
pub const DEFAULT_CASES: [CaseConfig; 8] = [
    CaseConfig::new(0.1, true, false, 0.0),
    CaseConfig::new(0.1, false, false, 0.0),
    CaseConfig::new(0.5, false, true, 0.01),
    CaseConfig::new(0.5, false, false, 0.01),
    CaseConfig::new(0.1, true, true, 0.01),
    CaseConfig::new(0.1, true, false, 0.01),
    CaseConfig::new(0.1, false, true, 0.01),
    CaseConfig::new(0.1, false, false, 0.01),
];

/// Complete configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentPlan {
    /// Source length in bytes
    pub msg_length: usize,

    /// Repetition length for cases with channel coding
    pub repeat_length: u32,

    /// Source data rate in bits per second; scales every reported rate
    pub rs: f64,

    /// Base seed; each case derives its own source and noise seeds from it
    pub seed: u64,

    pub cases: Vec<CaseConfig>,
}

impl Default for ExperimentPlan {
    fn default() -> Self {
        Self {
            msg_length: 102_400,
            repeat_length: 3,
            rs: 1.0,
            seed: 0,
            cases: DEFAULT_CASES.to_vec(),
        }
    }
}

impl ExperimentPlan {
    /// Parse a plan from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let plan: Self = toml::from_str(text)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Load a plan from a TOML file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Check every parameter before any file is written.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        RepetitionCode::new(self.repeat_length)?;
        if !self.rs.is_finite() || self.rs <= 0.0 {
            return Err(format!("rs {} must be positive", self.rs).into());
        }
        for (i, case) in self.cases.iter().enumerate() {
            if !(0.0..=1.0).contains(&case.prob0) {
                return Err(format!("case {}: prob0 {} outside [0, 1]", i + 1, case.prob0).into());
            }
            if !(0.0..=1.0).contains(&case.error_rate) {
                return Err(
                    format!("case {}: error_rate {} outside [0, 1]", i + 1, case.error_rate).into(),
                );
            }
        }
        Ok(())
    }

    /// Source and noise seeds for case `index` (0-based).
    pub fn case_seeds(&self, index: usize) -> (u64, u64) {
        let base = self.seed.wrapping_add(2 * index as u64);
        (base, base.wrapping_add(1))
    }

    /// Log the resolved plan.
    pub fn log(&self) {
        tracing::info!(
            msg_length = self.msg_length,
            repeat_length = self.repeat_length,
            rs = self.rs,
            seed = self.seed,
            cases = self.cases.len(),
            "experiment plan"
        );
        for (i, case) in self.cases.iter().enumerate() {
            tracing::debug!(
                case = i + 1,
                prob0 = case.prob0,
                source_codec = case.source_codec,
                channel_codec = case.channel_codec,
                error_rate = case.error_rate,
                "case"
            );
        }
    }
}
