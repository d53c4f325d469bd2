//! TOML configuration shared by the binaries.
//!
//! Every section has defaults, so an absent file or a partial file is valid.
//! Command-line flags are applied on top by the binaries.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::EngineOptions;
use crate::error::{BenchError, Result};
use crate::history::{DEFAULT_HISTORY_FILE, DEFAULT_SWEEP_HISTORY_FILE};
use crate::parse::OutputLayout;
use crate::runner::{CommandSpec, DEFAULT_DATA_DIR, DEFAULT_PROGRAM};
use crate::sampler::{SamplerOptions, DEFAULT_REPETITIONS};
use crate::sweep::{DEFAULT_TOTAL_ROWS, WIDE_FRAGMENT_COUNTS};

/// File picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "frag-bench.toml";

/// Fragment sweep driven through the engine by `perf-run sweep`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSection {
    /// Name of the synthetic table.
    pub table_name: String,
    /// Rows in the synthetic table.
    pub total_rows: usize,
    /// Fragment counts to visit, in order.
    pub fragment_counts: Vec<usize>,
    /// Timed pairs per point.
    pub repetitions: usize,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            table_name: "test".to_string(),
            total_rows: DEFAULT_TOTAL_ROWS,
            fragment_counts: vec![1],
            repetitions: DEFAULT_REPETITIONS,
        }
    }
}

impl SweepSection {
    /// Sampler parameters for this section.
    pub fn sampler_options(&self) -> SamplerOptions {
        SamplerOptions {
            table_name: self.table_name.clone(),
            total_rows: self.total_rows,
            repetitions: self.repetitions,
        }
    }
}

/// History file and chart directory of one driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTarget {
    /// JSON history file.
    pub path: PathBuf,
    /// Directory receiving the rendered charts.
    pub chart_dir: PathBuf,
}

impl HistoryTarget {
    fn new(path: &str, chart_dir: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            chart_dir: PathBuf::from(chart_dir),
        }
    }
}

/// Where each `perf-run` subcommand keeps its history and charts.
///
/// `bench` entries hold one value per case and `sweep` entries two per
/// point, so the two must never share a file or a chart directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Target of `perf-run bench`.
    pub bench: HistoryTarget,
    /// Target of `perf-run sweep`.
    pub sweep: HistoryTarget,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            bench: HistoryTarget::new(DEFAULT_HISTORY_FILE, "."),
            sweep: HistoryTarget::new(DEFAULT_SWEEP_HISTORY_FILE, "sweep_charts"),
        }
    }
}

/// Benchmark executable and its output layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchSection {
    /// Executable to run.
    pub program: String,
    /// Value passed as `--data`.
    pub data_dir: String,
    /// Positions of the case rows in stdout.
    pub layout: OutputLayout,
}

impl Default for BenchSection {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            data_dir: DEFAULT_DATA_DIR.to_string(),
            layout: OutputLayout::default(),
        }
    }
}

impl BenchSection {
    /// Command line for the benchmark.
    pub fn command(&self) -> CommandSpec {
        CommandSpec::with_data_dir(self.program.clone(), self.data_dir.clone())
    }
}

/// One-off wide sweep written to CSV by `profile sweep`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSection {
    /// Fragment counts to visit, in order.
    pub fragment_counts: Vec<usize>,
    /// Directory receiving the CSV and host metadata.
    pub output_dir: PathBuf,
}

impl Default for ProfileSection {
    fn default() -> Self {
        Self {
            fragment_counts: WIDE_FRAGMENT_COUNTS.to_vec(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Full configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Engine startup options.
    pub engine: EngineOptions,
    /// Engine sweep for the history driver.
    pub sweep: SweepSection,
    /// History and chart locations.
    pub history: HistorySection,
    /// Benchmark executable.
    pub bench: BenchSection,
    /// One-off profiling sweep.
    pub profile: ProfileSection,
}

impl BenchConfig {
    /// Reads `explicit`, or [`DEFAULT_CONFIG_FILE`] when it exists, or
    /// falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let contents = fs::read_to_string(&path)
            .map_err(|e| BenchError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml(&contents)
            .map_err(|e| BenchError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| BenchError::Config(e.to_string()))
    }

    /// Rejects values the drivers cannot run with.
    pub fn validate(&self) -> Result<()> {
        validate_counts("sweep", &self.sweep.fragment_counts)?;
        validate_counts("profile", &self.profile.fragment_counts)?;
        if self.sweep.total_rows == 0 {
            return Err(BenchError::Config("sweep.total_rows must be positive".into()));
        }
        if self.sweep.repetitions < 2 {
            return Err(BenchError::Config(
                "sweep.repetitions must be at least 2 to compute a standard deviation".into(),
            ));
        }
        if self.sweep.table_name.is_empty() || self.sweep.table_name.contains(char::is_whitespace) {
            return Err(BenchError::Config(format!(
                "sweep.table_name {:?} is not a valid identifier",
                self.sweep.table_name
            )));
        }
        if self.bench.layout.case_count == 0 {
            return Err(BenchError::Config("bench.layout.case_count must be positive".into()));
        }
        let (bench, sweep) = (&self.history.bench, &self.history.sweep);
        if bench.path == sweep.path {
            return Err(BenchError::Config(format!(
                "history.bench and history.sweep share {}",
                bench.path.display()
            )));
        }
        if bench.chart_dir == sweep.chart_dir {
            return Err(BenchError::Config(format!(
                "history.bench and history.sweep share chart directory {}",
                bench.chart_dir.display()
            )));
        }
        Ok(())
    }
}

fn validate_counts(section: &str, counts: &[usize]) -> Result<()> {
    if counts.is_empty() {
        return Err(BenchError::Config(format!("{section}.fragment_counts is empty")));
    }
    if counts.contains(&0) {
        return Err(BenchError::Config(format!(
            "{section}.fragment_counts must all be positive"
        )));
    }
    Ok(())
}
