//! JSON-backed run history.
//!
//! The file holds `[time_series, cpu_series]`; each series has one entry per
//! run and each entry one value per tracked case. It is read and rewritten
//! whole on every run with no locking, so concurrent runs lose updates.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BenchError, Result};

/// History file of `perf-run bench` when none is configured.
pub const DEFAULT_HISTORY_FILE: &str = "perf_history.json";
/// History file of `perf-run sweep` when none is configured.
pub const DEFAULT_SWEEP_HISTORY_FILE: &str = "sweep_history.json";

/// The two tracked series.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    /// Wall-clock time.
    Time,
    /// CPU time.
    Cpu,
}

impl Metric {
    /// Both metrics in file order.
    pub const ALL: [Metric; 2] = [Metric::Time, Metric::Cpu];

    /// Lowercase name used in file names.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Time => "time",
            Metric::Cpu => "cpu",
        }
    }
}

type RawHistory = (Vec<Vec<f64>>, Vec<Vec<f64>>);

/// Accumulated per-run entries for both metrics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawHistory", into = "RawHistory")]
pub struct History {
    time: Vec<Vec<f64>>,
    cpu: Vec<Vec<f64>>,
}

impl From<RawHistory> for History {
    fn from((time, cpu): RawHistory) -> Self {
        Self { time, cpu }
    }
}

impl From<History> for RawHistory {
    fn from(history: History) -> Self {
        (history.time, history.cpu)
    }
}

fn check_arity(series: &'static str, entries: &[Vec<f64>], width: usize) -> Result<()> {
    match entries.last() {
        Some(last) if last.len() != width => Err(BenchError::ArityMismatch {
            series,
            expected: last.len(),
            found: width,
        }),
        _ => Ok(()),
    }
}

fn check_finite(series: &'static str, entry: &[f64]) -> Result<()> {
    match entry.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(BenchError::NonFinite {
            series,
            index,
            value: entry[index],
        }),
        None => Ok(()),
    }
}

impl History {
    /// Reads `path`, or returns the empty history if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no history yet");
                return Ok(Self::default());
            }
            Err(err) => return Err(BenchError::persistence(path, err)),
        };
        serde_json::from_slice(&data).map_err(|err| BenchError::persistence(path, err))
    }

    /// Rewrites `path` with the full history.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| BenchError::persistence(parent, err))?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|err| BenchError::persistence(path, err))?;
        fs::write(path, json).map_err(|err| BenchError::persistence(path, err))
    }

    /// Fails unless a run of `width` values per series could be appended.
    pub fn ensure_width(&self, width: usize) -> Result<()> {
        check_arity("time", &self.time, width)?;
        check_arity("cpu", &self.cpu, width)
    }

    /// Appends one run. Both entries must keep the width of earlier runs,
    /// match each other and hold only finite values.
    pub fn append(&mut self, time: Vec<f64>, cpu: Vec<f64>) -> Result<()> {
        check_arity("time", &self.time, time.len())?;
        check_arity("cpu", &self.cpu, cpu.len())?;
        check_finite("time", &time)?;
        check_finite("cpu", &cpu)?;
        if time.len() != cpu.len() {
            return Err(BenchError::ArityMismatch {
                series: "cpu",
                expected: time.len(),
                found: cpu.len(),
            });
        }
        self.time.push(time);
        self.cpu.push(cpu);
        Ok(())
    }

    /// Number of recorded runs.
    pub fn runs(&self) -> usize {
        self.time.len()
    }

    /// Values per run, or 0 for an empty history.
    pub fn width(&self) -> usize {
        self.time.last().map_or(0, Vec::len)
    }

    /// All entries of `metric`.
    pub fn series(&self, metric: Metric) -> &[Vec<f64>] {
        match metric {
            Metric::Time => &self.time,
            Metric::Cpu => &self.cpu,
        }
    }

    /// Value of case `index` in every run that has it.
    pub fn column(&self, metric: Metric, index: usize) -> Vec<f64> {
        self.series(metric)
            .iter()
            .filter_map(|entry| entry.get(index).copied())
            .collect()
    }
}

/// Load, append and save in one step. Returns the updated history.
pub fn record_run(path: &Path, time: Vec<f64>, cpu: Vec<f64>) -> Result<History> {
    let mut history = History::load(path)?;
    history.append(time, cpu)?;
    history.save(path)?;
    info!(path = %path.display(), runs = history.runs(), width = history.width(), "history updated");
    Ok(history)
}
