//! CSV and console output of a profiling sweep.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use csv::Writer;
use serde::Serialize;

use crate::engine::EngineOptions;
use crate::env::RunEnvironment;
use crate::error::{BenchError, Result};
use crate::sampler::PointReport;

/// Column headers of the profiling CSV, index column first.
pub const CSV_HEADER: [&str; 9] = [
    "fragments_count",
    "fragment_size",
    "getArrowTable.mean",
    "getArrowTable.stdev",
    "getArrowRecordBatch.mean",
    "getArrowRecordBatch.stdev",
    "speedup.mean",
    "speedup.stdev",
    "speedup.approx",
];

/// `PROFILING-RUN_N<rows>_<YYYYmmdd_HH:MM:SS>.csv`
pub fn profile_file_name(total_rows: usize, at: DateTime<Local>) -> String {
    format!(
        "PROFILING-RUN_N{}_{}.csv",
        total_rows,
        at.format("%Y%m%d_%H:%M:%S")
    )
}

fn row(report: &PointReport) -> [String; 9] {
    [
        report.point.fragment_count.to_string(),
        report.point.fragment_size.to_string(),
        report.table.mean.to_string(),
        report.table.stdev.to_string(),
        report.batches.mean.to_string(),
        report.batches.stdev.to_string(),
        report.speedup.mean.to_string(),
        report.speedup.stdev.to_string(),
        report.speedup.approx.to_string(),
    ]
}

/// Writes one row per point to `path`.
pub fn write_csv(path: &Path, reports: &[PointReport]) -> Result<()> {
    let mut writer = Writer::from_path(path).map_err(|e| BenchError::persistence(path, e))?;
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| BenchError::persistence(path, e))?;
    for report in reports {
        writer
            .write_record(row(report))
            .map_err(|e| BenchError::persistence(path, e))?;
    }
    writer.flush().map_err(|e| BenchError::persistence(path, e))
}

/// Prints the sweep as an aligned table.
pub fn print_table<W: Write>(out: &mut W, reports: &[PointReport]) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>15} {:>13} {:>12} {:>12} {:>12} {:>12} {:>10} {:>10} {:>10}",
        "FRAGMENTS", "FRAG_SIZE", "TABLE_MEAN", "TABLE_STDEV", "BATCH_MEAN", "BATCH_STDEV", "SP_MEAN", "SP_STDEV", "SP_APPROX"
    )?;
    for r in reports {
        writeln!(
            out,
            "{:>15} {:>13} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>10.4} {:>10.4} {:>10.4}",
            r.point.fragment_count,
            r.point.fragment_size,
            r.table.mean,
            r.table.stdev,
            r.batches.mean,
            r.batches.stdev,
            r.speedup.mean,
            r.speedup.stdev,
            r.speedup.approx
        )?;
    }
    Ok(())
}

/// Parameters, environment and full per-point statistics of a profiling
/// run, stored next to its CSV.
#[derive(Debug, Serialize)]
pub struct RunMetadata<'a> {
    /// Rows in the synthetic table.
    pub total_rows: usize,
    /// Timed pairs per point.
    pub repetitions: usize,
    /// Engine options the run used.
    pub engine: &'a EngineOptions,
    /// Host, build and storage snapshot.
    pub environment: RunEnvironment,
    /// Every reduced point, including the medians and cpu summaries the
    /// CSV leaves out.
    pub points: &'a [PointReport],
}

/// `<csv stem>.env.json` beside `csv_path`.
pub fn metadata_path(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("env.json")
}

/// Writes `meta` as pretty JSON.
pub fn write_metadata(path: &Path, meta: &RunMetadata<'_>) -> Result<()> {
    let json = serde_json::to_vec_pretty(meta).map_err(|e| BenchError::persistence(path, e))?;
    fs::write(path, json).map_err(|e| BenchError::persistence(path, e))
}
