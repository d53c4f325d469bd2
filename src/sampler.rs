//! Timed sampling of the two export paths at each sweep point.

use std::sync::Arc;
use std::time::Instant;

use arrow::array::{ArrayRef, Int64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use cpu_time::ProcessTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::ExportEngine;
use crate::error::{BenchError, Result};
use crate::stats::{Speedup, Summary};
use crate::sweep::SweepPoint;

/// Value stored in every row of the synthetic table.
pub const FILL_VALUE: i64 = 4;
/// Repetitions per sweep point unless configured otherwise.
pub const DEFAULT_REPETITIONS: usize = 100;

/// Parameters shared by every point of a sweep.
#[derive(Clone, Debug)]
pub struct SamplerOptions {
    /// Name of the synthetic table.
    pub table_name: String,
    /// Rows in the synthetic table.
    pub total_rows: usize,
    /// Timed pairs per point.
    pub repetitions: usize,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            table_name: "test".to_string(),
            total_rows: crate::sweep::DEFAULT_TOTAL_ROWS,
            repetitions: DEFAULT_REPETITIONS,
        }
    }
}

impl SamplerOptions {
    fn select_sql(&self) -> String {
        format!("SELECT a FROM {};", self.table_name)
    }
}

/// Wall and process-CPU seconds of one call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timing {
    /// Elapsed wall-clock seconds.
    pub wall: f64,
    /// Process CPU seconds consumed during the call.
    pub cpu: f64,
}

fn measure<T>(f: impl FnOnce() -> Result<T>) -> Result<(T, Timing)> {
    let cpu_start = ProcessTime::try_now()
        .map_err(|e| BenchError::Stats(format!("process cpu clock unavailable: {e}")))?;
    let wall_start = Instant::now();
    let out = f()?;
    let wall = wall_start.elapsed().as_secs_f64();
    let cpu = cpu_start
        .try_elapsed()
        .map_err(|e| BenchError::Stats(format!("process cpu clock unavailable: {e}")))?
        .as_secs_f64();
    Ok((out, Timing { wall, cpu }))
}

/// Raw timings for one sweep point.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBatch {
    /// Point the samples were taken at.
    pub point: SweepPoint,
    /// `fetch_table` timings.
    pub table: Vec<Timing>,
    /// `fetch_record_batches` timings.
    pub batches: Vec<Timing>,
}

/// Reduced statistics for one sweep point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PointReport {
    /// Point the statistics describe.
    pub point: SweepPoint,
    /// Wall time of the single-table path.
    pub table: Summary,
    /// Wall time of the record-batch path.
    pub batches: Summary,
    /// Record-batch time relative to single-table time.
    pub speedup: Speedup,
    /// CPU time of the single-table path.
    pub table_cpu: Summary,
    /// CPU time of the record-batch path.
    pub batches_cpu: Summary,
}

fn walls(timings: &[Timing]) -> Vec<f64> {
    timings.iter().map(|t| t.wall).collect()
}

fn cpus(timings: &[Timing]) -> Vec<f64> {
    timings.iter().map(|t| t.cpu).collect()
}

impl SampleBatch {
    /// Zero timings for `repetitions` pairs, without touching an engine.
    pub fn dry(point: SweepPoint, repetitions: usize) -> Self {
        Self {
            point,
            table: vec![Timing::default(); repetitions],
            batches: vec![Timing::default(); repetitions],
        }
    }

    /// Reduces the samples; needs at least two repetitions.
    pub fn reduce(&self) -> Result<PointReport> {
        let table = walls(&self.table);
        let batches = walls(&self.batches);
        Ok(PointReport {
            point: self.point,
            table: Summary::from_samples(&table)?,
            batches: Summary::from_samples(&batches)?,
            speedup: Speedup::from_pairs(&table, &batches)?,
            table_cpu: Summary::from_samples(&cpus(&self.table))?,
            batches_cpu: Summary::from_samples(&cpus(&self.batches))?,
        })
    }
}

/// Single Int64 column `a` holding [`FILL_VALUE`] in every row.
pub fn synthetic_batch(rows: usize) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int64, false)]));
    let column: ArrayRef = Arc::new(Int64Array::from_value(FILL_VALUE, rows));
    Ok(RecordBatch::try_new(schema, vec![column])?)
}

/// Imports the synthetic table sharded at `fragment_size`.
pub fn build_table<E: ExportEngine + ?Sized>(
    engine: &mut E,
    name: &str,
    rows: usize,
    fragment_size: usize,
) -> Result<()> {
    engine.import_table(name, synthetic_batch(rows)?, fragment_size)
}

/// Issues `DROP TABLE <name>;`.
pub fn drop_table<E: ExportEngine + ?Sized>(engine: &mut E, name: &str) -> Result<()> {
    engine.execute_ddl(&format!("DROP TABLE {name};"))
}

fn profile_pair<E: ExportEngine + ?Sized>(engine: &E, sql: &str) -> Result<(Timing, Timing)> {
    let mut cursor = engine.execute_dml(sql)?;
    let (_, table) = measure(|| cursor.fetch_table())?;
    let (_, batches) = measure(|| cursor.fetch_record_batches())?;
    Ok((table, batches))
}

fn run_repetitions<E: ExportEngine + ?Sized>(
    engine: &E,
    opts: &SamplerOptions,
    point: SweepPoint,
) -> Result<SampleBatch> {
    let sql = opts.select_sql();
    let mut batch = SampleBatch {
        point,
        table: Vec::with_capacity(opts.repetitions),
        batches: Vec::with_capacity(opts.repetitions),
    };
    for _ in 0..opts.repetitions {
        let (table, batches) = profile_pair(engine, &sql)?;
        batch.table.push(table);
        batch.batches.push(batches);
    }
    Ok(batch)
}

/// Builds the table for `point`, times `opts.repetitions` export pairs and
/// drops the table. The drop runs even if sampling failed; the sampling
/// error is the one returned.
pub fn sample_point<E: ExportEngine + ?Sized>(
    engine: &mut E,
    opts: &SamplerOptions,
    point: SweepPoint,
) -> Result<SampleBatch> {
    build_table(engine, &opts.table_name, opts.total_rows, point.fragment_size)?;
    let sampled = run_repetitions(engine, opts, point);
    let dropped = drop_table(engine, &opts.table_name);
    match (sampled, dropped) {
        (Ok(batch), Ok(())) => Ok(batch),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(drop_err)) => {
            warn!(table = %opts.table_name, error = %drop_err, "table left behind after failed sampling");
            Err(err)
        }
    }
}

/// Samples and reduces every point in order. The first error aborts the
/// sweep. With `dry_run` the engine is never called.
pub fn run_sweep<E: ExportEngine + ?Sized>(
    engine: &mut E,
    opts: &SamplerOptions,
    points: &[SweepPoint],
    dry_run: bool,
) -> Result<Vec<PointReport>> {
    let mut reports = Vec::with_capacity(points.len());
    for &point in points {
        info!(
            fragment_count = point.fragment_count,
            fragment_size = point.fragment_size,
            "profiling"
        );
        let batch = if dry_run {
            SampleBatch::dry(point, opts.repetitions)
        } else {
            sample_point(engine, opts, point)?
        };
        let report = batch.reduce()?;
        info!(
            table_cv = report.table.coefficient_of_variation(),
            batches_cv = report.batches.coefficient_of_variation(),
            speedup = report.speedup.approx,
            "point done"
        );
        reports.push(report);
    }
    Ok(reports)
}

/// History entries for a sweep: per point, the single-table then the
/// record-batch mean.
pub fn history_entries(reports: &[PointReport]) -> (Vec<f64>, Vec<f64>) {
    let time = reports
        .iter()
        .flat_map(|r| [r.table.mean, r.batches.mean])
        .collect();
    let cpu = reports
        .iter()
        .flat_map(|r| [r.table_cpu.mean, r.batches_cpu.mean])
        .collect();
    (time, cpu)
}

fn fetch_once<E: ExportEngine + ?Sized>(engine: &E, sql: &str) -> Result<Timing> {
    let mut cursor = engine.execute_dml(sql)?;
    let (table, timing) = measure(|| cursor.fetch_table())?;
    info!(rows = table.num_rows(), wall = timing.wall, "fetched table");
    Ok(timing)
}

/// Builds the table, times one `fetch_table` and drops the table.
pub fn single_invocation<E: ExportEngine + ?Sized>(
    engine: &mut E,
    opts: &SamplerOptions,
    point: SweepPoint,
) -> Result<Timing> {
    build_table(engine, &opts.table_name, opts.total_rows, point.fragment_size)?;
    let timed = fetch_once(engine, &opts.select_sql());
    let dropped = drop_table(engine, &opts.table_name);
    let timing = timed?;
    dropped?;
    Ok(timing)
}
