//! Binding seam to the columnar database engine under measurement.
//!
//! The drivers only ever import a table, run one `SELECT`, fetch its result
//! through one of the two export paths and drop the table again.
//! [`ExportEngine`] captures exactly that surface; [`MemoryEngine`] is the
//! in-process backend used for dry runs and tests.

mod memory;

use std::path::PathBuf;

use arrow::array::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use memory::MemoryEngine;

/// Fragment size used when a table is imported with `fragment_size == 0`.
pub const DEFAULT_FRAGMENT_SIZE: usize = 32_000_000;

/// Startup options for an engine handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Catalog directory the engine owns.
    pub data_dir: PathBuf,
    /// Port of the SQL planner sidecar.
    pub calcite_port: u16,
    /// Produce results in columnar layout.
    pub columnar_output: bool,
    /// Defer result materialization until a fetch call.
    pub lazy_fetch: bool,
    /// Log the duration of each export conversion.
    pub debug_timer: bool,
    /// Rows per fragment when an import passes 0.
    pub default_fragment_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("omnitmp"),
            calcite_port: 4564,
            columnar_output: true,
            lazy_fetch: false,
            debug_timer: true,
            default_fragment_size: DEFAULT_FRAGMENT_SIZE,
        }
    }
}

/// Result handle returned by [`ExportEngine::execute_dml`].
pub trait ResultCursor {
    /// Materializes the whole result as one batch.
    fn fetch_table(&mut self) -> Result<RecordBatch>;
    /// Returns the result as it is stored, one batch per fragment.
    fn fetch_record_batches(&mut self) -> Result<Vec<RecordBatch>>;
}

/// Operations the drivers need from an engine.
pub trait ExportEngine {
    /// Imports `batch` as table `name`, sharded into `fragment_size` rows
    /// (0 selects the engine default).
    fn import_table(&mut self, name: &str, batch: RecordBatch, fragment_size: usize) -> Result<()>;
    /// Runs a DDL statement.
    fn execute_ddl(&mut self, sql: &str) -> Result<()>;
    /// Runs a query and returns a cursor over its result.
    fn execute_dml(&self, sql: &str) -> Result<Box<dyn ResultCursor + '_>>;
}
