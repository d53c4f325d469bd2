//! Benchmark orchestration for columnar export paths.
//!
//! Runs the prebuilt benchmark binary for CI, sweeps fragment sizes through
//! an [`engine::ExportEngine`] to compare single-table and record-batch
//! export, and keeps a JSON history of results with one PDF chart per
//! tracked value.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chart;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod history;
pub mod logging;
pub mod parse;
pub mod report;
pub mod runner;
pub mod sampler;
pub mod stats;
pub mod sweep;

pub use error::{BenchError, Result};
