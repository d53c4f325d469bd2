use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Failure categories for benchmark orchestration.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The benchmark executable could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that was being spawned.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
    /// The benchmark executable ran but reported failure.
    #[error("{program} exited with {status}")]
    ExitStatus {
        /// Program that failed.
        program: String,
        /// Rendered exit status.
        status: String,
        /// Stdout captured before the failure.
        stdout: String,
    },
    /// Benchmark output did not match the expected layout.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// One-based line number, or 0 when the whole output is at fault.
        line: usize,
        /// Description of the mismatch.
        message: String,
    },
    /// A call into the database engine failed.
    #[error("engine error: {0}")]
    Engine(String),
    /// Reading or writing a persisted artifact failed.
    #[error("persistence error for {}: {message}", .path.display())]
    Persistence {
        /// File the operation was targeting.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
    /// A history entry does not match the width of earlier entries.
    #[error("{series} entry has {found} values, history tracks {expected}")]
    ArityMismatch {
        /// Series being appended to.
        series: &'static str,
        /// Width of existing entries.
        expected: usize,
        /// Width of the rejected entry.
        found: usize,
    },
    /// A history value is NaN or infinite and cannot be stored as JSON.
    #[error("{series} value {index} is not finite: {value}")]
    NonFinite {
        /// Series being appended to.
        series: &'static str,
        /// Position of the offending value in the entry.
        index: usize,
        /// The rejected value.
        value: f64,
    },
    /// Configuration could not be read or is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A statistic could not be computed from the samples.
    #[error("statistics error: {0}")]
    Stats(String),
}

impl BenchError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        BenchError::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn engine(message: impl Into<String>) -> Self {
        BenchError::Engine(message.into())
    }

    pub(crate) fn persistence(path: impl AsRef<Path>, message: impl ToString) -> Self {
        BenchError::Persistence {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }
}

impl From<arrow::error::ArrowError> for BenchError {
    fn from(err: arrow::error::ArrowError) -> Self {
        BenchError::Engine(err.to_string())
    }
}
