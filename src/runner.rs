//! Invocation of the prebuilt benchmark executable.

use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{BenchError, Result};

/// Program run by `ci-runner` when no override is given.
pub const DEFAULT_PROGRAM: &str = "build/bin/taxi_reduced";
/// Data directory passed via `--data` when no override is given.
pub const DEFAULT_DATA_DIR: &str = "data";

/// A program plus its positional/flag arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    /// Path to the executable.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Builds `<program> --data <data_dir>`.
    pub fn with_data_dir(program: impl Into<String>, data_dir: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["--data".to_string(), data_dir.into()],
        }
    }

    /// Space-joined rendering, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for CommandSpec {
    fn default() -> Self {
        Self::with_data_dir(DEFAULT_PROGRAM, DEFAULT_DATA_DIR)
    }
}

/// Runs `spec` to completion and returns its stdout as text.
///
/// Stderr is inherited. A non-zero exit yields [`BenchError::ExitStatus`]
/// with the captured stdout attached.
pub fn run_capture(spec: &CommandSpec) -> Result<String> {
    info!(command = %spec.display(), "running benchmark");
    let output = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| BenchError::Launch {
            program: spec.program.clone(),
            source,
        })?;
    let stdout = String::from_utf8(output.stdout)
        .map_err(|e| BenchError::parse(0, format!("stdout is not valid UTF-8: {e}")))?;
    debug!(bytes = stdout.len(), status = %output.status, "benchmark finished");
    if !output.status.success() {
        return Err(BenchError::ExitStatus {
            program: spec.program.clone(),
            status: output.status.to_string(),
            stdout,
        });
    }
    Ok(stdout)
}
