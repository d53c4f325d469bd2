use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{BenchError, Result};

/// Installs the stderr subscriber used by every binary.
///
/// `RUST_LOG` takes precedence; `level` is the fallback directive.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| BenchError::Config(format!("invalid log level: {e}")))?,
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| BenchError::Config("logging already initialized".into()))
}
