//! Runs the prebuilt benchmark binary and forwards its stdout for CI logs.
#![forbid(unsafe_code)]

use std::io::{self, Write};

use clap::Parser;
use frag_bench::{
    logging::init_logging,
    runner::{run_capture, CommandSpec, DEFAULT_DATA_DIR, DEFAULT_PROGRAM},
    BenchError,
};

#[derive(Parser, Debug)]
#[command(
    name = "ci-runner",
    version,
    about = "Run the benchmark binary and print its stdout unmodified"
)]
struct Args {
    /// Benchmark executable.
    #[arg(long, env = "FRAG_BENCH_PROGRAM", default_value = DEFAULT_PROGRAM)]
    program: String,

    /// Directory passed to the benchmark as `--data`.
    #[arg(long, env = "FRAG_BENCH_DATA", default_value = DEFAULT_DATA_DIR)]
    data: String,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("ci-runner failed: {err}");
        std::process::exit(1);
    }
}

fn forward(stdout: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(stdout.as_bytes())?;
    out.flush()
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_level)?;
    let spec = CommandSpec::with_data_dir(args.program, args.data);
    match run_capture(&spec) {
        Ok(stdout) => forward(&stdout)?,
        Err(BenchError::ExitStatus {
            program,
            status,
            stdout,
        }) => {
            forward(&stdout)?;
            return Err(BenchError::ExitStatus {
                program,
                status,
                stdout: String::new(),
            }
            .into());
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
