//! One-off profiling of the table and record-batch export paths.
#![forbid(unsafe_code)]

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use frag_bench::{
    config::BenchConfig,
    engine::MemoryEngine,
    env::RunEnvironment,
    logging::init_logging,
    report::{metadata_path, print_table, profile_file_name, write_csv, write_metadata, RunMetadata},
    sampler::{run_sweep, single_invocation},
    sweep::{sweep_points, SweepPoint},
    BenchError,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "profile",
    version,
    about = "Time Arrow export paths for manual profiling sessions",
    disable_help_subcommand = true
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "FRAG_BENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Rows in the synthetic table.
    #[arg(long, global = true)]
    rows: Option<usize>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the table once and time a single table export.
    Single(SingleCmd),
    /// Sweep fragment counts and write the summary CSV.
    Sweep(SweepCmd),
}

#[derive(Args, Debug)]
struct SingleCmd {
    /// Number of fragments to shard the table into.
    #[arg(long, default_value_t = 1)]
    fragments: usize,
}

#[derive(Args, Debug)]
struct SweepCmd {
    /// Fragment count to visit; repeat for several.
    #[arg(long = "fragment-count")]
    fragment_counts: Vec<usize>,

    /// Timed pairs per point.
    #[arg(long)]
    repetitions: Option<usize>,

    /// Directory receiving the CSV.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Record zero timings without calling the engine.
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("profile failed: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let mut cfg = BenchConfig::load(cli.config.as_deref())?;
    if let Some(rows) = cli.rows {
        cfg.sweep.total_rows = rows;
    }
    match cli.command {
        Command::Single(cmd) => run_single(cfg, cmd),
        Command::Sweep(cmd) => run_profile_sweep(cfg, cmd),
    }
}

fn run_single(cfg: BenchConfig, cmd: SingleCmd) -> Result<(), Box<dyn std::error::Error>> {
    cfg.validate()?;
    let point = SweepPoint::new(cfg.sweep.total_rows, cmd.fragments)?;
    let mut engine = MemoryEngine::open(cfg.engine.clone())?;
    let opts = cfg.sweep.sampler_options();
    info!(table = %opts.table_name, rows = opts.total_rows, fragment_size = point.fragment_size, "running single export");
    let timing = single_invocation(&mut engine, &opts, point)?;
    println!(
        "fetch_table: elapsed {:.6} s wall, {:.6} s cpu (rows: {})",
        timing.wall, timing.cpu, opts.total_rows
    );
    Ok(())
}

fn run_profile_sweep(mut cfg: BenchConfig, cmd: SweepCmd) -> Result<(), Box<dyn std::error::Error>> {
    if !cmd.fragment_counts.is_empty() {
        cfg.profile.fragment_counts = cmd.fragment_counts;
    }
    if let Some(repetitions) = cmd.repetitions {
        cfg.sweep.repetitions = repetitions;
    }
    if let Some(dir) = cmd.output_dir {
        cfg.profile.output_dir = dir;
    }
    cfg.validate()?;

    let started = Local::now();
    let points = sweep_points(cfg.sweep.total_rows, &cfg.profile.fragment_counts)?;
    let mut engine = MemoryEngine::open(cfg.engine.clone())?;
    let opts = cfg.sweep.sampler_options();
    let reports = run_sweep(&mut engine, &opts, &points, cmd.dry_run)?;
    print_table(&mut io::stdout().lock(), &reports)?;

    let out_dir = &cfg.profile.output_dir;
    fs::create_dir_all(out_dir).map_err(|e| BenchError::Persistence {
        path: out_dir.clone(),
        message: e.to_string(),
    })?;
    let csv_path = out_dir.join(profile_file_name(opts.total_rows, started));
    write_csv(&csv_path, &reports)?;
    let meta = RunMetadata {
        total_rows: opts.total_rows,
        repetitions: opts.repetitions,
        engine: &cfg.engine,
        environment: RunEnvironment::collect(&cfg.engine.data_dir),
        points: &reports,
    };
    write_metadata(&metadata_path(&csv_path), &meta)?;
    println!("## SAVED TO: {}", csv_path.display());
    Ok(())
}
