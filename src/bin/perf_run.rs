//! Performance history driver.
//!
//! `bench` parses the benchmark binary's console table, `sweep` times the
//! two export paths across fragment counts. Each appends one entry per
//! series to its own history file and re-renders its charts.
#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use frag_bench::{
    chart::render_history,
    config::{BenchConfig, HistoryTarget},
    engine::MemoryEngine,
    history::{record_run, History},
    logging::init_logging,
    parse::{history_entries, parse_cases},
    report::print_table,
    runner::run_capture,
    sampler::{self, run_sweep},
    sweep::sweep_points,
    BenchError,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "perf-run",
    version,
    about = "Record benchmark results into the JSON history and chart them",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// TOML configuration file.
    #[arg(long, global = true, env = "FRAG_BENCH_CONFIG")]
    config: Option<PathBuf>,

    /// History file override for the running subcommand.
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Chart directory override for the running subcommand.
    #[arg(long, global = true)]
    chart_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the benchmark binary and record its per-case time and cpu.
    Bench(BenchCmd),
    /// Sweep fragment counts through the engine and record mean timings.
    Sweep(SweepCmd),
}

#[derive(Args, Debug)]
struct BenchCmd {
    /// Benchmark executable override.
    #[arg(long)]
    program: Option<String>,

    /// `--data` directory override.
    #[arg(long)]
    data: Option<String>,
}

#[derive(Args, Debug)]
struct SweepCmd {
    /// Rows in the synthetic table.
    #[arg(long)]
    rows: Option<usize>,

    /// Fragment count to visit; repeat for several.
    #[arg(long = "fragment-count")]
    fragment_counts: Vec<usize>,

    /// Timed pairs per point.
    #[arg(long)]
    repetitions: Option<usize>,

    /// Record zero timings without calling the engine.
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("perf-run failed: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli { common, command } = Cli::parse();
    init_logging(&common.log_level)?;
    let mut cfg = BenchConfig::load(common.config.as_deref())?;

    let (target, time, cpu) = match command {
        Command::Bench(cmd) => {
            if let Some(program) = cmd.program {
                cfg.bench.program = program;
            }
            if let Some(data) = cmd.data {
                cfg.bench.data_dir = data;
            }
            override_target(&mut cfg.history.bench, &common);
            cfg.validate()?;
            let target = cfg.history.bench.clone();
            ensure_fits(&target, cfg.bench.layout.case_count)?;
            let (time, cpu) = bench_entries(&cfg)?;
            (target, time, cpu)
        }
        Command::Sweep(cmd) => {
            if let Some(rows) = cmd.rows {
                cfg.sweep.total_rows = rows;
            }
            if !cmd.fragment_counts.is_empty() {
                cfg.sweep.fragment_counts = cmd.fragment_counts;
            }
            if let Some(repetitions) = cmd.repetitions {
                cfg.sweep.repetitions = repetitions;
            }
            override_target(&mut cfg.history.sweep, &common);
            cfg.validate()?;
            let target = cfg.history.sweep.clone();
            ensure_fits(&target, 2 * cfg.sweep.fragment_counts.len())?;
            let (time, cpu) = sweep_entries(&cfg, cmd.dry_run)?;
            (target, time, cpu)
        }
    };

    let history = record_run(&target.path, time, cpu)?;
    let charts = render_history(&history, &target.chart_dir)?;
    info!(
        runs = history.runs(),
        charts = charts.len(),
        dir = %target.chart_dir.display(),
        "charts rendered"
    );
    Ok(())
}

fn override_target(target: &mut HistoryTarget, common: &CommonArgs) {
    if let Some(path) = &common.history {
        target.path = path.clone();
    }
    if let Some(dir) = &common.chart_dir {
        target.chart_dir = dir.clone();
    }
}

/// Fails before any measurement if the run could not be recorded.
fn ensure_fits(target: &HistoryTarget, width: usize) -> frag_bench::Result<()> {
    History::load(&target.path)?.ensure_width(width)
}

fn bench_entries(cfg: &BenchConfig) -> Result<(Vec<f64>, Vec<f64>), Box<dyn std::error::Error>> {
    let stdout = match run_capture(&cfg.bench.command()) {
        Ok(stdout) => stdout,
        Err(BenchError::ExitStatus {
            program,
            status,
            stdout,
        }) => {
            io::stdout().write_all(stdout.as_bytes())?;
            return Err(BenchError::ExitStatus {
                program,
                status,
                stdout: String::new(),
            }
            .into());
        }
        Err(err) => return Err(err.into()),
    };
    io::stdout().write_all(stdout.as_bytes())?;
    let cases = parse_cases(&stdout, &cfg.bench.layout)?;
    for case in &cases {
        info!(case = %case.name, time = case.time, cpu = case.cpu, "parsed case");
    }
    Ok(history_entries(&cases))
}

fn sweep_entries(
    cfg: &BenchConfig,
    dry_run: bool,
) -> Result<(Vec<f64>, Vec<f64>), Box<dyn std::error::Error>> {
    let points = sweep_points(cfg.sweep.total_rows, &cfg.sweep.fragment_counts)?;
    let mut engine = MemoryEngine::open(cfg.engine.clone())?;
    let reports = run_sweep(&mut engine, &cfg.sweep.sampler_options(), &points, dry_run)?;
    print_table(&mut io::stdout().lock(), &reports)?;
    Ok(sampler::history_entries(&reports))
}
