#![allow(missing_docs)]
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use frag_bench::history::{History, Metric};
use tempfile::TempDir;

const CONSOLE: &str = "\
Run on (8 X 3000 MHz CPU s)
-----------------------------------------------------
Benchmark           Time             CPU   Iterations
-----------------------------------------------------
taxi_q1          412 ms          398 ms            2
taxi_q2          655 ms          641 ms            1
taxi_q3         1203 ms         1190 ms            1
taxi_q4         1987 ms         1960 ms            1
";

fn fake_benchmark(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake_bench.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn console_benchmark(dir: &Path) -> PathBuf {
    let console = dir.join("console.txt");
    fs::write(&console, CONSOLE).unwrap();
    fake_benchmark(dir, &format!("cat '{}'", console.display()))
}

fn bin(name: &str, cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin(name).expect("binary");
    cmd.current_dir(cwd).env_remove("RUST_LOG").env_remove("FRAG_BENCH_CONFIG");
    cmd
}

#[test]
fn ci_runner_forwards_stdout_verbatim() {
    let dir = TempDir::new().unwrap();
    let script = fake_benchmark(dir.path(), "printf 'args: %s %s\\n  padded\\t\\n' \"$1\" \"$2\"");
    let output = bin("ci-runner", dir.path())
        .args(["--program", script.to_str().unwrap(), "--data", "datadir"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "args: --data datadir\n  padded\t\n");
}

#[test]
fn ci_runner_reports_child_failure() {
    let dir = TempDir::new().unwrap();
    let script = fake_benchmark(dir.path(), "echo before-crash; exit 2");
    let output = bin("ci-runner", dir.path())
        .args(["--program", script.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "before-crash\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("ci-runner failed"));
}

#[test]
fn ci_runner_missing_binary_fails() {
    let dir = TempDir::new().unwrap();
    bin("ci-runner", dir.path())
        .args(["--program", "./does-not-exist"])
        .assert()
        .failure();
}

#[test]
fn perf_run_bench_appends_history_and_charts() {
    let dir = TempDir::new().unwrap();
    let script = console_benchmark(dir.path());
    for _ in 0..2 {
        bin("perf-run", dir.path())
            .args(["bench", "--program", script.to_str().unwrap(), "--history", "h.json", "--chart-dir", "charts"])
            .assert()
            .success();
    }
    let history = History::load(&dir.path().join("h.json")).unwrap();
    assert_eq!(history.runs(), 2);
    assert_eq!(history.series(Metric::Time)[0], vec![412.0, 655.0, 1203.0, 1987.0]);
    assert_eq!(history.series(Metric::Cpu)[1], vec![398.0, 641.0, 1190.0, 1960.0]);
    for metric in ["time", "cpu"] {
        for idx in 0..4 {
            assert!(dir.path().join("charts").join(format!("{metric}_{idx}.pdf")).exists());
        }
    }
}

#[test]
fn perf_run_bench_rejects_unexpected_output() {
    let dir = TempDir::new().unwrap();
    let script = fake_benchmark(dir.path(), "echo nothing useful");
    bin("perf-run", dir.path())
        .args(["bench", "--program", script.to_str().unwrap(), "--history", "h.json"])
        .assert()
        .failure();
    assert!(!dir.path().join("h.json").exists());
}

#[test]
fn perf_run_bench_forwards_output_of_failed_benchmark() {
    let dir = TempDir::new().unwrap();
    let script = fake_benchmark(dir.path(), "echo partial-table; exit 3");
    let output = bin("perf-run", dir.path())
        .args(["bench", "--program", script.to_str().unwrap(), "--history", "h.json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "partial-table\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("perf-run failed"), "{stderr}");
    assert!(!dir.path().join("h.json").exists());
}

#[test]
fn bench_and_sweep_defaults_do_not_collide() {
    let dir = TempDir::new().unwrap();
    let script = console_benchmark(dir.path());
    bin("perf-run", dir.path())
        .args(["bench", "--program", script.to_str().unwrap()])
        .assert()
        .success();
    bin("perf-run", dir.path())
        .args(["sweep", "--dry-run", "--rows", "1000", "--repetitions", "3"])
        .assert()
        .success();

    let bench = History::load(&dir.path().join("perf_history.json")).unwrap();
    assert_eq!((bench.runs(), bench.width()), (1, 4));
    let sweep = History::load(&dir.path().join("sweep_history.json")).unwrap();
    assert_eq!((sweep.runs(), sweep.width()), (1, 2));
    assert!(dir.path().join("time_3.pdf").exists());
    assert!(dir.path().join("sweep_charts").join("time_1.pdf").exists());
    assert!(!dir.path().join("sweep_charts").join("time_2.pdf").exists());
}

#[test]
fn sweep_checks_history_width_before_sampling() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sweep.json");
    frag_bench::history::record_run(&path, vec![1.0; 4], vec![1.0; 4]).unwrap();
    let before = fs::read(&path).unwrap();

    let output = bin("perf-run", dir.path())
        .args(["sweep", "--rows", "1000", "--repetitions", "3", "--history", "sweep.json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty(), "sweep table printed before the width check");
    assert!(String::from_utf8_lossy(&output.stderr).contains("history tracks 4"));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn perf_run_dry_sweep_records_zero_timings() {
    let dir = TempDir::new().unwrap();
    bin("perf-run", dir.path())
        .args([
            "sweep", "--dry-run", "--rows", "1000", "--fragment-count", "1", "--fragment-count", "4",
            "--repetitions", "3", "--history", "sweep.json", "--chart-dir", "charts",
        ])
        .assert()
        .success();
    let history = History::load(&dir.path().join("sweep.json")).unwrap();
    assert_eq!(history.series(Metric::Time), &[vec![0.0; 4]]);
    assert!(dir.path().join("charts").join("cpu_3.pdf").exists());
}

#[test]
fn perf_run_sweep_rejects_single_repetition() {
    let dir = TempDir::new().unwrap();
    bin("perf-run", dir.path())
        .args(["sweep", "--rows", "10", "--repetitions", "1", "--history", "sweep.json"])
        .assert()
        .failure();
}

#[test]
fn profile_sweep_writes_csv_and_metadata() {
    let dir = TempDir::new().unwrap();
    let output = bin("profile", dir.path())
        .args([
            "--rows", "1000", "sweep", "--fragment-count", "1", "--fragment-count", "10",
            "--repetitions", "3", "--output-dir", "out",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("## SAVED TO:"));

    let entries: Vec<PathBuf> = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    let csv = entries
        .iter()
        .find(|p| p.extension().is_some_and(|e| e == "csv"))
        .expect("csv written");
    let name = csv.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("PROFILING-RUN_N1000_"));
    let mut reader = csv::Reader::from_path(csv).unwrap();
    assert_eq!(&reader.headers().unwrap()[0], "fragments_count");
    assert_eq!(reader.records().count(), 2);
    let meta = entries
        .iter()
        .find(|p| p.to_string_lossy().ends_with(".env.json"))
        .expect("metadata written");
    let meta: serde_json::Value = serde_json::from_slice(&fs::read(meta).unwrap()).unwrap();
    assert_eq!(meta["points"].as_array().map(Vec::len), Some(2));
    assert_eq!(meta["points"][1]["point"]["fragment_size"], 100);
}

#[test]
fn profile_single_runs_once() {
    let dir = TempDir::new().unwrap();
    let output = bin("profile", dir.path())
        .args(["--rows", "5000", "single", "--fragments", "5"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("fetch_table: elapsed"));
}
