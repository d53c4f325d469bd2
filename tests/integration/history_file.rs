#![allow(missing_docs)]

use std::fs;

use frag_bench::history::{record_run, History, Metric};
use frag_bench::BenchError;
use tempfile::TempDir;

#[test]
fn missing_file_starts_empty() {
    let dir = TempDir::new().expect("tempdir");
    let history = History::load(&dir.path().join("absent.json")).expect("load");
    assert_eq!(history.runs(), 0);
    assert_eq!(history.width(), 0);
}

#[test]
fn append_to_empty_file_writes_single_entry() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("history.json");
    fs::write(&path, "[[], []]").unwrap();

    let w = vec![0.5, 1.5, 2.5, 3.5];
    record_run(&path, w.clone(), w.clone()).expect("record");

    let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw, serde_json::json!([[w.clone()], [w]]));
}

#[test]
fn identical_runs_produce_equal_entries() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("nested").join("history.json");
    let time = vec![412.0, 655.0, 1203.0, 1987.0];
    let cpu = vec![398.0, 641.0, 1190.0, 1960.0];
    record_run(&path, time.clone(), cpu.clone()).unwrap();
    let history = record_run(&path, time.clone(), cpu.clone()).unwrap();

    let reloaded = History::load(&path).unwrap();
    assert_eq!(reloaded, history);
    let series = reloaded.series(Metric::Time);
    assert_eq!(series.len(), 2);
    assert_eq!(series[0], series[1]);
    assert_eq!(reloaded.series(Metric::Cpu)[1], cpu);
}

#[test]
fn malformed_history_is_persistence_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("history.json");
    fs::write(&path, "{not json").unwrap();
    match History::load(&path) {
        Err(BenchError::Persistence { path: p, .. }) => assert_eq!(p, path),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(record_run(&path, vec![1.0], vec![1.0]).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
}

#[test]
fn width_mismatch_leaves_file_untouched() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("history.json");
    record_run(&path, vec![1.0, 2.0], vec![3.0, 4.0]).unwrap();
    let before = fs::read(&path).unwrap();
    let err = record_run(&path, vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]).unwrap_err();
    assert!(matches!(err, BenchError::ArityMismatch { .. }));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn non_finite_run_keeps_history_readable() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("history.json");
    record_run(&path, vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 2.0, 3.0, 4.0]).unwrap();

    let err = record_run(&path, vec![f64::NAN, 2.0, f64::INFINITY, 4.0], vec![1.0; 4]).unwrap_err();
    assert!(matches!(err, BenchError::NonFinite { series: "time", index: 0, .. }));

    let history = record_run(&path, vec![5.0; 4], vec![6.0; 4]).expect("file still loads");
    assert_eq!(history.runs(), 2);
    assert!(!fs::read_to_string(&path).unwrap().contains("null"));
}

#[test]
fn nan_tokens_in_benchmark_output_never_reach_the_file() {
    use frag_bench::parse::{parse_cases, OutputLayout};

    let out = "-----\nq1 nan ms 1 ms\nq2 2 ms 2 ms\nq3 inf ms 3 ms\nq4 4 ms 4 ms\n";
    let err = parse_cases(out, &OutputLayout::default()).unwrap_err();
    assert!(matches!(err, BenchError::Parse { line: 2, .. }));
}
