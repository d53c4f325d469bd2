#![allow(missing_docs)]

use frag_bench::chart::render_history;
use frag_bench::engine::{EngineOptions, ExportEngine, MemoryEngine};
use frag_bench::history::{record_run, History};
use frag_bench::sampler::{self, run_sweep, SamplerOptions};
use frag_bench::sweep::{sweep_points, SweepPoint};
use tempfile::TempDir;

#[test]
fn thirty_million_rows_single_fragment() {
    let dir = TempDir::new().expect("tempdir");
    let history_path = dir.path().join("history.json");
    record_run(&history_path, vec![0.0, 0.0], vec![0.0, 0.0]).unwrap();
    let before = History::load(&history_path).unwrap().runs();

    let point = SweepPoint::new(30_000_000, 1).unwrap();
    assert_eq!(point.fragment_size, 30_000_000);

    let mut engine = MemoryEngine::open(EngineOptions::default()).expect("engine");
    let opts = SamplerOptions::default();
    assert_eq!(opts.repetitions, 100);
    let reports = run_sweep(&mut engine, &opts, &[point], false).expect("sweep");
    let report = &reports[0];
    assert!(report.table.mean >= 0.0 && report.table.stdev >= 0.0);
    assert!(report.batches.mean >= 0.0 && report.batches.stdev >= 0.0);
    assert!(!engine.has_table(&opts.table_name));

    let (time, cpu) = sampler::history_entries(&reports);
    let history = record_run(&history_path, time, cpu).unwrap();
    assert_eq!(history.runs(), before + 1);
}

#[test]
fn multi_point_sweep_feeds_history_and_charts() {
    let dir = TempDir::new().expect("tempdir");
    let history_path = dir.path().join("history.json");
    let chart_dir = dir.path().join("charts");

    let opts = SamplerOptions {
        table_name: "frag_sweep".into(),
        total_rows: 10_000,
        repetitions: 5,
    };
    let points = sweep_points(opts.total_rows, &[1, 3, 10_000]).unwrap();
    let mut engine = MemoryEngine::open(EngineOptions {
        lazy_fetch: true,
        ..EngineOptions::default()
    })
    .unwrap();

    for run in 1..=2 {
        let reports = run_sweep(&mut engine, &opts, &points, false).unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[2].point.fragment_size, 1);
        let (time, cpu) = sampler::history_entries(&reports);
        let history = record_run(&history_path, time, cpu).unwrap();
        assert_eq!(history.runs(), run);
        assert_eq!(history.width(), 6);

        let charts = render_history(&history, &chart_dir).unwrap();
        assert_eq!(charts.len(), 12);
        assert!(charts.iter().all(|p| p.exists()));
    }
    assert!(chart_dir.join("time_5.pdf").exists());
    assert!(chart_dir.join("cpu_0.pdf").exists());
}

#[test]
fn table_is_rebuilt_for_each_point() {
    let mut engine = MemoryEngine::open(EngineOptions::default()).unwrap();
    let opts = SamplerOptions {
        table_name: "t".into(),
        total_rows: 100,
        repetitions: 2,
    };
    for count in [1, 7, 100] {
        let point = SweepPoint::new(opts.total_rows, count).unwrap();
        sampler::build_table(&mut engine, &opts.table_name, opts.total_rows, point.fragment_size)
            .unwrap();
        let expected = opts.total_rows.div_ceil(point.fragment_size);
        assert_eq!(engine.fragment_count("t"), Some(expected));
        let mut cursor = engine.execute_dml("SELECT a FROM t;").unwrap();
        assert_eq!(cursor.fetch_record_batches().unwrap().len(), expected);
        assert_eq!(cursor.fetch_table().unwrap().num_rows(), 100);
        drop(cursor);
        sampler::drop_table(&mut engine, "t").unwrap();
    }
}
