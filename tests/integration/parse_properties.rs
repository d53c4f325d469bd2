#![allow(missing_docs)]

use frag_bench::parse::{parse_cases, OutputLayout};
use frag_bench::stats::{mean, Speedup};
use frag_bench::sweep::{fragment_size, SweepPoint};
use proptest::prelude::*;

fn arb_padding() -> impl Strategy<Value = String> {
    "[ \t]{0,4}"
}

fn arb_row() -> impl Strategy<Value = (String, u32, u32)> {
    ("[a-z][a-z0-9_]{0,10}", 0u32..1_000_000, 0u32..1_000_000)
}

proptest! {
    #[test]
    fn prop_whitespace_does_not_change_values(
        rows in prop::collection::vec((arb_row(), arb_padding(), arb_padding(), arb_padding()), 4),
    ) {
        let mut out = String::from("Benchmark Time CPU Iterations\n----------------\n");
        for ((name, time, cpu), lead, sep, trail) in &rows {
            out.push_str(&format!("{lead}{name}{sep} {time}\tms {cpu}{sep} ms 1{trail}\n"));
        }
        let cases = parse_cases(&out, &OutputLayout::default()).unwrap();
        prop_assert_eq!(cases.len(), 4);
        for (case, ((name, time, cpu), _, _, _)) in cases.iter().zip(&rows) {
            prop_assert_eq!(&case.name, name);
            prop_assert_eq!(case.time, f64::from(*time));
            prop_assert_eq!(case.cpu, f64::from(*cpu));
        }
    }

    #[test]
    fn prop_fragment_size_truncates(total in 1usize..50_000_000, count in 1usize..10_000) {
        let size = fragment_size(total, count).unwrap();
        prop_assert_eq!(size, total / count);
        prop_assert!(size * count <= total);
        prop_assert!(total - size * count < count);
    }

    #[test]
    fn prop_fragment_size_boundaries(total in 1usize..10_000_000) {
        prop_assert_eq!(SweepPoint::new(total, total).unwrap().fragment_size, 1);
        prop_assert_eq!(SweepPoint::new(total, 1).unwrap().fragment_size, total);
    }

    #[test]
    fn prop_speedup_approx_is_ratio_of_means(
        pairs in prop::collection::vec((1e-6f64..10.0, 1e-6f64..10.0), 2..50),
    ) {
        let (a, b): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let sp = Speedup::from_pairs(&a, &b).unwrap();
        let expected = mean(&b).unwrap() / mean(&a).unwrap();
        prop_assert!((sp.approx - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        prop_assert!(sp.mean.is_finite() && sp.stdev >= 0.0);
    }
}
