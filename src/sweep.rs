use serde::Serialize;

use crate::error::{BenchError, Result};

/// Row count used by the profiling scripts when none is configured.
pub const DEFAULT_TOTAL_ROWS: usize = 30_000_000;

/// Fragment counts swept by `profile sweep`.
pub const WIDE_FRAGMENT_COUNTS: &[usize] = &[
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 150, 200, 250, 300,
];

/// One fragmentation configuration of the synthetic table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SweepPoint {
    /// Requested number of fragments.
    pub fragment_count: usize,
    /// Rows per fragment handed to the engine.
    pub fragment_size: usize,
}

/// `total_rows / fragment_count`, truncated. The remainder is not
/// redistributed, so the engine may create one extra short fragment.
pub fn fragment_size(total_rows: usize, fragment_count: usize) -> Result<usize> {
    if fragment_count == 0 {
        return Err(BenchError::Config("fragment count must be positive".into()));
    }
    Ok(total_rows / fragment_count)
}

impl SweepPoint {
    /// Derives the fragment size for `fragment_count`.
    pub fn new(total_rows: usize, fragment_count: usize) -> Result<Self> {
        Ok(Self {
            fragment_count,
            fragment_size: fragment_size(total_rows, fragment_count)?,
        })
    }
}

/// Points for each count in order.
pub fn sweep_points(total_rows: usize, fragment_counts: &[usize]) -> Result<Vec<SweepPoint>> {
    fragment_counts
        .iter()
        .map(|&count| SweepPoint::new(total_rows, count))
        .collect()
}
