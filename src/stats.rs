//! Reduction of timing samples.

use serde::Serialize;
use statrs::statistics::{Data, Median, Statistics};

use crate::error::{BenchError, Result};

/// Added to every denominator when computing speedup ratios.
pub const SPEEDUP_EPSILON: f64 = 1e-12;

/// Arithmetic mean. Fails on an empty slice.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(BenchError::Stats("mean requires at least one sample".into()));
    }
    Ok(values.iter().mean())
}

/// Median; the average of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(BenchError::Stats("median requires at least one sample".into()));
    }
    Ok(Data::new(values.to_vec()).median())
}

/// Sample standard deviation (n - 1 denominator). Needs two samples.
pub fn stdev(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(BenchError::Stats(format!(
            "stdev requires at least two samples, got {}",
            values.len()
        )));
    }
    Ok(values.iter().std_dev())
}

/// Mean, median and standard deviation of one sample sequence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Summary {
    /// Arithmetic mean.
    pub mean: f64,
    /// Median.
    pub median: f64,
    /// Sample standard deviation.
    pub stdev: f64,
}

impl Summary {
    /// Reduces `values`; requires at least two samples.
    pub fn from_samples(values: &[f64]) -> Result<Self> {
        Ok(Self {
            mean: mean(values)?,
            median: median(values)?,
            stdev: stdev(values)?,
        })
    }

    /// `stdev / mean`, or 0 when the mean is 0.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            self.stdev / self.mean
        }
    }
}

/// Ratio statistics of method B over method A.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Speedup {
    /// Mean of the per-sample ratios.
    pub mean: f64,
    /// Standard deviation of the per-sample ratios.
    pub stdev: f64,
    /// Ratio of the two means.
    pub approx: f64,
}

/// `b / a` with [`SPEEDUP_EPSILON`] guarding the denominator.
pub fn guarded_ratio(b: f64, a: f64) -> f64 {
    b / (a + SPEEDUP_EPSILON)
}

impl Speedup {
    /// Compares the paired samples `b[i]` against `a[i]`.
    pub fn from_pairs(a: &[f64], b: &[f64]) -> Result<Self> {
        if a.len() != b.len() {
            return Err(BenchError::Stats(format!(
                "paired samples differ in length: {} vs {}",
                a.len(),
                b.len()
            )));
        }
        let ratios: Vec<f64> = a
            .iter()
            .zip(b)
            .map(|(&a, &b)| guarded_ratio(b, a))
            .collect();
        Ok(Self {
            mean: mean(&ratios)?,
            stdev: stdev(&ratios)?,
            approx: guarded_ratio(mean(b)?, mean(a)?),
        })
    }
}
