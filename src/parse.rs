//! Positional extraction of per-case timings from benchmark console output.
//!
//! The benchmark binary prints one row per test case with whitespace
//! separated columns. Nothing in the output describes its own layout, so the
//! positions live in [`OutputLayout`] and default to the CI layout: four
//! cases, time in field 1, cpu in field 3.

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// Where the case rows and their fields sit in the output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    /// Lines to skip before the first case row. `None` starts after the
    /// last line made only of `-`.
    pub skip_lines: Option<usize>,
    /// Number of case rows to read.
    pub case_count: usize,
    /// Zero-based field index holding the wall time.
    pub time_field: usize,
    /// Zero-based field index holding the cpu time.
    pub cpu_field: usize,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            skip_lines: None,
            case_count: 4,
            time_field: 1,
            cpu_field: 3,
        }
    }
}

/// One extracted row.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkCase {
    /// First field of the row.
    pub name: String,
    /// Value in the time column, as printed.
    pub time: f64,
    /// Value in the cpu column, as printed.
    pub cpu: f64,
}

fn is_rule(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '-')
}

fn first_case_line(lines: &[&str], layout: &OutputLayout) -> usize {
    match layout.skip_lines {
        Some(skip) => skip,
        None => lines
            .iter()
            .rposition(|line| is_rule(line))
            .map_or(0, |idx| idx + 1),
    }
}

fn field(fields: &[&str], index: usize, line_no: usize, what: &str) -> Result<f64> {
    let raw = fields.get(index).ok_or_else(|| {
        BenchError::parse(
            line_no,
            format!("missing {what} field {index} (row has {} fields)", fields.len()),
        )
    })?;
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(BenchError::parse(
            line_no,
            format!("{what} field {index} is not a finite number: {raw:?}"),
        )),
    }
}

/// Extracts `layout.case_count` rows from `stdout`.
pub fn parse_cases(stdout: &str, layout: &OutputLayout) -> Result<Vec<BenchmarkCase>> {
    let lines: Vec<&str> = stdout.lines().collect();
    let start = first_case_line(&lines, layout);
    let mut cases = Vec::with_capacity(layout.case_count);
    for (idx, line) in lines.iter().enumerate().skip(start) {
        if cases.len() == layout.case_count {
            break;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        cases.push(BenchmarkCase {
            name: fields[0].to_string(),
            time: field(&fields, layout.time_field, line_no, "time")?,
            cpu: field(&fields, layout.cpu_field, line_no, "cpu")?,
        });
    }
    if cases.len() < layout.case_count {
        return Err(BenchError::parse(
            0,
            format!(
                "expected {} case rows, found {}",
                layout.case_count,
                cases.len()
            ),
        ));
    }
    Ok(cases)
}

/// Splits parsed cases into the `(time, cpu)` history entries.
pub fn history_entries(cases: &[BenchmarkCase]) -> (Vec<f64>, Vec<f64>) {
    cases.iter().map(|case| (case.time, case.cpu)).unzip()
}
