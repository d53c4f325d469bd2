//! Line charts of history columns, written as single-page PDFs.

use std::fs;
use std::path::{Path, PathBuf};

use pdf_writer::{Content, Finish, Pdf, Rect, Ref};
use tracing::debug;

use crate::error::{BenchError, Result};
use crate::history::{History, Metric};

const PAGE_WIDTH: f32 = 460.8;
const PAGE_HEIGHT: f32 = 345.6;
const MARGIN: f32 = 36.0;
const TICKS: usize = 5;
const TICK_LEN: f32 = 4.0;
const MARKER: f32 = 3.0;

/// Plot area inside the page, in PDF points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlotArea {
    /// Left edge.
    pub x0: f32,
    /// Bottom edge.
    pub y0: f32,
    /// Right edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
}

impl Default for PlotArea {
    fn default() -> Self {
        Self {
            x0: MARGIN,
            y0: MARGIN,
            x1: PAGE_WIDTH - MARGIN,
            y1: PAGE_HEIGHT - MARGIN,
        }
    }
}

fn value_range(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi - lo > f64::EPSILON * hi.abs().max(1.0) {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    } else {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
        (lo - pad, hi + pad)
    }
}

/// Maps run index and value into `area`. Non-finite values are skipped.
pub fn plot_points(values: &[f64], area: PlotArea) -> Vec<(f32, f32)> {
    let finite: Vec<(usize, f64)> = values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .collect();
    if finite.is_empty() {
        return Vec::new();
    }
    let ys: Vec<f64> = finite.iter().map(|&(_, v)| v).collect();
    let (lo, hi) = value_range(&ys);
    let last = values.len().saturating_sub(1).max(1) as f32;
    let width = area.x1 - area.x0;
    let height = area.y1 - area.y0;
    finite
        .into_iter()
        .map(|(i, v)| {
            let x = if values.len() == 1 {
                area.x0 + width / 2.0
            } else {
                area.x0 + width * (i as f32 / last)
            };
            let y = area.y0 + height * ((v - lo) / (hi - lo)) as f32;
            (x, y)
        })
        .collect()
}

fn draw_axes(content: &mut Content, area: PlotArea) {
    content.set_line_width(0.8);
    content.set_stroke_rgb(0.0, 0.0, 0.0);
    content.rect(area.x0, area.y0, area.x1 - area.x0, area.y1 - area.y0);
    content.stroke();
    for tick in 0..=TICKS {
        let t = tick as f32 / TICKS as f32;
        let x = area.x0 + (area.x1 - area.x0) * t;
        let y = area.y0 + (area.y1 - area.y0) * t;
        content.move_to(x, area.y0);
        content.line_to(x, area.y0 - TICK_LEN);
        content.move_to(area.x0, y);
        content.line_to(area.x0 - TICK_LEN, y);
    }
    content.stroke();
}

fn draw_series(content: &mut Content, points: &[(f32, f32)]) {
    let Some(&(x, y)) = points.first() else {
        return;
    };
    content.set_line_width(1.5);
    content.set_stroke_rgb(0.12, 0.47, 0.71);
    content.set_fill_rgb(0.12, 0.47, 0.71);
    if points.len() > 1 {
        content.move_to(x, y);
        for &(x, y) in &points[1..] {
            content.line_to(x, y);
        }
        content.stroke();
    }
    for &(x, y) in points {
        content.rect(x - MARKER / 2.0, y - MARKER / 2.0, MARKER, MARKER);
    }
    content.fill_nonzero();
}

/// Encodes one chart of `values` as PDF bytes. No axis labels are drawn.
pub fn line_chart_pdf(values: &[f64]) -> Vec<u8> {
    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let page_id = Ref::new(3);
    let content_id = Ref::new(4);

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id).kids([page_id]).count(1);
    let mut page = pdf.page(page_id);
    page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
    page.parent(page_tree_id);
    page.contents(content_id);
    page.finish();

    let area = PlotArea::default();
    let mut content = Content::new();
    draw_axes(&mut content, area);
    draw_series(&mut content, &plot_points(values, area));
    pdf.stream(content_id, &content.finish());
    pdf.finish()
}

/// Writes a chart of `values` to `path`, replacing any existing file.
pub fn render_line_chart(values: &[f64], path: &Path) -> Result<()> {
    fs::write(path, line_chart_pdf(values)).map_err(|err| BenchError::persistence(path, err))
}

/// File name of the chart for `metric` and case `index`.
pub fn chart_file_name(metric: Metric, index: usize) -> String {
    format!("{}_{}.pdf", metric.label(), index)
}

/// Renders every tracked column of `history` into `out_dir`.
pub fn render_history(history: &History, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).map_err(|err| BenchError::persistence(out_dir, err))?;
    let mut written = Vec::new();
    for metric in Metric::ALL {
        for index in 0..history.width() {
            let path = out_dir.join(chart_file_name(metric, index));
            render_line_chart(&history.column(metric, index), &path)?;
            debug!(path = %path.display(), "chart written");
            written.push(path);
        }
    }
    Ok(written)
}
