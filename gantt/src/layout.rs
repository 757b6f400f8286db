use crate::{error::RenderError, palette};
use perf_log_parser::{Interval, Row};
use plotters::style::RGBColor;
use std::ops::Range;

/// Height of a row's bar band in chart units.
pub const SEGMENT_HEIGHT: f64 = 6.0;
/// Headroom to the right of the latest segment end.
pub const X_MARGIN: f64 = 1.06;
/// Vertical distance between row ticks.
const ROW_PITCH: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    /// Legend names, positionally parallel to every row's segment lists.
    pub categories: Vec<String>,
    /// One per row; empty means no arrivals. 0 draws the marker without a label.
    pub arrivals: Vec<i64>,
    pub x_label: String,
    pub y_label: String,
    pub size: (u32, u32),
}

impl ChartSpec {
    pub fn new(title: impl Into<String>, categories: Vec<String>) -> ChartSpec {
        ChartSpec {
            title: title.into(),
            categories,
            arrivals: Vec::new(),
            x_label: "seconds since start".to_string(),
            y_label: "Process".to_string(),
            size: (1000, 300),
        }
    }

    pub fn with_arrivals(mut self, arrivals: Vec<i64>) -> ChartSpec {
        self.arrivals = arrivals;
        self
    }

    pub fn with_x_label(mut self, x_label: impl Into<String>) -> ChartSpec {
        self.x_label = x_label.into();
        self
    }

    pub fn with_y_label(mut self, y_label: impl Into<String>) -> ChartSpec {
        self.y_label = y_label.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> ChartSpec {
        self.size = (width, height);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub category: usize,
    pub interval: Interval,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowGeometry {
    pub label: String,
    pub tick: f64,
    pub lower: f64,
    pub upper: f64,
    pub arrival: i64,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: RGBColor,
}

/// Chart geometry in data coordinates, independent of any backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
    pub rows: Vec<RowGeometry>,
    pub colors: Vec<RGBColor>,
    pub legend: Vec<LegendEntry>,
}

impl ChartLayout {
    pub fn compute(rows: &[Row], spec: &ChartSpec) -> Result<ChartLayout, RenderError> {
        if rows.is_empty() {
            return Err(RenderError::NoRows);
        }
        if !spec.arrivals.is_empty() && spec.arrivals.len() != rows.len() {
            return Err(RenderError::ArrivalCountMismatch {
                rows: rows.len(),
                arrivals: spec.arrivals.len(),
            });
        }
        for row in rows {
            if row.segments().len() != spec.categories.len() {
                return Err(RenderError::CategoryMismatch {
                    row: row.label().to_string(),
                    segments: row.segments().len(),
                    categories: spec.categories.len(),
                });
            }
        }

        let max_time = rows
            .iter()
            .flat_map(|row| row.segments().iter().flatten())
            .map(Interval::end)
            .max()
            .ok_or(RenderError::NoSegments)?;
        if max_time <= 0 {
            return Err(RenderError::EmptyTimeSpan { max_time });
        }

        let count = rows.len();
        let ticks = linspace(count as f64 * ROW_PITCH + 5.0, 15.0, count);
        let colors = palette::sample(spec.categories.len());

        let rows = rows
            .iter()
            .zip(ticks)
            .enumerate()
            .map(|(i, (row, tick))| {
                let lower = tick - SEGMENT_HEIGHT / 2.0;
                let bars = row
                    .segments()
                    .iter()
                    .enumerate()
                    .flat_map(|(category, segments)| {
                        segments.iter().map(move |&interval| Bar { category, interval })
                    })
                    .collect();
                RowGeometry {
                    label: row.label().to_string(),
                    tick,
                    lower,
                    upper: lower + SEGMENT_HEIGHT,
                    arrival: spec.arrivals.get(i).copied().unwrap_or(0),
                    bars,
                }
            })
            .collect();

        let legend = spec
            .categories
            .iter()
            .zip(&colors)
            .map(|(label, &color)| LegendEntry {
                label: label.clone(),
                color,
            })
            .collect();

        Ok(ChartLayout {
            x_range: 0.0..max_time as f64 * X_MARGIN,
            y_range: 0.0..count as f64 * ROW_PITCH + 20.0,
            rows,
            colors,
            legend,
        })
    }
}

/// `count` evenly spaced values from `start` to `stop`, both included.
fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}
