use crate::{
    error::RenderError,
    layout::{ChartLayout, ChartSpec, SEGMENT_HEIGHT},
};
use perf_log_parser::Row;
use plotters::{coord::Shift, prelude::*};
use plotters_backend::text_anchor::{HPos, Pos, VPos};
use serde::Deserialize;
use std::{fmt, path::Path, str::FromStr};
use tracing::info;

const ARRIVAL_COLOR: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const TICK_LENGTH: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    /// `.svg` selects SVG, anything else PNG.
    pub fn from_path(path: &Path) -> ImageFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => ImageFormat::Svg,
            _ => ImageFormat::Png,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<ImageFormat, String> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            _ => Err(format!("unknown image format `{s}` (expected png or svg)")),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Lays out `rows` and writes the chart to `path`.
pub fn save_chart(rows: &[Row], spec: &ChartSpec, path: &Path) -> Result<ChartLayout, RenderError> {
    let layout = ChartLayout::compute(rows, spec)?;

    match ImageFormat::from_path(path) {
        ImageFormat::Png => draw(
            BitMapBackend::new(path, spec.size).into_drawing_area(),
            &layout,
            spec,
        ),
        ImageFormat::Svg => draw(
            SVGBackend::new(path, spec.size).into_drawing_area(),
            &layout,
            spec,
        ),
    }
    .map_err(|e| RenderError::Drawing {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    info!(path = %path.display(), rows = layout.rows.len(), "saved chart");
    Ok(layout)
}

pub fn draw<DB>(
    root: DrawingArea<DB, Shift>,
    layout: &ChartLayout,
    spec: &ChartSpec,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(spec.title.as_str(), ("sans-serif", 20).into_font())
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(layout.x_range.clone(), layout.y_range.clone())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_label_formatter(&|x| format!("{x:.0}"))
        .y_labels(0)
        .draw()?;

    // One tick and label per row, at the row's band center.
    let label_style =
        TextStyle::from(("sans-serif", 14).into_font()).pos(Pos::new(HPos::Right, VPos::Center));
    for row in &layout.rows {
        let (x, y) = chart.backend_coord(&(layout.x_range.start, row.tick));
        root.draw(&PathElement::new(
            vec![(x - TICK_LENGTH, y), (x, y)],
            BLACK.stroke_width(1),
        ))?;
        root.draw(&Text::new(
            row.label.clone(),
            (x - TICK_LENGTH - 3, y),
            label_style.clone(),
        ))?;
    }

    let arrival_style = TextStyle::from(("sans-serif", 12).into_font())
        .color(&ARRIVAL_COLOR)
        .pos(Pos::new(HPos::Center, VPos::Bottom));

    for row in &layout.rows {
        chart.draw_series(row.bars.iter().map(|bar| {
            Rectangle::new(
                [
                    (bar.interval.start as f64, row.lower),
                    (bar.interval.end() as f64, row.upper),
                ],
                layout.colors[bar.category].filled(),
            )
        }))?;

        let arrival = row.arrival as f64;
        chart.draw_series(std::iter::once(ErrorBar::new_vertical(
            arrival,
            row.tick - SEGMENT_HEIGHT / 2.0,
            row.tick,
            row.tick + SEGMENT_HEIGHT / 2.0,
            ARRIVAL_COLOR.filled(),
            6,
        )))?;
        if row.arrival != 0 {
            chart.draw_series(std::iter::once(Text::new(
                row.arrival.to_string(),
                (arrival, row.upper + 1.0),
                arrival_style.clone(),
            )))?;
        }
    }

    // Bars are drawn per row, so each category gets an empty series of its own
    // to carry the legend entry.
    for entry in &layout.legend {
        let color = entry.color;
        chart
            .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
            .label(entry.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}
