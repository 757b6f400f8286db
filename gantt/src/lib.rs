//! Gantt charts of per-block stage intervals.
//!
//! [`ChartLayout::compute`] turns rows of segment lists into chart geometry
//! (axis ranges, row ticks, one color per category); [`save_chart`] draws it
//! with `plotters` to a PNG or SVG file.

pub mod error;
pub mod layout;
pub mod palette;
pub mod render;

pub use error::RenderError;
pub use layout::{ChartLayout, ChartSpec, LegendEntry, RowGeometry};
pub use render::{ImageFormat, draw, save_chart};
