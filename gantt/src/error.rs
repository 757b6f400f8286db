use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("nothing to draw: no rows")]
    NoRows,

    #[error("nothing to draw: no segments")]
    NoSegments,

    #[error("latest segment ends at {max_time}, the time axis would be empty")]
    EmptyTimeSpan { max_time: i64 },

    #[error("row {row} has {segments} segment lists for {categories} categories")]
    CategoryMismatch {
        row: String,
        segments: usize,
        categories: usize,
    },

    #[error("{arrivals} arrival times given for {rows} rows")]
    ArrivalCountMismatch { rows: usize, arrivals: usize },

    #[error("failed to draw {}: {message}", .path.display())]
    Drawing { path: PathBuf, message: String },
}
