use crate::parser::ParseError;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read log")]
    Read(#[from] io::Error),

    #[error("malformed line {line}")]
    MalformedLine {
        line: usize,
        #[source]
        reason: ParseError,
    },

    #[error("anchor event `{key}` not found in log")]
    MissingAnchorEvent { key: String },

    #[error("incomplete stage data: `{key}` not found in log")]
    IncompleteStageData { key: String },

    #[error("`{stage}` of block {index} ends at {end} before it starts at {start}")]
    ReversedInterval {
        stage: String,
        index: u32,
        start: i64,
        end: i64,
    },

    #[error("first index {first} is past last index {last}")]
    InvalidIndexRange { first: u32, last: u32 },

    #[error("log contains no stage data")]
    NoStageData,

    #[error("timestamp {value} is out of range for an interval in the requested time unit")]
    TimestampOverflow { value: i64 },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
