//! Extracts per-block stage intervals from `performance statistic:` log lines.
//!
//! ```text
//! 2023/06/14 10:21:07 performance statistic: consensus[s][1]: 1686738067000000000
//! ```
//!
//! Every marker line carries one `<stage>[s|e][<index>]: <timestamp>` event.
//! Timestamps are rebased on an anchor event and paired into start/duration
//! intervals, one row per sequence index.

pub mod error;
pub mod intervals;
pub mod parser;
pub mod timestamps;
pub mod units;

pub use error::{ExtractError, Result};
pub use intervals::{ExtractOptions, IndexBounds, Interval, Row, StageIntervals, StageSummary};
pub use parser::{EventKey, Phase};
pub use timestamps::{AnchorPolicy, RebasedRecord, TimestampRecord};
pub use units::{TimeScale, TimeUnit};

use std::path::Path;
use tracing::{debug, info};

/// Parses, rebases and pairs the events of one log file.
pub fn extract_file<P: AsRef<Path>>(path: P, options: &ExtractOptions) -> Result<StageIntervals> {
    let path = path.as_ref();
    let record = TimestampRecord::parse_file(path)?;
    let record = record.rebase(&options.anchor, options.anchor_policy)?;

    if let Some(time) = options.scale.source.wall_clock(record.reference()) {
        debug!(anchor = %options.anchor, reference = record.reference(), %time, "rebased on anchor");
    }

    let intervals = StageIntervals::extract(&record, options)?;
    info!(
        path = %path.display(),
        stages = intervals.stages().len(),
        blocks = intervals.total_rows(),
        rows = intervals.rows().len(),
        "extracted stage intervals"
    );
    Ok(intervals)
}
