use crate::{
    error::{ExtractError, Result},
    parser::EventKey,
    timestamps::{AnchorPolicy, RebasedRecord},
    units::TimeScale,
};
use serde::Serialize;
use std::collections::BTreeSet;

/// Rows handed to the chart unless configured otherwise.
pub const DEFAULT_PREVIEW_ROWS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: i64,
    pub duration: i64,
}

impl Interval {
    pub fn new(start: i64, duration: i64) -> Interval {
        Interval { start, duration }
    }

    /// `None` when the duration does not fit an `i64`.
    pub fn between(start: i64, end: i64) -> Option<Interval> {
        Some(Interval {
            start,
            duration: end.checked_sub(start)?,
        })
    }

    /// Saturates at `i64::MAX`.
    pub fn end(&self) -> i64 {
        self.start.saturating_add(self.duration)
    }
}

/// One block: a segment list per stage, in stage order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    index: u32,
    label: String,
    segments: Vec<Vec<Interval>>,
}

impl Row {
    pub fn new(index: u32, segments: Vec<Vec<Interval>>) -> Row {
        Row {
            index,
            label: index.to_string(),
            segments,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn segments(&self) -> &[Vec<Interval>] {
        self.segments.as_ref()
    }
}

/// Inclusive sequence index range. A missing bound is taken from the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexBounds {
    pub first: Option<u32>,
    pub last: Option<u32>,
}

impl IndexBounds {
    pub fn new(first: Option<u32>, last: Option<u32>) -> IndexBounds {
        IndexBounds { first, last }
    }

    /// Indices to extract, ascending. An explicit range is walked lazily, it
    /// need not be backed by the log.
    pub fn resolve<'a>(
        &self,
        observed: &'a BTreeSet<u32>,
    ) -> Result<Box<dyn Iterator<Item = u32> + 'a>> {
        if self.first.is_none() && self.last.is_none() {
            return Ok(Box::new(observed.iter().copied()));
        }
        let first = self.first.or_else(|| observed.first().copied());
        let last = self.last.or_else(|| observed.last().copied());
        match (first, last) {
            (Some(first), Some(last)) if first > last => {
                Err(ExtractError::InvalidIndexRange { first, last })
            }
            (Some(first), Some(last)) => Ok(Box::new(first..=last)),
            _ => Ok(Box::new(std::iter::empty())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub anchor: EventKey,
    pub anchor_policy: AnchorPolicy,
    /// Stages to chart; `None` takes every stage in order of first appearance.
    pub stages: Option<Vec<String>>,
    pub bounds: IndexBounds,
    pub max_rows: Option<usize>,
    pub scale: TimeScale,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            anchor: EventKey::start("consensus", 1),
            anchor_policy: AnchorPolicy::Required,
            stages: None,
            bounds: IndexBounds::default(),
            max_rows: Some(DEFAULT_PREVIEW_ROWS),
            scale: TimeScale::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: String,
    pub count: usize,
    pub total: i64,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageIntervals {
    stages: Vec<String>,
    rows: Vec<Row>,
    #[serde(skip)]
    total_rows: usize,
}

impl StageIntervals {
    /// Every index in range must have a start and an end for every stage,
    /// including the rows cut off by `max_rows`.
    pub fn extract(record: &RebasedRecord, options: &ExtractOptions) -> Result<StageIntervals> {
        let stages = match &options.stages {
            Some(stages) => stages.clone(),
            None => record.stages().to_vec(),
        };
        let mut indices = options.bounds.resolve(record.indices())?.peekable();
        if stages.is_empty() || indices.peek().is_none() {
            return Err(ExtractError::NoStageData);
        }

        let lookup = |key: EventKey| -> Result<i64> {
            let value = record
                .get(&key)
                .ok_or_else(|| ExtractError::IncompleteStageData {
                    key: key.to_string(),
                })?;
            options
                .scale
                .convert(value)
                .ok_or(ExtractError::TimestampOverflow { value })
        };

        let mut rows = Vec::new();
        for index in indices {
            let mut segments = Vec::with_capacity(stages.len());
            for stage in &stages {
                let start = lookup(EventKey::start(stage, index))?;
                let end = lookup(EventKey::end(stage, index))?;
                if end < start {
                    return Err(ExtractError::ReversedInterval {
                        stage: stage.clone(),
                        index,
                        start,
                        end,
                    });
                }
                let interval = Interval::between(start, end)
                    .ok_or(ExtractError::TimestampOverflow { value: end })?;
                segments.push(vec![interval]);
            }
            rows.push(Row::new(index, segments));
        }

        let total_rows = rows.len();
        if let Some(max_rows) = options.max_rows {
            rows.truncate(max_rows);
        }

        Ok(StageIntervals {
            stages,
            rows,
            total_rows,
        })
    }

    pub fn stages(&self) -> &[String] {
        self.stages.as_ref()
    }

    pub fn rows(&self) -> &[Row] {
        self.rows.as_ref()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Rows extracted before truncation.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Flat view keyed `<stage>[<index>]`.
    pub fn stage_bars(&self) -> Vec<(String, Interval)> {
        let mut bars = Vec::new();
        for row in &self.rows {
            for (stage, segments) in self.stages.iter().zip(row.segments()) {
                for interval in segments {
                    bars.push((format!("{stage}[{}]", row.index()), *interval));
                }
            }
        }
        bars
    }

    pub fn summary(&self) -> Vec<StageSummary> {
        self.stages
            .iter()
            .enumerate()
            .map(|(position, stage)| {
                let durations: Vec<i64> = self
                    .rows
                    .iter()
                    .flat_map(|row| row.segments().get(position).into_iter().flatten())
                    .map(|interval| interval.duration)
                    .collect();

                let total = durations
                    .iter()
                    .fold(0i64, |total, &duration| total.saturating_add(duration));
                StageSummary {
                    stage: stage.clone(),
                    count: durations.len(),
                    total,
                    min: durations.iter().copied().min().unwrap_or(0),
                    max: durations.iter().copied().max().unwrap_or(0),
                    mean: if durations.is_empty() {
                        0.0
                    } else {
                        total as f64 / durations.len() as f64
                    },
                }
            })
            .collect()
    }
}
