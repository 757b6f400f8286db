use crate::{
    error::{ExtractError, Result},
    parser::{EventKey, LineParser, Record},
};
use std::collections::{BTreeSet, HashMap, hash_map::Entry};
use std::{fs::File, io::BufRead, io::BufReader, path::Path};
use tracing::{debug, warn};

/// Event every other timestamp is measured from.
pub const DEFAULT_ANCHOR: &str = "consensus[s][1]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorPolicy {
    /// A log without the anchor event is an error.
    #[default]
    Required,
    /// A log without the anchor event keeps its raw timestamps.
    DefaultToZero,
}

#[derive(Debug, Default, Clone)]
pub struct TimestampRecord {
    entries: HashMap<EventKey, i64>,
    stages: Vec<String>,
    indices: BTreeSet<u32>,
}

impl TimestampRecord {
    pub fn new() -> TimestampRecord {
        TimestampRecord::default()
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<TimestampRecord> {
        let path = path.as_ref();
        let io_error = |source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_error)?;
        let mut record = TimestampRecord::new();
        record
            .parse_reader(BufReader::new(file))
            .map_err(|e| match e {
                ExtractError::Read(source) => io_error(source),
                e => e,
            })?;

        debug!(
            path = %path.display(),
            events = record.len(),
            stages = record.stages.len(),
            blocks = record.indices.len(),
            "parsed log"
        );
        Ok(record)
    }

    pub fn parse_str(s: &str) -> Result<TimestampRecord> {
        let mut record = TimestampRecord::new();
        record.parse_reader(s.as_bytes())?;
        Ok(record)
    }

    /// Lines are decoded lossily; only marker lines need to be valid text.
    pub fn parse_reader<R: BufRead>(&mut self, mut reader: R) -> Result<()> {
        let parser = LineParser::new();
        let mut buffer = Vec::with_capacity(256);
        let mut line_number = 0usize;

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            line_number += 1;

            let line = String::from_utf8_lossy(&buffer);
            match parser.parse_line(&line) {
                Ok(Some(record)) => self.insert(record),
                Ok(None) => (),
                Err(reason) => {
                    return Err(ExtractError::MalformedLine {
                        line: line_number,
                        reason,
                    });
                }
            }
        }
        Ok(())
    }

    /// Later events overwrite earlier ones with the same key.
    pub fn insert(&mut self, record: Record) {
        let Record { key, value } = record;

        if !self.stages.iter().any(|stage| stage == key.stage()) {
            self.stages.push(key.stage().to_string());
        }
        self.indices.insert(key.index());

        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                debug!(key = %entry.key(), previous = *entry.get(), value, "duplicate event");
                entry.insert(value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
        }
    }

    pub fn get(&self, key: &EventKey) -> Option<i64> {
        self.entries.get(key).copied()
    }

    /// Stage names in order of first appearance.
    pub fn stages(&self) -> &[String] {
        self.stages.as_ref()
    }

    pub fn indices(&self) -> &BTreeSet<u32> {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rebase(mut self, anchor: &EventKey, policy: AnchorPolicy) -> Result<RebasedRecord> {
        let reference = match (self.get(anchor), policy) {
            (Some(reference), _) => reference,
            (None, AnchorPolicy::DefaultToZero) => {
                warn!(%anchor, "anchor event missing, timestamps are left as logged");
                0
            }
            (None, AnchorPolicy::Required) => {
                return Err(ExtractError::MissingAnchorEvent {
                    key: anchor.to_string(),
                });
            }
        };

        for value in self.entries.values_mut() {
            *value = value
                .checked_sub(reference)
                .ok_or(ExtractError::TimestampOverflow { value: *value })?;
        }

        Ok(RebasedRecord {
            reference,
            record: self,
        })
    }
}

/// Timestamps relative to the anchor event.
#[derive(Debug, Clone)]
pub struct RebasedRecord {
    reference: i64,
    record: TimestampRecord,
}

impl RebasedRecord {
    /// Raw value of the anchor event, 0 when it was missing.
    pub fn reference(&self) -> i64 {
        self.reference
    }

    pub fn get(&self, key: &EventKey) -> Option<i64> {
        self.record.get(key)
    }

    pub fn stages(&self) -> &[String] {
        self.record.stages()
    }

    pub fn indices(&self) -> &BTreeSet<u32> {
        self.record.indices()
    }

    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseError;
    use std::error::Error;

    const LOG: &str = "\
2023/06/14 10:21:07 performance statistic: consensus[s][1]: 1000
2023/06/14 10:21:07 Receive a msg: {tx}, len(queue)=1, epoch=1
2023/06/14 10:21:08 performance statistic: consensus[e][1]: 1040
2023/06/14 10:21:08 performance statistic: consensus[s][2]: 1040
2023/06/14 10:21:08 performance statistic: exe[s][1]: 1041
2023/06/14 10:21:09 performance statistic: exe[e][1]: 1050
2023/06/14 10:21:09 performance statistic: commit[s][1]: 1050
2023/06/14 10:21:09 performance statistic: commit[e][1]: 1070
";

    #[test]
    fn test_parse_record() {
        let record = TimestampRecord::parse_str(LOG).unwrap();
        assert_eq!(record.len(), 7);
        assert_eq!(record.stages(), ["consensus", "exe", "commit"]);
        assert_eq!(record.indices().iter().copied().collect::<Vec<_>>(), [1, 2]);
        assert_eq!(record.get(&EventKey::end("exe", 1)), Some(1050));
    }

    #[test]
    fn test_rebase() {
        let record = TimestampRecord::parse_str(LOG).unwrap();
        let raw: Vec<_> = [
            EventKey::end("consensus", 1),
            EventKey::start("exe", 1),
            EventKey::end("commit", 1),
        ]
        .into_iter()
        .map(|key| (record.get(&key).unwrap(), key))
        .collect();

        let anchor: EventKey = DEFAULT_ANCHOR.parse().unwrap();
        let rebased = record.rebase(&anchor, AnchorPolicy::Required).unwrap();

        assert_eq!(rebased.reference(), 1000);
        assert_eq!(rebased.get(&anchor), Some(0));
        for (value, key) in raw {
            assert_eq!(rebased.get(&key), Some(value - 1000));
        }
    }

    #[test]
    fn test_rebase_missing_anchor() {
        let record = TimestampRecord::parse_str(LOG).unwrap();
        let anchor = EventKey::start("consensus", 7);
        let err = record.rebase(&anchor, AnchorPolicy::Required).unwrap_err();
        assert!(
            matches!(err, ExtractError::MissingAnchorEvent { ref key } if key == "consensus[s][7]")
        );
    }

    #[test]
    fn test_rebase_default_to_zero() {
        let record = TimestampRecord::parse_str(LOG).unwrap();
        let anchor = EventKey::start("consensus", 7);
        let rebased = record.rebase(&anchor, AnchorPolicy::DefaultToZero).unwrap();
        assert_eq!(rebased.reference(), 0);
        assert_eq!(rebased.get(&EventKey::start("exe", 1)), Some(1041));
    }

    #[test]
    fn test_duplicate_keeps_last() {
        let log = "performance statistic: exe[s][1]: 5\nperformance statistic: exe[s][1]: 9\n";
        let record = TimestampRecord::parse_str(log).unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get(&EventKey::start("exe", 1)), Some(9));
    }

    #[test]
    fn test_malformed_line_number() {
        let log = "noise\nperformance statistic: exe[s][1]: 5\nperformance statistic: exe[e][1]: soon\n";
        let err = TimestampRecord::parse_str(log).unwrap_err();
        match err {
            ExtractError::MalformedLine { line, reason } => {
                assert_eq!(line, 3);
                assert_eq!(reason, ParseError::InvalidTimestamp("soon".to_string()));
            }
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_malformed_line_message() {
        let err = TimestampRecord::parse_str("performance statistic: exe[s][1]\n").unwrap_err();
        assert_eq!(err.to_string(), "malformed line 1");
        assert_eq!(
            err.source().map(ToString::to_string),
            Some(ParseError::MissingSeparator.to_string())
        );
    }

    #[test]
    fn test_parse_file_not_found() {
        let err = TimestampRecord::parse_file("does-not-exist.log").unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
        assert_eq!(err.to_string(), "failed to read does-not-exist.log");
        assert!(err.source().is_some());
    }
}
