use memchr::memmem::Finder;
use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Literal that introduces a timestamp event on a log line.
pub const MARKER: &str = "performance statistic:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("marker `performance statistic:` appears {0} times")]
    RepeatedMarker(usize),
    #[error("missing `: ` between key and value")]
    MissingSeparator,
    #[error("key `{0}` is not of the form `stage[s|e][index]`")]
    InvalidKey(String),
    #[error("timestamp `{0}` is not an integer")]
    InvalidTimestamp(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Phase {
    Start,
    End,
}

impl Phase {
    pub fn tag(self) -> char {
        match self {
            Phase::Start => 's',
            Phase::End => 'e',
        }
    }
}

/// `<stage>[s|e][<index>]`, e.g. `consensus[s][1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    stage: String,
    phase: Phase,
    index: u32,
}

impl EventKey {
    pub fn new(stage: impl Into<String>, phase: Phase, index: u32) -> EventKey {
        EventKey {
            stage: stage.into(),
            phase,
            index,
        }
    }

    pub fn start(stage: &str, index: u32) -> EventKey {
        EventKey::new(stage, Phase::Start, index)
    }

    pub fn end(stage: &str, index: u32) -> EventKey {
        EventKey::new(stage, Phase::End, index)
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}][{}]", self.stage, self.phase.tag(), self.index)
    }
}

impl FromStr for EventKey {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<EventKey> {
        let invalid = || ParseError::InvalidKey(s.to_string());

        let (stage, rest) = s.split_once('[').ok_or_else(invalid)?;
        let rest = rest.strip_suffix(']').ok_or_else(invalid)?;
        let (phase, index) = rest.split_once("][").ok_or_else(invalid)?;

        if stage.is_empty() {
            return Err(invalid());
        }
        let phase = match phase {
            "s" => Phase::Start,
            "e" => Phase::End,
            _ => return Err(invalid()),
        };
        let index = index.parse::<u32>().map_err(|_| invalid())?;

        Ok(EventKey::new(stage, phase, index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: EventKey,
    pub value: i64,
}

pub struct LineParser {
    finder: Finder<'static>,
}

impl Default for LineParser {
    fn default() -> Self {
        LineParser::new()
    }
}

impl LineParser {
    pub fn new() -> LineParser {
        LineParser {
            finder: Finder::new(MARKER),
        }
    }

    /// Returns `Ok(None)` for lines that carry no marker.
    pub fn parse_line(&self, line: &str) -> ParseResult<Option<Record>> {
        let mut found = self.finder.find_iter(line.as_bytes());
        let Some(pos) = found.next() else {
            return Ok(None);
        };
        let repeated = found.count();
        if repeated > 0 {
            return Err(ParseError::RepeatedMarker(repeated + 1));
        }

        let rest = line[pos + MARKER.len()..].trim();
        let (key, value) = rest
            .split_once(": ")
            .ok_or(ParseError::MissingSeparator)?;

        let key = key.trim().parse::<EventKey>()?;
        let value = value
            .trim()
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidTimestamp(value.trim().to_string()))?;

        Ok(Some(Record { key, value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        let key: EventKey = "consensus[s][1]".parse().unwrap();
        assert_eq!(key.stage(), "consensus");
        assert_eq!(key.phase(), Phase::Start);
        assert_eq!(key.index(), 1);
        assert_eq!(key.to_string(), "consensus[s][1]");
    }

    #[test]
    fn test_parse_key_invalid() {
        for s in ["consensus", "[s][1]", "exe[x][1]", "exe[s][-1]", "exe[s][1", "exe[s]"] {
            assert_eq!(
                s.parse::<EventKey>(),
                Err(ParseError::InvalidKey(s.to_string())),
                "{s}"
            );
        }
    }

    #[test]
    fn test_parse_line() {
        let parser = LineParser::new();
        let line = "2023/06/14 10:21:07 performance statistic: commit[e][12]: 1686738067000000000\n";
        let record = parser.parse_line(line).unwrap().unwrap();
        assert_eq!(record.key, EventKey::end("commit", 12));
        assert_eq!(record.value, 1_686_738_067_000_000_000);
    }

    #[test]
    fn test_parse_line_without_marker() {
        let parser = LineParser::new();
        let line = "2023/06/14 10:21:07 Receive a msg: {}, len(queue)=1, epoch=1";
        assert_eq!(parser.parse_line(line), Ok(None));
    }

    #[test]
    fn test_parse_line_repeated_marker() {
        let parser = LineParser::new();
        let line = "performance statistic: exe[s][1]: 1 performance statistic: exe[e][1]: 2";
        assert_eq!(parser.parse_line(line), Err(ParseError::RepeatedMarker(2)));
    }

    #[test]
    fn test_parse_line_missing_separator() {
        let parser = LineParser::new();
        let line = "performance statistic: exe[s][1] 100";
        assert_eq!(parser.parse_line(line), Err(ParseError::MissingSeparator));
    }

    #[test]
    fn test_parse_line_invalid_timestamp() {
        let parser = LineParser::new();
        let line = "performance statistic: exe[s][1]: 2023-06-14 10:21:07.1 +0000 UTC";
        assert!(matches!(
            parser.parse_line(line),
            Err(ParseError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_parse_line_negative_value() {
        let parser = LineParser::new();
        let line = "performance statistic: exe[s][3]: -5";
        let record = parser.parse_line(line).unwrap().unwrap();
        assert_eq!(record.value, -5);
    }
}
