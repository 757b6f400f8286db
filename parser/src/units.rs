use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(alias = "ns")]
    Nanoseconds,
    #[serde(alias = "us")]
    Microseconds,
    #[serde(alias = "ms")]
    Milliseconds,
    #[default]
    #[serde(alias = "s")]
    Seconds,
}

impl TimeUnit {
    pub fn name(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "nanoseconds",
            TimeUnit::Microseconds => "microseconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
        }
    }

    pub fn axis_label(self) -> String {
        format!("{} since start", self.name())
    }

    fn to_delta(self, value: i64) -> Option<TimeDelta> {
        match self {
            TimeUnit::Nanoseconds => Some(TimeDelta::nanoseconds(value)),
            TimeUnit::Microseconds => Some(TimeDelta::microseconds(value)),
            TimeUnit::Milliseconds => TimeDelta::try_milliseconds(value),
            TimeUnit::Seconds => TimeDelta::try_seconds(value),
        }
    }

    fn from_delta(self, delta: TimeDelta) -> Option<i64> {
        match self {
            TimeUnit::Nanoseconds => delta.num_nanoseconds(),
            TimeUnit::Microseconds => delta.num_microseconds(),
            TimeUnit::Milliseconds => Some(delta.num_milliseconds()),
            TimeUnit::Seconds => Some(delta.num_seconds()),
        }
    }

    /// Interprets `value` as time since the Unix epoch.
    pub fn wall_clock(self, value: i64) -> Option<DateTime<Utc>> {
        let delta = self.to_delta(value)?;
        DateTime::from_timestamp(delta.num_seconds(), delta.subsec_nanos().try_into().ok()?)
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<TimeUnit, String> {
        match s {
            "ns" | "nanoseconds" => Ok(TimeUnit::Nanoseconds),
            "us" | "microseconds" => Ok(TimeUnit::Microseconds),
            "ms" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "seconds" => Ok(TimeUnit::Seconds),
            _ => Err(format!("unknown time unit `{s}` (expected ns, us, ms or s)")),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unit the log is written in and unit the chart is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeScale {
    pub source: TimeUnit,
    pub display: TimeUnit,
}

impl TimeScale {
    pub fn new(source: TimeUnit, display: TimeUnit) -> TimeScale {
        TimeScale { source, display }
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.display
    }

    /// Truncates toward zero. `None` on overflow.
    pub fn convert(&self, value: i64) -> Option<i64> {
        if self.is_identity() {
            return Some(value);
        }
        self.display.from_delta(self.source.to_delta(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_identity() {
        let scale = TimeScale::default();
        assert!(scale.is_identity());
        assert_eq!(scale.convert(i64::MAX), Some(i64::MAX));
    }

    #[test]
    fn test_convert_nanos_to_millis() {
        let scale = TimeScale::new(TimeUnit::Nanoseconds, TimeUnit::Milliseconds);
        assert_eq!(scale.convert(1_500_000), Some(1));
        assert_eq!(scale.convert(42_000_000), Some(42));
        assert_eq!(scale.convert(-2_500_000), Some(-2));
    }

    #[test]
    fn test_convert_seconds_to_nanos_overflow() {
        let scale = TimeScale::new(TimeUnit::Seconds, TimeUnit::Nanoseconds);
        assert_eq!(scale.convert(3), Some(3_000_000_000));
        assert_eq!(scale.convert(i64::MAX / 10), None);
    }

    #[test]
    fn test_unit_from_str() {
        assert_eq!("ms".parse::<TimeUnit>(), Ok(TimeUnit::Milliseconds));
        assert_eq!("seconds".parse::<TimeUnit>(), Ok(TimeUnit::Seconds));
        assert!("minutes".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_wall_clock() {
        let time = TimeUnit::Nanoseconds
            .wall_clock(1_686_738_067_500_000_000)
            .unwrap();
        assert_eq!(time.to_rfc3339(), "2023-06-14T10:21:07.500+00:00");
    }

    #[test]
    fn test_axis_label() {
        assert_eq!(TimeUnit::Seconds.axis_label(), "seconds since start");
    }
}
