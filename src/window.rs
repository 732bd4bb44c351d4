use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Named dashboard range. Unrecognized names fall back to the last 24 hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum TimeRange {
    #[default]
    Day,
    Week,
    Month,
}

impl TimeRange {
    pub fn hours(self) -> i64 {
        match self {
            TimeRange::Day => 24,
            TimeRange::Week => 7 * 24,
            TimeRange::Month => 30 * 24,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::Day => "24h",
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
        }
    }
}

impl From<&str> for TimeRange {
    fn from(name: &str) -> Self {
        match name {
            "7d" => TimeRange::Week,
            "30d" => TimeRange::Month,
            _ => TimeRange::Day,
        }
    }
}

impl From<String> for TimeRange {
    fn from(name: String) -> Self {
        TimeRange::from(name.as_str())
    }
}

impl From<TimeRange> for &'static str {
    fn from(range: TimeRange) -> Self {
        range.as_str()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed interval `[start, end]` compared at millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The window ending at `now` that covers `range`.
    pub fn resolve(range: TimeRange, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::hours(range.hours()),
            end: now,
        }
    }

    pub fn contains_millis(&self, millis: i64) -> bool {
        millis >= self.start.timestamp_millis() && millis <= self.end.timestamp_millis()
    }
}
