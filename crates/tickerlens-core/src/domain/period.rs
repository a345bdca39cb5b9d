use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Duration;

use super::UtcDateTime;
use crate::ValidationError;

/// Total span requested from a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Self; 5] = [
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
        Self::OneYear,
        Self::Max,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::OneWeek => "1wk",
            Self::OneMonth => "1mo",
            Self::OneYear => "1y",
            Self::Max => "max",
        }
    }

    /// Sampling interval paired with this period.
    pub const fn interval(self) -> Interval {
        match self {
            Self::OneDay => Interval::OneMinute,
            Self::OneWeek => Interval::ThirtyMinutes,
            Self::OneMonth => Interval::OneDay,
            Self::OneYear | Self::Max => Interval::OneWeek,
        }
    }

    /// Resolves the window a source should request, relative to `now`.
    ///
    /// Provider "1wk" shorthands are unreliable at intraday granularity, so
    /// the week is always spelled out as `[now - 7 days, now]`.
    pub fn window(self, now: UtcDateTime) -> FetchWindow {
        match self {
            Self::OneWeek => {
                let end = now.into_inner();
                FetchWindow::Between {
                    start: UtcDateTime::from_utc(end - Duration::days(7)),
                    end: now,
                }
            }
            other => FetchWindow::Range(other),
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1d" => Ok(Self::OneDay),
            "1wk" => Ok(Self::OneWeek),
            "1mo" => Ok(Self::OneMonth),
            "1y" => Ok(Self::OneYear),
            "max" => Ok(Self::Max),
            other => Err(ValidationError::InvalidPeriod {
                value: other.to_owned(),
            }),
        }
    }
}

/// Sampling granularity of the bars within a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
}

impl Interval {
    pub const ALL: [Self; 4] = [
        Self::OneMinute,
        Self::ThirtyMinutes,
        Self::OneDay,
        Self::OneWeek,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::ThirtyMinutes => "30m",
            Self::OneDay => "1d",
            Self::OneWeek => "1wk",
        }
    }

    pub const fn is_intraday(self) -> bool {
        matches!(self, Self::OneMinute | Self::ThirtyMinutes)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Self::OneMinute),
            "30m" => Ok(Self::ThirtyMinutes),
            "1d" => Ok(Self::OneDay),
            "1wk" => Ok(Self::OneWeek),
            other => Err(ValidationError::InvalidInterval {
                value: other.to_owned(),
            }),
        }
    }
}

/// Time span handed to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchWindow {
    /// Let the provider resolve its own range shorthand for the period.
    Range(Period),
    /// Explicit `[start, end]` bounds.
    Between { start: UtcDateTime, end: UtcDateTime },
}
