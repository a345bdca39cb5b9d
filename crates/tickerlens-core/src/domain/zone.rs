use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Offset, TimeZone};
use chrono_tz::Tz;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use super::UtcDateTime;
use crate::ValidationError;

/// IANA time zone every normalized series is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketZone(Tz);

impl MarketZone {
    pub const DEFAULT_NAME: &'static str = "US/Eastern";

    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        name.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| ValidationError::UnknownTimeZone {
                value: name.to_owned(),
            })
    }

    pub const fn utc() -> Self {
        Self(Tz::UTC)
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// UTC offset in effect for this zone at `instant` (DST aware).
    ///
    /// Truncated to whole minutes: historical local mean time offsets such
    /// as US/Eastern's `-04:56:02` before 1883 carry seconds, which RFC3339
    /// cannot express.
    pub fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        let Some(utc) = chrono::DateTime::from_timestamp(instant.unix_timestamp(), 0) else {
            return UtcOffset::UTC;
        };
        let seconds = self
            .0
            .offset_from_utc_datetime(&utc.naive_utc())
            .fix()
            .local_minus_utc();
        UtcOffset::from_whole_seconds(seconds - seconds % 60).unwrap_or(UtcOffset::UTC)
    }

    /// Expresses `instant` as wall-clock time in this zone. The instant itself
    /// never changes, so converting an already converted value is a no-op.
    pub fn convert(&self, instant: OffsetDateTime) -> MarketTime {
        MarketTime(instant.to_offset(self.offset_at(instant)))
    }

    pub fn contains(&self, time: MarketTime) -> bool {
        time.offset() == self.offset_at(time.0)
    }
}

impl Default for MarketZone {
    fn default() -> Self {
        Self(Tz::US__Eastern)
    }
}

impl Display for MarketZone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MarketZone {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for MarketZone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for MarketZone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Instant carrying the wall-clock offset of the zone it was converted to.
///
/// Ordering and equality compare instants; use [`MarketTime::offset`] to
/// inspect the zone offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarketTime(OffsetDateTime);

impl MarketTime {
    pub fn offset(self) -> UtcOffset {
        self.0.offset()
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn to_utc(self) -> UtcDateTime {
        UtcDateTime::from_utc(self.0)
    }

    /// RFC3339 text; years outside `0000..=9999` fall back to the `time`
    /// display form.
    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.0.to_string())
    }
}

impl Display for MarketTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for MarketTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}
