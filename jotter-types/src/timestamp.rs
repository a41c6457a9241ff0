//! Modification timestamps for last-write-wins reconciliation.
//!
//! A timestamp is milliseconds since the Unix epoch, totally ordered as a
//! plain integer. Millisecond precision is load-bearing: the wire format is
//! RFC 3339 with millisecond precision, and both the conflict resolver and
//! the store's conditional write-backs compare timestamps for exact
//! equality, so a value must survive the wire round-trip bit-for-bit.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A note modification time (milliseconds since Unix epoch).
///
/// New local edits are stamped with [`Timestamp::next_after`], which stays
/// strictly increasing per record even when the wall clock stalls or rewinds
/// between edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp at the current time, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_millis() as i64;
        Self(millis)
    }

    /// Creates a timestamp from raw Unix milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the raw Unix milliseconds.
    #[must_use]
    pub const fn unix_millis(&self) -> i64 {
        self.0
    }

    /// Stamp for a new edit of a record last stamped `prev`.
    ///
    /// Returns the current time, bumped to one millisecond past `prev` if
    /// the wall clock has not advanced beyond it.
    #[must_use]
    pub fn next_after(prev: Self) -> Self {
        let now = Self::now();
        if now.0 > prev.0 {
            now
        } else {
            Self(prev.0.saturating_add(1))
        }
    }

    /// Formats as RFC 3339 in UTC with millisecond precision.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.as_datetime()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Parses an RFC 3339 string, normalizing any offset to UTC.
    pub fn parse_rfc3339(s: &str) -> Result<Self, crate::Error> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| crate::Error::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self(dt.with_timezone(&Utc).timestamp_millis()))
    }

    fn as_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0)
            .single()
            .expect("timestamp out of datetime range")
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_rfc3339(&s).map_err(serde::de::Error::custom)
    }
}
