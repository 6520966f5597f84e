//! Serde helpers for event timestamps.
//!
//! Every timestamp crossing a serialization boundary is ISO-8601 UTC with
//! microsecond precision and an explicit `+00:00` offset, e.g.
//! `2025-01-01T09:00:00.000000+00:00`. Emitting one canonical form keeps
//! output byte-identical across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f+00:00";

/// Formats a timestamp in the canonical output form.
#[must_use]
pub fn to_string(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(FORMAT).to_string()
}

/// Parses an ISO-8601 timestamp (offset or `Z` suffix) into UTC.
///
/// # Errors
/// Returns the underlying chrono error for malformed input.
pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

/// Serializes a timestamp in the canonical output form.
///
/// # Errors
/// Propagates serializer errors.
pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_string(timestamp))
}

/// Deserializes a timestamp from an ISO-8601 string.
///
/// # Errors
/// Returns a deserialization error for malformed input.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

/// Serde helpers for optional timestamps.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    /// Serializes an optional timestamp in the canonical output form.
    ///
    /// # Errors
    /// Propagates serializer errors.
    pub fn serialize<S>(
        timestamp: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match timestamp {
            Some(ts) => serializer.serialize_str(&super::to_string(ts)),
            None => serializer.serialize_none(),
        }
    }
}
