//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp type with ISO 8601 `Z`-suffix
//! rendering, truncated to seconds precision.
//!
//! Timestamps that feed canonical payloads must be UTC with a `Z` suffix;
//! local offsets would produce different canonical bytes for the same
//! instant and break every anchored digest. Non-UTC inputs are rejected at
//! construction rather than silently converted.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] — current UTC time, truncated.
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] — from an ISO 8601 string, rejecting non-UTC offsets.
/// - [`Timestamp::parse_lenient()`] — converts any offset to UTC (ingest only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// Only timestamps with the `Z` suffix are accepted. Explicit offsets
    /// are rejected — even `+00:00`, which is semantically equivalent to
    /// `Z` but canonically distinct.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: "must use Z suffix (UTC only)".to_string(),
            });
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Parse an RFC 3339 string, accepting any offset and converting to UTC.
    ///
    /// Lenient parser for ingesting external data. The result is always
    /// UTC with seconds precision. Digest paths use [`Timestamp::parse()`].
    pub fn parse_lenient(s: &str) -> Result<Self, ValidationError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as ISO 8601 with Z suffix (e.g. `2026-06-30T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision.
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn now_has_no_subseconds() {
        assert_eq!(Timestamp::now().as_datetime().nanosecond(), 0);
    }

    #[test]
    fn from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 6, 30, 12, 30, 45).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(123_456_789).unwrap());
        assert_eq!(ts.as_datetime().nanosecond(), 0);
        assert_eq!(ts.to_iso8601(), "2026-06-30T12:30:45Z");
    }

    #[test]
    fn parse_z_suffix_accepted() {
        let ts = Timestamp::parse("2026-06-30T12:00:00Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-06-30T12:00:00Z");
    }

    #[test]
    fn parse_offsets_rejected() {
        assert!(Timestamp::parse("2026-06-30T12:00:00+00:00").is_err());
        assert!(Timestamp::parse("2026-06-30T17:00:00+05:00").is_err());
        assert!(Timestamp::parse("2026-06-30T08:00:00-04:00").is_err());
    }

    #[test]
    fn parse_subseconds_truncated() {
        let ts = Timestamp::parse("2026-06-30T12:00:00.123456Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-06-30T12:00:00Z");
    }

    #[test]
    fn parse_invalid_format() {
        assert!(Timestamp::parse("not-a-date").is_err());
        assert!(Timestamp::parse("2026-06-30").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn parse_lenient_converts_offset() {
        let ts = Timestamp::parse_lenient("2026-06-30T17:00:00+05:00").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-06-30T12:00:00Z");
    }

    #[test]
    fn epoch_roundtrip() {
        let ts = Timestamp::parse("2026-06-30T12:00:00Z").unwrap();
        assert_eq!(ts.epoch_secs(), ts.as_datetime().timestamp());
    }

    #[test]
    fn ordering() {
        let earlier = Timestamp::parse("2026-06-30T12:00:00Z").unwrap();
        let later = Timestamp::parse("2026-06-30T12:00:01Z").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn serde_roundtrip() {
        let ts = Timestamp::parse("2026-06-30T12:00:00Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }

    #[test]
    fn display_matches_iso8601() {
        let ts = Timestamp::parse("2026-12-31T23:59:59Z").unwrap();
        assert_eq!(format!("{ts}"), ts.to_iso8601());
    }
}
