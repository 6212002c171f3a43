//! Centralized datetime handling utilities
//!
//! Provider APIs return timestamps in a handful of shapes ("2025-11-30T18:00Z",
//! "2025-11-30T18:00:00+00:00", "2025-11-30 18:00:00"). This module parses all
//! of them into UTC and owns the formatting used for XMLTV output and provider
//! query parameters.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Errors that can occur during datetime operations
#[derive(Error, Debug)]
pub enum DateTimeError {
    #[error("Invalid datetime format: '{input}'")]
    InvalidFormat { input: String },

    #[error("Unknown timezone: {input}")]
    UnknownTimezone { input: String },
}

/// Centralized datetime parsing and formatting utilities
pub struct DateTimeParser;

impl DateTimeParser {
    /// Parse a provider timestamp into UTC
    ///
    /// Accepts RFC3339 with `Z` or an explicit offset, the minute-precision
    /// variant some scoreboard feeds use ("2025-11-30T18:00Z"), and the
    /// space-separated SQLite shape (assumed UTC).
    pub fn parse_flexible(input: &str) -> Result<DateTime<Utc>, DateTimeError> {
        let trimmed = input.trim();

        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(parsed.with_timezone(&Utc));
        }

        // Minute-precision ISO with trailing Z
        if let Some(stripped) = trimmed.strip_suffix('Z') {
            if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, "%Y-%m-%dT%H:%M") {
                return Ok(Utc.from_utc_datetime(&naive));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, "%Y-%m-%dT%H:%M:%S") {
                return Ok(Utc.from_utc_datetime(&naive));
            }
        }

        // Zone-less ISO shapes are treated as UTC
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Utc.from_utc_datetime(&naive));
            }
        }

        Err(DateTimeError::InvalidFormat {
            input: input.to_string(),
        })
    }

    /// Resolve an IANA timezone name
    pub fn parse_timezone(name: &str) -> Result<Tz, DateTimeError> {
        name.parse::<Tz>().map_err(|_| DateTimeError::UnknownTimezone {
            input: name.to_string(),
        })
    }

    /// Format a timestamp for XMLTV: local time with explicit offset
    pub fn format_xmltv(dt: &DateTime<Utc>, tz: &Tz) -> String {
        dt.with_timezone(tz).format("%Y%m%d%H%M%S %z").to_string()
    }

    /// Date key used by scoreboard endpoints ("20251130")
    pub fn format_yyyymmdd(date: NaiveDate) -> String {
        format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
    }

    /// Truncate to the top of the hour
    pub fn round_to_hour<T: TimeZone>(dt: DateTime<T>) -> DateTime<T> {
        dt.with_minute(0)
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0))
            .expect("hour truncation is always representable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_variants() {
        let a = DateTimeParser::parse_flexible("2025-11-30T18:00:00Z").unwrap();
        let b = DateTimeParser::parse_flexible("2025-11-30T18:00Z").unwrap();
        let c = DateTimeParser::parse_flexible("2025-11-30 18:00:00").unwrap();
        let d = DateTimeParser::parse_flexible("2025-11-30T13:00:00-05:00").unwrap();
        let e = DateTimeParser::parse_flexible("2025-11-30T18:00:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
        assert_eq!(a, e);
    }

    #[test]
    fn rejects_garbage() {
        assert!(DateTimeParser::parse_flexible("not a date").is_err());
    }

    #[test]
    fn xmltv_format_carries_offset() {
        let tz = DateTimeParser::parse_timezone("America/Detroit").unwrap();
        let dt = DateTimeParser::parse_flexible("2025-11-30T18:00:00Z").unwrap();
        let formatted = DateTimeParser::format_xmltv(&dt, &tz);
        assert_eq!(formatted, "20251130130000 -0500");
    }

    #[test]
    fn rounds_down_to_hour() {
        let dt = DateTimeParser::parse_flexible("2025-11-30T18:42:11Z").unwrap();
        let rounded = DateTimeParser::round_to_hour(dt);
        assert_eq!(rounded.to_rfc3339(), "2025-11-30T18:00:00+00:00");
    }
}
