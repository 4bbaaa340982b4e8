//! Timestamp utilities
//!
//! Record tooling speaks local wall-clock timestamps without zone
//! (`2025-12-27 16:28:10`). The inspection tool sometimes prints them with a
//! dash between date and time (`2025-12-27-16:28:10`); both forms parse.

use chrono::{DateTime, Local, NaiveDateTime, Utc};

use crate::{Error, Result};

/// Wire format used by the slicing/playback tool and the manifest
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used for per-partition last-update stamps
pub const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current local wall-clock time formatted as a last-update stamp
pub fn local_stamp() -> String {
    Local::now().format(STAMP_FORMAT).to_string()
}

/// Parse a record timestamp (`YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD-HH:MM:SS`)
pub fn parse_record_time(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    let normalized = if trimmed.len() > 10 && trimmed.as_bytes()[10] == b'-' {
        format!("{} {}", &trimmed[..10], &trimmed[11..])
    } else {
        trimmed.to_string()
    };

    NaiveDateTime::parse_from_str(&normalized, RECORD_TIME_FORMAT)
        .map_err(|e| Error::InvalidInput(format!("Unrecognized time format '{}': {}", raw, e)))
}

/// Format a timestamp the way the record tool expects it
pub fn format_record_time(dt: &NaiveDateTime) -> String {
    dt.format(RECORD_TIME_FORMAT).to_string()
}

/// Format a timestamp as ISO-8601 (`2025-12-27T16:28:05`)
pub fn format_iso(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parse an ISO-8601 timestamp written by [`format_iso`]
pub fn parse_iso(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| Error::InvalidInput(format!("Unrecognized ISO time '{}': {}", raw, e)))
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}
