//! Timestamps in the oneM2M basic format (`YYYYMMDDThhmmss`, UTC).
//!
//! The format orders lexicographically, so staleness comparisons are plain
//! string comparisons.

use chrono::{DateTime, Utc};

const BASIC_FORMAT: &str = "%Y%m%dT%H%M%S";

/// The current time as a basic-format timestamp.
#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Render an instant as a basic-format timestamp.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(BASIC_FORMAT).to_string()
}
