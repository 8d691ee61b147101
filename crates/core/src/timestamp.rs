//! Naive (timezone-less) timestamp parsing for anchor due dates.
//!
//! Clients send either a bare date (`2024-03-01`) or a local date-time
//! (`2024-03-01T09:30:00`, `2024-03-01 09:30`). Dates without a time part
//! anchor at midnight. Values are always serialized as ISO 8601 without an
//! offset.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serializer};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a naive timestamp, accepting date-only and date-time forms.
///
/// A trailing `Z` or UTC offset is dropped rather than converted, since the
/// engine works on naive local timestamps.
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    let without_offset = strip_offset(trimmed);

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(without_offset, format) {
            return Some(ts);
        }
    }

    NaiveDate::parse_from_str(without_offset, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn strip_offset(input: &str) -> &str {
    if let Some(stripped) = input.strip_suffix('Z') {
        return stripped;
    }
    // Only look for an offset sign in the time part, so the date's own
    // dashes are left alone.
    match input.find(['T', ' ']) {
        Some(sep) => match input[sep..].rfind(['+', '-']) {
            Some(rel) => &input[..sep + rel],
            None => input,
        },
        None => input,
    }
}

/// Format a timestamp as the `YYYY-MM-DD` date used in notification messages.
pub fn format_date(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Serde adapter for `NaiveDateTime` fields using [`parse_timestamp`].
pub mod naive {
    use super::*;

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid due date: '{raw}'")))
    }
}
