//! Date parsing for the formats the API and CSV exports use.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Parses an RFC 3339 timestamp, a naive date-time, or a plain date
/// (`YYYY-MM-DD` or `DD/MM/YYYY`). Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(raw, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

/// `YYYY-MM` bucket for monthly aggregation
pub fn month_key(raw: &str) -> Option<String> {
    parse_timestamp(raw).map(|dt| dt.format("%Y-%m").to_string())
}
