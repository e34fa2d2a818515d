//! Task data model and title validation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Default maximum title length, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// A single task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned id, monotonic and never reused.
    pub id: i64,
    /// Trimmed title.
    pub title: String,
    /// Completion flag (stored as 0/1).
    pub done: bool,
    /// When the task was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_start: Option<DateTime<Utc>>,
    /// When the task was completed. Present only while `done` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_end: Option<DateTime<Utc>>,
}

impl Task {
    /// Whether the row still needs doing.
    pub fn is_active(&self) -> bool {
        !self.done
    }
}

/// Current time at the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    parse_timestamp(&format_timestamp(&now)).unwrap_or(now)
}

/// Format a timestamp as ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Naive forms accepted besides RFC 3339, read as UTC. The dotted ones are
/// the `pl-PL` display form older CSV files carry.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y, %H:%M:%S",
    "%d.%m.%Y, %H:%M",
    "%d.%m.%Y %H:%M",
];

/// Parse an ISO-8601 / RFC 3339, SQLite or `pl-PL` datetime string, or a bare
/// `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Trim a title and check it against the length bound.
pub fn validate_title(raw: &str, max_len: usize) -> Result<String, TaskError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    let len = title.chars().count();
    if len > max_len {
        return Err(TaskError::TitleTooLong { len, max: max_len });
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamp_format_matches_iso_millis() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 5).unwrap();
        assert_eq!(format_timestamp(&dt), "2025-03-01T09:30:05.000Z");
    }

    #[test]
    fn parses_iso_and_sqlite_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 5).unwrap();
        assert_eq!(parse_timestamp("2025-03-01T09:30:05.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01 09:30:05"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01T09:30:05"), Some(expected));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("01.03.2025, 09:30"), Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).single());
        assert_eq!(parse_timestamp("01.03.2025, 09:30:05"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01"), Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).single());
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn now_survives_format_roundtrip() {
        let t = now();
        assert_eq!(parse_timestamp(&format_timestamp(&t)), Some(t));
    }

    #[test]
    fn validate_trims() {
        assert_eq!(validate_title("  Buy milk \n", MAX_TITLE_LEN).unwrap(), "Buy milk");
    }

    #[test]
    fn validate_rejects_blank() {
        assert!(matches!(validate_title("   ", MAX_TITLE_LEN), Err(TaskError::EmptyTitle)));
    }

    #[test]
    fn validate_counts_characters_not_bytes() {
        let title = "ż".repeat(200);
        assert!(validate_title(&title, MAX_TITLE_LEN).is_ok());
        let too_long = "a".repeat(201);
        assert!(matches!(
            validate_title(&too_long, MAX_TITLE_LEN),
            Err(TaskError::TitleTooLong { len: 201, max: 200 })
        ));
    }

    #[test]
    fn task_serde_omits_absent_dates() {
        let task = Task {
            id: 1,
            title: "Buy milk".into(),
            done: false,
            date_start: None,
            date_end: None,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("date_end").is_none());
        assert_eq!(json["done"], false);
        assert!(task.is_active());
    }
}
