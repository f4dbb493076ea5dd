use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parses the timestamp shapes the backend and the demo data use:
/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `"2024-04-24"` -> `"Apr 24, 2024"`. Unparsable input comes back unchanged.
pub fn format_date(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => format_datetime(&dt),
        None => raw.to_string(),
    }
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%b %-d, %Y").to_string()
}
