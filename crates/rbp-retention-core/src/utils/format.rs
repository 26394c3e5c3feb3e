use chrono::NaiveDate;

use crate::models::Percent;

/// Parse an ISO-8601 calendar date.
/// Accepts `YYYY-MM-DD`, or a timestamp whose date part is followed by `T` or a space.
pub fn parse_iso_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(parsed);
    }

    match date.as_bytes().get(10) {
        Some(b'T') | Some(b' ') => date
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()),
        _ => None,
    }
}

/// Format an optional percentage for a table cell, `-` when undefined
pub fn format_percent(value: Option<Percent>) -> String {
    match value {
        Some(p) => format!("{}%", p),
        None => "-".to_string(),
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
