//! Timestamp and date utilities
//!
//! The backend sends ISO-8601 dates; the dashboard displays them as `DD.MM.YYYY`.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an ISO-8601 date (`2024-05-17`) or the date part of a datetime
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| Error::Decode(format!("Invalid ISO date '{}': {}", value, e)))
}

/// Format a date for display (`17.05.2024`)
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Format a timestamp for display (`17.05.2024 14:03`)
pub fn display_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%d.%m.%Y %H:%M").to_string()
}

/// Display an optional ISO date string, falling back to the raw text when unparsable
pub fn display_iso(value: Option<&str>) -> String {
    match value {
        Some(raw) => parse_iso_date(raw)
            .map(display_date)
            .unwrap_or_else(|_| raw.to_string()),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_parse_iso_date_plain() {
        let date = parse_iso_date("2024-05-17").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
    }

    #[test]
    fn test_parse_iso_date_from_datetime() {
        let date = parse_iso_date("2023-11-02T08:15:00+05:00").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 11, 2).unwrap());
    }

    #[test]
    fn test_parse_iso_date_rejects_garbage() {
        assert!(matches!(parse_iso_date("17/05/2024"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_display_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(display_date(date), "09.01.2024");
    }

    #[test]
    fn test_display_iso_fallbacks() {
        assert_eq!(display_iso(Some("2022-03-04")), "04.03.2022");
        assert_eq!(display_iso(Some("unknown")), "unknown");
        assert_eq!(display_iso(None), "-");
    }
}
