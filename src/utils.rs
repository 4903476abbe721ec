// Utility functions
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Parses either an RFC3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_datetime(date_str: &str) -> Option<DateTime<Utc>> {
    let s = date_str.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Formats a drawdown fraction as a signed percentage, e.g. `-31.25%`.
pub fn format_pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Human-readable span in whole days.
pub fn format_days(duration: Duration) -> String {
    match duration.num_days() {
        1 => "1 day".to_string(),
        n => format!("{} days", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_plain_dates_and_rfc3339() {
        let expected = Utc.with_ymd_and_hms(2023, 4, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_datetime("2023-04-05"), Some(expected));
        assert_eq!(parse_datetime("2023-04-05T02:00:00+02:00"), Some(expected));
        assert_eq!(parse_datetime("05/04/2023"), None);
    }

    #[test]
    fn formats() {
        assert_eq!(format_pct(-0.3125), "-31.25%");
        assert_eq!(format_days(Duration::days(1)), "1 day");
        assert_eq!(format_days(Duration::hours(50)), "2 days");
    }
}
