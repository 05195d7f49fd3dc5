// Timestamps embedded in alert file names

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

// YYYYMMDD_HHMMSS anywhere in the name
static FILENAME_STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{8})_(\d{6})").expect("filename timestamp pattern"));

/// Parse the `YYYYMMDD_HHMMSS` stamp out of an alert file name.
/// Returns None if the pattern is absent or is not a real calendar date/time.
pub fn filename_datetime(file_name: &str) -> Option<NaiveDateTime> {
    FILENAME_STAMP.captures_iter(file_name).find_map(|caps| {
        let stamp = format!("{}{}", &caps[1], &caps[2]);
        NaiveDateTime::parse_from_str(&stamp, "%Y%m%d%H%M%S").ok()
    })
}

/// Detection timestamp for a report, e.g. `alert_20250620_152926.json`
/// becomes `2025-06-20T15:29:26.000Z`.
pub fn detection_timestamp(file_name: &str) -> Option<String> {
    filename_datetime(file_name).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

#[derive(Error, Debug, PartialEq)]
pub enum TimeRangeError {
    #[error("invalid time range '{0}', use e.g. '24h', '7d', '1w'")]
    Invalid(String),
}

/// Look-back window like `24h`, `7d` or `1w`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange(Duration);

impl TimeRange {
    pub fn duration(&self) -> Duration {
        self.0
    }

    /// Oldest instant still inside the range
    pub fn cutoff(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.checked_sub_signed(self.0)
            .map(|t| t.naive_utc())
            .unwrap_or(NaiveDateTime::MIN)
    }

    /// Files without a timestamp in their name are always kept
    pub fn includes_file(&self, file_name: &str, now: DateTime<Utc>) -> bool {
        match filename_datetime(file_name) {
            Some(file_time) => file_time >= self.cutoff(now),
            None => true,
        }
    }
}

impl FromStr for TimeRange {
    type Err = TimeRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TimeRangeError::Invalid(s.to_string());
        let s = s.trim();
        let unit = s.chars().last().ok_or_else(invalid)?;
        let value: i64 = s[..s.len() - unit.len_utf8()].parse().map_err(|_| invalid())?;
        if value < 0 {
            return Err(invalid());
        }

        let duration = match unit {
            'h' => Duration::try_hours(value),
            'd' => Duration::try_days(value),
            'w' => Duration::try_weeks(value),
            _ => None,
        };
        duration.map(TimeRange).ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_detection_timestamp_from_name() {
        assert_eq!(
            detection_timestamp("alert_20250620_152926.json").as_deref(),
            Some("2025-06-20T15:29:26.000Z")
        );
        assert_eq!(detection_timestamp("alert.json"), None);
        assert_eq!(detection_timestamp("alert_20251340_152926.json"), None);
    }

    #[test]
    fn test_time_range_parse() {
        assert_eq!("24h".parse::<TimeRange>().unwrap().duration(), Duration::hours(24));
        assert_eq!("7d".parse::<TimeRange>().unwrap().duration(), Duration::days(7));
        assert_eq!("1w".parse::<TimeRange>().unwrap().duration(), Duration::weeks(1));
        assert!("5m".parse::<TimeRange>().is_err());
        assert!("h".parse::<TimeRange>().is_err());
        assert!("".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_time_range_includes_file() {
        let now = Utc.with_ymd_and_hms(2025, 6, 21, 12, 0, 0).unwrap();
        let range: TimeRange = "24h".parse().unwrap();

        assert!(range.includes_file("alert_20250620_152926.json", now));
        assert!(!range.includes_file("alert_20250619_152926.json", now));
        assert!(range.includes_file("manual_upload.json", now));
    }
}
