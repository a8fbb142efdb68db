//! Shared utility functions for ADO crates.

/// Date utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Weekday};

    /// Calendar format used by every dataset: "YYYY-MM-DD"
    pub const DATE_FORMAT: &str = "%Y-%m-%d";

    const SECONDS_PER_DAY: i64 = 86_400;

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format(DATE_FORMAT).to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> Result<NaiveDate, DateError> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map_err(|_| DateError::Parse(s.to_string()))
    }

    /// Whole days since 1970-01-01, i.e. `floor(timestamp_seconds / 86400)`.
    pub fn day_index(date: &NaiveDate) -> i64 {
        day_index_from_timestamp(date.and_time(NaiveTime::MIN).and_utc().timestamp())
    }

    /// Day index for a unix timestamp in seconds. Floors toward negative
    /// infinity so instants before the epoch land on the right day.
    pub fn day_index_from_timestamp(seconds: i64) -> i64 {
        seconds.div_euclid(SECONDS_PER_DAY)
    }

    /// Inverse of [`day_index`].
    pub fn date_from_day_index(day: i64) -> Result<NaiveDate, DateError> {
        day.checked_mul(SECONDS_PER_DAY)
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .map(|dt| dt.date_naive())
            .ok_or(DateError::OutOfRange(day))
    }

    /// Parse "YYYY-MM-DD" straight into a day index.
    pub fn to_day_index(s: &str) -> Result<i64, DateError> {
        parse_date(s).map(|date| day_index(&date))
    }

    /// Format a day index as "YYYY-MM-DD".
    pub fn to_date_string(day: i64) -> Result<String, DateError> {
        date_from_day_index(day).map(|date| format_date(&date))
    }

    /// ISO (year, week) a date belongs to. Early January days can belong
    /// to the last week of the previous ISO year.
    pub fn iso_year_week(date: &NaiveDate) -> (i32, u32) {
        let week = date.iso_week();
        (week.year(), week.week())
    }

    /// Number of ISO weeks in a year: 53 for long years, 52 otherwise.
    pub fn weeks_in_iso_year(year: i32) -> u32 {
        if NaiveDate::from_isoywd_opt(year, 53, Weekday::Mon).is_some() {
            53
        } else {
            52
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2023-06-15");
            let parsed = parse_date(&formatted).unwrap();
            assert_eq!(parsed, date);
        }

        #[test]
        fn test_parse_rejects_other_formats() {
            assert_eq!(
                parse_date("20230615"),
                Err(DateError::Parse("20230615".to_string()))
            );
            assert!(parse_date("2023-02-30").is_err());
        }

        #[test]
        fn test_day_index_known_values() {
            assert_eq!(to_day_index("1970-01-01").unwrap(), 0);
            assert_eq!(to_day_index("1970-01-02").unwrap(), 1);
            assert_eq!(to_day_index("1969-12-31").unwrap(), -1);
            assert_eq!(to_day_index("2020-01-01").unwrap(), 18262);
        }

        #[test]
        fn test_day_index_from_timestamp_floors() {
            assert_eq!(day_index_from_timestamp(86_399), 0);
            assert_eq!(day_index_from_timestamp(86_400), 1);
            assert_eq!(day_index_from_timestamp(-1), -1);
        }

        #[test]
        fn test_day_index_round_trip_across_leap_years() {
            let start = NaiveDate::from_ymd_opt(1999, 12, 1).unwrap();
            let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
            for date in start.iter_days().take_while(|date| *date <= end) {
                let s = format_date(&date);
                assert_eq!(to_date_string(to_day_index(&s).unwrap()).unwrap(), s);
            }
        }

        #[test]
        fn test_to_date_string_out_of_range() {
            assert_eq!(to_date_string(i64::MAX), Err(DateError::OutOfRange(i64::MAX)));
        }

        #[test]
        fn test_iso_weeks() {
            assert_eq!(weeks_in_iso_year(2020), 53);
            assert_eq!(weeks_in_iso_year(2021), 52);
            let jan1 = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
            assert_eq!(iso_year_week(&jan1), (2020, 53));
            let mid = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
            assert_eq!(iso_year_week(&mid), (2023, 11));
        }
    }
}

/// Error types
pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error, Clone, PartialEq, Eq)]
    pub enum DateError {
        #[error("Date error: '{0}' is not a YYYY-MM-DD date")]
        Parse(String),

        #[error("Date error: day index {0} is outside the supported calendar")]
        OutOfRange(i64),
    }
}
