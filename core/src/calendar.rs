//! Day and week bucketing rules. Weeks start on Monday (ISO numbering).

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// The Monday on or before `date`.
#[must_use]
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The Sunday closing the week that contains `date`.
#[must_use]
pub fn week_end_of(date: NaiveDate) -> NaiveDate {
    week_start_of(date) + Duration::days(6)
}

/// Monday through Sunday of the week beginning at `week_start`.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn week_dates(week_start: NaiveDate) -> [NaiveDate; 7] {
    let monday = week_start_of(week_start);
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

#[must_use]
pub fn is_week_start(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() == 0
}

/// Years accepted from user input. Keeps every week arithmetic in range.
pub const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

fn check_year(date: NaiveDate, s: &str) -> Result<NaiveDate> {
    if !YEARS.contains(&date.year()) {
        bail!(
            "Date '{s}' is out of range. Years must be between {} and {}",
            YEARS.start(),
            YEARS.end()
        );
    }
    Ok(date)
}

pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD"))?;
    check_year(date, s)
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a local timestamp. A bare date means midnight of that date.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            check_year(ts.date(), s)?;
            return Ok(ts);
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| {
        format!("Invalid timestamp '{s}'. Use YYYY-MM-DD or YYYY-MM-DD HH:MM[:SS]")
    })?;
    Ok(check_year(date, s)?.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_week_start_every_weekday() {
        // 2024-06-10 is a Monday
        let monday = d(2024, 6, 10);
        for offset in 0..7 {
            let date = monday + Duration::days(offset);
            assert_eq!(week_start_of(date), monday, "failed for {date}");
        }
    }

    #[test]
    fn test_week_start_sunday_belongs_to_previous_monday() {
        // Sunday 2024-06-16 closes the week that began Monday 2024-06-10
        assert_eq!(week_start_of(d(2024, 6, 16)), d(2024, 6, 10));
        // and the next day starts a new week
        assert_eq!(week_start_of(d(2024, 6, 17)), d(2024, 6, 17));
    }

    #[test]
    fn test_week_start_across_year_boundary() {
        // Wednesday 2025-01-01 -> Monday 2024-12-30
        assert_eq!(week_start_of(d(2025, 1, 1)), d(2024, 12, 30));
        // Sunday 2023-01-01 -> Monday 2022-12-26
        assert_eq!(week_start_of(d(2023, 1, 1)), d(2022, 12, 26));
    }

    #[test]
    fn test_week_start_across_leap_day() {
        // Thursday 2024-02-29 -> Monday 2024-02-26
        assert_eq!(week_start_of(d(2024, 2, 29)), d(2024, 2, 26));
        // Saturday 2024-03-02 -> same Monday
        assert_eq!(week_start_of(d(2024, 3, 2)), d(2024, 2, 26));
    }

    #[test]
    fn test_week_start_is_monday_within_six_days() {
        let mut date = d(2023, 1, 1);
        let end = d(2025, 12, 31);
        while date <= end {
            let start = week_start_of(date);
            assert_eq!(start.weekday(), Weekday::Mon);
            let gap = (date - start).num_days();
            assert!((0..=6).contains(&gap), "gap {gap} for {date}");
            date += Duration::days(1);
        }
    }

    #[test]
    fn test_week_end_of() {
        assert_eq!(week_end_of(d(2024, 6, 12)), d(2024, 6, 16));
        assert_eq!(week_end_of(d(2024, 6, 16)), d(2024, 6, 16));
        assert_eq!(week_end_of(d(2024, 6, 10)).weekday(), Weekday::Sun);
    }

    #[test]
    fn test_week_dates() {
        let dates = week_dates(d(2024, 12, 30));
        assert_eq!(dates[0], d(2024, 12, 30));
        assert_eq!(dates[2], d(2025, 1, 1));
        assert_eq!(dates[6], d(2025, 1, 5));

        // Non-Monday input is normalized to its week
        assert_eq!(week_dates(d(2025, 1, 3)), dates);
    }

    #[test]
    fn test_is_week_start() {
        assert!(is_week_start(d(2024, 6, 10)));
        assert!(!is_week_start(d(2024, 6, 16)));
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2024-06-12").unwrap(), d(2024, 6, 12));
        assert_eq!(parse_iso_date(" 2024-06-12 ").unwrap(), d(2024, 6, 12));
        assert!(parse_iso_date("12/06/2024").is_err());
        assert!(parse_iso_date("2024-02-30").is_err());
    }

    #[test]
    fn test_parse_iso_date_year_range() {
        assert_eq!(parse_iso_date("0001-01-01").unwrap(), d(1, 1, 1));
        assert_eq!(parse_iso_date("9999-12-31").unwrap(), d(9999, 12, 31));
        assert!(parse_iso_date("+262142-12-31").is_err());
        assert!(parse_iso_date("-262143-01-01").is_err());
        assert!(parse_iso_date("0000-12-31").is_err());
        assert!(parse_iso_date("+10000-01-03").is_err());

        // Both ends of the range still resolve to a full week
        assert_eq!(week_start_of(d(1, 1, 1)), d(1, 1, 1));
        assert_eq!(week_end_of(d(9999, 12, 31)), d(10000, 1, 2));
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = d(2024, 6, 12).and_hms_opt(18, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-06-12 18:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-06-12T18:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-06-12 18:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-06-12T18:30:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-06-12").unwrap(),
            d(2024, 6, 12).and_hms_opt(0, 0, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday at noon").is_err());
        assert!(parse_timestamp("2024-06-12 25:00").is_err());
    }

    #[test]
    fn test_parse_timestamp_year_range() {
        assert!(parse_timestamp("-262143-01-01 00:00").is_err());
        assert!(parse_timestamp("+262142-12-31T23:59:59").is_err());
        assert!(parse_timestamp("-262143-01-01").is_err());
        let err = parse_timestamp("0000-06-12 08:00").unwrap_err().to_string();
        assert!(err.contains("out of range"), "{err}");
        assert!(parse_timestamp("9999-12-31 23:59").is_ok());
    }
}
