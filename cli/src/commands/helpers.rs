use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fullsnack_core::calendar::{parse_iso_date, parse_timestamp, week_end_of};
use fullsnack_core::models::{Day, FoodLogEntry, Week};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    match date_str {
        None => Ok(today),
        Some(s) => match s.as_str() {
            "today" => Ok(today),
            "yesterday" => Ok(today - chrono::Duration::days(1)),
            "tomorrow" => Ok(today + chrono::Duration::days(1)),
            _ => parse_iso_date(&s).context("Dates also accept today/yesterday/tomorrow"),
        },
    }
}

/// The instant an entry is logged at. Defaults to now, read once here.
pub(crate) fn parse_logged_at(at: Option<String>) -> Result<NaiveDateTime> {
    let now = Local::now().naive_local();
    match at {
        None => Ok(now),
        Some(s) => match s.as_str() {
            "now" => Ok(now),
            "today" | "yesterday" | "tomorrow" => {
                let date = parse_date(Some(s))?;
                Ok(date.and_time(now.time()))
            }
            _ => parse_timestamp(&s),
        },
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing entity and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn print_logs_table(logs: &[FoodLogEntry]) {
    #[derive(Tabled)]
    struct LogRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Food")]
        name: String,
        #[tabled(rename = "Calories")]
        calories: u32,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
    }

    let rows: Vec<LogRow> = logs
        .iter()
        .map(|l| LogRow {
            id: l.id,
            time: l.logged_at.format("%H:%M").to_string(),
            name: truncate(&l.food_name, 35),
            calories: l.calories,
            protein: format!("{}g", l.protein),
            carbs: format!("{}g", l.carbs),
            fat: format!("{}g", l.fat),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_days_table(days: &[Day]) {
    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weekday")]
        weekday: String,
        #[tabled(rename = "Week of")]
        week_start: String,
        #[tabled(rename = "Calories")]
        calories: i64,
    }

    let rows: Vec<DayRow> = days
        .iter()
        .map(|d| DayRow {
            date: d.date.to_string(),
            weekday: d.date.format("%a").to_string(),
            week_start: d.week_start.to_string(),
            calories: d.daily_calorie_total,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_weeks_table(weeks: &[Week]) {
    #[derive(Tabled)]
    struct WeekRow {
        #[tabled(rename = "Week of")]
        start: String,
        #[tabled(rename = "Through")]
        end: String,
        #[tabled(rename = "Calories")]
        calories: i64,
    }

    let rows: Vec<WeekRow> = weeks
        .iter()
        .map(|w| WeekRow {
            start: w.start_date.to_string(),
            end: week_end_of(w.start_date).to_string(),
            calories: w.weekly_calorie_total,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_parse_date_out_of_range_year() {
        assert!(parse_date(Some("+262142-12-31".to_string())).is_err());
        assert!(parse_date(Some("-262143-01-01".to_string())).is_err());
        assert!(parse_logged_at(Some("-262143-01-01 00:00".to_string())).is_err());
    }

    #[test]
    fn test_parse_logged_at_explicit() {
        let ts = parse_logged_at(Some("2024-06-12 07:45".to_string())).unwrap();
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(2024, 6, 12)
                .unwrap()
                .and_hms_opt(7, 45, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_logged_at_bare_date_is_midnight() {
        let ts = parse_logged_at(Some("2024-06-12".to_string())).unwrap();
        assert_eq!(ts.time(), chrono::NaiveTime::MIN);
    }

    #[test]
    fn test_parse_logged_at_yesterday_keeps_date() {
        let ts = parse_logged_at(Some("yesterday".to_string())).unwrap();
        assert_eq!(ts.date(), Local::now().date_naive() - chrono::Duration::days(1));
    }

    #[test]
    fn test_parse_logged_at_invalid() {
        assert!(parse_logged_at(Some("later".to_string())).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("日清カップヌードル", 8), "日清カップ...");
    }

    #[test]
    fn test_json_error() {
        let s = json_error("Entry 7 not found");
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["error"], "Entry 7 not found");
    }
}
