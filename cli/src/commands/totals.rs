use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use fullsnack_core::calendar::{week_dates, week_end_of, week_start_of};
use fullsnack_core::db::Database;
use fullsnack_core::models::{Day, FoodLogEntry, Week};

use super::helpers::{
    exit_not_found, parse_date, print_days_table, print_json, print_logs_table, print_weeks_table,
};

#[derive(Serialize)]
struct DayView {
    #[serde(flatten)]
    day: Day,
    logs: Vec<FoodLogEntry>,
}

#[derive(Serialize)]
struct WeekView {
    #[serde(flatten)]
    week: Week,
    end_date: NaiveDate,
    days: Vec<Day>,
}

/// One row per weekday. Dates without a bucket read as 0.
fn fill_week(week_start: NaiveDate, days: &[Day]) -> Vec<(NaiveDate, i64)> {
    week_dates(week_start)
        .into_iter()
        .map(|date| {
            let total = days
                .iter()
                .find(|d| d.date == date)
                .map_or(0, |d| d.daily_calorie_total);
            (date, total)
        })
        .collect()
}

pub(crate) fn cmd_logs(db: &Database, user_id: i64, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let logs = db.list_food_logs_for_date(user_id, date)?;

    if json {
        return print_json(&logs);
    }
    if logs.is_empty() {
        exit_not_found(&format!("No entries for {date}"), false);
    }
    println!("=== {date} ===\n");
    print_logs_table(&logs);
    Ok(())
}

pub(crate) fn cmd_day(db: &Database, user_id: i64, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let Some(day) = db.get_day(date)? else {
        exit_not_found(&format!("No day bucket for {date}"), json);
    };
    let logs = db.list_food_logs_for_date(user_id, date)?;

    if json {
        return print_json(&DayView { day, logs });
    }

    let weekday = day.date.format("%A");
    println!("=== {date} ({weekday}) ===\n");
    if !logs.is_empty() {
        print_logs_table(&logs);
        println!();
    }
    let (total, week_start) = (day.daily_calorie_total, day.week_start);
    println!("  DAY TOTAL: {total} kcal (week of {week_start})");
    Ok(())
}

pub(crate) fn cmd_week(db: &Database, user_id: i64, date: Option<String>, json: bool) -> Result<()> {
    let week_start = week_start_of(parse_date(date)?);
    let Some(week) = db.get_week(week_start)? else {
        exit_not_found(&format!("No week bucket for week of {week_start}"), json);
    };
    let days = db.list_days_in_week(user_id, week_start)?;

    if json {
        return print_json(&WeekView {
            week,
            end_date: week_end_of(week_start),
            days,
        });
    }

    let end = week_end_of(week_start);
    println!("=== Week of {week_start} to {end} ===\n");
    for (date, total) in fill_week(week_start, &days) {
        let weekday = date.format("%a");
        println!("  {weekday} {date}  {total:>6} kcal");
    }
    let total = week.weekly_calorie_total;
    println!("\n  WEEK TOTAL: {total} kcal");
    Ok(())
}

pub(crate) fn cmd_days(
    db: &Database,
    user_id: i64,
    week: Option<String>,
    limit: u32,
    json: bool,
) -> Result<()> {
    let days = match week {
        Some(w) => db.list_days_in_week(user_id, week_start_of(parse_date(Some(w))?))?,
        None => db.list_recent_days(user_id, limit)?,
    };

    if json {
        return print_json(&days);
    }
    if days.is_empty() {
        exit_not_found("No days logged yet", false);
    }
    print_days_table(&days);
    Ok(())
}

pub(crate) fn cmd_weeks(db: &Database, user_id: i64, limit: u32, json: bool) -> Result<()> {
    let weeks = db.list_recent_weeks(user_id, limit)?;

    if json {
        return print_json(&weeks);
    }
    if weeks.is_empty() {
        exit_not_found("No weeks logged yet", false);
    }
    print_weeks_table(&weeks);
    Ok(())
}

pub(crate) fn cmd_recalc(db: &Database, json: bool) -> Result<()> {
    let summary = db.recalculate_all()?;

    if json {
        return print_json(&summary);
    }
    let (days, weeks, corrected) = (summary.days, summary.weeks, summary.corrected);
    println!("Recalculated {days} days and {weeks} weeks ({corrected} corrected)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fill_week_zero_for_missing_days() {
        let days = vec![
            Day {
                date: date(2024, 6, 10),
                week_start: date(2024, 6, 10),
                daily_calorie_total: 1800,
            },
            Day {
                date: date(2024, 6, 14),
                week_start: date(2024, 6, 10),
                daily_calorie_total: 2200,
            },
        ];
        let filled = fill_week(date(2024, 6, 10), &days);
        assert_eq!(filled.len(), 7);
        assert_eq!(filled[0], (date(2024, 6, 10), 1800));
        assert_eq!(filled[1], (date(2024, 6, 11), 0));
        assert_eq!(filled[4], (date(2024, 6, 14), 2200));
        assert_eq!(filled[6], (date(2024, 6, 16), 0));
    }

    #[test]
    fn test_day_view_flattens_bucket() {
        let view = DayView {
            day: Day {
                date: date(2024, 6, 12),
                week_start: date(2024, 6, 10),
                daily_calorie_total: 500,
            },
            logs: Vec::new(),
        };
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["date"], "2024-06-12");
        assert_eq!(v["week_start"], "2024-06-10");
        assert_eq!(v["daily_calorie_total"], 500);
        assert!(v["logs"].as_array().unwrap().is_empty());
    }
}
