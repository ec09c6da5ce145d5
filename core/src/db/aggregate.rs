//! Recomputes the denormalized day and week calorie totals from raw entries.
//!
//! Totals are a cache over `food_logs`. Every write path that touches
//! entries ends by recomputing the buckets it touched. An empty bucket sums
//! to 0, so deleting the last entry needs no separate branch.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::params;

use super::Database;
use crate::models::{Day, RecalculationSummary, Week};

impl Database {
    /// Set the day's total to the sum of its entries and return the new row.
    pub(crate) fn recalculate_day(&self, date: NaiveDate) -> Result<Day> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(calories), 0) FROM food_logs WHERE day_date = ?1",
            params![date],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "UPDATE days SET daily_calorie_total = ?1 WHERE date = ?2",
            params![total, date],
        )?;
        tracing::debug!(%date, total, "recalculated day");
        self.get_day(date)?
            .with_context(|| format!("Day {date} not found"))
    }

    /// Set the week's total to the sum over every entry of every day in the
    /// week. Summed from entries rather than day totals.
    pub(crate) fn recalculate_week(&self, start_date: NaiveDate) -> Result<Week> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(f.calories), 0)
             FROM food_logs f
             JOIN days d ON f.day_date = d.date
             WHERE d.week_start = ?1",
            params![start_date],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "UPDATE weeks SET weekly_calorie_total = ?1 WHERE start_date = ?2",
            params![total, start_date],
        )?;
        tracing::debug!(%start_date, total, "recalculated week");
        self.get_week(start_date)?
            .with_context(|| format!("Week {start_date} not found"))
    }

    /// Day first, then its week.
    pub(crate) fn recalculate_buckets_for(&self, day_date: NaiveDate) -> Result<(Day, Week)> {
        let day = self.recalculate_day(day_date)?;
        let week = self.recalculate_week(day.week_start)?;
        Ok((day, week))
    }

    /// Recompute every bucket in one transaction. Safe to re-run; repairs
    /// any totals that drifted from their entries.
    pub fn recalculate_all(&self) -> Result<RecalculationSummary> {
        self.write_unit(|| {
            let mut summary = RecalculationSummary::default();

            let days: Vec<(NaiveDate, i64)> = {
                let mut stmt = self
                    .conn
                    .prepare("SELECT date, daily_calorie_total FROM days ORDER BY date")?;
                stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?
            };
            for (date, before) in days {
                let day = self.recalculate_day(date)?;
                summary.days += 1;
                if day.daily_calorie_total != before {
                    summary.corrected += 1;
                }
            }

            let weeks: Vec<(NaiveDate, i64)> = {
                let mut stmt = self.conn.prepare(
                    "SELECT start_date, weekly_calorie_total FROM weeks ORDER BY start_date",
                )?;
                stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?
            };
            for (start_date, before) in weeks {
                let week = self.recalculate_week(start_date)?;
                summary.weeks += 1;
                if week.weekly_calorie_total != before {
                    summary.corrected += 1;
                }
            }

            tracing::info!(
                days = summary.days,
                weeks = summary.weeks,
                corrected = summary.corrected,
                "recalculated all buckets"
            );
            Ok(summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{at, date, draft, test_user};

    #[test]
    fn test_recalculate_empty_day_is_zero() {
        let db = Database::open_in_memory().unwrap();
        db.get_or_create_day(date(2024, 6, 12)).unwrap();
        let (day, week) = db.recalculate_buckets_for(date(2024, 6, 12)).unwrap();
        assert_eq!(day.daily_calorie_total, 0);
        assert_eq!(week.weekly_calorie_total, 0);
    }

    #[test]
    fn test_recalculate_missing_day_errors() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.recalculate_day(date(2024, 6, 12)).is_err());
    }

    #[test]
    fn test_week_sums_entries_across_days() {
        let db = Database::open_in_memory().unwrap();
        let user = test_user(&db);
        db.create_food_log(user.id, &draft("Mon", 400), at(2024, 6, 10, 9))
            .unwrap();
        db.create_food_log(user.id, &draft("Wed", 250), at(2024, 6, 12, 9))
            .unwrap();
        db.create_food_log(user.id, &draft("Sun", 100), at(2024, 6, 16, 21))
            .unwrap();

        let week = db.recalculate_week(date(2024, 6, 10)).unwrap();
        assert_eq!(week.weekly_calorie_total, 750);
    }

    #[test]
    fn test_recalculate_all_repairs_drift() {
        let db = Database::open_in_memory().unwrap();
        let user = test_user(&db);
        db.create_food_log(user.id, &draft("Eggs", 200), at(2024, 6, 12, 8))
            .unwrap();
        db.create_food_log(user.id, &draft("Soup", 300), at(2024, 6, 13, 12))
            .unwrap();

        // Simulate a partially applied write
        db.conn
            .execute(
                "UPDATE days SET daily_calorie_total = 999 WHERE date = ?1",
                params![date(2024, 6, 12)],
            )
            .unwrap();
        db.conn
            .execute("UPDATE weeks SET weekly_calorie_total = 1", [])
            .unwrap();

        let summary = db.recalculate_all().unwrap();
        assert_eq!(summary.days, 2);
        assert_eq!(summary.weeks, 1);
        assert_eq!(summary.corrected, 2);

        let day = db.get_day(date(2024, 6, 12)).unwrap().unwrap();
        assert_eq!(day.daily_calorie_total, 200);
        let week = db.get_week(date(2024, 6, 10)).unwrap().unwrap();
        assert_eq!(week.weekly_calorie_total, 500);

        // Second pass finds nothing to fix
        let again = db.recalculate_all().unwrap();
        assert_eq!(again.corrected, 0);
    }
}
