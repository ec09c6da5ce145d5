//! Get-or-create for Day and Week rows.
//!
//! Creation is `INSERT .. ON CONFLICT DO NOTHING` against the primary key
//! followed by a read. Two writers that race on the same key both end up
//! reading the single surviving row, and an existing Day keeps the
//! `week_start` it was created with.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rusqlite::{OptionalExtension, params};

use super::Database;
use crate::calendar::{is_week_start, week_start_of};
use crate::models::{Day, Week};

impl Database {
    pub fn get_or_create_week(&self, week_start: NaiveDate) -> Result<Week> {
        if !is_week_start(week_start) {
            bail!("Week start {week_start} is not a Monday");
        }
        let created = self.conn.execute(
            "INSERT INTO weeks (start_date, weekly_calorie_total) VALUES (?1, 0)
             ON CONFLICT(start_date) DO NOTHING",
            params![week_start],
        )?;
        if created > 0 {
            tracing::debug!(%week_start, "created week bucket");
        }
        self.get_week(week_start)?
            .with_context(|| format!("Week {week_start} missing after insert"))
    }

    pub fn get_or_create_day(&self, date: NaiveDate) -> Result<Day> {
        if let Some(day) = self.get_day(date)? {
            return Ok(day);
        }
        let week = self.get_or_create_week(week_start_of(date))?;
        let created = self.conn.execute(
            "INSERT INTO days (date, week_start, daily_calorie_total) VALUES (?1, ?2, 0)
             ON CONFLICT(date) DO NOTHING",
            params![date, week.start_date],
        )?;
        if created > 0 {
            tracing::debug!(%date, week_start = %week.start_date, "created day bucket");
        }
        self.get_day(date)?
            .with_context(|| format!("Day {date} missing after insert"))
    }

    pub fn get_week(&self, start_date: NaiveDate) -> Result<Option<Week>> {
        let week = self
            .conn
            .query_row(
                "SELECT start_date, weekly_calorie_total FROM weeks WHERE start_date = ?1",
                params![start_date],
                Self::week_from_row,
            )
            .optional()?;
        Ok(week)
    }

    pub fn get_day(&self, date: NaiveDate) -> Result<Option<Day>> {
        let day = self
            .conn
            .query_row(
                "SELECT date, week_start, daily_calorie_total FROM days WHERE date = ?1",
                params![date],
                Self::day_from_row,
            )
            .optional()?;
        Ok(day)
    }
}
