//! Create, update and delete of food log entries.
//!
//! Each operation is one write unit: resolve buckets, mutate the entry,
//! recompute the affected day and week. All of it commits or none of it does.
//! The bucket an entry lands in is derived from `logged_at` once, at creation.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;

use super::Database;
use crate::models::{DeletedFoodLog, FoodImage, LoggedFood, NewFoodLog, UpdateFoodLog};

impl Database {
    pub fn create_food_log(
        &self,
        user_id: i64,
        draft: &NewFoodLog,
        logged_at: NaiveDateTime,
    ) -> Result<LoggedFood> {
        let logged = self.write_unit(|| {
            let day = self.get_or_create_day(logged_at.date())?;
            let id = self.insert_food_log_row(user_id, draft, logged_at, day.date)?;
            let (day, week) = self.recalculate_buckets_for(day.date)?;
            let entry = self
                .get_food_log(user_id, id)?
                .context("Food log missing after insert")?;
            Ok(LoggedFood { entry, day, week })
        })?;
        tracing::info!(
            id = logged.entry.id,
            user_id,
            date = %logged.day.date,
            calories = logged.entry.calories,
            daily_total = logged.day.daily_calorie_total,
            "logged food"
        );
        Ok(logged)
    }

    /// Apply field changes to an entry. The entry stays in the day it was
    /// created in. Returns `None` if the entry does not exist for this user.
    pub fn update_food_log(
        &self,
        user_id: i64,
        id: i64,
        update: &UpdateFoodLog,
    ) -> Result<Option<LoggedFood>> {
        let logged = self.write_unit(|| {
            let Some(existing) = self.get_food_log(user_id, id)? else {
                return Ok(None);
            };
            self.apply_food_log_update(id, update)?;
            let (day, week) = self.recalculate_buckets_for(existing.date)?;
            let entry = self
                .get_food_log(user_id, id)?
                .context("Food log missing after update")?;
            Ok(Some(LoggedFood { entry, day, week }))
        })?;
        if let Some(ref logged) = logged {
            tracing::info!(
                id,
                user_id,
                date = %logged.day.date,
                daily_total = logged.day.daily_calorie_total,
                "updated food log"
            );
        }
        Ok(logged)
    }

    pub fn set_food_log_image(
        &self,
        user_id: i64,
        id: i64,
        image: Option<FoodImage>,
    ) -> Result<Option<LoggedFood>> {
        let update = UpdateFoodLog {
            image: Some(image),
            ..UpdateFoodLog::default()
        };
        self.update_food_log(user_id, id, &update)
    }

    /// Remove an entry and recompute the buckets it belonged to from what
    /// remains. Returns `None` if the entry does not exist for this user.
    pub fn delete_food_log(&self, user_id: i64, id: i64) -> Result<Option<DeletedFoodLog>> {
        let deleted = self.write_unit(|| {
            let Some(existing) = self.get_food_log(user_id, id)? else {
                return Ok(None);
            };
            self.delete_food_log_row(id)?;
            let (day, week) = self.recalculate_buckets_for(existing.date)?;
            Ok(Some(DeletedFoodLog {
                deleted_name: existing.food_name,
                date: day.date,
                daily_total: day.daily_calorie_total,
                weekly_total: week.weekly_calorie_total,
            }))
        })?;
        if let Some(ref deleted) = deleted {
            tracing::info!(
                id,
                user_id,
                date = %deleted.date,
                daily_total = deleted.daily_total,
                weekly_total = deleted.weekly_total,
                "deleted food log"
            );
        }
        Ok(deleted)
    }
}
