mod aggregate;
mod buckets;
mod lifecycle;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use uuid::Uuid;

use crate::models::{
    Day, FoodImage, FoodLogEntry, NewFoodLog, UpdateFoodLog, User, Week, validate_email,
    validate_food_name,
};

pub const DEFAULT_RECENT_LIMIT: u32 = 30;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Column order expected by `food_log_from_row`.
const FOOD_LOG_COLUMNS: &str = "id, uuid, user_id, food_name, calories, protein, carbs, fat,
     image_url, image_credit_name, image_credit_profile, image_credit_photo, image_credit_source,
     logged_at, day_date, created_at, updated_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    api_key TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS weeks (
                    start_date TEXT PRIMARY KEY NOT NULL,
                    weekly_calorie_total INTEGER NOT NULL DEFAULT 0
                        CHECK (weekly_calorie_total >= 0)
                );

                CREATE TABLE IF NOT EXISTS days (
                    date TEXT PRIMARY KEY NOT NULL,
                    week_start TEXT NOT NULL REFERENCES weeks(start_date) ON DELETE CASCADE,
                    daily_calorie_total INTEGER NOT NULL DEFAULT 0
                        CHECK (daily_calorie_total >= 0)
                );

                CREATE TABLE IF NOT EXISTS food_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    day_date TEXT NOT NULL REFERENCES days(date) ON DELETE CASCADE,
                    food_name TEXT NOT NULL,
                    calories INTEGER NOT NULL CHECK (calories >= 0),
                    protein INTEGER NOT NULL CHECK (protein >= 0),
                    carbs INTEGER NOT NULL CHECK (carbs >= 0),
                    fat INTEGER NOT NULL CHECK (fat >= 0),
                    image_url TEXT,
                    image_credit_name TEXT,
                    image_credit_profile TEXT,
                    image_credit_photo TEXT,
                    image_credit_source TEXT,
                    logged_at TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_days_week_start ON days(week_start);
                CREATE INDEX IF NOT EXISTS idx_food_logs_day ON food_logs(day_date);
                CREATE INDEX IF NOT EXISTS idx_food_logs_user ON food_logs(user_id, day_date);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Run `unit` inside one write transaction. The write lock is taken up
    /// front so concurrent writers to the same bucket queue instead of racing.
    /// Any error rolls the whole unit back.
    fn write_unit<T>(&self, unit: impl FnOnce() -> Result<T>) -> Result<T> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .context("Failed to begin write transaction")?;
        let value = unit()?;
        tx.commit().context("Failed to commit write transaction")?;
        Ok(value)
    }

    // --- Row mapping helpers ---

    fn week_from_row(row: &rusqlite::Row) -> rusqlite::Result<Week> {
        Ok(Week {
            start_date: row.get(0)?,
            weekly_calorie_total: row.get(1)?,
        })
    }

    fn day_from_row(row: &rusqlite::Row) -> rusqlite::Result<Day> {
        Ok(Day {
            date: row.get(0)?,
            week_start: row.get(1)?,
            daily_calorie_total: row.get(2)?,
        })
    }

    fn food_log_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodLogEntry> {
        let image_url: Option<String> = row.get(8)?;
        let image = match image_url {
            Some(url) => Some(FoodImage {
                url,
                credit_name: row.get(9)?,
                credit_profile: row.get(10)?,
                credit_photo: row.get(11)?,
                source: row.get(12)?,
            }),
            None => None,
        };
        Ok(FoodLogEntry {
            id: row.get(0)?,
            uuid: row.get(1)?,
            user_id: row.get(2)?,
            food_name: row.get(3)?,
            calories: row.get(4)?,
            protein: row.get(5)?,
            carbs: row.get(6)?,
            fat: row.get(7)?,
            image,
            logged_at: row.get(13)?,
            date: row.get(14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }

    fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            created_at: row.get(2)?,
        })
    }

    // --- Users ---

    pub fn create_user(&self, email: &str, api_key: &str) -> Result<User> {
        let email = validate_email(email)?;
        if api_key.trim().is_empty() {
            bail!("API key must not be empty");
        }
        if self.get_user_by_email(&email)?.is_some() {
            bail!("User '{email}' already exists");
        }
        let now = Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO users (email, api_key, created_at) VALUES (?1, ?2, ?3)",
                params![email, api_key, now],
            )
            .with_context(|| format!("Failed to create user '{email}'"))?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(user_id = id, %email, "created user");
        self.get_user_by_id(id)?.context("User not found")
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE id = ?1",
                params![id],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        let user = self
            .conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE email = ?1",
                params![email],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_api_key(&self, api_key: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE api_key = ?1",
                params![api_key],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_api_key(&self, user_id: i64) -> Result<String> {
        self.conn
            .query_row(
                "SELECT api_key FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .context("User not found")
    }

    // --- Food log rows ---
    //
    // These only touch the food_logs table. Bucket totals are owned by the
    // aggregation engine, so every caller goes through lifecycle.rs.

    fn insert_food_log_row(
        &self,
        user_id: i64,
        draft: &NewFoodLog,
        logged_at: NaiveDateTime,
        day_date: NaiveDate,
    ) -> Result<i64> {
        let food_name = validate_food_name(&draft.food_name)?;
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        let image = draft.image.as_ref();
        self.conn.execute(
            "INSERT INTO food_logs (uuid, user_id, day_date, food_name, calories, protein, carbs, fat,
                 image_url, image_credit_name, image_credit_profile, image_credit_photo, image_credit_source,
                 logged_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                uuid,
                user_id,
                day_date,
                food_name,
                draft.calories,
                draft.protein,
                draft.carbs,
                draft.fat,
                image.map(|i| i.url.as_str()),
                image.and_then(|i| i.credit_name.as_deref()),
                image.and_then(|i| i.credit_profile.as_deref()),
                image.and_then(|i| i.credit_photo.as_deref()),
                image.and_then(|i| i.source.as_deref()),
                logged_at,
                now,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn apply_food_log_update(&self, id: i64, update: &UpdateFoodLog) -> Result<()> {
        let now = Local::now().to_rfc3339();
        if let Some(ref name) = update.food_name {
            let name = validate_food_name(name)?;
            self.conn.execute(
                "UPDATE food_logs SET food_name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name, now, id],
            )?;
        }
        for (column, value) in [
            ("calories", update.calories),
            ("protein", update.protein),
            ("carbs", update.carbs),
            ("fat", update.fat),
        ] {
            if let Some(value) = value {
                self.conn.execute(
                    &format!("UPDATE food_logs SET {column} = ?1, updated_at = ?2 WHERE id = ?3"),
                    params![value, now, id],
                )?;
            }
        }
        if let Some(ref image) = update.image {
            let image = image.as_ref();
            self.conn.execute(
                "UPDATE food_logs SET image_url = ?1, image_credit_name = ?2, image_credit_profile = ?3,
                     image_credit_photo = ?4, image_credit_source = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    image.map(|i| i.url.as_str()),
                    image.and_then(|i| i.credit_name.as_deref()),
                    image.and_then(|i| i.credit_profile.as_deref()),
                    image.and_then(|i| i.credit_photo.as_deref()),
                    image.and_then(|i| i.source.as_deref()),
                    now,
                    id
                ],
            )?;
        }
        Ok(())
    }

    fn delete_food_log_row(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM food_logs WHERE id = ?1", params![id])?;
        Ok(())
    }

    // --- Read accessors ---

    /// Fetch an entry owned by `user_id`. Entries of other users read as missing.
    pub fn get_food_log(&self, user_id: i64, id: i64) -> Result<Option<FoodLogEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {FOOD_LOG_COLUMNS} FROM food_logs WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
                Self::food_log_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn list_food_logs_for_date(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<FoodLogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FOOD_LOG_COLUMNS} FROM food_logs
             WHERE user_id = ?1 AND day_date = ?2
             ORDER BY logged_at DESC, id DESC"
        ))?;
        let entries = stmt
            .query_map(params![user_id, date], Self::food_log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Days holding at least one of the user's entries, newest first.
    pub fn list_recent_days(&self, user_id: i64, limit: u32) -> Result<Vec<Day>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.date, d.week_start, d.daily_calorie_total FROM days d
             WHERE EXISTS (SELECT 1 FROM food_logs f WHERE f.day_date = d.date AND f.user_id = ?1)
             ORDER BY d.date DESC
             LIMIT ?2",
        )?;
        let days = stmt
            .query_map(params![user_id, limit], Self::day_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(days)
    }

    /// Weeks holding at least one of the user's entries, newest first.
    pub fn list_recent_weeks(&self, user_id: i64, limit: u32) -> Result<Vec<Week>> {
        let mut stmt = self.conn.prepare(
            "SELECT w.start_date, w.weekly_calorie_total FROM weeks w
             WHERE EXISTS (
                 SELECT 1 FROM food_logs f
                 JOIN days d ON f.day_date = d.date
                 WHERE d.week_start = w.start_date AND f.user_id = ?1
             )
             ORDER BY w.start_date DESC
             LIMIT ?2",
        )?;
        let weeks = stmt
            .query_map(params![user_id, limit], Self::week_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(weeks)
    }

    /// The user's days within one week, Monday first.
    pub fn list_days_in_week(&self, user_id: i64, week_start: NaiveDate) -> Result<Vec<Day>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.date, d.week_start, d.daily_calorie_total FROM days d
             WHERE d.week_start = ?1
               AND EXISTS (SELECT 1 FROM food_logs f WHERE f.day_date = d.date AND f.user_id = ?2)
             ORDER BY d.date ASC",
        )?;
        let days = stmt
            .query_map(params![week_start, user_id], Self::day_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(days)
    }
}
