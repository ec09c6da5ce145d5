use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const MAX_FOOD_NAME_LEN: usize = 100;

/// A Monday-keyed calorie bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub start_date: NaiveDate,
    pub weekly_calorie_total: i64,
}

/// A date-keyed calorie bucket. `week_start` is fixed when the row is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub date: NaiveDate,
    pub week_start: NaiveDate,
    pub daily_calorie_total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodLogEntry {
    pub id: i64,
    pub uuid: String,
    pub user_id: i64,
    pub food_name: String,
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<FoodImage>,
    pub logged_at: NaiveDateTime,
    /// The day bucket this entry was assigned to at creation.
    pub date: NaiveDate,
    pub created_at: String,
    pub updated_at: String,
}

/// Draft of a food log entry before it is bucketed.
#[derive(Debug, Clone)]
pub struct NewFoodLog {
    pub food_name: String,
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
    pub image: Option<FoodImage>,
}

#[derive(Debug, Clone, Default)]
#[allow(clippy::option_option)]
pub struct UpdateFoodLog {
    pub food_name: Option<String>,
    pub calories: Option<u32>,
    pub protein: Option<u32>,
    pub carbs: Option<u32>,
    pub fat: Option<u32>,
    /// `Some(None)` clears the image.
    pub image: Option<Option<FoodImage>>,
}

impl UpdateFoodLog {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.food_name.is_none()
            && self.calories.is_none()
            && self.protein.is_none()
            && self.carbs.is_none()
            && self.fat.is_none()
            && self.image.is_none()
    }
}

/// An entry together with its bucket rows after aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedFood {
    pub entry: FoodLogEntry,
    pub day: Day,
    pub week: Week,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedFoodLog {
    pub deleted_name: String,
    pub date: NaiveDate,
    pub daily_total: i64,
    pub weekly_total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RecalculationSummary {
    pub days: usize,
    pub weeks: usize,
    /// Buckets whose stored total differed from the recomputed one.
    pub corrected: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: String,
}

/// Normalized nutrition record returned by the lookup integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub name: String,
    pub calories: u32,
    pub protein_g: u32,
    pub carbs_g: u32,
    pub fat_g: u32,
}

impl NutritionFacts {
    #[must_use]
    pub fn into_new_food_log(self) -> NewFoodLog {
        NewFoodLog {
            food_name: self.name,
            calories: self.calories,
            protein: self.protein_g,
            carbs: self.carbs_g,
            fat: self.fat_g,
            image: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageCredit {
    pub name: Option<String>,
    pub profile: Option<String>,
    /// The photo's page on Unsplash.
    #[serde(rename = "unsplash")]
    pub photo: Option<String>,
}

/// One candidate image for the search preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePreview {
    pub id: Option<String>,
    pub alt: String,
    pub thumb: Option<String>,
    pub full: Option<String>,
    pub credit: ImageCredit,
}

pub fn validate_food_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("Food name must not be empty");
    }
    if trimmed.chars().count() > MAX_FOOD_NAME_LEN {
        bail!("Food name must be at most {MAX_FOOD_NAME_LEN} characters");
    }
    Ok(trimmed.to_string())
}

pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        bail!("Invalid email address '{email}'");
    }
    Ok(email)
}
