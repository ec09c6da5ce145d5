use anyhow::{Result, bail};
use clap::Args;

use fullsnack_core::db::Database;
use fullsnack_core::models::{LoggedFood, NewFoodLog, UpdateFoodLog};

use super::helpers::{exit_not_found, parse_logged_at, print_json};
use crate::unsplash::UnsplashClient;
use crate::usda::UsdaClient;

#[derive(Args)]
pub(crate) struct LogArgs {
    /// Food name
    pub name: String,
    /// Calories (required unless --lookup)
    #[arg(short, long)]
    pub calories: Option<u32>,
    /// Protein in grams
    #[arg(long)]
    pub protein: Option<u32>,
    /// Carbohydrates in grams
    #[arg(long)]
    pub carbs: Option<u32>,
    /// Fat in grams
    #[arg(long)]
    pub fat: Option<u32>,
    /// When it was eaten (YYYY-MM-DD [HH:MM], today/yesterday, default: now)
    #[arg(long)]
    pub at: Option<String>,
    /// Fill in missing nutrition values from USDA `FoodData` Central
    #[arg(long)]
    pub lookup: bool,
    /// Attach the first Unsplash photo for this search term
    #[arg(long, value_name = "QUERY")]
    pub image: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub(crate) struct UpdateArgs {
    /// Entry ID to update
    pub entry_id: i64,
    /// New food name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(short, long)]
    pub calories: Option<u32>,
    #[arg(long)]
    pub protein: Option<u32>,
    #[arg(long)]
    pub carbs: Option<u32>,
    #[arg(long)]
    pub fat: Option<u32>,
    /// Remove the attached image
    #[arg(long)]
    pub clear_image: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Merge explicit values over looked-up ones.
fn build_draft(args: &LogArgs, looked_up: Option<NewFoodLog>) -> Result<NewFoodLog> {
    let base = looked_up.unwrap_or_else(|| NewFoodLog {
        food_name: args.name.clone(),
        calories: 0,
        protein: 0,
        carbs: 0,
        fat: 0,
        image: None,
    });
    let calories = match (args.calories, args.lookup) {
        (Some(c), _) => c,
        (None, true) => base.calories,
        (None, false) => bail!("Provide --calories, or use --lookup to fetch them"),
    };
    Ok(NewFoodLog {
        food_name: args.name.clone(),
        calories,
        protein: args.protein.unwrap_or(base.protein),
        carbs: args.carbs.unwrap_or(base.carbs),
        fat: args.fat.unwrap_or(base.fat),
        image: None,
    })
}

fn print_logged(verb: &str, logged: &LoggedFood) {
    let e = &logged.entry;
    let (id, name, cal) = (e.id, &e.food_name, e.calories);
    let (p, c, f) = (e.protein, e.carbs, e.fat);
    println!("{verb} [{id}] {name}: {cal} kcal | P:{p}g C:{c}g F:{f}g");
    let (date, day_total) = (logged.day.date, logged.day.daily_calorie_total);
    let (week, week_total) = (logged.week.start_date, logged.week.weekly_calorie_total);
    println!("  {date}: {day_total} kcal | week of {week}: {week_total} kcal");
    if let Some(ref image) = e.image {
        let credit = image.credit_name.as_deref().unwrap_or("unknown");
        println!("  Image: {} (photo by {credit})", image.url);
    }
}

pub(crate) async fn cmd_log(
    db: &Database,
    user_id: i64,
    usda: &UsdaClient,
    unsplash: Option<&UnsplashClient>,
    args: LogArgs,
) -> Result<()> {
    let logged_at = parse_logged_at(args.at.clone())?;

    let looked_up = if args.lookup {
        match usda.lookup(&args.name).await? {
            Some(facts) => Some(facts.into_new_food_log()),
            None => bail!("No nutrition data found for '{}'", args.name),
        }
    } else {
        None
    };
    let draft = build_draft(&args, looked_up)?;

    let mut logged = db.create_food_log(user_id, &draft, logged_at)?;

    if let Some(ref query) = args.image {
        if let Some(client) = unsplash {
            match client.first_image(query).await {
                Ok(Some(image)) => {
                    let id = logged.entry.id;
                    if let Some(updated) = db.set_food_log_image(user_id, id, Some(image))? {
                        logged = updated;
                    }
                }
                Ok(None) => tracing::warn!(%query, "no image found"),
                Err(e) => {
                    let error = format!("{e:#}");
                    tracing::warn!(%query, %error, "image lookup failed");
                }
            }
        } else {
            tracing::warn!("UNSPLASH_ACCESS_KEY is not set, skipping image");
        }
    }

    if args.json {
        print_json(&logged)
    } else {
        print_logged("Logged", &logged);
        Ok(())
    }
}

pub(crate) fn cmd_update(db: &Database, user_id: i64, args: UpdateArgs) -> Result<()> {
    let update = UpdateFoodLog {
        food_name: args.name,
        calories: args.calories,
        protein: args.protein,
        carbs: args.carbs,
        fat: args.fat,
        image: args.clear_image.then_some(None),
    };
    if update.is_empty() {
        bail!(
            "Nothing to update. Provide at least one of --name, --calories, --protein, --carbs, --fat or --clear-image"
        );
    }

    let entry_id = args.entry_id;
    let Some(logged) = db.update_food_log(user_id, entry_id, &update)? else {
        exit_not_found(&format!("Entry {entry_id} not found"), args.json);
    };

    if args.json {
        print_json(&logged)
    } else {
        print_logged("Updated", &logged);
        Ok(())
    }
}

pub(crate) fn cmd_delete(db: &Database, user_id: i64, entry_id: i64, json: bool) -> Result<()> {
    let Some(deleted) = db.delete_food_log(user_id, entry_id)? else {
        exit_not_found(&format!("Entry {entry_id} not found"), json);
    };

    if json {
        print_json(&deleted)
    } else {
        let (name, date) = (&deleted.deleted_name, deleted.date);
        let (day_total, week_total) = (deleted.daily_total, deleted.weekly_total);
        println!("Deleted entry {entry_id} ({name})");
        println!("  {date}: {day_total} kcal | week total: {week_total} kcal");
        Ok(())
    }
}

pub(crate) async fn cmd_image(
    db: &Database,
    user_id: i64,
    unsplash: Option<&UnsplashClient>,
    entry_id: i64,
    query: &str,
    json: bool,
) -> Result<()> {
    let Some(client) = unsplash else {
        bail!("UNSPLASH_ACCESS_KEY is not set");
    };
    if db.get_food_log(user_id, entry_id)?.is_none() {
        exit_not_found(&format!("Entry {entry_id} not found"), json);
    }

    let Some(image) = client.first_image(query).await? else {
        exit_not_found(&format!("No images found for '{query}'"), json);
    };

    let Some(logged) = db.set_food_log_image(user_id, entry_id, Some(image))? else {
        exit_not_found(&format!("Entry {entry_id} not found"), json);
    };

    if json {
        print_json(&logged)
    } else {
        print_logged("Updated", &logged);
        Ok(())
    }
}
