mod helpers;
mod log;
mod lookup;
mod totals;

use anyhow::Result;
use serde::Serialize;

use fullsnack_core::db::Database;
use fullsnack_core::models::User;

pub(crate) use log::{LogArgs, UpdateArgs, cmd_delete, cmd_image, cmd_log, cmd_update};
pub(crate) use lookup::{cmd_images, cmd_lookup};
pub(crate) use totals::{cmd_day, cmd_days, cmd_logs, cmd_recalc, cmd_week, cmd_weeks};

/// Show the local user and the API key the server accepts for it.
pub(crate) fn cmd_user(db: &Database, user: &User, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct UserView<'a> {
        #[serde(flatten)]
        user: &'a User,
        api_key: String,
    }

    let api_key = db.get_user_api_key(user.id)?;
    if json {
        return helpers::print_json(&UserView { user, api_key });
    }
    let (id, email) = (user.id, &user.email);
    println!("User {id}: {email}");
    println!("API key: {api_key}");
    println!("Include in requests: Authorization: Bearer {api_key}");
    Ok(())
}
