mod commands;
mod config;
mod server;
mod unsplash;
mod usda;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    LogArgs, UpdateArgs, cmd_day, cmd_days, cmd_delete, cmd_image, cmd_images, cmd_log,
    cmd_logs, cmd_lookup, cmd_recalc, cmd_update, cmd_user, cmd_week, cmd_weeks,
};
use crate::config::{Config, ensure_user};
use crate::unsplash::UnsplashClient;
use crate::usda::UsdaClient;
use fullsnack_core::db::DEFAULT_RECENT_LIMIT;

#[derive(Parser)]
#[command(
    name = "fullsnack",
    version,
    about = "Log what you eat, see it add up by day and by week"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a food entry
    Log(LogArgs),
    /// Update a food entry's name or nutrition values
    Update(UpdateArgs),
    /// Delete a food entry by ID
    Delete {
        /// Entry ID to delete
        entry_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List food entries for a date (default: today)
    Logs {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a day's calorie total and entries (default: today)
    Day {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the Monday-to-Sunday week containing a date (default: this week)
    Week {
        /// Any date inside the week
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List days with entries, newest first
    Days {
        /// Only days of the week containing this date
        #[arg(long)]
        week: Option<String>,
        /// Maximum number of days
        #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List weeks with entries, newest first
    Weeks {
        /// Maximum number of weeks
        #[arg(short, long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up nutrition facts on USDA `FoodData` Central
    Lookup {
        /// Food name
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Preview Unsplash photos for a food
    Images {
        /// Search term
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Attach the first Unsplash photo for a search term to an entry
    Image {
        /// Entry ID
        entry_id: i64,
        /// Search term
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recompute every day and week total from the stored entries
    Recalc {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the local user and its API key
    User {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication and act as the local user
        #[arg(long)]
        no_auth: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fullsnack=info,fullsnack_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = config.open_database()?;
    let (user, created) = ensure_user(&db, &config.user_email)?;
    if created {
        tracing::info!(email = %user.email, "created local user");
    }

    let usda = UsdaClient::new(config.fdc_api_key.clone())?;
    let unsplash = config
        .unsplash_access_key
        .clone()
        .map(UnsplashClient::new)
        .transpose()?;

    match cli.command {
        Commands::Log(args) => cmd_log(&db, user.id, &usda, unsplash.as_ref(), args).await,
        Commands::Update(args) => cmd_update(&db, user.id, args),
        Commands::Delete { entry_id, json } => cmd_delete(&db, user.id, entry_id, json),
        Commands::Logs { date, json } => cmd_logs(&db, user.id, date, json),
        Commands::Day { date, json } => cmd_day(&db, user.id, date, json),
        Commands::Week { date, json } => cmd_week(&db, user.id, date, json),
        Commands::Days { week, limit, json } => cmd_days(&db, user.id, week, limit, json),
        Commands::Weeks { limit, json } => cmd_weeks(&db, user.id, limit, json),
        Commands::Lookup { query, json } => cmd_lookup(&usda, &query, json).await,
        Commands::Images { query, json } => cmd_images(unsplash.as_ref(), &query, json).await,
        Commands::Image {
            entry_id,
            query,
            json,
        } => cmd_image(&db, user.id, unsplash.as_ref(), entry_id, &query, json).await,
        Commands::Recalc { json } => cmd_recalc(&db, json),
        Commands::User { json } => cmd_user(&db, &user, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let auth = if no_auth {
                server::AuthMode::LocalUser(user.id)
            } else {
                server::AuthMode::ApiKey
            };
            let clients = server::Clients {
                nutrition: usda,
                images: unsplash,
            };
            server::start_server(db, clients, port, &bind, auth).await
        }
    }
}
