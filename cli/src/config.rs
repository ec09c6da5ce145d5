use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use fullsnack_core::db::Database;
use fullsnack_core::models::User;

pub const DEFAULT_USER: &str = "me@localhost";
pub const DEMO_FDC_KEY: &str = "DEMO_KEY";

pub struct Config {
    pub db_path: PathBuf,
    pub user_email: String,
    pub fdc_api_key: String,
    pub unsplash_access_key: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "fullsnack").context("Could not determine home directory")?;
        let data_dir = proj_dirs.data_dir().to_path_buf();
        let config = Self::from_lookup(data_dir, |name| std::env::var(name).ok());

        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
        Ok(config)
    }

    fn from_lookup(data_dir: PathBuf, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Config {
            db_path: var("FULLSNACK_DB").map_or_else(|| data_dir.join("fullsnack.db"), PathBuf::from),
            user_email: var("FULLSNACK_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
            fdc_api_key: var("FDC_API_KEY").unwrap_or_else(|| DEMO_FDC_KEY.to_string()),
            unsplash_access_key: var("UNSPLASH_ACCESS_KEY"),
        }
    }

    pub fn open_database(&self) -> Result<Database> {
        Database::open(&self.db_path)
    }
}

/// 32 random bytes, hex encoded.
pub fn generate_api_key() -> String {
    use rand::Rng;
    use std::fmt::Write;

    let bytes: [u8; 32] = rand::rng().random();
    bytes
        .iter()
        .fold(String::with_capacity(64), |mut acc: String, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

/// Find the user by email, creating it with a fresh API key on first use.
/// Returns `(user, newly_created)`.
pub fn ensure_user(db: &Database, email: &str) -> Result<(User, bool)> {
    if let Some(user) = db.get_user_by_email(email)? {
        return Ok((user, false));
    }
    let user = db.create_user(email, &generate_api_key())?;
    Ok((user, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(PathBuf::from("/data/fullsnack"), |name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]);
        assert_eq!(config.db_path, PathBuf::from("/data/fullsnack/fullsnack.db"));
        assert_eq!(config.user_email, DEFAULT_USER);
        assert_eq!(config.fdc_api_key, DEMO_FDC_KEY);
        assert!(config.unsplash_access_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = config_with(&[
            ("FULLSNACK_DB", "/tmp/other.db"),
            ("FULLSNACK_USER", "sam@example.com"),
            ("FDC_API_KEY", "fdc-123"),
            ("UNSPLASH_ACCESS_KEY", "unsplash-456"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.user_email, "sam@example.com");
        assert_eq!(config.fdc_api_key, "fdc-123");
        assert_eq!(config.unsplash_access_key.as_deref(), Some("unsplash-456"));
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = config_with(&[("FDC_API_KEY", "  "), ("UNSPLASH_ACCESS_KEY", "")]);
        assert_eq!(config.fdc_api_key, DEMO_FDC_KEY);
        assert!(config.unsplash_access_key.is_none());
    }

    #[test]
    fn test_generate_api_key() {
        let key = generate_api_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn test_ensure_user_creates_once() {
        let db = Database::open_in_memory().unwrap();
        let (user, created) = ensure_user(&db, DEFAULT_USER).unwrap();
        assert!(created);
        let (again, created) = ensure_user(&db, DEFAULT_USER).unwrap();
        assert!(!created);
        assert_eq!(user.id, again.id);
        assert_eq!(db.get_user_api_key(user.id).unwrap().len(), 64);
    }
}
