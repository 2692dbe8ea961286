use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

pub const MEALDB_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const REMIX_MODEL: &str = "gpt-4.1";

/// Runtime settings read from the environment (and `.env`).
///
/// The Telegram token is not part of it: teloxide reads `TELOXIDE_TOKEN`
/// itself.
#[derive(Debug, Clone)]
pub struct Config {
    pub mealdb_base_url: String,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub remix_model: String,
    pub favorites_db: PathBuf,
    pub http_timeout: Duration,
}

impl Config {
    pub fn load() -> Self {
        let openai_api_key = var("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        if openai_api_key.is_none() {
            log::warn!("OPENAI_API_KEY not set, remixes will fail");
        }
        Self {
            mealdb_base_url: try_load("MEALDB_BASE_URL", MEALDB_BASE_URL.to_string()),
            openai_base_url: try_load("OPENAI_BASE_URL", OPENAI_BASE_URL.to_string()),
            openai_api_key,
            remix_model: try_load("REMIX_MODEL", REMIX_MODEL.to_string()),
            favorites_db: PathBuf::from(try_load("FAVORITES_DB", "favorites.sqlite3".to_string())),
            http_timeout: Duration::from_secs(try_load("HTTP_TIMEOUT_SECS", 30)),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    let Some(raw) = var(key) else {
        log::info!("{key} not set, using default: {default}");
        return default;
    };
    raw.parse().unwrap_or_else(|e| {
        log::warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}
