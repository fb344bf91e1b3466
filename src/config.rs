use std::{env, path::PathBuf};

use tracing::warn;

pub struct Config {
    pub db_path: PathBuf,
    pub identity_api_url: String,
    pub identity_api_key: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            db_path: PathBuf::from(var_or("FINANCEFLOW_DB", "data/financeflow.sqlite")),
            identity_api_url: var_or("IDENTITY_API_URL", "https://users.internal/v1"),
            identity_api_key: var_or("IDENTITY_API_KEY", ""),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{key} not set, using default: {default}");
        default.to_string()
    })
}
