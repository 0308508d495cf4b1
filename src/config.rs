//! Environment-driven configuration, loaded once at startup.

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// When unset the server falls back to the in-memory ledger.
    pub database_url: Option<String>,
    pub finnhub_api_key: String,
    pub finnhub_base_url: String,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            finnhub_api_key: env::var("FINNHUB_API_KEY")
                .map_err(|_| ConfigError::Missing("FINNHUB_API_KEY"))?,
            finnhub_base_url: env::var("FINNHUB_BASE_URL")
                .unwrap_or_else(|_| "https://finnhub.io/api/v1".to_string()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
        })
    }
}
