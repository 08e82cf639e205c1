//! Configuration management for the log shipper.
//!
//! Settings come from the process environment, with a `.env` file in the
//! working directory loaded first.

use crate::utils::{Result, ShipperError};
use std::time::Duration;

const ENV_HOST: &str = "API_HOST";
const ENV_SECRET: &str = "API_SECRET";
const ENV_TIMEOUT: &str = "API_TIMEOUT_SECS";
const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the ingestion server, e.g. `https://stats.example.com/`
    pub api_host: String,

    /// Shared secret sent with every upload
    pub api_secret: String,

    /// Per-request timeout for uploads
    pub request_timeout: Duration,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ShipperError::Config(format!("{} is not set", key)))
        };

        let api_host = required(ENV_HOST)?;
        let api_secret = required(ENV_SECRET)?;

        let timeout_secs = match lookup(ENV_TIMEOUT) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ShipperError::Config(format!("{} must be a whole number of seconds, got {:?}", ENV_TIMEOUT, raw))
            })?,
            None => default_timeout_secs(),
        };

        Ok(Config {
            api_host,
            api_secret,
            request_timeout: Duration::from_secs(timeout_secs),
            log_level: lookup(ENV_LOG_LEVEL).unwrap_or_else(default_log_level),
        })
    }
}
