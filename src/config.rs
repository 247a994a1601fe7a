//! Configuration loader for the `airquality-service` backend.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::{env, time::Duration};

use anyhow::{anyhow, Result};

/// Cities queried when a request does not name any.
const DEFAULT_CITIES: [&str; 8] = [
    "london",
    "paris",
    "berlin",
    "new york",
    "los angeles",
    "beijing",
    "tokyo",
    "mumbai",
];

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// WAQI city feed base URL.
    pub api_url: String,

    /// WAQI API token used when a request does not supply one.
    pub api_token: String,

    /// Per-request timeout for WAQI calls.
    pub api_timeout: Duration,

    /// Pause between consecutive WAQI network requests.
    pub fetch_delay: Duration,

    /// How long a fetched city feed stays fresh.
    pub cache_ttl: Duration,

    /// Cities used when a request selects none.
    pub default_cities: Vec<String>,

    /// HTTP listen port.
    pub listen_port: u16,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `WAQI_API_URL` – feed base URL (default: `https://api.waqi.info/feed`)
/// - `WAQI_API_TOKEN` – API token (default: `demo`)
/// - `WAQI_TIMEOUT_SECS` – request timeout (default: 10)
/// - `WAQI_FETCH_DELAY_MS` – delay between city requests (default: 300)
/// - `CACHE_TTL_SECS` – feed cache lifetime (default: 1800)
/// - `DEFAULT_CITIES` – comma separated city list
/// - `LISTEN_PORT` – HTTP port (default: 8080)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let api_url = env::var("WAQI_API_URL").unwrap_or_else(|_| "https://api.waqi.info/feed".into());
    let api_token = env::var("WAQI_API_TOKEN").unwrap_or_else(|_| "demo".into());
    let api_timeout = Duration::from_secs(parse_env_u32!("WAQI_TIMEOUT_SECS", 10).into());
    let fetch_delay = Duration::from_millis(parse_env_u32!("WAQI_FETCH_DELAY_MS", 300).into());
    let cache_ttl = Duration::from_secs(parse_env_u32!("CACHE_TTL_SECS", 1800).into());
    let default_cities = env::var("DEFAULT_CITIES")
        .ok()
        .map(|v| parse_city_list(&v))
        .filter(|cities| !cities.is_empty())
        .unwrap_or_else(|| DEFAULT_CITIES.iter().map(|c| c.to_string()).collect());

    let listen_port = parse_env_u32!("LISTEN_PORT", 8080);
    let listen_port =
        u16::try_from(listen_port).map_err(|_| anyhow!("Invalid LISTEN_PORT: {}", listen_port))?;

    Ok(Config {
        db_url,
        db_pool_max,
        api_url,
        api_token,
        api_timeout,
        fetch_delay,
        cache_ttl,
        default_cities,
        listen_port,
    })
}

/// Split a comma separated list, trimming and lowercasing each entry.
pub fn parse_city_list(raw: &str) -> Vec<String> {
    // ---
    raw.split(',')
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Keep the first and last character of a secret, hide the rest.
fn mask_secret(secret: &str) -> String {
    // ---
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****{}", chars[0], chars[chars.len() - 1])
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password and the API token while showing
    /// all other configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL        : {}", self.masked_db_url());
        tracing::info!("  DB_POOL_MAX         : {}", self.db_pool_max);
        tracing::info!("  WAQI_API_URL        : {}", self.api_url);
        tracing::info!("  WAQI_API_TOKEN      : {}", mask_secret(&self.api_token));
        tracing::info!("  WAQI_TIMEOUT_SECS   : {}", self.api_timeout.as_secs());
        tracing::info!("  WAQI_FETCH_DELAY_MS : {}", self.fetch_delay.as_millis());
        tracing::info!("  CACHE_TTL_SECS      : {}", self.cache_ttl.as_secs());
        tracing::info!("  DEFAULT_CITIES      : {}", self.default_cities.join(", "));
        tracing::info!("  LISTEN_PORT         : {}", self.listen_port);
    }

    /// Database URL with the password replaced by `****`.
    pub fn masked_db_url(&self) -> String {
        // ---
        // Only the userinfo between "://" and "@" can carry a password
        let userinfo_start = self.db_url.find("://").map_or(0, |pos| pos + 3);
        if let Some(at_pos) = self.db_url.rfind('@').filter(|&at| at >= userinfo_start) {
            if let Some(colon_pos) = self.db_url[userinfo_start..at_pos].rfind(':') {
                let colon_pos = userinfo_start + colon_pos;
                return format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                );
            }
        }
        self.db_url.clone()
    }
}
