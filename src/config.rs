use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_DATABASE_URL: &str = "lernis.db";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:8080";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STATUS_CLEAR_SECS: u64 = 4;
const DEFAULT_PORT: u16 = 3000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gate_secret: String,
    pub jwt_secret: String,
    pub database_url: String,
    pub document_store_url: Option<String>,
    pub document_store_api_key: Option<String>,
    pub document_store_timeout: Duration,
    pub status_clear_after: Duration,
    pub admin_api_key: Option<String>,
    pub frontend_url: String,
    pub environment: String,
    pub port: u16,
    pub sentry_dsn: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| non_empty(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            gate_secret: required("GATE_SECRET")?,
            jwt_secret: required("JWT_SECRET_KEY")?,
            database_url: non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            document_store_url: non_empty("DOCUMENT_STORE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            document_store_api_key: non_empty("DOCUMENT_STORE_API_KEY"),
            document_store_timeout: Duration::from_secs(parse_or(
                &non_empty,
                "DOCUMENT_STORE_TIMEOUT_SECS",
                DEFAULT_STORE_TIMEOUT_SECS,
            )?),
            status_clear_after: Duration::from_secs(parse_or(
                &non_empty,
                "STATUS_CLEAR_SECS",
                DEFAULT_STATUS_CLEAR_SECS,
            )?),
            admin_api_key: non_empty("ADMIN_API_KEY"),
            frontend_url: non_empty("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
            environment: non_empty("ENVIRONMENT").unwrap_or_else(|| "production".to_string()),
            port: parse_or(&non_empty, "PORT", DEFAULT_PORT)?,
            sentry_dsn: non_empty("SENTRY_DSN"),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
