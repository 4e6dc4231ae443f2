use crate::errors::{ServiceError, ServiceResult, ValidationError};
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings for the export engine.
///
/// Values come from the process environment (a `.env` file is honoured),
/// every key is prefixed with `REPORT_`.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Rows fetched per keyset query against the vote view
    pub vote_batch_size: usize,
    /// Bound of the channel between the vote cursor task and the CSV writer
    pub channel_capacity: usize,
    pub query_timeout: Duration,
    pub idle_timeout: Duration,
    /// Rows written between explicit flushes of the output sink
    pub flush_interval: usize,
    pub include_bom: bool,
    pub conversation_url_base: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: 5,
            vote_batch_size: 1000,
            channel_capacity: 16,
            query_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            flush_interval: 100,
            include_bom: false,
            conversation_url_base: None,
        }
    }
}

impl ExportConfig {
    /// Load from the environment, reading `.env` first if present
    pub fn from_env() -> ServiceResult<Self> {
        if let Err(e) = dotenv::dotenv() {
            log::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Missing optional keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("REPORT_DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ValidationError::required("REPORT_DATABASE_URL"))?;

        let config = Self {
            database_url,
            max_connections: parse_or(&lookup, "REPORT_DB_MAX_CONNECTIONS", defaults.max_connections)?,
            vote_batch_size: parse_or(&lookup, "REPORT_VOTE_BATCH_SIZE", defaults.vote_batch_size)?,
            channel_capacity: parse_or(&lookup, "REPORT_CHANNEL_CAPACITY", defaults.channel_capacity)?,
            query_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REPORT_QUERY_TIMEOUT_SECS",
                defaults.query_timeout.as_secs(),
            )?),
            idle_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REPORT_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout.as_secs(),
            )?),
            flush_interval: parse_or(&lookup, "REPORT_FLUSH_INTERVAL", defaults.flush_interval)?,
            include_bom: parse_or(&lookup, "REPORT_CSV_BOM", defaults.include_bom)?,
            conversation_url_base: lookup("REPORT_CONVERSATION_URL_BASE")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.database_url.trim().is_empty() {
            return Err(ValidationError::required("database_url"));
        }
        if self.max_connections == 0 || self.max_connections > 64 {
            return Err(ValidationError::range("max_connections", 1, 64));
        }
        if self.vote_batch_size == 0 || self.vote_batch_size > 100_000 {
            return Err(ValidationError::range("vote_batch_size", 1, 100_000));
        }
        if self.channel_capacity == 0 {
            return Err(ValidationError::invalid_value("channel_capacity", "must be positive"));
        }
        if self.query_timeout.is_zero() {
            return Err(ValidationError::invalid_value("query_timeout", "must be positive"));
        }
        if self.flush_interval == 0 {
            return Err(ValidationError::invalid_value("flush_interval", "must be positive"));
        }
        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> ServiceResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            ServiceError::Configuration(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
    }
}
