use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub api_keys: String,
    pub alert_webhook_url: Option<String>,
    pub query_cache_ttl: Duration,
    pub ingest_max_attempts: u32,
    pub ingest_base_delay: Duration,
    pub feed_utc_offset_hours: i32,
    pub mlb_api_base_url: String,
    pub feed_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            api_keys: std::env::var("API_KEYS").unwrap_or_default(),
            alert_webhook_url: std::env::var("ALERT_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            query_cache_ttl: Duration::from_secs(parse_or("QUERY_CACHE_TTL_SECS", 300)?),
            ingest_max_attempts: parse_or("INGEST_MAX_ATTEMPTS", 3)?,
            ingest_base_delay: Duration::from_millis(parse_or("INGEST_BASE_DELAY_MS", 1000)?),
            feed_utc_offset_hours: parse_or("FEED_UTC_OFFSET_HOURS", -4)?,
            mlb_api_base_url: std::env::var("MLB_API_BASE_URL")
                .unwrap_or_else(|_| importer::sources::mlb::DEFAULT_BASE_URL.to_string()),
            feed_timeout: Duration::from_secs(parse_or("FEED_TIMEOUT_SECS", 30)?),
        })
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value '{raw}'")),
        _ => Ok(default),
    }
}
