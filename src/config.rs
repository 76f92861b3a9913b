use anyhow::Context;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

use crate::services::hub::DEFAULT_OBSERVER_QUEUE_CAPACITY;
use crate::utils::reference::DEFAULT_REFERENCE_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub hmac_secret: String,
    pub reference_prefix: String,
    pub ws_client_queue_capacity: usize,
    pub ws_idle_timeout_secs: u64,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let hmac_secret = hmac_secret_from_env()?;

        let reference_prefix =
            env::var("REFERENCE_PREFIX").unwrap_or_else(|_| DEFAULT_REFERENCE_PREFIX.to_string());
        if reference_prefix.is_empty() || !reference_prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            anyhow::bail!("REFERENCE_PREFIX must be one or more ASCII letters");
        }

        let ws_idle_timeout_secs = parse_or("WS_IDLE_TIMEOUT_SECS", 60)?;
        if ws_idle_timeout_secs == 0 {
            anyhow::bail!("WS_IDLE_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Config {
            server_port: parse_or("SERVER_PORT", 8000)?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            hmac_secret,
            reference_prefix,
            ws_client_queue_capacity: parse_or(
                "WS_CLIENT_QUEUE_CAPACITY",
                DEFAULT_OBSERVER_QUEUE_CAPACITY,
            )?,
            ws_idle_timeout_secs,
            log_format: parse_or("LOG_FORMAT", LogFormat::Pretty)?,
        })
    }
}

/// Reads only the signing key, for commands that never touch the database.
pub fn hmac_secret_from_env() -> anyhow::Result<String> {
    dotenv().ok(); // Load .env file if present

    let hmac_secret = env::var("HMAC_SECRET").context("HMAC_SECRET must be set")?;
    if hmac_secret.is_empty() {
        anyhow::bail!("HMAC_SECRET must not be empty");
    }
    Ok(hmac_secret)
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_format() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: u16 = parse_or("QR_PAYMENT_CORE_TEST_UNSET_PORT", 8000).unwrap();
        assert_eq!(value, 8000);
    }
}
