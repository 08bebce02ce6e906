use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Base URL of the deposit feed; the background scan is off when unset.
    pub deposit_source_url: Option<String>,
    pub scan_interval_ms: u64,
    pub lock_attempts: u32,
    pub lock_retry_delay_ms: u64,
    /// Offset of the settlement day boundary from UTC.
    pub business_utc_offset_hours: i32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or::<u16>(&env_map, "PORT", "8080", "must be a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let deposit_source_url = env_map
            .get("DEPOSIT_SOURCE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let scan_interval_ms =
            parse_or::<u64>(&env_map, "SCAN_INTERVAL_MS", "60000", "must be a valid u64")?;
        if scan_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "SCAN_INTERVAL_MS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let lock_attempts = parse_or::<u32>(&env_map, "LOCK_ATTEMPTS", "3", "must be a valid u32")?;
        if lock_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "LOCK_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let lock_retry_delay_ms =
            parse_or::<u64>(&env_map, "LOCK_RETRY_DELAY_MS", "5000", "must be a valid u64")?;

        let business_utc_offset_hours = parse_or::<i32>(
            &env_map,
            "BUSINESS_UTC_OFFSET_HOURS",
            "8",
            "must be a valid i32",
        )?;
        if !(-23..=23).contains(&business_utc_offset_hours) {
            return Err(ConfigError::InvalidValue(
                "BUSINESS_UTC_OFFSET_HOURS".to_string(),
                "must be between -23 and 23".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            deposit_source_url,
            scan_interval_ms,
            lock_attempts,
            lock_retry_delay_ms,
            business_utc_offset_hours,
        })
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn lock_retry_delay(&self) -> Duration {
        Duration::from_millis(self.lock_retry_delay_ms)
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
    expectation: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), expectation.to_string()))
}
