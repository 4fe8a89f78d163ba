use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::FixedOffset;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_kiosk_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // PIN handling
    pub pin_max_attempts: u32,
    pub pin_lockout_secs: u64,
    pub pin_hash_memory_kib: u32,
    pub pin_hash_iterations: u32,

    pub report_timeout_secs: u64,
    /// Offset of the business' local day, used for "today" on the dashboard.
    pub utc_offset_minutes: i32,

    pub log_dir: String,
    pub log_level: String,

    /// Seeds an HR manager when the directory has none.
    pub bootstrap_hr_name: Option<String>,
    pub bootstrap_hr_pin: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, which keeps tests away from
    /// process-global environment variables.
    pub fn from_source<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        fn parsed<T: FromStr>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
        where
            T::Err: std::fmt::Display,
        {
            match raw {
                Some(v) => v
                    .trim()
                    .parse()
                    .map_err(|e| anyhow!("{key} is not valid: {e}")),
                None => Ok(default),
            }
        }

        let config = Self {
            server_addr: read("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            database_url: read("DATABASE_URL"),
            jwt_secret: read("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: parsed("ACCESS_TOKEN_TTL", read("ACCESS_TOKEN_TTL"), 900)?, // 15 min
            refresh_token_ttl: parsed("REFRESH_TOKEN_TTL", read("REFRESH_TOKEN_TTL"), 604_800)?, // 7 days

            rate_login_per_min: parsed("RATE_LOGIN_PER_MIN", read("RATE_LOGIN_PER_MIN"), 60)?,
            rate_kiosk_per_min: parsed("RATE_KIOSK_PER_MIN", read("RATE_KIOSK_PER_MIN"), 120)?,
            rate_refresh_per_min: parsed("RATE_REFRESH_PER_MIN", read("RATE_REFRESH_PER_MIN"), 30)?,
            rate_protected_per_min: parsed(
                "RATE_PROTECTED_PER_MIN",
                read("RATE_PROTECTED_PER_MIN"),
                1000,
            )?,

            api_prefix: read("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            pin_max_attempts: parsed("PIN_MAX_ATTEMPTS", read("PIN_MAX_ATTEMPTS"), 5)?,
            pin_lockout_secs: parsed("PIN_LOCKOUT_SECS", read("PIN_LOCKOUT_SECS"), 300)?,
            pin_hash_memory_kib: parsed("PIN_HASH_MEMORY_KIB", read("PIN_HASH_MEMORY_KIB"), 19_456)?,
            pin_hash_iterations: parsed("PIN_HASH_ITERATIONS", read("PIN_HASH_ITERATIONS"), 2)?,

            report_timeout_secs: parsed("REPORT_TIMEOUT_SECS", read("REPORT_TIMEOUT_SECS"), 30)?,
            utc_offset_minutes: parsed("UTC_OFFSET_MINUTES", read("UTC_OFFSET_MINUTES"), 0)?,

            log_dir: read("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: read("LOG_LEVEL").unwrap_or_else(|| "debug".to_string()),

            bootstrap_hr_name: read("BOOTSTRAP_HR_NAME"),
            bootstrap_hr_pin: read("BOOTSTRAP_HR_PIN"),
        };

        if config.utc_offset().is_none() {
            return Err(anyhow!(
                "UTC_OFFSET_MINUTES is out of range: {}",
                config.utc_offset_minutes
            ));
        }

        Ok(config)
    }

    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    /// Config for tests and local runs: in-memory store, cheap PIN hashing.
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".to_string(),
            database_url: None,
            jwt_secret: "test-secret".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 10_000,
            rate_kiosk_per_min: 10_000,
            rate_refresh_per_min: 10_000,
            rate_protected_per_min: 10_000,
            api_prefix: "/api".to_string(),
            pin_max_attempts: 5,
            pin_lockout_secs: 300,
            pin_hash_memory_kib: 64,
            pin_hash_iterations: 1,
            report_timeout_secs: 30,
            utc_offset_minutes: 0,
            log_dir: "logs".to_string(),
            log_level: "debug".to_string(),
            bootstrap_hr_name: None,
            bootstrap_hr_pin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_source(source(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:8080");
        assert_eq!(config.database_url, None);
        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.pin_max_attempts, 5);
        assert_eq!(config.api_prefix, "/api");
    }

    #[test]
    fn secret_is_required() {
        assert!(Config::from_source(source(&[])).is_err());
    }

    #[test]
    fn bad_numbers_are_reported_by_key() {
        let err = Config::from_source(source(&[
            ("JWT_SECRET", "s3cret"),
            ("PIN_MAX_ATTEMPTS", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PIN_MAX_ATTEMPTS"));
    }

    #[test]
    fn offset_is_validated() {
        let config = Config::from_source(source(&[
            ("JWT_SECRET", "s3cret"),
            ("UTC_OFFSET_MINUTES", "120"),
        ]))
        .unwrap();
        assert_eq!(config.utc_offset().map(|o| o.local_minus_utc()), Some(7200));

        assert!(
            Config::from_source(source(&[
                ("JWT_SECRET", "s3cret"),
                ("UTC_OFFSET_MINUTES", "100000"),
            ]))
            .is_err()
        );
    }
}
