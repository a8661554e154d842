// region:    --- Imports
use crate::auction::rules::AuctionRules;
use chrono::Duration;
use std::collections::HashMap;

// endregion: --- Imports

// region:    --- Config

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env` in development).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub admin_secret: String,
    pub lot_duration_secs: i64,
    pub auto_close_lots: bool,
    pub sse_keepalive_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let admin_secret = get("ADMIN_SECRET")
            .ok_or(ConfigError::Missing("ADMIN_SECRET"))?
            .to_string();

        Ok(Self {
            database_url: get("DATABASE_URL").map(str::to_string),
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 5)?,
            bind_addr: get("BIND_ADDR").unwrap_or("0.0.0.0:3000").to_string(),
            admin_secret,
            lot_duration_secs: parse_or(get("LOT_DURATION_SECS"), "LOT_DURATION_SECS", 60)?,
            auto_close_lots: parse_or(get("AUTO_CLOSE_LOTS"), "AUTO_CLOSE_LOTS", false)?,
            sse_keepalive_secs: parse_or(get("SSE_KEEPALIVE_SECS"), "SSE_KEEPALIVE_SECS", 15)?,
        })
    }

    pub fn auction_rules(&self) -> AuctionRules {
        AuctionRules {
            lot_duration: Duration::seconds(self.lot_duration_secs),
            ..AuctionRules::default()
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<&str>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

// endregion: --- Config

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_vars(vars(&[("ADMIN_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.lot_duration_secs, 60);
        assert!(!config.auto_close_lots);
        assert!(config.database_url.is_none());
        assert_eq!(config.auction_rules().lot_duration, Duration::seconds(60));
    }

    #[test]
    fn missing_admin_secret_is_an_error() {
        let err = Config::from_vars(vars(&[("BIND_ADDR", "127.0.0.1:8080")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ADMIN_SECRET")));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = Config::from_vars(vars(&[
            ("ADMIN_SECRET", "x"),
            ("LOT_DURATION_SECS", "sixty"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "LOT_DURATION_SECS",
                ..
            }
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_vars(vars(&[
            ("ADMIN_SECRET", "x"),
            ("LOT_DURATION_SECS", "90"),
            ("AUTO_CLOSE_LOTS", "true"),
            ("DATABASE_URL", "postgres://localhost/beat"),
        ]))
        .unwrap();
        assert_eq!(config.auction_rules().lot_duration, Duration::seconds(90));
        assert!(config.auto_close_lots);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/beat"));
    }
}
// endregion: --- Tests
