use std::env;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Runtime configuration, loaded from the environment. Every variable is
/// optional and falls back to its default.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Enables gRPC reflection and verbose connect/create traces.
    pub local: bool,
    /// Default log filter: one of "debug", "info", "warn", "error".
    pub log_level: String,
    /// TCP listen port; 0 binds an ephemeral port (test use).
    pub port: u16,
    /// Address of the key/value store, with or without a redis:// scheme.
    pub redis_url: String,
    /// Upper bound on the number of messages loaded into a room hub.
    pub max_messages: usize,
    /// Age cutoff for messages loaded into a room hub.
    pub max_retention: Duration,
}

const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variables
    ///
    /// - `LOCAL`: local-development mode (default: "false")
    /// - `LOG_LEVEL`: default log filter (default: "warn")
    /// - `PORT`: TCP listen port, 0 for ephemeral (default: "55555")
    /// - `REDIS_URL`: key/value store address (default: "localhost:6379")
    /// - `MAX_MESSAGES`: snapshot load bound (default: "1000")
    /// - `MAX_RETENTION`: snapshot retention window (default: "7d")
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to a value that does not
    /// parse (e.g. a non-numeric port or an unknown log level).
    pub fn from_env() -> Result<Self> {
        Ok(AppConfig {
            local: Self::parse_bool_env("LOCAL", "false")?,
            log_level: Self::parse_log_level_env("LOG_LEVEL", "warn")?,
            port: Self::parse_u16_env("PORT", "55555")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "localhost:6379".to_string()),
            max_messages: Self::parse_usize_env("MAX_MESSAGES", "1000")?,
            max_retention: Self::parse_duration_env("MAX_RETENTION", "7d")?,
        })
    }

    /// Store address with a scheme, as the redis client expects.
    pub fn redis_connection_url(&self) -> String {
        if self.redis_url.contains("://") {
            self.redis_url.clone()
        } else {
            format!("redis://{}", self.redis_url)
        }
    }

    fn parse_bool_env(var_name: &str, default_value: &str) -> Result<bool> {
        let value = env::var(var_name).unwrap_or_else(|_| default_value.to_string());

        value.parse().map_err(|_| {
            ConfigError::InvalidEnvVar {
                var: var_name.to_string(),
                reason: format!("expected true or false, got '{value}'"),
            }
            .into()
        })
    }

    fn parse_u16_env(var_name: &str, default_value: &str) -> Result<u16> {
        let value = env::var(var_name).unwrap_or_else(|_| default_value.to_string());

        value.parse().map_err(|_| {
            ConfigError::InvalidEnvVar {
                var: var_name.to_string(),
                reason: format!("expected a valid number, got '{value}'"),
            }
            .into()
        })
    }

    fn parse_usize_env(var_name: &str, default_value: &str) -> Result<usize> {
        let value = env::var(var_name).unwrap_or_else(|_| default_value.to_string());

        value.parse().map_err(|_| {
            ConfigError::InvalidEnvVar {
                var: var_name.to_string(),
                reason: format!("expected a valid number, got '{value}'"),
            }
            .into()
        })
    }

    fn parse_log_level_env(var_name: &str, default_value: &str) -> Result<String> {
        let value = env::var(var_name).unwrap_or_else(|_| default_value.to_string());

        if LOG_LEVELS.contains(&value.as_str()) {
            Ok(value)
        } else {
            Err(ConfigError::InvalidEnvVar {
                var: var_name.to_string(),
                reason: format!("expected one of {LOG_LEVELS:?}, got '{value}'"),
            }
            .into())
        }
    }

    fn parse_duration_env(var_name: &str, default_value: &str) -> Result<Duration> {
        let value = env::var(var_name).unwrap_or_else(|_| default_value.to_string());

        parse_duration(&value).ok_or_else(|| {
            ConfigError::InvalidEnvVar {
                var: var_name.to_string(),
                reason: format!("expected a duration like 500ms, 30s, 5m, 12h or 7d, got '{value}'"),
            }
            .into()
        })
    }
}

/// Parses a duration literal: an integer followed by one of `ms`, `s`, `m`,
/// `h` or `d`.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let unit_start = value.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = value.split_at(unit_start);
    let amount: u64 = amount.parse().ok()?;

    match unit {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_secs(amount * 60)),
        "h" => Some(Duration::from_secs(amount * 3600)),
        "d" => Some(Duration::from_secs(amount * 86400)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("12h"), Some(Duration::from_secs(43200)));
        assert_eq!(parse_duration("7d"), Some(Duration::from_secs(604800)));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration("7"), None);
        assert_eq!(parse_duration("d"), None);
        assert_eq!(parse_duration("7w"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn redis_connection_url_gets_a_scheme() {
        let mut cfg = AppConfig {
            local: false,
            log_level: "warn".to_string(),
            port: 0,
            redis_url: "localhost:6379".to_string(),
            max_messages: 1000,
            max_retention: Duration::from_secs(604800),
        };
        assert_eq!(cfg.redis_connection_url(), "redis://localhost:6379");

        cfg.redis_url = "redis://elsewhere:6380".to_string();
        assert_eq!(cfg.redis_connection_url(), "redis://elsewhere:6380");
    }
}
