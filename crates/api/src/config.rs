//! Process configuration, read from environment variables (optionally seeded
//! from a `.env` file).
//!
//! | variable     | default                                  |
//! |--------------|------------------------------------------|
//! | `APP_ENV`    | `development`                            |
//! | `HOST`       | `0.0.0.0`                                |
//! | `PORT`       | `8000`                                   |
//! | `JSON_LIMIT` | `102400` (bytes)                         |
//! | `LOG_FORMAT` | `pretty` (development), `json` otherwise |

use keystone_observability::LogFormat;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_JSON_LIMIT: usize = 100 * 1024;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Anything other than `production` is treated as development.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Maximum accepted size of a JSON request body.
    pub json_limit_bytes: usize,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            json_limit_bytes: DEFAULT_JSON_LIMIT,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load from the process environment, after applying `.env` if present.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to read .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let environment = lookup("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(defaults.environment);

        let host = lookup("HOST")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(v) => parse_number("PORT", &v)?,
            None => defaults.port,
        };

        let json_limit_bytes = match lookup("JSON_LIMIT") {
            Some(v) => parse_number("JSON_LIMIT", &v)?,
            None => defaults.json_limit_bytes,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(v) => LogFormat::parse(&v).ok_or_else(|| ConfigError::Invalid {
                key: "LOG_FORMAT",
                value: v.clone(),
                reason: "expected json or pretty".to_string(),
            })?,
            None if environment == Environment::Production => LogFormat::Json,
            None => LogFormat::Pretty,
        };

        Ok(Self {
            environment,
            host,
            port,
            json_limit_bytes,
            log_format,
        })
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            log_format: LogFormat::Json,
            ..Self::default()
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_development() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(!config.is_production());
    }

    #[test]
    fn production_switches_log_format() {
        let config = AppConfig::from_lookup(lookup(&[("APP_ENV", "production")])).unwrap();

        assert!(config.is_production());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn unknown_environment_is_development() {
        let config = AppConfig::from_lookup(lookup(&[("APP_ENV", "staging")])).unwrap();
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "5000"),
            ("JSON_LIMIT", "2048"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.json_limit_bytes, 2048);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        let ConfigError::Invalid { key, .. } = err;
        assert_eq!(key, "PORT");

        assert!(AppConfig::from_lookup(lookup(&[("PORT", "70000")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).is_err());
    }
}
