//! Service configuration.
//!
//! Read from environment variables:
//!
//! | Variable | Required | Meaning |
//! |----------|----------|---------|
//! | `STROLL_DB_PATH` | yes | SQLite database holding the `track_location` table |
//! | `STROLL_API_ENDPOINT` | yes | Base URL of the chat provider API |
//! | `STROLL_AUTH_TOKEN` | yes | Chat provider auth token |
//! | `STROLL_IDLE_MINUTES` | no | Idle threshold override (default 30) |
//! | `STROLL_TOP_N` | no | Size of the top ranking (default 10) |

use std::time::Duration;

use crate::{Result, StrollConfig, StrollError};

pub const ENV_DB_PATH: &str = "STROLL_DB_PATH";
pub const ENV_API_ENDPOINT: &str = "STROLL_API_ENDPOINT";
pub const ENV_AUTH_TOKEN: &str = "STROLL_AUTH_TOKEN";
pub const ENV_IDLE_MINUTES: &str = "STROLL_IDLE_MINUTES";
pub const ENV_TOP_N: &str = "STROLL_TOP_N";

/// Settings for running the chat service around the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub database_path: String,
    pub api_endpoint: String,
    pub auth_token: String,
    pub strolls: StrollConfig,
}

impl ServiceConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| StrollError::config(format!("Failed to get configuration with key: {}", key)))
        };

        let mut strolls = StrollConfig::default();
        if let Some(minutes) = parse_optional::<u64>(&lookup, ENV_IDLE_MINUTES)? {
            if minutes == 0 {
                return Err(StrollError::config(format!("{} must be positive", ENV_IDLE_MINUTES)));
            }
            let secs = minutes
                .checked_mul(60)
                .ok_or_else(|| StrollError::config(format!("{} is out of range", ENV_IDLE_MINUTES)))?;
            strolls.idle_threshold = Duration::from_secs(secs);
        }
        if let Some(top_n) = parse_optional::<usize>(&lookup, ENV_TOP_N)? {
            if top_n == 0 {
                return Err(StrollError::config(format!("{} must be positive", ENV_TOP_N)));
            }
            strolls.top_n = top_n;
        }

        Ok(Self {
            database_path: required(ENV_DB_PATH)?,
            api_endpoint: required(ENV_API_ENDPOINT)?,
            auth_token: required(ENV_AUTH_TOKEN)?,
            strolls,
        })
    }
}

fn parse_optional<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| StrollError::config(format!("Invalid {} '{}': {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        (ENV_DB_PATH, "/var/lib/strolls/tracks.db"),
        (ENV_API_ENDPOINT, "https://chatapi.viber.com/pa/"),
        (ENV_AUTH_TOKEN, "secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.database_path, "/var/lib/strolls/tracks.db");
        assert_eq!(config.auth_token, "secret");
        assert_eq!(config.strolls, StrollConfig::default());
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((ENV_IDLE_MINUTES, "45"));
        pairs.push((ENV_TOP_N, " 5 "));

        let config = ServiceConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.strolls.idle_threshold, Duration::from_secs(45 * 60));
        assert_eq!(config.strolls.top_n, 5);
    }

    #[test]
    fn test_missing_required_key() {
        let err = ServiceConfig::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains(ENV_AUTH_TOKEN));

        let mut blank = REQUIRED.to_vec();
        blank[0] = (ENV_DB_PATH, "  ");
        assert!(ServiceConfig::from_lookup(lookup(&blank)).is_err());
    }

    #[test]
    fn test_invalid_numbers() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((ENV_IDLE_MINUTES, "half an hour"));
        let err = ServiceConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, StrollError::Config { .. }));

        let mut pairs = REQUIRED.to_vec();
        pairs.push((ENV_IDLE_MINUTES, "0"));
        assert!(ServiceConfig::from_lookup(lookup(&pairs)).is_err());

        // Parses as u64 but overflows when converted to seconds
        let mut pairs = REQUIRED.to_vec();
        pairs.push((ENV_IDLE_MINUTES, "307445734561825861"));
        let err = ServiceConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, StrollError::Config { .. }));
        assert!(err.to_string().contains(ENV_IDLE_MINUTES));
    }

    #[test]
    fn test_zero_top_n_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((ENV_TOP_N, "0"));
        let err = ServiceConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, StrollError::Config { .. }));
        assert!(err.to_string().contains(ENV_TOP_N));
    }
}
