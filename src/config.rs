//! Client configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local development.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::storage::SecureStorage;

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// How the request pipeline obtains the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProviderKind {
    /// Latest published snapshot, never waits
    Cached,
    /// One blocking store read per request
    Blocking,
}

impl FromStr for TokenProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cached" => Ok(Self::Cached),
            "blocking" => Ok(Self::Blocking),
            other => Err(ConfigError::Invalid("KHIGH_TOKEN_PROVIDER", other.to_string())),
        }
    }
}

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backend base URL
    pub api_url: String,
    /// Where credentials, cached users and logs live
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
    pub token_provider: TokenProviderKind,
    /// Age after which a cached user row is refetched
    pub user_stale_after: chrono::Duration,
    /// Mirror logs to the console in release builds too
    pub log_console: bool,
}

impl Default for AppConfig {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: SecureStorage::default_location(),
            http_timeout: Duration::from_secs(30),
            token_provider: TokenProviderKind::Cached,
            user_stale_after: chrono::Duration::hours(1),
            log_console: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("KHIGH_API_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        reqwest::Url::parse(&api_url)
            .map_err(|e| ConfigError::Invalid("KHIGH_API_URL", e.to_string()))?;

        let data_dir = lookup("KHIGH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(SecureStorage::default_location);

        let timeout_secs: u64 = parse_or("KHIGH_HTTP_TIMEOUT_SECS", &lookup, 30)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "KHIGH_HTTP_TIMEOUT_SECS",
                "must be greater than zero".to_string(),
            ));
        }

        let token_provider = match lookup("KHIGH_TOKEN_PROVIDER") {
            Some(v) => v.parse()?,
            None => TokenProviderKind::Cached,
        };

        let stale_secs: i64 = parse_or("KHIGH_USER_STALE_SECS", &lookup, 3600)?;
        let user_stale_after = (stale_secs >= 0)
            .then(|| chrono::Duration::try_seconds(stale_secs))
            .flatten()
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "KHIGH_USER_STALE_SECS",
                    format!("{} is not a usable number of seconds", stale_secs),
                )
            })?;
        let log_console: bool = parse_or("KHIGH_LOG_CONSOLE", &lookup, false)?;

        Ok(Self {
            api_url,
            data_dir,
            http_timeout: Duration::from_secs(timeout_secs),
            token_provider,
            user_stale_after,
            log_console,
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(key, e.to_string())),
        None => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.token_provider, TokenProviderKind::Cached);
        assert!(!config.log_console);
        assert_eq!(config.user_stale_after, chrono::Duration::hours(1));
        assert_eq!(
            load(&[("KHIGH_USER_STALE_SECS", "0")]).unwrap().user_stale_after,
            chrono::Duration::zero()
        );
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("KHIGH_API_URL", "https://api.khigh.test/v1/"),
            ("KHIGH_DATA_DIR", "/tmp/khigh"),
            ("KHIGH_HTTP_TIMEOUT_SECS", "5"),
            ("KHIGH_TOKEN_PROVIDER", "Blocking"),
            ("KHIGH_USER_STALE_SECS", "60"),
            ("KHIGH_LOG_CONSOLE", "true"),
        ])
        .unwrap();

        assert_eq!(config.api_url, "https://api.khigh.test/v1");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/khigh"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.token_provider, TokenProviderKind::Blocking);
        assert_eq!(config.user_stale_after, chrono::Duration::seconds(60));
        assert!(config.log_console);
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/khigh/logs"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("KHIGH_HTTP_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Invalid("KHIGH_HTTP_TIMEOUT_SECS", _))
        ));
        assert!(matches!(
            load(&[("KHIGH_TOKEN_PROVIDER", "sometimes")]),
            Err(ConfigError::Invalid("KHIGH_TOKEN_PROVIDER", _))
        ));
        assert!(matches!(
            load(&[("KHIGH_API_URL", "not a url")]),
            Err(ConfigError::Invalid("KHIGH_API_URL", _))
        ));
        assert!(matches!(
            load(&[("KHIGH_USER_STALE_SECS", "-1")]),
            Err(ConfigError::Invalid("KHIGH_USER_STALE_SECS", _))
        ));
        let huge = i64::MAX.to_string();
        assert!(matches!(
            load(&[("KHIGH_USER_STALE_SECS", huge.as_str())]),
            Err(ConfigError::Invalid("KHIGH_USER_STALE_SECS", _))
        ));
        assert!(matches!(
            load(&[("KHIGH_USER_STALE_SECS", "soon")]),
            Err(ConfigError::Invalid("KHIGH_USER_STALE_SECS", _))
        ));
    }
}
