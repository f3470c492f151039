//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const SESSION_DIR: &str = ".atom-connect";
const SESSION_FILE: &str = "session";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Timeouts {
    #[must_use]
    pub fn request(self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Identity server root, without a trailing slash.
    pub base_url: String,
    pub timeouts: Timeouts,
    /// Where the session token is persisted. `None` keeps it in memory only.
    pub session_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Build a config for `base_url` with default timeouts and no persistence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the URL is not http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self { base_url: normalize_base_url(base_url)?, timeouts: Timeouts::default(), session_file: None })
    }

    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `ATOM_BASE_URL` (falls back to `EXPO_PUBLIC_BASE_URL`): default `http://localhost:3000`
    /// - `ATOM_REQUEST_TIMEOUT_SECS`: default 30
    /// - `ATOM_CONNECT_TIMEOUT_SECS`: default 10
    /// - `ATOM_SESSION_FILE`: default `$HOME/.atom-connect/session`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the configured URL is not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = std::env::var("ATOM_BASE_URL")
            .or_else(|_| std::env::var("EXPO_PUBLIC_BASE_URL"))
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let base_url = normalize_base_url(&raw_url)?;

        let timeouts = Timeouts {
            request_secs: env_parse_u64("ATOM_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("ATOM_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        let session_file = std::env::var("ATOM_SESSION_FILE")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| default_session_file(std::env::var("HOME").ok().as_deref()));

        Ok(Self { base_url, timeouts, session_file })
    }

    /// Join an API path onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| ConfigError::InvalidBaseUrl(raw.to_owned()))?;
    if host.is_empty() {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn default_session_file(home: Option<&str>) -> Option<PathBuf> {
    let home = home.filter(|h| !h.trim().is_empty())?;
    Some(PathBuf::from(home).join(SESSION_DIR).join(SESSION_FILE))
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
