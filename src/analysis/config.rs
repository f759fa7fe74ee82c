//! Analysis client configuration parsed from environment variables.

use std::time::Duration;

use super::retry::{RetryMode, RetryPolicy};
use super::types::AnalysisError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_ANALYZE_PATH: &str = "/analyze-and-respond";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub base_url: String,
    pub path: String,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: u32,
    pub retry_mode: RetryMode,
    pub timeouts: HttpTimeouts,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            path: DEFAULT_ANALYZE_PATH.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retry_mode: RetryMode::Uniform,
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl AnalysisConfig {
    /// Build typed config from environment variables.
    ///
    /// All optional:
    /// - `ANALYSIS_BASE_URL`: default `http://127.0.0.1:8000`
    /// - `ANALYSIS_PATH`: default `/analyze-and-respond`
    /// - `ANALYSIS_MAX_ATTEMPTS`: default 3, must be at least 1
    /// - `ANALYSIS_INITIAL_DELAY_MS`: default 1000
    /// - `ANALYSIS_BACKOFF_MULTIPLIER`: default 2
    /// - `ANALYSIS_RETRY_MODE`: `uniform` (default) or `strict`
    /// - `ANALYSIS_REQUEST_TIMEOUT_SECS`: default 60
    /// - `ANALYSIS_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ConfigParse`] for an unknown retry mode or a
    /// zero attempt count.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let base_url = std::env::var("ANALYSIS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let path = std::env::var("ANALYSIS_PATH").unwrap_or_else(|_| DEFAULT_ANALYZE_PATH.to_string());
        let retry_mode = parse_retry_mode(&std::env::var("ANALYSIS_RETRY_MODE").unwrap_or_else(|_| "uniform".into()))?;

        let max_attempts = env_parse("ANALYSIS_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(AnalysisError::ConfigParse("ANALYSIS_MAX_ATTEMPTS must be at least 1".into()));
        }

        let timeouts = HttpTimeouts {
            request_secs: env_parse("ANALYSIS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("ANALYSIS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            base_url: normalize_base_url(&base_url),
            path: normalize_path(&path),
            max_attempts,
            initial_delay_ms: env_parse("ANALYSIS_INITIAL_DELAY_MS", DEFAULT_INITIAL_DELAY_MS),
            backoff_multiplier: env_parse("ANALYSIS_BACKOFF_MULTIPLIER", DEFAULT_BACKOFF_MULTIPLIER),
            retry_mode,
            timeouts,
        })
    }

    /// Replace the base URL, applying the same trimming as `from_env`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    /// Full endpoint URL for analyze-and-respond.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            self.backoff_multiplier,
            self.retry_mode,
        )
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key).map_or(default, |v| v.trim().parse::<T>().unwrap_or(default))
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{trimmed}") }
}

fn parse_retry_mode(raw: &str) -> Result<RetryMode, AnalysisError> {
    match raw.trim() {
        "uniform" => Ok(RetryMode::Uniform),
        "strict" => Ok(RetryMode::Strict),
        other => Err(AnalysisError::ConfigParse(format!(
            "unsupported retry mode '{other}' (expected 'uniform' or 'strict')"
        ))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
