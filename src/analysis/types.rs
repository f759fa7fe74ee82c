//! Analysis types — request/response records and errors.
//!
//! `AnalysisResult` is the typed shape of the backend's analysis record
//! after normalization. Unknown backend fields are kept in `extra` so the
//! record round-trips without loss.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by analysis client operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The HTTP call did not complete (DNS, refused connection, timeout).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("API returned status {status}: {detail}")]
    Server { status: u16, detail: String },

    /// A success response body was not a usable analysis record.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// Every attempt failed. Display text is stable; the last attempt's
    /// failure is available through `source()`.
    #[error("failed to connect to the analysis backend after multiple retries")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<AnalysisError>,
    },

    /// The caller cancelled the request.
    #[error("analysis request cancelled")]
    Cancelled,

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for AnalysisError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E_TRANSPORT",
            Self::Server { .. } => "E_SERVER",
            Self::Parse(_) => "E_PARSE",
            Self::Exhausted { .. } => "E_EXHAUSTED",
            Self::Cancelled => "E_CANCELLED",
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Whether the user may usefully resubmit. Retries inside the client are
    /// governed by [`super::retry::RetryPolicy`], not by this flag.
    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Server { .. } | Self::Parse(_) | Self::Exhausted { .. })
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// Body of a single analyze-and-respond call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    pub user_input: String,
}

impl AnalysisRequest {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self { user_input: user_input.into() }
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// One supporting source cited by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient")]
    pub snippet: String,
}

/// Normalized analysis record returned by the backend.
///
/// Every modelled field tolerates `null`, absence, and a mistyped value by
/// taking its default, so a 2xx object body always decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "lenient")]
    pub user_input: String,
    #[serde(default, deserialize_with = "lenient")]
    pub bot_response: String,
    #[serde(default, deserialize_with = "lenient")]
    pub is_verified: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub verification_confidence: f64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub official_sources_count: u32,
    /// Relevance order from the backend.
    #[serde(default, deserialize_with = "lenient")]
    pub sources: Vec<Source>,
    #[serde(default, deserialize_with = "lenient")]
    pub language: String,
    #[serde(default, deserialize_with = "lenient")]
    pub language_full: String,
    #[serde(default, deserialize_with = "lenient")]
    pub urgency: String,
    #[serde(default, deserialize_with = "lenient")]
    pub sentiment: String,
    #[serde(default, deserialize_with = "lenient")]
    pub emotion: String,
    #[serde(default, deserialize_with = "lenient")]
    pub emotion_confidence: f64,
    /// Backend fields this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    /// Parse `urgency` into a level. Unrecognized values map to `Unknown`.
    #[must_use]
    pub fn urgency_level(&self) -> UrgencyLevel {
        UrgencyLevel::parse(&self.urgency)
    }
}

/// Urgency as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyLevel {
    High,
    Medium,
    Low,
    Unknown,
}

impl UrgencyLevel {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "High" => Self::High,
            "Medium" => Self::Medium,
            "Low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

// =============================================================================
// LENIENT DECODING
// =============================================================================

/// Decode a field, taking its default for `null` or a value of the wrong type.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    if raw.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "analysis field has unexpected type, using default");
        T::default()
    }))
}

/// Decode a count that may arrive as `2` or `2.0`. Fractional, negative and
/// non-numeric values read as zero.
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    match raw.as_f64().and_then(whole_u32) {
        Some(count) => Ok(count),
        None => {
            if !raw.is_null() {
                tracing::warn!(value = %raw, "official_sources_count is not a whole number, using 0");
            }
            Ok(0)
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_u32(value: f64) -> Option<u32> {
    let in_range = value.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&value);
    if in_range && value.fract() == 0.0 { Some(value as u32) } else { None }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
