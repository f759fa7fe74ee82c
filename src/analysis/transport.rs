//! HTTP transport for the analyze-and-respond endpoint.
//!
//! One call is one POST. Interpreting the status and body lives in
//! [`interpret`] so it can be tested without a socket.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::config::{AnalysisConfig, HttpTimeouts};
use super::normalize::parse_analysis;
use super::types::{AnalysisError, AnalysisRequest, AnalysisResult};

const UNKNOWN_ERROR_DETAIL: &str = "Unknown error";

/// Raw outcome of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Issues a single analysis POST. Enables scripted transports in tests.
#[async_trait::async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// Send `request` once.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Transport`] when the exchange does not
    /// complete. A completed exchange with any status is `Ok`.
    async fn post_json(&self, request: &AnalysisRequest) -> Result<TransportResponse, AnalysisError>;
}

// =============================================================================
// REQWEST TRANSPORT
// =============================================================================

pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Build a transport posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::HttpClientBuild`] if the reqwest client fails
    /// to build.
    pub fn new(endpoint: String, timeouts: HttpTimeouts) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| AnalysisError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, endpoint })
    }

    /// # Errors
    ///
    /// See [`HttpTransport::new`].
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Self::new(config.endpoint(), config.timeouts)
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl AnalysisTransport for HttpTransport {
    async fn post_json(&self, request: &AnalysisRequest) -> Result<TransportResponse, AnalysisError> {
        // `.json()` sets `Content-Type: application/json`.
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(summarize(&e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(summarize(&e)))?;
        Ok(TransportResponse { status, body })
    }
}

fn summarize(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "could not connect to the analysis backend".to_string()
    } else {
        err.to_string()
    }
}

// =============================================================================
// INTERPRETATION
// =============================================================================

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

/// Turn a completed exchange into a normalized result or a classified error.
///
/// # Errors
///
/// - [`AnalysisError::Server`] for any non-2xx status.
/// - [`AnalysisError::Parse`] for a 2xx body that is not an analysis record.
pub fn interpret(response: &TransportResponse) -> Result<AnalysisResult, AnalysisError> {
    if (200..300).contains(&response.status) {
        return parse_analysis(&response.body);
    }
    Err(AnalysisError::Server { status: response.status, detail: error_detail(&response.body) })
}

/// Extract a human-readable `detail` from an error body, tolerating absent
/// or malformed JSON.
fn error_detail(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return UNKNOWN_ERROR_DETAIL.to_string();
    };
    match parsed.detail {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Null | Value::String(_)) | None => UNKNOWN_ERROR_DETAIL.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
