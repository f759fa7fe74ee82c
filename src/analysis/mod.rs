//! Analysis — resilient client for the analyze-and-respond backend.
//!
//! DESIGN
//! ======
//! `AnalysisClient` composes three pieces: an [`AnalysisTransport`] that
//! performs one POST, [`transport::interpret`] which classifies the
//! exchange and normalizes a success body, and a [`RetryPolicy`] that
//! drives attempts with exponential backoff. The client keeps no state
//! between calls.

pub mod config;
pub mod normalize;
pub mod retry;
pub mod transport;
pub mod types;

use tokio_util::sync::CancellationToken;

use config::AnalysisConfig;
pub use retry::{RetryMode, RetryPolicy};
pub use transport::{AnalysisTransport, HttpTransport, TransportResponse};
pub use types::{AnalysisError, AnalysisRequest, AnalysisResult, Source, UrgencyLevel};

// =============================================================================
// ANALYZE TRAIT
// =============================================================================

/// Anything that can turn user text into an analysis record. Enables
/// mocking the client in callers' tests.
#[async_trait::async_trait]
pub trait Analyze: Send + Sync {
    /// Analyze `user_input`, giving up early if `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalysisError`] once the request is exhausted, rejected,
    /// or cancelled.
    async fn analyze(&self, user_input: &str, cancel: &CancellationToken) -> Result<AnalysisResult, AnalysisError>;
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct AnalysisClient<T = HttpTransport> {
    transport: T,
    policy: RetryPolicy,
}

impl AnalysisClient<HttpTransport> {
    /// Build a client from environment variables (see [`AnalysisConfig::from_env`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the HTTP client fails.
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_config(&AnalysisConfig::from_env()?)
    }

    /// Build a client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let transport = HttpTransport::from_config(config)?;
        tracing::debug!(endpoint = transport.endpoint(), max_attempts = config.max_attempts, "analysis client ready");
        Ok(Self::with_transport(transport, config.retry_policy()))
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }
}

impl<T: AnalysisTransport> AnalysisClient<T> {
    pub fn with_transport(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Analyze `user_input` with the configured retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Exhausted`] when every attempt fails, or the
    /// rejecting [`AnalysisError::Server`] error in strict mode.
    pub async fn send(&self, user_input: &str) -> Result<AnalysisResult, AnalysisError> {
        self.send_with_cancel(user_input, &CancellationToken::new()).await
    }

    /// Like [`AnalysisClient::send`], but stops at the next suspension point
    /// once `cancel` fires.
    ///
    /// # Errors
    ///
    /// As [`AnalysisClient::send`], plus [`AnalysisError::Cancelled`].
    pub async fn send_with_cancel(
        &self,
        user_input: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        let request = AnalysisRequest::new(user_input);
        self.policy
            .run(cancel, |attempt| self.attempt(&request, attempt))
            .await
    }

    async fn attempt(&self, request: &AnalysisRequest, attempt: u32) -> Result<AnalysisResult, AnalysisError> {
        tracing::debug!(attempt = attempt + 1, "sending analysis request");
        let response = self.transport.post_json(request).await?;
        transport::interpret(&response)
    }
}

#[async_trait::async_trait]
impl<T: AnalysisTransport> Analyze for AnalysisClient<T> {
    async fn analyze(&self, user_input: &str, cancel: &CancellationToken) -> Result<AnalysisResult, AnalysisError> {
        self.send_with_cancel(user_input, cancel).await
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
