//! Bounded retry with exponential backoff.
//!
//! DESIGN
//! ======
//! Attempts run strictly one after another. After failed attempt `i` the
//! loop sleeps `initial_delay * multiplier^i` (no jitter) unless that was
//! the last attempt, in which case the failure is wrapped in
//! [`AnalysisError::Exhausted`]. The in-flight attempt and the backoff sleep
//! both race a [`CancellationToken`].

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::types::AnalysisError;

/// Which failures are worth another attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryMode {
    /// Retry every transport, server, and parse failure alike.
    #[default]
    Uniform,
    /// Fail fast on client errors (4xx other than 408 and 429).
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    multiplier: u32,
    mode: RetryMode,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), 2, RetryMode::Uniform)
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration, multiplier: u32, mode: RetryMode) -> Self {
        Self { max_attempts: max_attempts.max(1), initial_delay, multiplier, mode }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn mode(&self) -> RetryMode {
        self.mode
    }

    /// Delay to wait after failed attempt `attempt` (zero-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.initial_delay.saturating_mul(factor)
    }

    /// Whether `err` may be retried under this policy.
    #[must_use]
    pub fn should_retry(&self, err: &AnalysisError) -> bool {
        match err {
            AnalysisError::Transport(_) | AnalysisError::Parse(_) => true,
            AnalysisError::Server { status, .. } => match self.mode {
                RetryMode::Uniform => true,
                RetryMode::Strict => !is_client_error(*status) || matches!(status, 408 | 429),
            },
            AnalysisError::Exhausted { .. }
            | AnalysisError::Cancelled
            | AnalysisError::ConfigParse(_)
            | AnalysisError::HttpClientBuild(_) => false,
        }
    }

    /// Run `operation` until it succeeds, hits a non-retryable failure,
    /// runs out of attempts, or `cancel` fires.
    ///
    /// `operation` receives the zero-based attempt index.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::Exhausted`] when the final attempt fails.
    /// - [`AnalysisError::Cancelled`] when `cancel` fires first.
    /// - The attempt's own error when the policy refuses to retry it.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T, AnalysisError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AnalysisError>>,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AnalysisError::Cancelled),
                outcome = operation(attempt) => outcome,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(attempts = attempt + 1, "analysis request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !self.should_retry(&err) {
                tracing::warn!(attempt = attempt + 1, error = %err, "analysis request rejected, not retrying");
                return Err(err);
            }

            if attempt + 1 >= self.max_attempts {
                tracing::error!(attempts = self.max_attempts, error = %err, "analysis retries exhausted");
                return Err(AnalysisError::Exhausted { attempts: self.max_attempts, last: Box::new(err) });
            }

            let delay = self.delay_after(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max = self.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "analysis attempt failed, backing off"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AnalysisError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

fn is_client_error(status: u16) -> bool {
    (400..500).contains(&status)
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
