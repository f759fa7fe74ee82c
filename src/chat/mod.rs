//! Chat transcript — the caller side of the analysis client.
//!
//! A session owns its messages. Each user turn appends the user's text and
//! then exactly one assistant entry: the backend's reply with its analysis
//! attached, or a fallback message when the request failed.

pub mod report;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::analysis::{AnalysisResult, Analyze};
use crate::error::ErrorCode;

pub const WELCOME_MESSAGE: &str =
    "Welcome to the Crisis Communication System. Ask about any crisis situation, news, or fact.";

pub const FALLBACK_MESSAGE: &str =
    "Error: could not reach the analysis backend. Please make sure it is running and reachable.";

/// Placeholder record attached to entries that have no backend analysis
/// (the user's own message, or a failed turn).
#[must_use]
pub fn placeholder_analysis() -> AnalysisResult {
    AnalysisResult {
        user_input: String::new(),
        bot_response: String::new(),
        is_verified: false,
        verification_confidence: 0.0,
        official_sources_count: 0,
        sources: Vec::new(),
        language: "en".into(),
        language_full: "English".into(),
        urgency: "Low".into(),
        sentiment: "neutral".into(),
        emotion: "neutral".into(),
        emotion_confidence: 0.0,
        extra: serde_json::Map::new(),
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    /// `None` only for the welcome message.
    pub analysis: Option<AnalysisResult>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>, analysis: Option<AnalysisResult>) -> Self {
        Self { id: Uuid::new_v4(), role, content: content.into(), analysis }
    }
}

/// What happened to a submitted turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The backend answered; the reply is the last message.
    Answered,
    /// The request failed; a fallback message was appended. `alert` is the
    /// text to show the user.
    Failed { code: &'static str, alert: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyInput,
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "E_EMPTY_INPUT",
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    #[must_use]
    pub fn new() -> Self {
        Self { messages: vec![ChatMessage::new(Role::Assistant, WELCOME_MESSAGE, None)] }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Start a new chat: drop every entry and restore the welcome message.
    pub fn reset(&mut self) {
        tracing::debug!(discarded = self.messages.len(), "chat session reset");
        *self = Self::new();
    }

    /// Submit one user turn.
    ///
    /// Holding `&mut self` across the call keeps at most one request in
    /// flight per session.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyInput`] if `input` is blank; the transcript
    /// is left unchanged. Backend failures are not errors here: they are
    /// reported as [`SendOutcome::Failed`].
    pub async fn send<A>(&mut self, analyzer: &A, input: &str, cancel: &CancellationToken) -> Result<SendOutcome, ChatError>
    where
        A: Analyze + ?Sized,
    {
        let text = input.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        self.messages
            .push(ChatMessage::new(Role::User, text, Some(placeholder_analysis())));

        match analyzer.analyze(text, cancel).await {
            Ok(analysis) => {
                let reply = analysis.bot_response.clone();
                self.messages
                    .push(ChatMessage::new(Role::Assistant, reply, Some(analysis)));
                Ok(SendOutcome::Answered)
            }
            Err(e) => {
                tracing::warn!(code = e.error_code(), error = %e, "analysis failed, appending fallback reply");
                self.messages
                    .push(ChatMessage::new(Role::Assistant, FALLBACK_MESSAGE, Some(placeholder_analysis())));
                Ok(SendOutcome::Failed { code: e.error_code(), alert: e.to_string() })
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
