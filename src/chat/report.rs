//! Display-ready view of an analysis record.

use crate::analysis::{AnalysisResult, Source, UrgencyLevel};

/// Emotional tone derived from the backend's `sentiment` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

impl Tone {
    #[must_use]
    pub fn from_sentiment(sentiment: &str) -> Self {
        match sentiment.trim().to_ascii_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

/// Confidence grade: above 70% is high, above 40% medium, anything else low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Grade a [0,1] confidence on its unrounded percentage.
    #[must_use]
    pub fn from_confidence(confidence: f64) -> Self {
        let percent = confidence * 100.0;
        if percent > 70.0 {
            Self::High
        } else if percent > 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Verification badge shown under a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Verified { official_sources: u32 },
    Unverified { found: usize },
    NoSources,
}

impl Badge {
    #[must_use]
    pub fn text(self) -> String {
        match self {
            Self::Verified { official_sources: n } => {
                let plural = if n == 1 { "" } else { "s" };
                format!("Verified by {n} official source{plural}")
            }
            Self::Unverified { found } => format!("Found {found} sources (Unverified)"),
            Self::NoSources => "No sources found to verify claim".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub verified: bool,
    pub verdict: &'static str,
    pub confidence_percent: u8,
    pub confidence_tier: ConfidenceTier,
    pub urgency: UrgencyLevel,
    pub tone: Tone,
    pub sentiment_label: String,
    pub emotion_label: String,
    pub language: String,
    pub official_sources_count: u32,
    pub badge: Badge,
}

impl Report {
    /// Badge line, e.g. "Verified by 2 official sources".
    #[must_use]
    pub fn sources_line(&self) -> String {
        self.badge.text()
    }
}

/// At most this many sources are listed under a reply.
pub const MAX_LISTED_SOURCES: usize = 3;

/// The sources worth listing, in backend order.
#[must_use]
pub fn listed_sources(analysis: &AnalysisResult) -> &[Source] {
    &analysis.sources[..analysis.sources.len().min(MAX_LISTED_SOURCES)]
}

impl From<&AnalysisResult> for Report {
    fn from(analysis: &AnalysisResult) -> Self {
        Self {
            verified: analysis.is_verified,
            verdict: if analysis.is_verified { "VERIFIED" } else { "UNVERIFIED" },
            confidence_percent: to_percent(analysis.verification_confidence),
            confidence_tier: ConfidenceTier::from_confidence(analysis.verification_confidence),
            urgency: analysis.urgency_level(),
            tone: Tone::from_sentiment(&analysis.sentiment),
            sentiment_label: analysis.sentiment.to_uppercase(),
            emotion_label: analysis.emotion.to_uppercase(),
            language: analysis.language_full.clone(),
            official_sources_count: analysis.official_sources_count,
            badge: if analysis.is_verified {
                Badge::Verified { official_sources: analysis.official_sources_count }
            } else if analysis.sources.is_empty() {
                Badge::NoSources
            } else {
                Badge::Unverified { found: analysis.sources.len() }
            },
        }
    }
}

/// Scale a [0,1] confidence to a whole percentage, clamping out-of-range
/// and non-finite input.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_percent(confidence: f64) -> u8 {
    if !confidence.is_finite() {
        return 0;
    }
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
