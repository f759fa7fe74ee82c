//! crisislink — resilient analysis client and chat core for crisis
//! reporting and verification.

pub mod analysis;
pub mod chat;
pub mod claims;
pub mod error;

pub use analysis::{AnalysisClient, AnalysisError, AnalysisResult, Analyze};
pub use chat::{ChatSession, SendOutcome};
pub use error::ErrorCode;
