//! Normalization of raw backend payloads.
//!
//! The backend is trusted for content but not for types: `is_verified` has
//! been seen as `"true"`/`"false"` strings, `sources` may be missing, and
//! any field may be `null`. Any JSON object is accepted; a body that is not
//! JSON, or not an object, is the only parse failure.

use serde_json::Value;

use super::types::{AnalysisError, AnalysisResult};

/// Parse a success body and normalize it into an [`AnalysisResult`].
///
/// # Errors
///
/// Returns [`AnalysisError::Parse`] if the body is not JSON or not a JSON
/// object.
pub fn parse_analysis(body: &str) -> Result<AnalysisResult, AnalysisError> {
    let raw: Value = serde_json::from_str(body).map_err(|e| AnalysisError::Parse(e.to_string()))?;
    normalize(raw)
}

/// Repair type quirks in a parsed payload, then convert it to the typed record.
///
/// # Errors
///
/// Returns [`AnalysisError::Parse`] if the payload is not an object.
pub fn normalize(mut raw: Value) -> Result<AnalysisResult, AnalysisError> {
    let Some(fields) = raw.as_object_mut() else {
        return Err(AnalysisError::Parse("analysis payload is not a JSON object".into()));
    };

    let verified = match fields.get("is_verified") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(other) => {
            tracing::warn!(value = %other, "is_verified has unsupported type, treating as unverified");
            false
        }
    };
    fields.insert("is_verified".into(), Value::Bool(verified));

    let sources = match fields.remove("sources") {
        Some(Value::Array(items)) => items.into_iter().filter(Value::is_object).collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            tracing::warn!(value = %other, "sources is not an array, ignoring");
            Vec::new()
        }
    };
    fields.insert("sources".into(), Value::Array(sources));

    serde_json::from_value(raw).map_err(|e| AnalysisError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
