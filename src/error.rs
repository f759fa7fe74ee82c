//! Error classification shared by every fallible surface of the crate.

/// Stable machine-readable classification for an error.
///
/// `Display` carries the human-readable text; `error_code` is what callers
/// branch on, and `retryable` says whether resubmitting the same input may
/// succeed.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
