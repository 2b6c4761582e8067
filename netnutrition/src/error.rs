//! Error types for the netnutrition crate.
//!
//! Messages are stable strings suitable for logs. Unit oids and session
//! cookies never appear in error text.

/// Errors that can occur while talking to the NetNutrition site.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// An HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response markup did not have the expected structure.
    #[error("parse error: {0}")]
    Parse(String),

    /// The requested dining unit is not listed upstream.
    #[error("unit not found: {0}")]
    UnitNotFound(String),

    /// Invalid source configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SourceError {
    /// Returns `true` for failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Parse(_))
    }
}

/// Convenience type alias for netnutrition results.
pub type Result<T> = std::result::Result<T, SourceError>;
