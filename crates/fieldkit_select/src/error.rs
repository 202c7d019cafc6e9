//! Error types for fieldkit_select

use fieldkit_core::ReactiveError;
use thiserror::Error;

/// Errors that can occur while building or configuring a select field
///
/// All of these are fatal: a field is never handed out half-initialized.
#[derive(Error, Debug)]
pub enum FieldError {
    /// The configuration is inconsistent
    #[error("invalid select configuration: {0}")]
    Config(String),

    /// Settings text could not be parsed
    #[error("failed to parse select settings: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The internal reactive graph rejected a cell
    #[error("reactive graph error: {0}")]
    Reactive(#[from] ReactiveError),
}

/// Result type for fieldkit_select operations
pub type Result<T> = std::result::Result<T, FieldError>;

/// A failed search, as reported by a search provider
///
/// Search failures are recoverable: the field keeps its previous options and
/// clears its "querying" flag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The provider reported a failure
    #[error("search failed: {0}")]
    Failed(String),

    /// The responder was dropped without being resolved
    #[error("search responder dropped without a result")]
    Abandoned,
}

impl SearchError {
    pub fn failed(message: impl Into<String>) -> Self {
        SearchError::Failed(message.into())
    }
}
