//! Error types for the autocomplete controller.
//!
//! None of these errors ever reach the person typing: suggestion failures
//! are logged and the input keeps working as a plain search box.

/// Errors that can occur while fetching or applying suggestions.
#[derive(Debug, thiserror::Error)]
pub enum AutocompleteError {
    /// Transport failure or non-success HTTP status from the suggestion service.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The suggestion service (or a thumbnail) returned a body we could not decode.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid widget configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A navigation or endpoint URL could not be built.
    #[error("URL error: {0}")]
    Url(String),

    /// I/O error (config file loading).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<url::ParseError> for AutocompleteError {
    fn from(err: url::ParseError) -> Self {
        Self::Url(err.to_string())
    }
}

/// Convenience type alias for autocomplete results.
pub type Result<T> = std::result::Result<T, AutocompleteError>;
