//! Error types for Lectern.

use thiserror::Error;

/// Library-level error type for Lectern operations.
#[derive(Error, Debug)]
pub enum LecternError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model answered, but nothing in the answer parsed as structured data.
    #[error("Failed to parse model response: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Model API error: {0}")]
    Model(String),

    #[error("Model call timed out after {0} seconds")]
    Timeout(u64),

    #[error("Speech synthesis failed: {0}")]
    Speech(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl LecternError {
    /// True when the failure came from a third-party service rather than from us.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            LecternError::Parse(_)
                | LecternError::Model(_)
                | LecternError::Timeout(_)
                | LecternError::Speech(_)
                | LecternError::Search(_)
        )
    }
}

/// Result type alias for Lectern operations.
pub type Result<T> = std::result::Result<T, LecternError>;
