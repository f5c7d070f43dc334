//! Error types for the gazette scrapers.

use gesetze_harvester::HarvesterError;
use thiserror::Error;

/// Main error type for the gazette library.
#[derive(Debug, Error)]
pub enum GazetteError {
    /// Fetching a page failed.
    #[error(transparent)]
    Fetch(#[from] HarvesterError),

    /// A page did not have the expected structure.
    #[error("Malformed input in {document}: {message}")]
    MalformedInput { document: String, message: String },

    /// The site did not hand out a usable session.
    #[error("Session error: {0}")]
    Session(String),

    /// Invalid year range.
    #[error("Invalid year range: {min} > {max}")]
    InvalidYearRange { min: i32, max: i32 },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GazetteError {
    pub(crate) fn malformed(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            document: document.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for gazette operations.
pub type Result<T> = std::result::Result<T, GazetteError>;
