//! Error types for the harvester.
//!
//! Per-item failures (`NotFound`, `TransientFetch`, `MalformedInput`) are
//! collected by batch operations; everything else aborts the run.

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Invalid law slug.
    #[error("Invalid law slug: '{0}'. Expected lowercase letters, digits, '_', '-' or '.' (e.g., bgb, aeg_1994)")]
    InvalidSlug(String),

    /// The remote source has no resource at this location.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The network call failed; re-running may succeed.
    #[error("Fetching {url} failed: {message}")]
    TransientFetch { url: String, message: String },

    /// The response body exceeds the configured limit.
    #[error("Response from {url} is too large ({size} bytes, limit {max} bytes)")]
    ResponseTooLarge { url: String, size: u64, max: u64 },

    /// HTTP client setup failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A document could not be parsed.
    #[error("Malformed input in {document}: {message}")]
    MalformedInput { document: String, message: String },

    /// Missing required XML element.
    #[error("Missing required XML element: {element} in {context}")]
    MissingElement { element: String, context: String },

    /// Archive could not be read.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An archive member would be written outside the law directory.
    #[error("Refusing to write archive member outside the law directory: {0}")]
    UnsafePath(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    YamlSerialization(#[from] serde_yaml_ng::Error),

    /// Some items of a batch failed; they have been reported individually.
    #[error("{failed} of {total} items failed")]
    BatchFailed { failed: usize, total: usize },
}

impl HarvesterError {
    /// Whether the error concerns a single item and must not abort a batch.
    #[must_use]
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::InvalidSlug(_)
                | Self::NotFound(_)
                | Self::TransientFetch { .. }
                | Self::ResponseTooLarge { .. }
                | Self::MalformedInput { .. }
                | Self::MissingElement { .. }
                | Self::Archive(_)
                | Self::UnsafePath(_)
        )
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
