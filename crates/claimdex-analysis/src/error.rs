//! Analysis error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Stored source that is neither a valid multi-file JSON bundle nor
    /// plain text. Requires operator attention; batches abort on it.
    #[error("invalid source bundle: {0}")]
    SourceFormat(String),

    /// A `sources` entry tried to write outside the analysis root.
    #[error("path traversal attempt: {0}")]
    PathTraversal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Provider(#[from] claimdex_providers::ProviderError),
}
