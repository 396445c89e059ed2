//! Scanner error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Provider(#[from] claimdex_providers::ProviderError),

    #[error(transparent)]
    Analysis(#[from] claimdex_analysis::AnalysisError),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
