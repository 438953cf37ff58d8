//! Error types for the dataset pipeline

use thiserror::Error;

/// Errors that can occur while building a dataset
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Format-stage output is not the expected record shape
    #[error("Invalid record format: {0}")]
    InvalidFormat(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing has been produced yet
    #[error("No data to save")]
    NoData,
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Json(e.to_string())
    }
}

impl From<sftgen_domain::DomainError> for PipelineError {
    fn from(e: sftgen_domain::DomainError) -> Self {
        PipelineError::Config(e.to_string())
    }
}
