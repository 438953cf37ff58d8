//! Domain validation errors

use thiserror::Error;

/// Errors raised while validating domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more endpoint fields are blank
    #[error("base URL, API key and model name are all required")]
    MissingField,

    /// Base URL is not an http(s) URL
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// API key is too short to be real
    #[error("invalid API key: must be at least {0} characters")]
    InvalidApiKey(usize),

    /// A prompt was empty after trimming
    #[error("{0} prompt must not be empty")]
    EmptyPrompt(&'static str),
}
