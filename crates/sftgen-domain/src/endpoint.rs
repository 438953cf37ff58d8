//! Model endpoint configuration

use crate::error::DomainError;
use serde::{Deserialize, Serialize};

/// Minimum accepted API key length
pub const MIN_API_KEY_LEN: usize = 8;

/// Connection parameters for an OpenAI-compatible chat endpoint.
///
/// Validated once, then shared read-only by the segment, title and format
/// prompts of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEndpointConfig {
    /// API base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Bearer token
    pub api_key: String,

    /// Model identifier sent with every request
    pub model_name: String,
}

impl ModelEndpointConfig {
    /// Build a config, trimming surrounding whitespace from every field
    pub fn new(
        base_url: impl AsRef<str>,
        api_key: impl AsRef<str>,
        model_name: impl AsRef<str>,
    ) -> Self {
        Self {
            base_url: base_url.as_ref().trim().to_string(),
            api_key: api_key.as_ref().trim().to_string(),
            model_name: model_name.as_ref().trim().to_string(),
        }
    }

    /// Build and validate in one step
    pub fn parse(
        base_url: impl AsRef<str>,
        api_key: impl AsRef<str>,
        model_name: impl AsRef<str>,
    ) -> Result<Self, DomainError> {
        let config = Self::new(base_url, api_key, model_name);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration without touching the network
    pub fn validate(&self) -> Result<(), DomainError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() || self.api_key.trim().is_empty() || self.model_name.trim().is_empty() {
            return Err(DomainError::MissingField);
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(DomainError::InvalidBaseUrl(base_url.to_string()));
        }
        if self.api_key.trim().chars().count() < MIN_API_KEY_LEN {
            return Err(DomainError::InvalidApiKey(MIN_API_KEY_LEN));
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
