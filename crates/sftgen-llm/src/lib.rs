//! sftgen LLM Call Client Layer
//!
//! One prompt-completion call against a configured model endpoint.
//!
//! # Architecture
//!
//! The [`LlmClient`] trait is the single seam between the dataset pipeline and
//! the network. The segment, title and format "agents" are not separate types:
//! each is just a different system prompt passed to the same
//! [`LlmClient::complete`] over one shared connection handle.
//!
//! # Clients
//!
//! - `OpenAiClient`: OpenAI-compatible `/chat/completions` over `reqwest`
//! - `MockClient`: Scripted, deterministic client for tests
//!
//! # Examples
//!
//! ```
//! use sftgen_llm::{LlmClient, MockClient};
//!
//! # async fn example() {
//! let client = MockClient::new("Hello from LLM!");
//! let result = client.complete("system", "user").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod mock;
pub mod openai;
pub mod retry;

use thiserror::Error;

pub use config::ClientConfig;
pub use mock::{MockCall, MockClient, MockReply};
pub use openai::OpenAiClient;
pub use retry::{retry_on_rate_limit, RetryPolicy};

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Endpoint, key or model is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The endpoint signalled a rate limit (retried internally)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Rate limit persisted past the retry ceiling
    #[error("Rate limit exceeded after {attempts} attempts: {message}")]
    RateLimitExceeded {
        /// Total attempts made, including the first
        attempts: u32,
        /// Last error description from the endpoint
        message: String,
    },

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Network or transport failure
    #[error("Communication error: {0}")]
    Communication(String),

    /// Non-success HTTP status other than 429/404
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Model not available at this endpoint
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The connection handle has been released
    #[error("Connection is closed")]
    Closed,

    /// The client cannot perform this kind of request
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl LlmError {
    /// Only a rate-limit signal is retried; timeouts and everything else are not
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::RateLimited(_))
    }
}

/// A single-call prompt-completion client bound to one model endpoint.
///
/// Implementations own their connection handle. `open`/`close` make the
/// handle's lifetime explicit so callers can scope it to a run and rebind it
/// between runs.
#[allow(async_fn_in_trait)]
pub trait LlmClient {
    /// Send `content` under `system_prompt` and return the model's text
    async fn complete(&self, system_prompt: &str, content: &str) -> Result<String, LlmError>;

    /// Describe an image given as an `https://` or `data:` URL
    async fn describe_image(&self, system_prompt: &str, image_url: &str) -> Result<String, LlmError> {
        let _ = (system_prompt, image_url);
        Err(LlmError::Unsupported("image input".to_string()))
    }

    /// Model identifier this client is bound to
    fn model_name(&self) -> &str;

    /// Whether the connection handle is currently held
    fn is_open(&self) -> bool;

    /// Acquire the connection handle; no-op when already open
    fn open(&mut self) -> Result<(), LlmError>;

    /// Release the connection handle; no-op when already closed
    fn close(&mut self);
}
