//! Transport settings for LLM clients

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout for LLM requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of rate-limit retries
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff (2 seconds)
pub const DEFAULT_RETRY_BASE_DELAY_SECS: u64 = 2;

/// Timeout and retry settings shared by every call a client makes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry ceiling for rate-limit failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for `delay * 2^attempt` backoff, in seconds
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: u64,
}

impl ClientConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff policy derived from this config
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_secs(self.retry_base_delay_secs))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_secs: DEFAULT_RETRY_BASE_DELAY_SECS,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_base_delay_secs() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_SECS
}
