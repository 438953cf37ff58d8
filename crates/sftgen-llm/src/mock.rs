//! Mock LLM client for deterministic testing
//!
//! Replies are scripted per system prompt, which is how the pipeline tells
//! its segment, title and format calls apart.

use crate::{LlmClient, LlmError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// What the mock returns for a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Fixed text
    Text(String),
    /// The user content, unchanged
    Echo,
    /// The first `n` characters of the user content
    Prefix(usize),
    /// An injected failure
    Fail(LlmError),
}

impl From<&str> for MockReply {
    fn from(text: &str) -> Self {
        MockReply::Text(text.to_string())
    }
}

impl From<String> for MockReply {
    fn from(text: String) -> Self {
        MockReply::Text(text)
    }
}

impl From<LlmError> for MockReply {
    fn from(error: LlmError) -> Self {
        MockReply::Fail(error)
    }
}

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// System prompt the call was made with
    pub system_prompt: String,
    /// User content (or image URL)
    pub content: String,
}

#[derive(Debug)]
struct MockState {
    default_reply: MockReply,
    fixed: HashMap<String, MockReply>,
    queued: HashMap<String, VecDeque<MockReply>>,
    calls: Vec<MockCall>,
    open: bool,
    opens: usize,
    closes: usize,
}

/// Mock LLM client for deterministic testing
///
/// Returns pre-configured replies without making any network calls. Clones
/// share state, so a test can keep a handle for inspection after moving the
/// client into a pipeline.
///
/// # Examples
///
/// ```
/// use sftgen_llm::{LlmClient, MockClient, MockReply};
///
/// # async fn example() {
/// let client = MockClient::default();
/// client.add_response("title prompt", "标题");
/// client.queue_response("segment prompt", MockReply::Prefix(5));
///
/// assert_eq!(client.complete("title prompt", "text").await.unwrap(), "标题");
/// assert_eq!(client.complete("segment prompt", "abcdefgh").await.unwrap(), "abcde");
/// assert_eq!(client.call_count(), 2);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockClient {
    model: String,
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    /// Create a mock that returns `reply` for every call
    pub fn new(reply: impl Into<MockReply>) -> Self {
        Self {
            model: "mock-model".to_string(),
            state: Arc::new(Mutex::new(MockState {
                default_reply: reply.into(),
                fixed: HashMap::new(),
                queued: HashMap::new(),
                calls: Vec::new(),
                open: true,
                opens: 0,
                closes: 0,
            })),
        }
    }

    /// Create a mock whose every call fails with `error`
    pub fn failing(error: LlmError) -> Self {
        Self::new(MockReply::Fail(error))
    }

    /// Set the model name reported by this mock
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Always answer calls under `system_prompt` with `reply`
    pub fn add_response(&self, system_prompt: impl Into<String>, reply: impl Into<MockReply>) {
        self.state().fixed.insert(system_prompt.into(), reply.into());
    }

    /// Answer the next call under `system_prompt` with `reply`.
    ///
    /// Queued replies are consumed in order before fixed ones apply.
    pub fn queue_response(&self, system_prompt: impl Into<String>, reply: impl Into<MockReply>) {
        self.state()
            .queued
            .entry(system_prompt.into())
            .or_default()
            .push_back(reply.into());
    }

    /// Make every call under `system_prompt` fail
    pub fn add_error(&self, system_prompt: impl Into<String>, error: LlmError) {
        self.add_response(system_prompt, MockReply::Fail(error));
    }

    /// Get the number of calls made
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Number of calls made under `system_prompt`
    pub fn calls_for(&self, system_prompt: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.system_prompt == system_prompt)
            .count()
    }

    /// All calls made, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Reset the call log
    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }

    /// Times `open` acquired a fresh handle
    pub fn open_count(&self) -> usize {
        self.state().opens
    }

    /// Times `close` released a held handle
    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn respond(&self, system_prompt: &str, content: &str) -> Result<String, LlmError> {
        let mut state = self.state();
        state.calls.push(MockCall {
            system_prompt: system_prompt.to_string(),
            content: content.to_string(),
        });

        if !state.open {
            return Err(LlmError::Closed);
        }

        let queued = state
            .queued
            .get_mut(system_prompt)
            .and_then(|queue| queue.pop_front());
        let reply = match queued {
            Some(reply) => reply,
            None => match state.fixed.get(system_prompt) {
                Some(reply) => reply.clone(),
                None => state.default_reply.clone(),
            },
        };

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Echo => Ok(content.to_string()),
            MockReply::Prefix(n) => Ok(content.chars().take(n).collect()),
            MockReply::Fail(error) => Err(error),
        }
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmClient for MockClient {
    async fn complete(&self, system_prompt: &str, content: &str) -> Result<String, LlmError> {
        self.respond(system_prompt, content)
    }

    async fn describe_image(&self, system_prompt: &str, image_url: &str) -> Result<String, LlmError> {
        self.respond(system_prompt, image_url)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn is_open(&self) -> bool {
        self.state().open
    }

    fn open(&mut self) -> Result<(), LlmError> {
        let mut state = self.state();
        if !state.open {
            state.open = true;
            state.opens += 1;
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state();
        if state.open {
            state.open = false;
            state.closes += 1;
        }
    }
}
