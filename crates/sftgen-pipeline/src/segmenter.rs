//! LLM-driven paragraph segmentation
//!
//! The model is asked, over and over, for the text from the start of the
//! remainder up to a semantic breakpoint near 1000 tokens. The remainder then
//! advances by the length of that chunk. Segmentation ends when the remainder
//! is short, the model returns a degenerate chunk or fails, or the iteration
//! bound is hit; in every case whatever is left becomes the final paragraph.

use crate::config::PipelineConfig;
use sftgen_llm::LlmClient;
use tracing::{debug, warn};

/// Length thresholds and the iteration bound for one segmentation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLimits {
    /// Ask for another breakpoint only while the remainder is longer than this
    pub min_remaining_chars: usize,
    /// Chunks shorter than this are treated as degenerate
    pub min_chunk_chars: usize,
    /// Maximum number of breakpoint calls
    pub max_iterations: usize,
}

impl From<&PipelineConfig> for SegmentLimits {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            min_remaining_chars: config.min_remaining_chars,
            min_chunk_chars: config.min_chunk_chars,
            max_iterations: config.max_segment_iterations,
        }
    }
}

impl Default for SegmentLimits {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// Forward-only paragraph source over one document.
///
/// Paragraphs are produced lazily, one LLM call at a time. Restart by
/// building a new segmenter over the original document.
pub struct Segmenter<'a, C: LlmClient> {
    client: &'a C,
    prompt: &'a str,
    limits: SegmentLimits,
    remaining: String,
    done: bool,
    iterations: usize,
}

impl<'a, C: LlmClient> Segmenter<'a, C> {
    /// Create a segmenter over `document`
    pub fn new(client: &'a C, prompt: &'a str, document: &str, limits: SegmentLimits) -> Self {
        Self {
            client,
            prompt,
            limits,
            remaining: document.trim().to_string(),
            done: false,
            iterations: 0,
        }
    }

    /// Breakpoint calls made so far
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether the final paragraph has been emitted
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Produce the next paragraph, or `None` once the document is consumed
    pub async fn next_paragraph(&mut self) -> Option<String> {
        if self.done {
            return None;
        }

        let remaining_chars = self.remaining.chars().count();
        if remaining_chars > self.limits.min_remaining_chars {
            if self.iterations >= self.limits.max_iterations {
                warn!(
                    "Segmentation hit the {}-iteration bound with {} chars left",
                    self.limits.max_iterations, remaining_chars
                );
            } else {
                self.iterations += 1;
                match self.client.complete(self.prompt, &self.remaining).await {
                    Ok(chunk) if chunk.trim().chars().count() >= self.limits.min_chunk_chars => {
                        // The remainder is trimmed, so padding around the echoed prefix
                        // must not count towards the consumed length
                        let chunk = chunk.trim();
                        let consumed = chunk.chars().count();
                        self.advance(consumed);
                        debug!(
                            "Breakpoint {}: {} chars, {} chars left",
                            self.iterations,
                            consumed,
                            self.remaining.chars().count()
                        );
                        return Some(chunk.to_string());
                    }
                    Ok(chunk) => {
                        debug!(
                            "Degenerate breakpoint ({} chars), keeping remainder as one paragraph",
                            chunk.trim().chars().count()
                        );
                    }
                    Err(e) => {
                        warn!("Breakpoint call failed, keeping remainder as one paragraph: {}", e);
                    }
                }
            }
        }

        self.finish()
    }

    /// Run segmentation to completion
    pub async fn collect_all(mut self) -> Vec<String> {
        let mut paragraphs = Vec::new();
        while let Some(paragraph) = self.next_paragraph().await {
            paragraphs.push(paragraph);
        }
        paragraphs
    }

    fn advance(&mut self, consumed_chars: usize) {
        let split_at = self
            .remaining
            .char_indices()
            .nth(consumed_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.remaining.len());
        self.remaining = self.remaining[split_at..].trim().to_string();
    }

    fn finish(&mut self) -> Option<String> {
        self.done = true;
        let rest = std::mem::take(&mut self.remaining);
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}
