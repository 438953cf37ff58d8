//! Configuration for the dataset pipeline

use serde::{Deserialize, Serialize};

/// Tuning knobs for segmentation, checkpointing and previews.
///
/// All lengths are measured in characters (Unicode scalar values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Keep asking the model for breakpoints while the remainder is longer than this
    #[serde(default = "default_min_remaining_chars")]
    pub min_remaining_chars: usize,

    /// A breakpoint shorter than this ends segmentation
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// Upper bound on breakpoint calls for one document
    #[serde(default = "default_max_segment_iterations")]
    pub max_segment_iterations: usize,

    /// Persist the result set after every N paragraphs
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,

    /// Characters of each output shown in previews and debug logs
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl PipelineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_remaining_chars == 0 {
            return Err("min_remaining_chars must be greater than 0".to_string());
        }
        if self.min_chunk_chars == 0 {
            return Err("min_chunk_chars must be greater than 0".to_string());
        }
        if self.min_chunk_chars > self.min_remaining_chars {
            return Err("min_chunk_chars cannot exceed min_remaining_chars".to_string());
        }
        if self.max_segment_iterations == 0 {
            return Err("max_segment_iterations must be greater than 0".to_string());
        }
        if self.checkpoint_every == 0 {
            return Err("checkpoint_every must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_remaining_chars: default_min_remaining_chars(),
            min_chunk_chars: default_min_chunk_chars(),
            max_segment_iterations: default_max_segment_iterations(),
            checkpoint_every: default_checkpoint_every(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_min_remaining_chars() -> usize {
    100
}

fn default_min_chunk_chars() -> usize {
    50
}

fn default_max_segment_iterations() -> usize {
    1000
}

fn default_checkpoint_every() -> usize {
    3
}

fn default_preview_chars() -> usize {
    100
}
