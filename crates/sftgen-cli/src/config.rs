//! Configuration management for the CLI.

use crate::cli::EndpointArgs;
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use sftgen_domain::{prompts::DEFAULT_CAPTION_PROMPT, ModelEndpointConfig, PromptSet};
use sftgen_llm::ClientConfig;
use sftgen_pipeline::PipelineConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration, stored as TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Model endpoint
    #[serde(default)]
    pub endpoint: EndpointSettings,

    /// Text pipeline prompts
    #[serde(default)]
    pub prompts: PromptSet,

    /// Image captioning
    #[serde(default)]
    pub caption: CaptionSettings,

    /// Segmentation and checkpoint tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Timeout and retry settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Where datasets go when no output is given
    #[serde(default)]
    pub output: OutputSettings,
}

/// Endpoint values from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointSettings {
    /// API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

/// Captioner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSettings {
    /// System prompt sent with every image
    #[serde(default = "default_caption_prompt")]
    pub prompt: String,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory for timestamped dataset files
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".sftgen").join("config.toml"))
    }

    /// Load configuration from `path`, or defaults when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check the tuning sections
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate().map_err(CliError::Config)?;
        self.client.validate().map_err(CliError::Config)?;
        Ok(())
    }

    /// Merge command-line overrides over the file's endpoint values.
    ///
    /// The result is not validated here; binding the client does that.
    pub fn resolve_endpoint(&self, overrides: &EndpointArgs) -> Result<ModelEndpointConfig> {
        let pick = |cli: &Option<String>, file: &Option<String>, name: &str| {
            cli.clone()
                .or_else(|| file.clone())
                .ok_or_else(|| CliError::Config(format!("{} is not set (flag, env or config file)", name)))
        };

        let base_url = pick(&overrides.base_url, &self.endpoint.base_url, "base_url")?;
        let api_key = pick(&overrides.api_key, &self.endpoint.api_key, "api_key")?;
        let model = pick(&overrides.model, &self.endpoint.model_name, "model_name")?;
        Ok(ModelEndpointConfig::new(base_url, api_key, model))
    }

    /// A copy safe to print: the API key is reduced to its last four chars.
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        if let Some(key) = copy.endpoint.api_key.as_mut() {
            *key = mask_key(key);
        }
        copy
    }
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            prompt: default_caption_prompt(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

fn default_caption_prompt() -> String {
    DEFAULT_CAPTION_PROMPT.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("text_dataset")
}
