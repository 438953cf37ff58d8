//! CLI command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// sftgen - Build instruction-tuning datasets from documents and images.
#[derive(Debug, Parser)]
#[command(name = "sftgen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.sftgen/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub endpoint: EndpointArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Endpoint overrides; each falls back to the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct EndpointArgs {
    /// API base URL
    #[arg(long, env = "SFTGEN_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// API key
    #[arg(long, env = "SFTGEN_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Model name
    #[arg(long, env = "SFTGEN_MODEL", global = true)]
    pub model: Option<String>,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Segment and annotate a text document into a dataset
    Text(TextArgs),

    /// Generate captions for images
    Caption(CaptionArgs),

    /// Inspect or initialize the configuration file
    Config(ConfigArgs),
}

/// Arguments for the text command.
#[derive(Debug, Args)]
pub struct TextArgs {
    /// UTF-8 text file to process
    pub file: PathBuf,

    /// Write the dataset to this exact file
    #[arg(short, long, conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory for a timestamped dataset file
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Checkpoint after every N paragraphs
    #[arg(long)]
    pub checkpoint_every: Option<usize>,

    /// Print a preview of every record when done
    #[arg(long)]
    pub preview: bool,
}

/// Arguments for the caption command.
#[derive(Debug, Args)]
pub struct CaptionArgs {
    /// Image URL (`https://...` or `data:image/...;base64,...`); repeatable
    #[arg(short, long = "url", required = true)]
    pub urls: Vec<String>,

    /// System prompt for the captioner
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Write captions as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the config command.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (API key masked)
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}
