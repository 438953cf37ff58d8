//! sftgen Domain Layer
//!
//! Value types shared by every other crate in the workspace. Nothing in here
//! talks to the network or the file system.
//!
//! ## Key Concepts
//!
//! - **AnnotationRecord**: one `{instruction, input, output}` training example
//! - **ResultSet**: the ordered, append-only list of records for one document
//! - **ModelEndpointConfig**: base URL, API key and model name for the LLM
//! - **PromptSet**: the segment/title/format system prompts that turn one
//!   model binding into three logical agents

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod endpoint;
pub mod error;
pub mod prompts;
pub mod record;

// Re-exports for convenience
pub use endpoint::ModelEndpointConfig;
pub use error::DomainError;
pub use prompts::PromptSet;
pub use record::{AnnotationRecord, ResultSet, PLACEHOLDER_INSTRUCTION};
