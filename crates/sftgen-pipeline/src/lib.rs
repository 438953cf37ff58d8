//! sftgen Dataset Pipeline
//!
//! Turns raw documents into instruction-tuning records.
//!
//! # Overview
//!
//! A document is cut into semantically coherent paragraphs by an LLM, each
//! paragraph goes through a three-call annotation chain (analyze, title,
//! format), and the growing result set is checkpointed to a JSON array on
//! disk as it is produced.
//!
//! # Architecture
//!
//! ```text
//! Document → Segmenter → paragraph → Annotator → AnnotationRecord
//!                 ↑                                     ↓
//!                 └──────── next breakpoint ────── checkpoint (every N)
//! ```
//!
//! Segmentation and annotation are interleaved: the segmenter is a
//! forward-only stream and each paragraph is annotated as soon as it appears.
//! All LLM calls share one connection, held by a [`ClientSession`] for the
//! duration of a run.
//!
//! # Degradation
//!
//! No per-paragraph failure aborts a run. A failed or garbled stage turns into
//! a fallback record whose `output` is the paragraph itself, so every
//! paragraph is represented in the dataset in order.
//!
//! # Example Usage
//!
//! ```no_run
//! use sftgen_llm::MockClient;
//! use sftgen_pipeline::{DatasetPipeline, OutputTarget, PipelineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pipeline = DatasetPipeline::new(PipelineConfig::default())?
//!     .with_client(MockClient::default())
//!     .with_output(OutputTarget::File("dataset.json".into()));
//!
//! let report = pipeline.process("First sentence. Second sentence.").await;
//! println!("{}", report.status_message());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod annotator;
pub mod cancel;
pub mod captioner;
pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod segmenter;
pub mod session;
pub mod types;
pub mod writer;

pub use annotator::{Annotation, Annotator, Degradation, Stage};
pub use cancel::CancelHandle;
pub use captioner::ImageCaptioner;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use parser::{extract_json, parse_record};
pub use pipeline::DatasetPipeline;
pub use segmenter::{SegmentLimits, Segmenter};
pub use session::ClientSession;
pub use types::{Caption, CaptionReport, CaptionStatus, ImageInput, ProcessReport, RunStatus};
pub use writer::{timestamped_path, DatasetWriter, OutputTarget};
