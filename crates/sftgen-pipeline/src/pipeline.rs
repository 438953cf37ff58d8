//! Pipeline orchestrator: segment → annotate → checkpoint

use crate::annotator::Annotator;
use crate::cancel::CancelHandle;
use crate::captioner::ImageCaptioner;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::segmenter::{SegmentLimits, Segmenter};
use crate::session::ClientSession;
use crate::types::{CaptionReport, CaptionStatus, ImageInput, ProcessReport, RunStatus};
use crate::writer::{DatasetWriter, OutputTarget};
use sftgen_domain::{AnnotationRecord, ModelEndpointConfig, PromptSet, ResultSet};
use sftgen_llm::{ClientConfig, LlmClient, OpenAiClient};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Drives documents through segmentation and annotation and persists the
/// growing result set.
///
/// The pipeline owns at most one client. Its connection is held only while a
/// run is in progress and is closed before a replacement client is bound.
pub struct DatasetPipeline<C: LlmClient> {
    client: Option<C>,
    prompts: PromptSet,
    config: PipelineConfig,
    client_config: ClientConfig,
    output: OutputTarget,
    writer: DatasetWriter,
    cancel: CancelHandle,
    last_records: ResultSet,
}

impl<C: LlmClient> DatasetPipeline<C> {
    /// Create an unconfigured pipeline
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;
        Ok(Self {
            client: None,
            prompts: PromptSet::default(),
            config,
            client_config: ClientConfig::default(),
            output: OutputTarget::default(),
            writer: DatasetWriter::new(),
            cancel: CancelHandle::new(),
            last_records: Vec::new(),
        })
    }

    /// Bind a client at construction time
    pub fn with_client(mut self, client: C) -> Self {
        self.rebind(client);
        self
    }

    /// Set where checkpoints are written
    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }

    /// Set timeout/retry settings used by [`DatasetPipeline::configure`]
    pub fn with_client_config(mut self, client_config: ClientConfig) -> Self {
        self.client_config = client_config;
        self
    }

    /// Replace the bound client, closing the previous connection first
    pub fn rebind(&mut self, client: C) {
        if let Some(mut previous) = self.client.take() {
            previous.close();
            info!("Closed previous connection for model {}", previous.model_name());
        }
        info!("Bound client for model {}", client.model_name());
        self.client = Some(client);
    }

    /// Drop the bound client after closing its connection
    pub fn disconnect(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.close();
        }
    }

    /// Whether a client is bound
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// The bound client, if any
    pub fn client(&self) -> Option<&C> {
        self.client.as_ref()
    }

    /// Swap the three prompts; the connection is untouched
    pub fn set_prompts(
        &mut self,
        segment_prompt: &str,
        title_prompt: &str,
        format_prompt: &str,
    ) -> Result<(), PipelineError> {
        self.prompts = PromptSet::new(segment_prompt, title_prompt, format_prompt)?;
        info!("Prompts updated");
        Ok(())
    }

    /// Current prompts
    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Set where checkpoints are written
    pub fn set_output(&mut self, output: OutputTarget) {
        self.output = output;
    }

    /// Handle that stops the current run after its in-flight call
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Records produced by the most recent run
    pub fn records(&self) -> &[AnnotationRecord] {
        &self.last_records
    }

    /// Build a dataset from one document.
    ///
    /// Paragraphs stream from the segmenter straight into the annotator. The
    /// full result set is written every `checkpoint_every` paragraphs and once
    /// more at the end (also after cancellation). Empty input and documents
    /// that yield zero paragraphs produce no file.
    pub async fn process(&mut self, document: &str) -> ProcessReport {
        let run_id = Uuid::now_v7();
        let span = info_span!("run", %run_id);
        let report = self.process_inner(document).instrument(span).await;
        self.cancel.reset();
        if !report.records.is_empty() {
            self.last_records = report.records.clone();
        }
        report
    }

    async fn process_inner(&mut self, document: &str) -> ProcessReport {
        let Self {
            client,
            prompts,
            config,
            output,
            writer,
            cancel,
            ..
        } = self;

        let Some(client) = client.as_mut() else {
            error!("Processing requested before the API was configured");
            return ProcessReport::empty(RunStatus::NotConfigured);
        };

        if document.is_empty() {
            return ProcessReport::empty(RunStatus::NoInput);
        }

        info!("Starting document run, {} chars", document.chars().count());

        let session = match ClientSession::acquire(client) {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to open connection: {}", e);
                return ProcessReport::empty(RunStatus::ConnectionFailed(e.to_string()));
            }
        };

        let output_path = output.resolve();
        let mut segmenter = Segmenter::new(&*session, &prompts.segment, document, SegmentLimits::from(&*config));
        let annotator = Annotator::new(&*session, prompts).with_preview_chars(config.preview_chars);

        let mut records = ResultSet::new();
        let mut checkpoints_written = 0;
        let mut checkpoint_failures = 0;
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(paragraph) = segmenter.next_paragraph().await else {
                break;
            };
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let index = records.len() + 1;
            info!("Annotating paragraph {} ({} chars)", index, paragraph.chars().count());
            let annotation = annotator.annotate_detailed(&paragraph).await;
            if let Some(degradation) = &annotation.degradation {
                warn!("Paragraph {} degraded: {}", index, degradation);
            }
            records.push(annotation.record);

            if records.len() % config.checkpoint_every == 0 {
                checkpoint(writer, &records, &output_path, &mut checkpoints_written, &mut checkpoint_failures);
            }
        }

        if cancelled {
            info!("Cancellation requested, stopping after {} paragraphs", records.len());
        }

        if records.is_empty() {
            let status = if cancelled {
                RunStatus::Cancelled { annotated: 0, processed: 0 }
            } else {
                RunStatus::NoValidSegments
            };
            return ProcessReport::empty(status);
        }

        checkpoint(writer, &records, &output_path, &mut checkpoints_written, &mut checkpoint_failures);

        let total = records.len();
        let annotated = records.iter().filter(|r| !r.is_placeholder()).count();
        let status = if cancelled {
            RunStatus::Cancelled { annotated, processed: total }
        } else if annotated == total {
            RunStatus::Complete { total }
        } else {
            RunStatus::Partial { annotated, total }
        };
        info!("{}", status);

        ProcessReport {
            records,
            status,
            output_path: Some(output_path),
            checkpoints_written,
            checkpoint_failures,
        }
    }

    /// Write the most recent run's records to `path`
    pub fn save_dataset(&self, path: &Path) -> Result<PathBuf, PipelineError> {
        if self.last_records.is_empty() {
            return Err(PipelineError::NoData);
        }
        self.writer.write(&self.last_records, path)?;
        info!("Saved {} records to {}", self.last_records.len(), path.display());
        Ok(path.to_path_buf())
    }

    /// Caption a batch of images with `prompt`
    pub async fn caption_images(&mut self, prompt: &str, images: &[ImageInput]) -> CaptionReport {
        let cancel = self.cancel.clone();
        let Some(client) = self.client.as_mut() else {
            return CaptionReport {
                captions: Vec::new(),
                status: CaptionStatus::NotConfigured,
            };
        };

        let report = match ClientSession::acquire(client) {
            Ok(session) => ImageCaptioner::new(&*session, prompt).caption_all(images, &cancel).await,
            Err(e) => CaptionReport {
                captions: Vec::new(),
                status: CaptionStatus::ConnectionFailed(e.to_string()),
            },
        };
        self.cancel.reset();
        report
    }
}

impl DatasetPipeline<OpenAiClient> {
    /// Validate endpoint settings and bind a fresh OpenAI-compatible client.
    ///
    /// Each call fully replaces the previous connection. Returns whether the
    /// configuration was accepted plus a user-facing message.
    pub fn configure(&mut self, base_url: &str, api_key: &str, model_name: &str) -> (bool, String) {
        let endpoint = ModelEndpointConfig::new(base_url, api_key, model_name);
        match OpenAiClient::new(endpoint, self.client_config.clone()) {
            Ok(client) => {
                self.rebind(client);
                (true, "API configuration updated".to_string())
            }
            Err(e) => {
                warn!("API configuration rejected: {}", e);
                (false, format!("API configuration failed: {}", e))
            }
        }
    }
}

fn checkpoint(
    writer: &DatasetWriter,
    records: &[AnnotationRecord],
    path: &Path,
    written: &mut usize,
    failed: &mut usize,
) {
    match writer.write(records, path) {
        Ok(()) => {
            *written += 1;
            info!("Checkpoint: {} records -> {}", records.len(), path.display());
        }
        Err(e) => {
            *failed += 1;
            warn!("Checkpoint to {} failed: {}", path.display(), e);
        }
    }
}
