//! Text command implementation.

use crate::cli::{EndpointArgs, TextArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use sftgen_llm::OpenAiClient;
use sftgen_pipeline::{CancelHandle, DatasetPipeline, OutputTarget, PipelineConfig, RunStatus};
use std::fs;
use tokio::task::JoinHandle;
use tracing::warn;

/// Execute the text command.
pub async fn execute_text(
    args: TextArgs,
    config: &Config,
    endpoint: &EndpointArgs,
    formatter: &Formatter,
) -> Result<()> {
    let document = fs::read_to_string(&args.file)?;
    let endpoint = config.resolve_endpoint(endpoint)?;

    let mut pipeline: DatasetPipeline<OpenAiClient> = DatasetPipeline::new(pipeline_config(&args, config))?
        .with_client_config(config.client.clone())
        .with_output(output_target(&args, config));

    let (ok, message) = pipeline.configure(&endpoint.base_url, &endpoint.api_key, &endpoint.model_name);
    if !ok {
        return Err(CliError::Config(message));
    }
    pipeline.set_prompts(&config.prompts.segment, &config.prompts.title, &config.prompts.format)?;

    eprintln!("{}", formatter.info(&format!("Processing {}", args.file.display())));

    let watcher = cancel_on_ctrl_c(pipeline.cancel_handle());
    let report = pipeline.process(&document).await;
    watcher.abort();

    if let RunStatus::ConnectionFailed(reason) = &report.status {
        return Err(CliError::Connection(reason.clone()));
    }

    if args.preview && !report.records.is_empty() {
        println!("{}", report.preview(pipeline.config().preview_chars));
    }
    println!("{}", formatter.run_summary(&report));
    if let Some(note) = formatter.checkpoint_note(&report) {
        println!("{}", note);
    }

    Ok(())
}

/// Exit status for a run aborted by a second interrupt (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// What an interrupt should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InterruptAction {
    /// Stop after the in-flight call and flush
    Cancel,
    /// Stop now without waiting for the call
    Exit,
}

/// First interrupt cancels gracefully; any later one exits.
pub(crate) fn on_interrupt(handle: &CancelHandle) -> InterruptAction {
    if handle.is_cancelled() {
        InterruptAction::Exit
    } else {
        handle.cancel();
        InterruptAction::Cancel
    }
}

/// Spawn a task that requests cancellation on Ctrl-C.
///
/// The in-flight call finishes and the records so far are flushed. A second
/// Ctrl-C exits immediately; the last checkpoint on disk stays intact.
pub(crate) fn cancel_on_ctrl_c(handle: CancelHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&handle) {
                InterruptAction::Cancel => {
                    warn!("Interrupt received, finishing the current call (Ctrl-C again to exit now)")
                }
                InterruptAction::Exit => {
                    warn!("Second interrupt, exiting without waiting");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        }
    })
}

fn pipeline_config(args: &TextArgs, config: &Config) -> PipelineConfig {
    let mut pipeline = config.pipeline.clone();
    if let Some(every) = args.checkpoint_every {
        pipeline.checkpoint_every = every;
    }
    pipeline
}

fn output_target(args: &TextArgs, config: &Config) -> OutputTarget {
    match (&args.output, &args.output_dir) {
        (Some(file), _) => OutputTarget::File(file.clone()),
        (None, Some(dir)) => OutputTarget::Directory(dir.clone()),
        (None, None) => OutputTarget::Directory(config.output.dir.clone()),
    }
}
