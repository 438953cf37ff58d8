//! Caption command implementation.

use crate::cli::{CaptionArgs, EndpointArgs};
use crate::commands::text::cancel_on_ctrl_c;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use sftgen_llm::OpenAiClient;
use sftgen_pipeline::{CaptionStatus, DatasetPipeline, ImageInput};
use std::fs;

/// Execute the caption command.
pub async fn execute_caption(
    args: CaptionArgs,
    config: &Config,
    endpoint: &EndpointArgs,
    formatter: &Formatter,
) -> Result<()> {
    let images = image_inputs(&args.urls)?;
    let endpoint = config.resolve_endpoint(endpoint)?;

    let mut pipeline: DatasetPipeline<OpenAiClient> =
        DatasetPipeline::new(config.pipeline.clone())?.with_client_config(config.client.clone());
    let (ok, message) = pipeline.configure(&endpoint.base_url, &endpoint.api_key, &endpoint.model_name);
    if !ok {
        return Err(CliError::Config(message));
    }

    let prompt = args.prompt.as_deref().unwrap_or(&config.caption.prompt);
    let watcher = cancel_on_ctrl_c(pipeline.cancel_handle());
    let report = pipeline.caption_images(prompt, &images).await;
    watcher.abort();

    if let CaptionStatus::ConnectionFailed(reason) = &report.status {
        return Err(CliError::Connection(reason.clone()));
    }

    println!("{}", formatter.captions(&report));

    if let Some(path) = args.output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(&report.captions)?)?;
        println!("{}", formatter.success(&format!("Captions saved to {}", path.display())));
    }

    Ok(())
}

fn image_inputs(urls: &[String]) -> Result<Vec<ImageInput>> {
    urls.iter()
        .enumerate()
        .map(|(index, url)| {
            let url = url.trim();
            let accepted = url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:image/");
            if !accepted {
                return Err(CliError::InvalidInput(format!(
                    "Image {} must be an http(s) or data:image URL: {}",
                    index + 1,
                    url
                )));
            }
            Ok(ImageInput {
                index,
                url: url.to_string(),
            })
        })
        .collect()
}
