//! Sequential image captioning

use crate::cancel::CancelHandle;
use crate::types::{Caption, CaptionReport, CaptionStatus, ImageInput};
use sftgen_llm::LlmClient;
use tracing::{info, warn};

/// Captions a batch of images one at a time with a single system prompt
pub struct ImageCaptioner<'a, C: LlmClient> {
    client: &'a C,
    prompt: &'a str,
}

impl<'a, C: LlmClient> ImageCaptioner<'a, C> {
    /// Create a captioner
    pub fn new(client: &'a C, prompt: &'a str) -> Self {
        Self { client, prompt }
    }

    /// Caption every image. A failed image gets an empty caption and the
    /// error text; the batch keeps going.
    pub async fn caption_all(&self, images: &[ImageInput], cancel: &CancelHandle) -> CaptionReport {
        if images.is_empty() {
            return CaptionReport {
                captions: Vec::new(),
                status: CaptionStatus::NoImages,
            };
        }

        info!("Captioning {} images", images.len());
        let mut captions = Vec::with_capacity(images.len());

        for image in images {
            if cancel.is_cancelled() {
                let processed = captions.len();
                return CaptionReport {
                    captions,
                    status: CaptionStatus::Cancelled { processed },
                };
            }

            let caption = match self.client.describe_image(self.prompt, &image.url).await {
                Ok(text) => Caption {
                    index: image.index,
                    url: image.url.clone(),
                    text,
                    error: None,
                },
                Err(e) => {
                    warn!("Captioning image {} failed: {}", image.index, e);
                    Caption {
                        index: image.index,
                        url: image.url.clone(),
                        text: String::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            captions.push(caption);
        }

        let captioned = captions.iter().filter(|c| !c.text.trim().is_empty()).count();
        let total = captions.len();
        info!("Completed descriptions for {}/{} images", captioned, total);

        CaptionReport {
            captions,
            status: CaptionStatus::Finished { captioned, total },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sftgen_llm::{LlmError, MockClient, MockReply};

    fn images(n: usize) -> Vec<ImageInput> {
        (0..n)
            .map(|index| ImageInput {
                index,
                url: format!("https://example.com/{}.png", index),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_caption_all() {
        let client = MockClient::new("a chest x-ray");
        let report = ImageCaptioner::new(&client, "describe")
            .caption_all(&images(3), &CancelHandle::new())
            .await;

        assert_eq!(report.status, CaptionStatus::Finished { captioned: 3, total: 3 });
        assert!(report.missing().is_empty());
        assert_eq!(client.calls()[2].content, "https://example.com/2.png");
    }

    #[tokio::test]
    async fn test_failed_image_does_not_stop_batch() {
        let client = MockClient::default();
        client.queue_response("describe", "first");
        client.queue_response("describe", MockReply::Fail(LlmError::Timeout("30s".into())));
        client.queue_response("describe", "third");

        let report = ImageCaptioner::new(&client, "describe")
            .caption_all(&images(3), &CancelHandle::new())
            .await;

        assert_eq!(report.status, CaptionStatus::Finished { captioned: 2, total: 3 });
        assert_eq!(report.missing(), vec![1]);
        assert!(report.captions[1].error.as_deref().unwrap_or("").contains("timed out"));
    }

    #[tokio::test]
    async fn test_no_images() {
        let client = MockClient::default();
        let report = ImageCaptioner::new(&client, "describe")
            .caption_all(&[], &CancelHandle::new())
            .await;
        assert_eq!(report.status, CaptionStatus::NoImages);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let client = MockClient::default();
        let cancel = CancelHandle::new();
        cancel.cancel();

        let report = ImageCaptioner::new(&client, "describe")
            .caption_all(&images(2), &cancel)
            .await;

        assert_eq!(report.status, CaptionStatus::Cancelled { processed: 0 });
        assert_eq!(client.call_count(), 0);
    }
}
