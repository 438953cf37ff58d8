//! Three-stage paragraph annotation: analyze, title, format

use crate::parser::parse_record;
use sftgen_domain::{AnnotationRecord, PromptSet, PLACEHOLDER_INSTRUCTION};
use sftgen_llm::{LlmClient, LlmError};
use std::fmt;
use tracing::{debug, error, warn};

/// Annotation stage that made an LLM call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Analysis pass over the paragraph (segment prompt)
    Analyze,
    /// Title generation
    Title,
    /// Format-to-record
    Format,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Analyze => write!(f, "analyze"),
            Stage::Title => write!(f, "title"),
            Stage::Format => write!(f, "format"),
        }
    }
}

/// Why a record is degraded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// An LLM call failed; instruction fell back to the placeholder
    StageFailed {
        /// Stage whose call failed
        stage: Stage,
        /// The client's error
        error: LlmError,
    },
    /// Format output could not be parsed; instruction fell back to the title
    Unparseable {
        /// Parser error description
        reason: String,
    },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::StageFailed { stage, error } => write!(f, "{} stage failed: {}", stage, error),
            Degradation::Unparseable { reason } => write!(f, "format output unparseable: {}", reason),
        }
    }
}

/// A record plus how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// The record to append to the result set
    pub record: AnnotationRecord,
    /// Set when any fallback applied
    pub degradation: Option<Degradation>,
}

impl Annotation {
    /// Whether a fallback was applied
    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}

/// Turns one paragraph into one record. Never fails outward.
pub struct Annotator<'a, C: LlmClient> {
    client: &'a C,
    prompts: &'a PromptSet,
    preview_chars: usize,
}

impl<'a, C: LlmClient> Annotator<'a, C> {
    /// Create an annotator over a shared client and prompt set
    pub fn new(client: &'a C, prompts: &'a PromptSet) -> Self {
        Self {
            client,
            prompts,
            preview_chars: 100,
        }
    }

    /// Set how many characters of model output to show in debug logs
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Annotate `paragraph`; `output` of the result always keeps the paragraph
    /// unless the format stage returned a well-formed record
    pub async fn annotate(&self, paragraph: &str) -> AnnotationRecord {
        self.annotate_detailed(paragraph).await.record
    }

    /// Annotate and report which fallback, if any, applied
    pub async fn annotate_detailed(&self, paragraph: &str) -> Annotation {
        match self.run_stages(paragraph).await {
            Ok(annotation) => annotation,
            Err(degradation) => {
                log_stage_failure(&degradation);
                Annotation {
                    record: AnnotationRecord::fallback(paragraph),
                    degradation: Some(degradation),
                }
            }
        }
    }

    async fn run_stages(&self, paragraph: &str) -> Result<Annotation, Degradation> {
        let analysis = self.call(Stage::Analyze, &self.prompts.segment, paragraph).await?;
        debug!("Analysis: {}", preview(&analysis, self.preview_chars));

        let title = self.call(Stage::Title, &self.prompts.title, paragraph).await?;
        let title = title.trim();
        debug!("Title: {}", title);

        let format_input = PromptSet::format_input(title, paragraph);
        let formatted = self.call(Stage::Format, &self.prompts.format, &format_input).await?;
        debug!("Formatted: {}", preview(&formatted, self.preview_chars));

        let fallback_instruction = if title.is_empty() {
            PLACEHOLDER_INSTRUCTION
        } else {
            title
        };

        match parse_record(&formatted) {
            Ok(mut record) => {
                if record.instruction.trim().is_empty() {
                    record.instruction = fallback_instruction.to_string();
                }
                Ok(Annotation {
                    record,
                    degradation: None,
                })
            }
            Err(e) => {
                warn!("Format output unparseable, using title as instruction: {}", e);
                Ok(Annotation {
                    record: AnnotationRecord::new(fallback_instruction, paragraph),
                    degradation: Some(Degradation::Unparseable {
                        reason: e.to_string(),
                    }),
                })
            }
        }
    }

    async fn call(&self, stage: Stage, system_prompt: &str, content: &str) -> Result<String, Degradation> {
        self.client
            .complete(system_prompt, content)
            .await
            .map_err(|error| Degradation::StageFailed { stage, error })
    }
}

fn log_stage_failure(degradation: &Degradation) {
    let Degradation::StageFailed { stage, error } = degradation else {
        return;
    };
    match error {
        LlmError::RateLimitExceeded { attempts, .. } => {
            warn!("{} stage gave up after {} rate-limited attempts", stage, attempts)
        }
        LlmError::Timeout(_) => warn!("{} stage timed out: {}", stage, error),
        LlmError::Config(_) | LlmError::Closed | LlmError::ModelNotAvailable(_) => {
            error!("{} stage cannot reach the model: {}", stage, error)
        }
        _ => warn!("{} stage failed: {}", stage, error),
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when truncated
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sftgen_llm::{MockClient, MockReply};

    const PARAGRAPH: &str = "人工智能是计算机科学的一个分支，研究如何让机器模拟人类智能。";

    fn prompts() -> PromptSet {
        PromptSet::new("segment", "title", "format").unwrap()
    }

    fn client() -> MockClient {
        let client = MockClient::default();
        client.add_response("segment", "analysis text");
        client.add_response("title", "人工智能");
        client
    }

    #[tokio::test]
    async fn test_well_formed_record() {
        let client = client();
        client.add_response(
            "format",
            format!(r#"{{"instruction":"人工智能","input":"","output":"{}"}}"#, PARAGRAPH),
        );
        let prompts = prompts();

        let annotation = Annotator::new(&client, &prompts).annotate_detailed(PARAGRAPH).await;

        assert!(!annotation.is_degraded());
        assert_eq!(annotation.record, AnnotationRecord::new("人工智能", PARAGRAPH));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_stage_order_and_inputs() {
        let client = client();
        client.add_response("format", "not json");
        let prompts = prompts();

        Annotator::new(&client, &prompts).annotate(PARAGRAPH).await;

        let calls = client.calls();
        assert_eq!(calls[0].system_prompt, "segment");
        assert_eq!(calls[0].content, PARAGRAPH);
        assert_eq!(calls[1].system_prompt, "title");
        assert_eq!(calls[2].system_prompt, "format");
        assert!(calls[2].content.contains("人工智能"));
        assert!(calls[2].content.contains(PARAGRAPH));
    }

    #[tokio::test]
    async fn test_unparseable_uses_title() {
        let client = client();
        client.add_response("format", "Sure! Here is your JSON.");
        let prompts = prompts();

        let annotation = Annotator::new(&client, &prompts).annotate_detailed(PARAGRAPH).await;

        assert_eq!(annotation.record, AnnotationRecord::new("人工智能", PARAGRAPH));
        assert!(matches!(annotation.degradation, Some(Degradation::Unparseable { .. })));
    }

    #[tokio::test]
    async fn test_unparseable_with_blank_title_uses_placeholder() {
        let client = MockClient::default();
        client.add_response("segment", "analysis");
        client.add_response("title", "   ");
        client.add_response("format", r#"{"instruction":"X"}"#);
        let prompts = prompts();

        let record = Annotator::new(&client, &prompts).annotate(PARAGRAPH).await;

        assert_eq!(record, AnnotationRecord::fallback(PARAGRAPH));
    }

    #[tokio::test]
    async fn test_each_stage_failure_keeps_output() {
        for failing in ["segment", "title", "format"] {
            let client = client();
            client.add_response("format", r#"{"instruction":"X","input":"","output":"Y"}"#);
            client.add_error(failing, LlmError::Communication("connection reset".into()));
            let prompts = prompts();

            let annotation = Annotator::new(&client, &prompts).annotate_detailed(PARAGRAPH).await;

            assert_eq!(annotation.record.output, PARAGRAPH);
            assert_eq!(annotation.record.instruction, PLACEHOLDER_INSTRUCTION);
            assert_eq!(annotation.record.input, "");
            assert!(matches!(annotation.degradation, Some(Degradation::StageFailed { .. })));
        }
    }

    #[tokio::test]
    async fn test_failure_short_circuits() {
        let client = client();
        client.add_error("title", LlmError::Timeout("30s".into()));
        let prompts = prompts();

        let annotation = Annotator::new(&client, &prompts).annotate_detailed(PARAGRAPH).await;

        assert_eq!(client.calls_for("format"), 0);
        match annotation.degradation {
            Some(Degradation::StageFailed { stage, error }) => {
                assert_eq!(stage, Stage::Title);
                assert!(matches!(error, LlmError::Timeout(_)));
            }
            other => panic!("Expected StageFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_parsed_instruction_replaced_by_title() {
        let client = client();
        client.add_response("format", r#"{"instruction":"","input":"","output":"Y"}"#);
        let prompts = prompts();

        let record = Annotator::new(&client, &prompts).annotate(PARAGRAPH).await;

        assert_eq!(record.instruction, "人工智能");
        assert_eq!(record.output, "Y");
    }

    #[tokio::test]
    async fn test_every_call_fails() {
        let client = MockClient::new(MockReply::Fail(LlmError::Api {
            status: 500,
            message: "boom".into(),
        }));
        let prompts = prompts();

        let record = Annotator::new(&client, &prompts).annotate(PARAGRAPH).await;

        assert_eq!(record, AnnotationRecord::fallback(PARAGRAPH));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("你好世界", 2), "你好...");
        assert_eq!(preview("abc", 10), "abc");
    }
}
