//! Run outcomes and reports

use crate::annotator::preview;
use sftgen_domain::ResultSet;
use std::fmt;
use std::path::PathBuf;

/// How a document run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// No LLM client has been configured
    NotConfigured,
    /// The connection handle could not be acquired
    ConnectionFailed(String),
    /// The document was empty
    NoInput,
    /// Segmentation produced no paragraphs
    NoValidSegments,
    /// Every record carries a generated instruction
    Complete {
        /// Records produced
        total: usize,
    },
    /// Some records fell back to the placeholder instruction
    Partial {
        /// Records with a generated instruction
        annotated: usize,
        /// Records produced
        total: usize,
    },
    /// Stopped on request after `processed` paragraphs
    Cancelled {
        /// Records with a generated instruction
        annotated: usize,
        /// Records produced before stopping
        processed: usize,
    },
}

impl RunStatus {
    /// Whether the run produced a usable dataset
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Complete { .. } | RunStatus::Partial { .. })
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::NotConfigured => write!(f, "Please configure the API settings first"),
            RunStatus::ConnectionFailed(reason) => write!(f, "Could not open API connection: {}", reason),
            RunStatus::NoInput => write!(f, "No input text provided"),
            RunStatus::NoValidSegments => write!(f, "No valid text blocks found"),
            RunStatus::Complete { total } => write!(f, "Processing complete: {} records", total),
            RunStatus::Partial { annotated, total } => write!(
                f,
                "Processing complete: {}/{} records annotated, {} used the placeholder instruction",
                annotated,
                total,
                total - annotated
            ),
            RunStatus::Cancelled { annotated, processed } => write!(
                f,
                "Cancelled after {} records, {}/{} annotated",
                processed, annotated, processed
            ),
        }
    }
}

/// Everything a caller needs after one document run
#[derive(Debug, Clone)]
pub struct ProcessReport {
    /// Records in paragraph order
    pub records: ResultSet,
    /// Final status
    pub status: RunStatus,
    /// File the checkpoints were written to, if any were attempted
    pub output_path: Option<PathBuf>,
    /// Successful checkpoint writes
    pub checkpoints_written: usize,
    /// Failed checkpoint writes (records are still in memory)
    pub checkpoint_failures: usize,
}

impl ProcessReport {
    /// A report for a run that never started
    pub fn empty(status: RunStatus) -> Self {
        Self {
            records: Vec::new(),
            status,
            output_path: None,
            checkpoints_written: 0,
            checkpoint_failures: 0,
        }
    }

    /// Records with a generated (non-placeholder) instruction
    pub fn annotated_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_placeholder()).count()
    }

    /// User-facing status line
    pub fn status_message(&self) -> String {
        match (&self.output_path, self.checkpoints_written) {
            (Some(path), n) if n > 0 => format!("{} (saved to {})", self.status, path.display()),
            _ => self.status.to_string(),
        }
    }

    /// Human-readable listing: block number, instruction and output head
    pub fn preview(&self, max_chars: usize) -> String {
        let mut out = String::new();
        for (i, record) in self.records.iter().enumerate() {
            out.push_str(&format!("=== Block {} ===\n", i + 1));
            out.push_str(&format!("Instruction: {}\n", record.instruction));
            out.push_str(&format!("Output: {}\n\n", preview(&record.output, max_chars)));
        }
        out
    }
}

/// An image handed over as a ready-to-send URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Position in the curator's batch
    pub index: usize,
    /// `https://` or `data:image/...;base64,` URL
    pub url: String,
}

/// Caption generated for one image
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Caption {
    /// Position in the batch
    pub index: usize,
    /// Image URL
    pub url: String,
    /// Description; empty when generation failed
    pub text: String,
    /// Failure description, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a captioning batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionStatus {
    /// No LLM client has been configured
    NotConfigured,
    /// The connection handle could not be acquired
    ConnectionFailed(String),
    /// No images were supplied
    NoImages,
    /// Batch finished
    Finished {
        /// Images with a non-empty caption
        captioned: usize,
        /// Images in the batch
        total: usize,
    },
    /// Stopped on request
    Cancelled {
        /// Images attempted before stopping
        processed: usize,
    },
}

impl fmt::Display for CaptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionStatus::NotConfigured => write!(f, "Please configure the API settings first"),
            CaptionStatus::ConnectionFailed(reason) => write!(f, "Could not open API connection: {}", reason),
            CaptionStatus::NoImages => write!(f, "Please upload images first"),
            CaptionStatus::Finished { captioned, total } => {
                write!(f, "Completed descriptions for {}/{} images", captioned, total)
            }
            CaptionStatus::Cancelled { processed } => write!(f, "Cancelled after {} images", processed),
        }
    }
}

/// Captions plus batch status
#[derive(Debug, Clone)]
pub struct CaptionReport {
    /// One entry per attempted image, in batch order
    pub captions: Vec<Caption>,
    /// Final status
    pub status: CaptionStatus,
}

impl CaptionReport {
    /// Indices of images still lacking a caption
    pub fn missing(&self) -> Vec<usize> {
        self.captions
            .iter()
            .filter(|c| c.text.trim().is_empty())
            .map(|c| c.index)
            .collect()
    }

    /// Apply curator edits by image index; returns how many captions changed
    pub fn update_captions(&mut self, edits: &[(usize, String)]) -> usize {
        let mut updated = 0;
        for (index, text) in edits {
            if let Some(caption) = self.captions.iter_mut().find(|c| c.index == *index) {
                caption.text = text.clone();
                caption.error = None;
                updated += 1;
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sftgen_domain::AnnotationRecord;

    #[test]
    fn test_status_messages_are_distinct() {
        let statuses = [
            RunStatus::NotConfigured,
            RunStatus::ConnectionFailed("x".into()),
            RunStatus::NoInput,
            RunStatus::NoValidSegments,
            RunStatus::Complete { total: 3 },
            RunStatus::Partial { annotated: 2, total: 3 },
            RunStatus::Cancelled { annotated: 1, processed: 1 },
        ];
        let messages: std::collections::HashSet<String> =
            statuses.iter().map(|s| s.to_string()).collect();
        assert_eq!(messages.len(), statuses.len());
    }

    #[test]
    fn test_partial_message_reports_counts() {
        let message = RunStatus::Partial { annotated: 2, total: 5 }.to_string();
        assert!(message.contains("2/5"));
        assert!(message.contains("3 used the placeholder"));
    }

    #[test]
    fn test_cancelled_message_reports_counts() {
        let message = RunStatus::Cancelled { annotated: 3, processed: 4 }.to_string();
        assert!(message.contains("after 4 records"));
        assert!(message.contains("3/4 annotated"));
    }

    #[test]
    fn test_preview_lists_blocks() {
        let mut report = ProcessReport::empty(RunStatus::Complete { total: 2 });
        report.records = vec![
            AnnotationRecord::new("A", "x".repeat(150)),
            AnnotationRecord::fallback("short"),
        ];

        let preview = report.preview(100);
        assert!(preview.contains("=== Block 1 ==="));
        assert!(preview.contains("=== Block 2 ==="));
        assert!(preview.contains(&format!("{}...", "x".repeat(100))));
        assert_eq!(report.annotated_count(), 1);
    }

    #[test]
    fn test_caption_edits_fill_missing() {
        let mut report = CaptionReport {
            captions: vec![
                Caption { index: 0, url: "u0".into(), text: "a cat".into(), error: None },
                Caption { index: 1, url: "u1".into(), text: String::new(), error: Some("timeout".into()) },
            ],
            status: CaptionStatus::Finished { captioned: 1, total: 2 },
        };
        assert_eq!(report.missing(), vec![1]);

        let updated = report.update_captions(&[(1, "a dog".into()), (7, "nobody".into())]);
        assert_eq!(updated, 1);
        assert!(report.missing().is_empty());
        assert!(report.captions[1].error.is_none());
    }
}
