//! Annotation records - the atomic unit of a generated dataset

use serde::{Deserialize, Serialize};

/// Instruction used when no usable title could be produced for a paragraph
pub const PLACEHOLDER_INSTRUCTION: &str = "待处理文本";

/// One supervised fine-tuning example.
///
/// Field order matters: it is the key order written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Short generated label summarizing the paragraph
    pub instruction: String,

    /// Conditioning context; always empty for now
    pub input: String,

    /// The paragraph text
    pub output: String,
}

impl AnnotationRecord {
    /// Create a record with an empty `input`
    pub fn new(instruction: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            input: String::new(),
            output: output.into(),
        }
    }

    /// Create the degraded record used when annotation fails.
    ///
    /// The paragraph is kept verbatim; only the instruction degrades.
    pub fn fallback(paragraph: impl Into<String>) -> Self {
        Self::new(PLACEHOLDER_INSTRUCTION, paragraph)
    }

    /// Whether the instruction is the placeholder rather than a generated label
    pub fn is_placeholder(&self) -> bool {
        self.instruction == PLACEHOLDER_INSTRUCTION
    }
}

/// Ordered sequence of records, insertion order = paragraph order
pub type ResultSet = Vec<AnnotationRecord>;
