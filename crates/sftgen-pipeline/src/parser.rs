//! Parse format-stage output into an annotation record

use crate::error::PipelineError;
use serde_json::Value;
use sftgen_domain::AnnotationRecord;
use tracing::debug;

/// Parse the format agent's reply into a record.
///
/// Requires a JSON object with string `instruction`, `input` and `output`
/// keys. Extra keys are ignored; `input` is always normalized to empty.
pub fn parse_record(response: &str) -> Result<AnnotationRecord, PipelineError> {
    // Models wrap JSON in markdown fences despite being told not to
    let json_str = extract_json(response);

    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| PipelineError::InvalidFormat(format!("JSON parse error: {}", e)))?;

    let obj = json
        .as_object()
        .ok_or_else(|| PipelineError::InvalidFormat("Expected JSON object".to_string()))?;

    let instruction = required_str(obj, "instruction")?;
    let input = required_str(obj, "input")?;
    let output = required_str(obj, "output")?;

    if !input.is_empty() {
        debug!("Discarding non-empty 'input' from format stage");
    }

    Ok(AnnotationRecord::new(instruction, output))
}

/// Strip markdown code-fence markers and surrounding whitespace
pub fn extract_json(response: &str) -> String {
    response
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn required_str(obj: &serde_json::Map<String, Value>, key: &str) -> Result<String, PipelineError> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::InvalidFormat(format!("Missing or invalid '{}'", key)))
}
