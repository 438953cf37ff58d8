//! System prompts for the three text agents and the image captioner

use crate::error::DomainError;
use serde::{Deserialize, Serialize};

/// Asks the model to carve a semantic chunk of roughly 1000 tokens off the
/// front of the text. Also used for the per-paragraph analysis pass.
pub const DEFAULT_SEGMENT_PROMPT: &str = r#"你是文本分析专家。
你的任务是分析输入的文本，在接近1000个token的位置找到合适的语义断点，这个断点应该尽量保持段落或语义的完整性。

要求：
1. 寻找最接近1000 token处的语义完整位置
2. 优先在段落结束处断开
3. 返回从开始到断点的完整文本
4. 关注语义连贯性，不要在句子中间断开

直接返回这段完整的文本。"#;

/// Asks the model for a title of at most 10 characters
pub const DEFAULT_TITLE_PROMPT: &str = r#"你是标题生成专家。
为文本生成简短的instruction，要求：
1. 长度控制在10个字以内
2. 直接概括文本核心主题
3. 避免过度解释或分析

直接返回标题文本。"#;

/// Asks the model to emit the record as a bare JSON object
pub const DEFAULT_FORMAT_PROMPT: &str = r#"你是格式化专家。
请将提供的标题和原文按以下格式组织成JSON（直接返回 JSON，不要包含任何其他标记）：
{
    "instruction": "标题",
    "input": "",
    "output": "原文"
}

注意：
1. 严格按照格式输出
2. 保持原文完整
3. 只返回纯 JSON 字符串，不要包含 markdown 代码块标记
4. 确保 JSON 中的换行使用 \n"#;

/// Default system prompt for image captioning
pub const DEFAULT_CAPTION_PROMPT: &str = "你是一个专业的图像识别专家。请详细描述这张医学图像。";

/// The three prompts that drive the text pipeline.
///
/// Prompts are data: swapping them never touches the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSet {
    /// Breakpoint / analysis prompt
    #[serde(default = "default_segment")]
    pub segment: String,

    /// Title prompt
    #[serde(default = "default_title")]
    pub title: String,

    /// Format-to-record prompt
    #[serde(default = "default_format")]
    pub format: String,
}

impl PromptSet {
    /// Build a prompt set, trimming each prompt and rejecting empty ones
    pub fn new(
        segment: impl AsRef<str>,
        title: impl AsRef<str>,
        format: impl AsRef<str>,
    ) -> Result<Self, DomainError> {
        let segment = non_empty("segment", segment.as_ref())?;
        let title = non_empty("title", title.as_ref())?;
        let format = non_empty("format", format.as_ref())?;
        Ok(Self { segment, title, format })
    }

    /// Compose the user content sent to the format agent
    pub fn format_input(title: &str, paragraph: &str) -> String {
        format!("标题：{}\n原文：{}\n请按指定格式生成JSON。", title, paragraph)
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            segment: default_segment(),
            title: default_title(),
            format: default_format(),
        }
    }
}

fn non_empty(name: &'static str, prompt: &str) -> Result<String, DomainError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(DomainError::EmptyPrompt(name));
    }
    Ok(trimmed.to_string())
}

fn default_segment() -> String {
    DEFAULT_SEGMENT_PROMPT.to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE_PROMPT.to_string()
}

fn default_format() -> String {
    DEFAULT_FORMAT_PROMPT.to_string()
}
