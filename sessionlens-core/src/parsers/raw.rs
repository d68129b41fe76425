//! Raw transcript record shapes
//!
//! Typed serde models for the JSONL session file format. Top-level records
//! use camelCase keys; the nested API message body uses snake_case. Every
//! field is optional with a default so a record missing fields still
//! deserializes; unknown content-block kinds collapse into
//! [`ContentBlock::Unknown`] instead of failing the whole line.

use serde::Deserialize;
use serde_json::Value;
use std::io::{self, BufRead};

use crate::types::TokenUsage;

/// One line of a session transcript.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecord {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub uuid: Option<String>,
    pub parent_uuid: Option<String>,
    pub session_id: Option<String>,
    pub timestamp: Option<String>,
    pub cwd: Option<String>,
    pub git_branch: Option<String>,
    pub version: Option<String>,
    pub message: Option<RawMessageBody>,
    /// Progress payload; the agent's own assistant record is nested two
    /// levels down under `data.message.message`.
    pub data: Option<ProgressData>,
    // serde's camelCase would produce "parentToolUseId"; the files use a
    // capital ID
    #[serde(rename = "parentToolUseID")]
    pub parent_tool_use_id: Option<String>,
    pub tool_use_result: Option<RawToolUseResult>,
    pub slug: Option<String>,
    pub subtype: Option<String>,
    pub level: Option<String>,
}

impl RawRecord {
    pub fn kind(&self) -> &str {
        self.record_type.as_deref().unwrap_or("")
    }
}

/// The API message body carried by `user`/`assistant` records. snake_case
/// on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMessageBody {
    pub model: Option<String>,
    pub role: Option<String>,
    pub content: Option<RawContent>,
    pub usage: Option<RawUsage>,
    pub stop_reason: Option<String>,
}

/// Message content is either a bare string (legacy user prompts) or an
/// array of typed blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl RawContent {
    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            RawContent::Text(_) => &[],
            RawContent::Blocks(blocks) => blocks,
        }
    }
}

/// A typed content block, discriminated by its `type` tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Option<Value>,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default)]
        content: Option<ToolResultContent>,
    },
    #[serde(other)]
    Unknown,
}

/// Tool result content: legacy string shape or block array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ToolResultBlock>),
}

impl ToolResultContent {
    /// Flatten to text: the string itself, or all `text` blocks joined by
    /// newline.
    pub fn to_text(&self) -> String {
        match self {
            ToolResultContent::Text(text) => text.clone(),
            ToolResultContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolResultBlock {
    #[serde(rename = "type")]
    pub block_type: Option<String>,
    pub text: Option<String>,
}

/// Token usage as it appears on the wire. All counters optional.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct RawUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cache_read_input_tokens: Option<u64>,
    pub cache_creation_input_tokens: Option<u64>,
}

impl From<RawUsage> for TokenUsage {
    fn from(raw: RawUsage) -> Self {
        TokenUsage {
            input_tokens: raw.input_tokens.unwrap_or(0),
            output_tokens: raw.output_tokens.unwrap_or(0),
            cache_read_input_tokens: raw.cache_read_input_tokens.unwrap_or(0),
            cache_creation_input_tokens: raw.cache_creation_input_tokens.unwrap_or(0),
        }
    }
}

/// `progress` record payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressData {
    pub agent_id: Option<String>,
    pub message: Option<ProgressEnvelope>,
}

/// Wrapper around the agent's forwarded assistant record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProgressEnvelope {
    pub message: Option<RawMessageBody>,
}

/// `toolUseResult` sibling object on user tool-result records. Task
/// dispatch results carry a summary object; other tools put arbitrary
/// JSON here, so anything non-matching falls through to `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawToolUseResult {
    Summary(ToolUseResultSummary),
    Other(Value),
}

impl RawToolUseResult {
    pub fn as_summary(&self) -> Option<&ToolUseResultSummary> {
        match self {
            RawToolUseResult::Summary(summary) => Some(summary),
            RawToolUseResult::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseResultSummary {
    pub total_tokens: u64,
    #[serde(default)]
    pub total_tool_use_count: Option<u64>,
    #[serde(default)]
    pub total_duration_ms: Option<u64>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

/// Read one line, decoding lossily. Transcripts are appended while being
/// read, so a partial append can cut a multi-byte code point; such a line
/// comes back with replacement characters and fails JSON parse like any
/// other malformed line instead of aborting the whole stream.
pub(crate) fn read_line_lossy<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

/// Parse one transcript line. `None` for malformed JSON; corrupt lines
/// degrade to "fewer records observed", never a failure.
pub fn parse_line(line: &str) -> Option<RawRecord> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}
