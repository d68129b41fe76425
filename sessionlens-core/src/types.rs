//! Core domain types for sessionlens
//!
//! These are the derived, queryable views produced by the parsers from raw
//! JSONL transcripts. All of them serialize as camelCase JSON so the
//! emitted artifacts match what the dashboard frontend consumes.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Session** | One continuous interaction transcript, stored as one JSONL file |
//! | **Turn** | One transcript record relevant to the conversation |
//! | **Agent** | A delegated sub-task run via a `Task` tool call, optionally with its own transcript |
//! | **Skill** | A named reusable procedure invoked via a `Skill` tool call |
//! | **Context window** | The model's bounded input-token budget, tracked as a derived growth curve |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================
// Token accounting
// ============================================

/// Four non-negative token counters. Always additive and commutative
/// across accumulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cache_creation_input_tokens: u64,
}

impl TokenUsage {
    /// Add another usage block into this one, counter by counter.
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_read_input_tokens += other.cache_read_input_tokens;
        self.cache_creation_input_tokens += other.cache_creation_input_tokens;
    }

    /// Standing context size implied by this usage block. Output tokens are
    /// excluded: they represent generation, not context that persists.
    pub fn context_size(&self) -> u64 {
        self.input_tokens + self.cache_read_input_tokens + self.cache_creation_input_tokens
    }

    pub fn is_empty(&self) -> bool {
        *self == TokenUsage::default()
    }
}

// ============================================
// Session summary (bounded head/tail sample)
// ============================================

/// Lightweight index record for one session file, built from a bounded
/// sample of its first and last lines. Best effort by design: two renders
/// may differ if lines changed outside the sampled window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub project_path: String,
    pub project_name: String,
    pub branch: Option<String>,
    pub cwd: Option<String>,
    /// ISO-8601, minimum over sampled records
    pub started_at: String,
    /// ISO-8601, maximum over sampled records
    pub last_active_at: String,
    pub duration_ms: i64,
    pub message_count: u32,
    pub user_message_count: u32,
    pub assistant_message_count: u32,
    /// Derived from mtime + lock marker, set by the scanner
    pub is_active: bool,
    /// First assistant model seen in the sample
    pub model: Option<String>,
    pub version: Option<String>,
    pub file_size_bytes: u64,
}

// ============================================
// Session detail (full streaming parse)
// ============================================

/// Kind of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    User,
    Assistant,
    System,
}

/// One transcript record relevant to the conversation.
///
/// A turn with `tokens` set always carries a complete token object (all
/// four counters present, defaulting to 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub uuid: String,
    #[serde(rename = "type")]
    pub kind: TurnKind,
    pub timestamp: String,
    /// Truncated text content (first 500 characters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

/// One tool invocation. `tool_use_id` is the correlation key joining the
/// invocation to its result record, to an agent dispatch, or to a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub tool_name: String,
    pub tool_use_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
}

/// One `Task` tool dispatch. Created when the dispatch is seen, then
/// enriched from `progress` records (keyed by `parentToolUseID`), from the
/// correlated tool result, and from the agent's own transcript file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInvocation {
    pub subagent_type: String,
    pub description: String,
    pub timestamp: String,
    pub tool_use_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tool_use_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// The model the agent actually ran on, which may differ from the
    /// requested one; known only from the agent's progress stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<HashMap<String, u64>>,
    /// Skills invoked by this agent. `None` when the agent has no
    /// transcript on disk; empty when the transcript exists but invoked
    /// no skills.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<SkillInvocation>>,
}

/// One `Skill` tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInvocation {
    pub skill: String,
    pub args: Option<String>,
    pub timestamp: String,
    pub tool_use_id: String,
    /// Distinguishes directly-invoked from context-injected skills when the
    /// invocation carries a source tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Status of a tracked task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Deleted,
}

impl TaskStatus {
    pub fn parse(s: &str) -> Option<TaskStatus> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "deleted" => Some(TaskStatus::Deleted),
            _ => None,
        }
    }
}

/// A user-visible todo tracked via TaskCreate/TaskUpdate tool pairs.
///
/// Exists from the moment its TaskCreate call is seen; `task_id` stays
/// empty until resolved from the correlated tool result text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub task_id: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_form: Option<String>,
    pub status: TaskStatus,
    pub timestamp: String,
}

/// Error surfaced by a `system` record with `level = error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionError {
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

// ============================================
// Context window reconstruction
// ============================================

/// Context size observed at one usage-bearing assistant turn. Adjacent
/// snapshots never share the same `context_size` (run-length dedup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindowSnapshot {
    pub turn_index: usize,
    pub timestamp: String,
    pub context_size: u64,
    pub output_tokens: u64,
}

/// Derived context-window growth data for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindowData {
    pub context_limit: u64,
    pub model_name: String,
    /// Context size at the first snapshot
    pub system_overhead: u64,
    /// Context size at the last snapshot
    pub current_context_size: u64,
    pub messages_estimate: u64,
    pub free_space: u64,
    pub autocompact_buffer: u64,
    pub usage_percent: f64,
    pub snapshots: Vec<ContextWindowSnapshot>,
}

// ============================================
// Session detail
// ============================================

/// Full per-session view built from a single streaming pass over the
/// transcript plus correlated per-agent transcripts.
///
/// `total_tokens` equals the element-wise sum of every usage block in the
/// file, including usage attributed via agent progress records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub session_id: String,
    pub project_path: String,
    pub project_name: String,
    pub branch: Option<String>,
    pub turns: Vec<Turn>,
    pub total_tokens: TokenUsage,
    pub tokens_by_model: HashMap<String, TokenUsage>,
    pub tool_frequency: HashMap<String, u64>,
    pub errors: Vec<SessionError>,
    pub models: Vec<String>,
    pub agents: Vec<AgentInvocation>,
    pub skills: Vec<SkillInvocation>,
    pub tasks: Vec<TaskItem>,
    pub context_window: Option<ContextWindowData>,
}

/// One page of raw transcript records, for the log viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<serde_json::Value>,
    pub total: usize,
}
