//! Full streaming session parse
//!
//! Single forward pass over the transcript producing the complete detail
//! view: turns, tool frequency, token accounting (aggregate and per
//! model), agent/skill/task extraction, error records, and a
//! reconstruction of the context-window growth curve.
//!
//! Correlation state is bounded by the number of distinct correlation
//! keys, not the file size: agent progress accumulates into maps keyed by
//! `parentToolUseID` and is merged into the agent entries only after the
//! pass completes, because progress records for one agent may be spread
//! across the whole file.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::parsers::raw::{parse_line, read_line_lossy, ContentBlock, RawMessageBody, RawRecord};
use crate::paths::subagent_transcript_path;
use crate::types::{
    AgentInvocation, ContextWindowData, ContextWindowSnapshot, MessagePage, SessionDetail,
    SessionError, SkillInvocation, TaskItem, TaskStatus, TokenUsage, ToolCall, Turn, TurnKind,
};

/// Context window limit applied to every model family.
const CONTEXT_LIMIT: u64 = 200_000;
/// Fraction of the window reserved for automatic compaction.
const AUTOCOMPACT_FRACTION: f64 = 0.165;
/// Turn text is truncated to this many characters.
const TEXT_PREVIEW_CHARS: usize = 500;

/// Per-agent accumulation built from progress records during the pass.
#[derive(Default)]
struct AgentProgress {
    tokens: TokenUsage,
    tool_calls: HashMap<String, u64>,
    model: Option<String>,
    agent_id: Option<String>,
}

/// Parse the full session transcript.
///
/// Fails only when the file itself cannot be opened; malformed lines are
/// skipped and never abort the stream.
pub fn parse_detail(
    path: &Path,
    session_id: &str,
    project_path: &str,
    project_name: &str,
) -> Result<SessionDetail> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut turns: Vec<Turn> = Vec::new();
    let mut tool_frequency: HashMap<String, u64> = HashMap::new();
    let mut errors: Vec<SessionError> = Vec::new();
    let mut agents: Vec<AgentInvocation> = Vec::new();
    let mut skills: Vec<SkillInvocation> = Vec::new();
    let mut tasks: Vec<TaskItem> = Vec::new();
    let mut models: Vec<String> = Vec::new();
    let mut branch: Option<String> = None;
    let mut total_tokens = TokenUsage::default();
    let mut tokens_by_model: HashMap<String, TokenUsage> = HashMap::new();
    let mut snapshots: Vec<ContextWindowSnapshot> = Vec::new();
    let mut primary_model: Option<String> = None;

    // correlation state, keyed by toolUseId
    let mut progress_by_task: HashMap<String, AgentProgress> = HashMap::new();
    let mut agent_index: HashMap<String, usize> = HashMap::new();
    // TaskCreate toolUseId -> tasks index, until the result resolves the id
    let mut pending_tasks: HashMap<String, usize> = HashMap::new();
    // resolved taskId -> tasks index, for TaskUpdate
    let mut tasks_by_id: HashMap<String, usize> = HashMap::new();

    let mut line_buf = Vec::new();
    while let Some(line) = read_line_lossy(&mut reader, &mut line_buf)? {
        let Some(record) = parse_line(&line) else {
            continue;
        };
        let kind = record.kind().to_string();
        if kind == "file-history-snapshot" {
            continue;
        }

        if branch.is_none() {
            branch = record.git_branch.clone();
        }

        if kind == "progress" {
            accumulate_progress(
                &record,
                &mut progress_by_task,
                &mut total_tokens,
                &mut tokens_by_model,
            );
            continue;
        }

        let timestamp = record.timestamp.clone().unwrap_or_default();
        let uuid = record.uuid.clone().unwrap_or_default();
        let mut tool_calls: Vec<ToolCall> = Vec::new();

        if kind == "assistant" {
            if let Some(message) = &record.message {
                for block in message.content.as_ref().map(|c| c.blocks()).unwrap_or(&[]) {
                    let ContentBlock::ToolUse { id, name, input } = block else {
                        continue;
                    };
                    tool_calls.push(ToolCall {
                        tool_name: name.clone(),
                        tool_use_id: id.clone(),
                        input: input.clone(),
                    });
                    *tool_frequency.entry(name.clone()).or_insert(0) += 1;

                    match name.as_str() {
                        "Task" => {
                            if let Some(agent) = agent_from_task_input(input, &timestamp, id) {
                                agent_index.insert(id.clone(), agents.len());
                                agents.push(agent);
                            }
                        }
                        "Skill" => {
                            if let Some(skill) = skill_from_input(input, &timestamp, id) {
                                skills.push(skill);
                            }
                        }
                        "TaskCreate" => {
                            if let Some(task) = task_from_create_input(input, &timestamp) {
                                pending_tasks.insert(id.clone(), tasks.len());
                                tasks.push(task);
                            }
                        }
                        "TaskUpdate" => {
                            apply_task_update(input, &mut tasks, &tasks_by_id);
                        }
                        _ => {}
                    }
                }

                if let Some(model) = &message.model {
                    if !models.contains(model) {
                        models.push(model.clone());
                    }
                    if primary_model.is_none() {
                        primary_model = Some(model.clone());
                    }
                }

                if let Some(usage) = message.usage {
                    let tokens: TokenUsage = usage.into();
                    total_tokens.accumulate(&tokens);
                    if let Some(model) = &message.model {
                        tokens_by_model
                            .entry(model.clone())
                            .or_default()
                            .accumulate(&tokens);
                    }

                    push_snapshot(&mut snapshots, turns.len(), &timestamp, &tokens);

                    turns.push(Turn {
                        uuid,
                        kind: TurnKind::Assistant,
                        timestamp,
                        message: None,
                        model: message.model.clone(),
                        tool_calls,
                        tokens: Some(tokens),
                        stop_reason: message.stop_reason.clone(),
                    });
                    continue;
                }
            }
        }

        if kind == "user" {
            if let Some(message) = &record.message {
                for block in message.content.as_ref().map(|c| c.blocks()).unwrap_or(&[]) {
                    let ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                    } = block
                    else {
                        continue;
                    };

                    let text = content.as_ref().map(|c| c.to_text()).unwrap_or_default();
                    if let Some(task_id) = parse_task_created_id(&text) {
                        if let Some(index) = pending_tasks.remove(tool_use_id) {
                            tasks[index].task_id = task_id.clone();
                            tasks_by_id.insert(task_id, index);
                        }
                    }

                    if let Some(summary) =
                        record.tool_use_result.as_ref().and_then(|r| r.as_summary())
                    {
                        if let Some(&index) = agent_index.get(tool_use_id) {
                            let agent = &mut agents[index];
                            agent.total_tokens = Some(summary.total_tokens);
                            agent.total_tool_use_count = summary.total_tool_use_count;
                            agent.duration_ms = summary.total_duration_ms;
                            if agent.agent_id.is_none() {
                                agent.agent_id = summary.agent_id.clone();
                            }
                        }
                    }
                }
            }
        }

        if kind == "system" && record.level.as_deref() == Some("error") {
            errors.push(SessionError {
                timestamp: timestamp.clone(),
                message: record
                    .slug
                    .clone()
                    .or_else(|| record.subtype.clone())
                    .unwrap_or_else(|| "Unknown error".to_string()),
                kind: record.subtype.clone().unwrap_or_else(|| "system".to_string()),
            });
        }

        let turn_kind = match kind.as_str() {
            "user" => TurnKind::User,
            "assistant" => TurnKind::Assistant,
            "system" => TurnKind::System,
            _ => continue,
        };
        turns.push(Turn {
            uuid,
            kind: turn_kind,
            timestamp,
            message: extract_text_preview(record.message.as_ref()),
            model: None,
            tool_calls,
            tokens: None,
            stop_reason: None,
        });
    }

    // progress data for an agent may arrive after its Task record, so the
    // merge happens only once the whole file has been seen
    for agent in &mut agents {
        let Some(progress) = progress_by_task.get(&agent.tool_use_id) else {
            continue;
        };
        if agent.tokens.is_none() && !progress.tokens.is_empty() {
            agent.tokens = Some(progress.tokens);
        }
        if agent.tool_calls.is_none() && !progress.tool_calls.is_empty() {
            agent.tool_calls = Some(progress.tool_calls.clone());
        }
        if agent.model.is_none() {
            agent.model = progress.model.clone();
        }
        if agent.agent_id.is_none() {
            agent.agent_id = progress.agent_id.clone();
        }
    }

    for agent in &mut agents {
        if let Some(agent_id) = agent.agent_id.clone() {
            agent.skills = parse_subagent_skills(path, &agent_id);
        }
    }

    let context_window = build_context_window(snapshots, primary_model);

    Ok(SessionDetail {
        session_id: session_id.to_string(),
        project_path: project_path.to_string(),
        project_name: project_name.to_string(),
        branch,
        turns,
        total_tokens,
        tokens_by_model,
        tool_frequency,
        errors,
        models,
        agents,
        skills,
        tasks,
        context_window,
    })
}

/// Fold one progress record into the per-agent maps and the session-global
/// totals. Usage seen here counts toward the whole session as well as the
/// agent's subtotal: the top-level Task record carries no usage of its own.
fn accumulate_progress(
    record: &RawRecord,
    progress_by_task: &mut HashMap<String, AgentProgress>,
    total_tokens: &mut TokenUsage,
    tokens_by_model: &mut HashMap<String, TokenUsage>,
) {
    let Some(parent_id) = &record.parent_tool_use_id else {
        return;
    };
    let Some(data) = &record.data else {
        return;
    };

    let progress = progress_by_task.entry(parent_id.clone()).or_default();
    if progress.agent_id.is_none() {
        progress.agent_id = data.agent_id.clone();
    }

    let Some(body) = data.message.as_ref().and_then(|m| m.message.as_ref()) else {
        return;
    };

    if let Some(model) = &body.model {
        progress.model = Some(model.clone());
    }

    for block in body.content.as_ref().map(|c| c.blocks()).unwrap_or(&[]) {
        if let ContentBlock::ToolUse { name, .. } = block {
            *progress.tool_calls.entry(name.clone()).or_insert(0) += 1;
        }
    }

    if let Some(usage) = body.usage {
        let tokens: TokenUsage = usage.into();
        progress.tokens.accumulate(&tokens);
        total_tokens.accumulate(&tokens);
        if let Some(model) = &body.model {
            tokens_by_model
                .entry(model.clone())
                .or_default()
                .accumulate(&tokens);
        }
    }
}

fn agent_from_task_input(
    input: &Option<Value>,
    timestamp: &str,
    tool_use_id: &str,
) -> Option<AgentInvocation> {
    let input = input.as_ref()?;
    let subagent_type = input.get("subagent_type")?.as_str()?;
    Some(AgentInvocation {
        subagent_type: subagent_type.to_string(),
        description: input
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        timestamp: timestamp.to_string(),
        tool_use_id: tool_use_id.to_string(),
        ..AgentInvocation::default()
    })
}

fn skill_from_input(
    input: &Option<Value>,
    timestamp: &str,
    tool_use_id: &str,
) -> Option<SkillInvocation> {
    let input = input.as_ref()?;
    let skill = input.get("skill")?.as_str()?;
    // empty args carry no information; treat as absent
    let args = input
        .get("args")
        .and_then(Value::as_str)
        .filter(|a| !a.is_empty())
        .map(str::to_string);
    let source = input
        .get("source")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(SkillInvocation {
        skill: skill.to_string(),
        args,
        timestamp: timestamp.to_string(),
        tool_use_id: tool_use_id.to_string(),
        source,
    })
}

fn task_from_create_input(input: &Option<Value>, timestamp: &str) -> Option<TaskItem> {
    let input = input.as_ref()?;
    let subject = input.get("subject")?.as_str()?;
    Some(TaskItem {
        task_id: String::new(), // resolved from the tool result
        subject: subject.to_string(),
        description: input
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        active_form: input
            .get("activeForm")
            .and_then(Value::as_str)
            .map(str::to_string),
        status: TaskStatus::Pending,
        timestamp: timestamp.to_string(),
    })
}

/// Mutate a previously-resolved task from a TaskUpdate input. Updates for
/// unknown task ids are a no-op.
fn apply_task_update(
    input: &Option<Value>,
    tasks: &mut [TaskItem],
    tasks_by_id: &HashMap<String, usize>,
) {
    let Some(input) = input.as_ref() else {
        return;
    };
    let Some(task_id) = input.get("taskId").and_then(Value::as_str) else {
        return;
    };
    let Some(&index) = tasks_by_id.get(task_id) else {
        return;
    };
    let task = &mut tasks[index];

    if let Some(status) = input
        .get("status")
        .and_then(Value::as_str)
        .and_then(TaskStatus::parse)
    {
        task.status = status;
    }
    if let Some(subject) = input.get("subject").and_then(Value::as_str) {
        task.subject = subject.to_string();
    }
    if let Some(description) = input.get("description").and_then(Value::as_str) {
        task.description = Some(description.to_string());
    }
    if let Some(active_form) = input.get("activeForm").and_then(Value::as_str) {
        task.active_form = Some(active_form.to_string());
    }
}

/// Extract a task id from tool-result text of the form
/// "Task #<id> created successfully".
fn parse_task_created_id(text: &str) -> Option<String> {
    let rest = text.split("Task #").nth(1)?;
    let id: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
    if id.is_empty() || !rest[id.len()..].trim_start().starts_with("created successfully") {
        return None;
    }
    Some(id)
}

/// First 500 characters of all text blocks, joined by newline. Character
/// based, never split inside a code point.
fn extract_text_preview(message: Option<&RawMessageBody>) -> Option<String> {
    let blocks = message?.content.as_ref()?.blocks();
    let texts: Vec<&str> = blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::Text { text } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect();
    if texts.is_empty() {
        return None;
    }
    let joined = texts.join("\n");
    Some(joined.chars().take(TEXT_PREVIEW_CHARS).collect())
}

/// Append a context snapshot unless it matches the previous one's size.
fn push_snapshot(
    snapshots: &mut Vec<ContextWindowSnapshot>,
    turn_index: usize,
    timestamp: &str,
    tokens: &TokenUsage,
) {
    let context_size = tokens.context_size();
    if snapshots.last().map(|s| s.context_size) == Some(context_size) {
        return;
    }
    snapshots.push(ContextWindowSnapshot {
        turn_index,
        timestamp: timestamp.to_string(),
        context_size,
        output_tokens: tokens.output_tokens,
    });
}

/// Derive the context-window view from the deduped snapshot sequence.
/// `None` when the session produced no usage-bearing turns.
fn build_context_window(
    snapshots: Vec<ContextWindowSnapshot>,
    model_name: Option<String>,
) -> Option<ContextWindowData> {
    let first = snapshots.first()?;
    let last = snapshots.last()?;

    let system_overhead = first.context_size;
    let current_context_size = last.context_size;
    let messages_estimate = current_context_size.saturating_sub(system_overhead);
    let free_space = CONTEXT_LIMIT.saturating_sub(current_context_size);
    let autocompact_buffer = (CONTEXT_LIMIT as f64 * AUTOCOMPACT_FRACTION).round() as u64;
    let usage_percent = current_context_size as f64 / CONTEXT_LIMIT as f64 * 100.0;

    Some(ContextWindowData {
        context_limit: CONTEXT_LIMIT,
        model_name: model_name.unwrap_or_default(),
        system_overhead,
        current_context_size,
        messages_estimate,
        free_space,
        autocompact_buffer,
        usage_percent,
        snapshots,
    })
}

/// Parse an agent's own transcript for Skill invocations.
///
/// `None` when the transcript file does not exist (the agent simply has no
/// skill data); `Some(vec)` when it does, even if no skills were invoked.
fn parse_subagent_skills(session_file: &Path, agent_id: &str) -> Option<Vec<SkillInvocation>> {
    let path = subagent_transcript_path(session_file, agent_id);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(_) => {
            debug!(path = %path.display(), "no sub-agent transcript");
            return None;
        }
    };

    let mut skills = Vec::new();
    let mut reader = BufReader::new(file);
    let mut line_buf = Vec::new();
    while let Ok(Some(line)) = read_line_lossy(&mut reader, &mut line_buf) {
        let Some(record) = parse_line(&line) else {
            continue;
        };
        if record.kind() != "assistant" {
            continue;
        }
        let timestamp = record.timestamp.clone().unwrap_or_default();
        let Some(message) = &record.message else {
            continue;
        };
        for block in message.content.as_ref().map(|c| c.blocks()).unwrap_or(&[]) {
            if let ContentBlock::ToolUse { id, name, input } = block {
                if name == "Skill" {
                    if let Some(skill) = skill_from_input(input, &timestamp, id) {
                        skills.push(skill);
                    }
                }
            }
        }
    }
    Some(skills)
}

/// Read one page of raw records for the log viewer. Snapshot records are
/// excluded from both the page and the total.
pub fn read_session_messages(path: &Path, offset: usize, limit: usize) -> Result<MessagePage> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut messages: Vec<Value> = Vec::new();
    let mut total = 0usize;

    let mut line_buf = Vec::new();
    while let Some(line) = read_line_lossy(&mut reader, &mut line_buf)? {
        let Ok(value) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        if value.get("type").and_then(Value::as_str) == Some("file-history-snapshot") {
            continue;
        }
        if total >= offset && total < offset + limit {
            messages.push(value);
        }
        total += 1;
    }

    Ok(MessagePage { messages, total })
}
