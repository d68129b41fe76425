//! Path conventions for the on-disk session layout.
//!
//! Session transcripts live under a projects root where each project is a
//! directory whose name is the project's absolute path with every `/`
//! replaced by `-` (so `-Users-dev-myproject` means `/Users/dev/myproject`).
//! Each project directory holds one `<sessionId>.jsonl` file per session,
//! an optional lock-marker directory named after the session id, and an
//! optional per-session `subagents/` tree with one transcript per
//! dispatched agent.

use std::path::{Path, PathBuf};

/// Decode a project directory name back into a filesystem path.
///
/// `-Users-dev-myproject` becomes `/Users/dev/myproject`. The encoding is
/// lossy for paths that contain literal dashes; callers treat the decoded
/// value as a display/join key, not a guaranteed-resolvable path.
pub fn decode_project_dir_name(dir_name: &str) -> String {
    dir_name.replace('-', "/")
}

/// Encode a project path into the directory-name form.
pub fn encode_project_path(path: &str) -> String {
    path.replace('/', "-")
}

/// Extract a short project name from a decoded path.
///
/// `/Users/dev/myproject` -> `myproject`.
pub fn project_name_from_path(decoded_path: &str) -> String {
    Path::new(decoded_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(decoded_path)
        .to_string()
}

/// Extract a session id from a transcript filename.
///
/// `abc-123.jsonl` -> `abc-123`.
pub fn session_id_from_filename(filename: &str) -> &str {
    filename.strip_suffix(".jsonl").unwrap_or(filename)
}

/// Path of the sub-agent transcript for `agent_id`, addressed by convention
/// from the session's own transcript path:
/// `<dir>/<session-stem>/subagents/agent-<agentId>.jsonl`.
pub fn subagent_transcript_path(session_file: &Path, agent_id: &str) -> PathBuf {
    let dir = session_file.parent().unwrap_or_else(|| Path::new(""));
    let stem = session_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    dir.join(stem)
        .join("subagents")
        .join(format!("agent-{agent_id}.jsonl"))
}
