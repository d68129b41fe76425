//! Bounded head/tail summary parse
//!
//! Builds a lightweight index record for a session file by sampling only
//! its first and last lines, keeping memory flat even for very large
//! transcripts. The tail read is a byte-window approximation: the last
//! 64 KiB are read and split on newlines, which is not line-accurate for
//! lines longer than the window. The window never reaches back before the
//! end of the head sample, so short files are not double-counted.

use chrono::DateTime;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;
use crate::parsers::raw::parse_line;
use crate::types::SessionSummary;

const HEAD_LINES: usize = 15;
const TAIL_LINES: usize = 15;
const TAIL_WINDOW_BYTES: u64 = 64 * 1024;

/// Parse a session summary from a bounded sample of the file.
///
/// Returns `Ok(None)` when no sampled record carries a timestamp; such a
/// file cannot be indexed but is not an error.
pub fn parse_summary(
    path: &Path,
    session_id: &str,
    project_path: &str,
    project_name: &str,
    file_size_bytes: u64,
) -> Result<Option<SessionSummary>> {
    let (head, head_end) = read_head_lines(path, HEAD_LINES)?;
    let tail = read_tail_lines(path, TAIL_LINES, head_end)?;

    let mut started_at: Option<String> = None;
    let mut last_active_at: Option<String> = None;
    let mut branch: Option<String> = None;
    let mut cwd: Option<String> = None;
    let mut model: Option<String> = None;
    let mut version: Option<String> = None;
    let mut user_message_count = 0u32;
    let mut assistant_message_count = 0u32;
    let mut message_count = 0u32;

    for line in head.iter().chain(tail.iter()) {
        let Some(record) = parse_line(line) else {
            continue;
        };
        let kind = record.kind().to_string();
        if kind == "file-history-snapshot" {
            continue;
        }

        if let Some(ts) = &record.timestamp {
            match &started_at {
                Some(min) if ts >= min => {}
                _ => started_at = Some(ts.clone()),
            }
            match &last_active_at {
                Some(max) if ts <= max => {}
                _ => last_active_at = Some(ts.clone()),
            }
        }

        if branch.is_none() {
            branch = record.git_branch.clone();
        }
        if cwd.is_none() {
            cwd = record.cwd.clone();
        }
        if version.is_none() {
            version = record.version.clone();
        }

        match kind.as_str() {
            "user" => user_message_count += 1,
            "assistant" => {
                assistant_message_count += 1;
                if model.is_none() {
                    model = record.message.as_ref().and_then(|m| m.model.clone());
                }
            }
            _ => {}
        }
        if matches!(kind.as_str(), "user" | "assistant" | "system") {
            message_count += 1;
        }
    }

    let Some(started_at) = started_at else {
        return Ok(None);
    };
    let last_active_at = last_active_at.unwrap_or_else(|| started_at.clone());
    let duration_ms = timestamp_delta_ms(&started_at, &last_active_at);

    Ok(Some(SessionSummary {
        session_id: session_id.to_string(),
        project_path: project_path.to_string(),
        project_name: project_name.to_string(),
        branch,
        cwd,
        started_at,
        last_active_at,
        duration_ms,
        message_count,
        user_message_count,
        assistant_message_count,
        is_active: false, // set by the scanner
        model,
        version,
        file_size_bytes,
    }))
}

fn timestamp_delta_ms(start: &str, end: &str) -> i64 {
    match (
        DateTime::parse_from_rfc3339(start),
        DateTime::parse_from_rfc3339(end),
    ) {
        (Ok(start), Ok(end)) => end.timestamp_millis() - start.timestamp_millis(),
        _ => 0,
    }
}

/// Read up to `count` lines from the start of the file. Returns the lines
/// and the byte offset where reading stopped, so the tail read can avoid
/// re-sampling them. Decoding is lossy: a line cut mid-code-point by a
/// concurrent append fails JSON parse downstream instead of aborting.
fn read_head_lines(path: &Path, count: usize) -> Result<(Vec<String>, u64)> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut lines = Vec::with_capacity(count);
    let mut consumed = 0u64;
    let mut buf = Vec::new();

    while lines.len() < count {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        consumed += n as u64;
        let decoded = String::from_utf8_lossy(&buf);
        let line = decoded.trim_end_matches(['\n', '\r']);
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    Ok((lines, consumed))
}

/// Read the last `count` non-empty lines from a bounded window at the end
/// of the file. The window starts no earlier than `skip_before`, which the
/// caller sets to the end of the head sample.
fn read_tail_lines(path: &Path, count: usize, skip_before: u64) -> Result<Vec<String>> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();

    let window_start = size.saturating_sub(TAIL_WINDOW_BYTES).max(skip_before);
    if window_start >= size {
        return Ok(Vec::new());
    }

    file.seek(SeekFrom::Start(window_start))?;
    let mut bytes = Vec::with_capacity((size - window_start) as usize);
    file.read_to_end(&mut bytes)?;
    let text = String::from_utf8_lossy(&bytes);

    let mut lines: Vec<String> = text
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect();

    // when the window starts mid-file its first line is usually partial;
    // it simply fails JSON parse downstream

    if lines.len() > count {
        lines.drain(..lines.len() - count);
    }
    Ok(lines)
}
