//! Prompt history parser
//!
//! `history.jsonl` records every prompt submitted, one JSON object per
//! line. Entries missing any of the required fields are treated as noise.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::Result;
use crate::parsers::raw::read_line_lossy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// The prompt text as displayed
    pub display: String,
    /// Unix epoch milliseconds
    pub timestamp: i64,
    #[serde(default)]
    pub project: String,
    pub session_id: String,
}

/// Parse history entries, most recent first. A missing history file yields
/// an empty list; malformed or incomplete lines are skipped.
pub fn parse_history(path: &Path, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries: Vec<HistoryEntry> = Vec::new();
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    while let Some(line) = read_line_lossy(&mut reader, &mut buf)? {
        let Ok(entry) = serde_json::from_str::<HistoryEntry>(&line) else {
            continue;
        };
        if entry.display.is_empty() || entry.timestamp == 0 || entry.session_id.is_empty() {
            continue;
        }
        entries.push(entry);
    }

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn entry(display: &str, timestamp: i64) -> String {
        format!(
            r#"{{"display":"{display}","timestamp":{timestamp},"project":"/p","sessionId":"s1"}}"#
        )
    }

    #[test]
    fn test_missing_file_is_empty() {
        let entries = parse_history(Path::new("/nope/history.jsonl"), None).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_sorted_most_recent_first() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", entry("first", 1000)).unwrap();
        writeln!(file, "{}", entry("third", 3000)).unwrap();
        writeln!(file, "{}", entry("second", 2000)).unwrap();

        let entries = parse_history(file.path(), None).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].display, "third");
        assert_eq!(entries[2].display, "first");
    }

    #[test]
    fn test_limit() {
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..10 {
            writeln!(file, "{}", entry(&format!("p{i}"), i * 100 + 100)).unwrap();
        }
        let entries = parse_history(file.path(), Some(3)).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].timestamp, 1000);
    }

    #[test]
    fn test_skips_malformed_and_incomplete() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        file.write_all(b"{\"display\":\"caf\xc3\n").unwrap();
        writeln!(file, r#"{{"display":"","timestamp":5,"sessionId":"s"}}"#).unwrap();
        writeln!(file, r#"{{"display":"x","timestamp":0,"sessionId":"s"}}"#).unwrap();
        writeln!(file, "{}", entry("ok", 42)).unwrap();

        let entries = parse_history(file.path(), None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display, "ok");
    }
}
