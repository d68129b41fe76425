//! Project and session discovery
//!
//! Walks the projects root, finds session transcripts, and builds their
//! summaries with an mtime-keyed in-memory cache. Liveness is detected
//! from the transcript's mtime combined with a lock-marker directory the
//! assistant creates for the lifetime of a running session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::cache::file_mtime_ms;
use crate::error::Result;
use crate::parsers::parse_summary;
use crate::paths::{decode_project_dir_name, project_name_from_path, session_id_from_filename};
use crate::types::SessionSummary;

/// One discovered project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub dir_name: String,
    pub decoded_path: String,
    pub project_name: String,
    pub session_files: Vec<String>,
}

/// List project directories under the projects root. Directories without
/// any `.jsonl` file are skipped; unreadable entries are tolerated.
pub fn scan_projects(projects_dir: &Path) -> Vec<ProjectInfo> {
    let entries = match std::fs::read_dir(projects_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %projects_dir.display(), error = %e, "projects dir not readable");
            return Vec::new();
        }
    };

    let mut projects = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(dir_name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };

        let mut session_files: Vec<String> = match std::fs::read_dir(&path) {
            Ok(files) => files
                .flatten()
                .filter_map(|f| f.file_name().to_str().map(str::to_string))
                .filter(|name| name.ends_with(".jsonl"))
                .collect(),
            Err(e) => {
                warn!(dir = %path.display(), error = %e, "skipping unreadable project dir");
                continue;
            }
        };
        if session_files.is_empty() {
            continue;
        }
        session_files.sort();

        let decoded_path = decode_project_dir_name(&dir_name);
        projects.push(ProjectInfo {
            project_name: project_name_from_path(&decoded_path),
            dir_name,
            decoded_path,
            session_files,
        });
    }

    projects.sort_by(|a, b| a.dir_name.cmp(&b.dir_name));
    projects
}

/// A session counts as active when its transcript was written within the
/// threshold AND its lock-marker directory still exists.
pub fn is_session_active(
    projects_dir: &Path,
    project_dir_name: &str,
    session_id: &str,
    threshold: Duration,
) -> bool {
    let project_dir = projects_dir.join(project_dir_name);
    let transcript = project_dir.join(format!("{session_id}.jsonl"));

    let Ok(metadata) = std::fs::metadata(&transcript) else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    if age > threshold {
        return false;
    }

    project_dir.join(session_id).is_dir()
}

/// Scans sessions and caches their summaries by transcript mtime.
pub struct SessionScanner {
    projects_dir: PathBuf,
    active_threshold: Duration,
    summary_cache: Mutex<HashMap<String, (i64, SessionSummary)>>,
}

impl SessionScanner {
    pub fn new(projects_dir: impl Into<PathBuf>, active_threshold: Duration) -> Self {
        Self {
            projects_dir: projects_dir.into(),
            active_threshold,
            summary_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// Summarize every discoverable session, most recently active first.
    ///
    /// A summary is recomputed only when its transcript's mtime changed;
    /// `is_active` is refreshed on every call, cached or not.
    pub fn scan_all(&self) -> Result<Vec<SessionSummary>> {
        let projects = scan_projects(&self.projects_dir);
        let mut summaries = Vec::new();

        for project in &projects {
            for file in &project.session_files {
                let session_id = session_id_from_filename(file);
                let path = self.projects_dir.join(&project.dir_name).join(file);
                let Some(mtime_ms) = file_mtime_ms(&path) else {
                    continue;
                };

                if let Some(mut summary) = self.cached_summary(session_id, mtime_ms) {
                    summary.is_active = self.check_active(&project.dir_name, session_id);
                    summaries.push(summary);
                    continue;
                }

                let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                let parsed = match parse_summary(
                    &path,
                    session_id,
                    &project.decoded_path,
                    &project.project_name,
                    size,
                ) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "summary parse failed");
                        continue;
                    }
                };
                let Some(mut summary) = parsed else {
                    continue;
                };

                summary.is_active = self.check_active(&project.dir_name, session_id);
                if let Ok(mut cache) = self.summary_cache.lock() {
                    cache.insert(session_id.to_string(), (mtime_ms, summary.clone()));
                }
                summaries.push(summary);
            }
        }

        summaries.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
        Ok(summaries)
    }

    /// Only the currently-active sessions.
    pub fn active_sessions(&self) -> Result<Vec<SessionSummary>> {
        Ok(self.scan_all()?.into_iter().filter(|s| s.is_active).collect())
    }

    /// Locate a session's transcript. Tries project directories matching
    /// `project_path` (decoded or raw dir name) first, then falls back to
    /// searching every project: sessions can outlive a project rename.
    pub fn find_session_file(&self, session_id: &str, project_path: &str) -> Option<PathBuf> {
        let projects = scan_projects(&self.projects_dir);
        let filename = format!("{session_id}.jsonl");

        for project in &projects {
            if project.decoded_path == project_path || project.dir_name == project_path {
                let path = self.projects_dir.join(&project.dir_name).join(&filename);
                if path.is_file() {
                    return Some(path);
                }
            }
        }

        for project in &projects {
            let path = self.projects_dir.join(&project.dir_name).join(&filename);
            if path.is_file() {
                return Some(path);
            }
        }
        None
    }

    fn cached_summary(&self, session_id: &str, mtime_ms: i64) -> Option<SessionSummary> {
        let cache = self.summary_cache.lock().ok()?;
        let (cached_mtime, summary) = cache.get(session_id)?;
        (*cached_mtime == mtime_ms).then(|| summary.clone())
    }

    fn check_active(&self, project_dir_name: &str, session_id: &str) -> bool {
        is_session_active(
            &self.projects_dir,
            project_dir_name,
            session_id,
            self.active_threshold,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const THRESHOLD: Duration = Duration::from_secs(120);

    fn write_session(root: &Path, project: &str, session_id: &str, lines: &[&str]) -> PathBuf {
        let dir = root.join(project);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{session_id}.jsonl"));
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    fn user_line(ts: &str) -> String {
        format!(r#"{{"type":"user","timestamp":"{ts}"}}"#)
    }

    #[test]
    fn test_scan_projects_skips_empty_dirs() {
        let root = TempDir::new().unwrap();
        write_session(root.path(), "-work-app", "s1", &[&user_line("2026-01-01T10:00:00Z")]);
        std::fs::create_dir_all(root.path().join("-work-empty")).unwrap();
        std::fs::write(root.path().join("stray-file"), "x").unwrap();

        let projects = scan_projects(root.path());
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].dir_name, "-work-app");
        assert_eq!(projects[0].decoded_path, "/work/app");
        assert_eq!(projects[0].project_name, "app");
        assert_eq!(projects[0].session_files, vec!["s1.jsonl"]);
    }

    #[test]
    fn test_scan_projects_missing_root() {
        assert!(scan_projects(Path::new("/nope/projects")).is_empty());
    }

    #[test]
    fn test_scan_all_sorted_by_last_active() {
        let root = TempDir::new().unwrap();
        write_session(root.path(), "-work-a", "old", &[&user_line("2026-01-01T10:00:00Z")]);
        write_session(root.path(), "-work-b", "new", &[&user_line("2026-02-01T10:00:00Z")]);

        let scanner = SessionScanner::new(root.path(), THRESHOLD);
        let summaries = scanner.scan_all().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].session_id, "new");
        assert_eq!(summaries[1].session_id, "old");
    }

    #[test]
    fn test_unparseable_session_is_skipped() {
        let root = TempDir::new().unwrap();
        write_session(root.path(), "-work-a", "bad", &["{no timestamps here}"]);
        write_session(root.path(), "-work-a", "good", &[&user_line("2026-01-01T10:00:00Z")]);

        let scanner = SessionScanner::new(root.path(), THRESHOLD);
        let summaries = scanner.scan_all().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].session_id, "good");
    }

    #[test]
    fn test_summary_cache_hit_on_unchanged_mtime() {
        let root = TempDir::new().unwrap();
        write_session(root.path(), "-work-a", "s1", &[&user_line("2026-01-01T10:00:00Z")]);

        let scanner = SessionScanner::new(root.path(), THRESHOLD);
        let first = scanner.scan_all().unwrap();
        let second = scanner.scan_all().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            scanner.summary_cache.lock().unwrap().len(),
            1
        );
    }

    #[test]
    fn test_summary_recomputed_when_transcript_changes() {
        let root = TempDir::new().unwrap();
        let path = write_session(
            root.path(),
            "-work-a",
            "s1",
            &[&user_line("2026-01-01T10:00:00Z")],
        );

        let scanner = SessionScanner::new(root.path(), THRESHOLD);
        let first = scanner.scan_all().unwrap();
        assert_eq!(first[0].message_count, 1);

        let contents = format!(
            "{}\n{}",
            user_line("2026-01-01T10:00:00Z"),
            user_line("2026-01-01T11:00:00Z")
        );
        std::fs::write(&path, contents).unwrap();
        // backdate the cached mtime: both writes can land in the same
        // millisecond, which would make the rescan a false cache hit
        scanner
            .summary_cache
            .lock()
            .unwrap()
            .get_mut("s1")
            .unwrap()
            .0 = 0;

        let second = scanner.scan_all().unwrap();
        assert_eq!(second[0].message_count, 2);
        assert_eq!(second[0].last_active_at, "2026-01-01T11:00:00Z");
    }

    #[test]
    fn test_active_requires_lock_marker() {
        let root = TempDir::new().unwrap();
        // freshly written, but no lock-marker dir
        write_session(root.path(), "-work-a", "s1", &[&user_line("2026-01-01T10:00:00Z")]);
        assert!(!is_session_active(root.path(), "-work-a", "s1", THRESHOLD));

        std::fs::create_dir_all(root.path().join("-work-a").join("s1")).unwrap();
        assert!(is_session_active(root.path(), "-work-a", "s1", THRESHOLD));
    }

    #[test]
    fn test_active_missing_transcript() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("-work-a")).unwrap();
        assert!(!is_session_active(root.path(), "-work-a", "ghost", THRESHOLD));
    }

    #[test]
    fn test_find_session_file_by_project_then_fallback() {
        let root = TempDir::new().unwrap();
        let expected =
            write_session(root.path(), "-work-a", "s1", &[&user_line("2026-01-01T10:00:00Z")]);
        write_session(root.path(), "-work-b", "s2", &[&user_line("2026-01-01T10:00:00Z")]);

        let scanner = SessionScanner::new(root.path(), THRESHOLD);
        // decoded path match
        assert_eq!(
            scanner.find_session_file("s1", "/work/a"),
            Some(expected.clone())
        );
        // raw dir-name match
        assert_eq!(
            scanner.find_session_file("s1", "-work-a"),
            Some(expected.clone())
        );
        // wrong project hint still resolves via fallback
        assert_eq!(
            scanner.find_session_file("s1", "/somewhere/else"),
            Some(expected)
        );
        assert_eq!(scanner.find_session_file("missing", "/work/a"), None);
    }
}
