//! Dashboard service facade
//!
//! Owns the scanner, stats reader, and disk cache, and exposes the
//! operations the dashboard frontend consumes. One instance per process;
//! all caching state lives inside the injected components so tests can
//! build isolated services over temp directories.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::analytics::{
    aggregate_project_analytics, paginate_and_filter_sessions, ProjectAnalytics, SessionPage,
    SessionQuery,
};
use crate::cache::{file_mtime_ms, DiskCache};
use crate::config::Config;
use crate::cost::{calculate_session_cost, merged_pricing, CostBreakdown};
use crate::error::{Error, Result};
use crate::parsers::{
    parse_detail, parse_history, read_session_messages, HistoryEntry, StatsCache, StatsReader,
};
use crate::paths::{project_name_from_path, session_id_from_filename};
use crate::scanner::SessionScanner;
use crate::settings::{load_settings, save_settings, Settings};
use crate::types::{MessagePage, SessionDetail, SessionSummary};

pub struct DashboardService {
    config: Config,
    scanner: SessionScanner,
    detail_cache: DiskCache,
    stats: StatsReader,
}

impl DashboardService {
    pub fn new(config: Config) -> Self {
        let scanner = SessionScanner::new(
            config.projects_dir(),
            Duration::from_secs(config.scanner.active_threshold_secs),
        );
        let detail_cache = DiskCache::new(config.cache_dir());
        let stats = StatsReader::new(config.stats_path());
        info!(projects_dir = %config.projects_dir().display(), "dashboard service ready");
        Self {
            config,
            scanner,
            detail_cache,
            stats,
        }
    }

    /// Filtered, paginated session list.
    pub fn session_list(&self, query: &SessionQuery) -> Result<SessionPage> {
        let all = self.scanner.scan_all()?;
        Ok(paginate_and_filter_sessions(all, query))
    }

    pub fn active_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.scanner.active_sessions()
    }

    /// Full detail parse for one session. `project_path` is a hint; the
    /// session is found across projects if the hint is stale.
    pub fn session_detail(&self, session_id: &str, project_path: &str) -> Result<SessionDetail> {
        let path = self
            .scanner
            .find_session_file(session_id, project_path)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let project_name = project_name_from_path(project_path);
        parse_detail(&path, session_id, project_path, &project_name)
    }

    /// Like [`Self::session_detail`], but served from the disk cache when
    /// the transcript has not changed since the cached parse.
    pub fn session_detail_cached(
        &self,
        session_id: &str,
        project_path: &str,
    ) -> Result<SessionDetail> {
        let path = self
            .scanner
            .find_session_file(session_id, project_path)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let key = format!("detail-{session_id}");

        let mtime_ms = file_mtime_ms(&path).unwrap_or(0);
        if let Some(detail) = self.detail_cache.read::<SessionDetail>(&key, mtime_ms) {
            return Ok(detail);
        }

        let project_name = project_name_from_path(project_path);
        let detail = parse_detail(&path, session_id, project_path, &project_name)?;
        self.detail_cache.write(&key, &path, mtime_ms, &detail);
        Ok(detail)
    }

    /// One page of raw transcript records for the log viewer.
    pub fn session_messages(
        &self,
        session_id: &str,
        project_path: &str,
        offset: usize,
        limit: usize,
    ) -> Result<MessagePage> {
        let path = self
            .scanner
            .find_session_file(session_id, project_path)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        read_session_messages(&path, offset, limit)
    }

    /// Cost estimate for one session, using the current settings.
    pub fn session_cost(&self, session_id: &str, project_path: &str) -> Result<CostBreakdown> {
        let detail = self.session_detail_cached(session_id, project_path)?;
        let pricing = merged_pricing(&self.settings());
        Ok(calculate_session_cost(&detail.tokens_by_model, &pricing))
    }

    /// The assistant-maintained stats blob, if computed.
    pub fn stats(&self) -> Result<Option<Arc<StatsCache>>> {
        self.stats.read()
    }

    pub fn history(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        parse_history(&self.config.history_path(), limit)
    }

    pub fn project_analytics(&self) -> Result<Vec<ProjectAnalytics>> {
        let all = self.scanner.scan_all()?;
        Ok(aggregate_project_analytics(&all))
    }

    pub fn settings(&self) -> Settings {
        load_settings(&self.config.settings_path())
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<Settings> {
        save_settings(&self.config.settings_path(), settings)
    }

    /// Resolve the transcript path for a session, mainly for tooling.
    pub fn session_file(&self, session_id: &str, project_path: &str) -> Result<std::path::PathBuf> {
        self.scanner
            .find_session_file(session_id, project_path)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// Convenience accessor used by tests and the summary endpoint.
    pub fn session_summary_for(
        &self,
        session_id: &str,
        project_path: &str,
    ) -> Result<Option<SessionSummary>> {
        let path = self
            .scanner
            .find_session_file(session_id, project_path)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let session_id = session_id_from_filename(file_name).to_string();
        let project_name = project_name_from_path(project_path);
        crate::parsers::parse_summary(&path, &session_id, project_path, &project_name, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::StatusFilter;
    use std::path::Path;
    use tempfile::TempDir;

    fn service_over(root: &TempDir) -> DashboardService {
        let claude_dir = root.path().join("claude");
        let dashboard_dir = root.path().join("dash");
        std::fs::create_dir_all(claude_dir.join("projects")).unwrap();
        let config: Config = toml::from_str(&format!(
            "[data]\nclaude_dir = \"{}\"\ndashboard_dir = \"{}\"\n",
            claude_dir.display(),
            dashboard_dir.display()
        ))
        .unwrap();
        DashboardService::new(config)
    }

    fn write_session(service_root: &TempDir, project: &str, session_id: &str, lines: &[&str]) {
        let dir = service_root
            .path()
            .join("claude")
            .join("projects")
            .join(project);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{session_id}.jsonl")), lines.join("\n")).unwrap();
    }

    const ASSISTANT_LINE: &str = r#"{"type":"assistant","uuid":"u1","timestamp":"2026-01-01T10:00:05Z","message":{"model":"claude-sonnet-4","content":[{"type":"text","text":"done"}],"usage":{"input_tokens":1000000,"output_tokens":0}}}"#;
    const USER_LINE: &str = r#"{"type":"user","uuid":"u0","timestamp":"2026-01-01T10:00:00Z","message":{"content":[{"type":"text","text":"go"}]}}"#;

    #[test]
    fn test_session_list_end_to_end() {
        let root = TempDir::new().unwrap();
        let service = service_over(&root);
        write_session(&root, "-work-app", "s1", &[USER_LINE, ASSISTANT_LINE]);

        let page = service
            .session_list(&SessionQuery {
                page: 1,
                page_size: 10,
                status: StatusFilter::All,
                ..SessionQuery::default()
            })
            .unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.sessions[0].session_id, "s1");
        assert_eq!(page.sessions[0].project_name, "app");
        assert_eq!(page.projects, vec!["app"]);
    }

    #[test]
    fn test_session_detail_not_found() {
        let root = TempDir::new().unwrap();
        let service = service_over(&root);
        let err = service.session_detail("ghost", "/work/app").unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(ref id) if id == "ghost"));
    }

    #[test]
    fn test_session_detail_and_cost() {
        let root = TempDir::new().unwrap();
        let service = service_over(&root);
        write_session(&root, "-work-app", "s1", &[USER_LINE, ASSISTANT_LINE]);

        let detail = service.session_detail("s1", "/work/app").unwrap();
        assert_eq!(detail.total_tokens.input_tokens, 1_000_000);
        assert_eq!(detail.turns.len(), 2);

        // 1M input tokens at the claude-sonnet-4 rate
        let cost = service.session_cost("s1", "/work/app").unwrap();
        assert!((cost.total_usd - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_session_detail_cached_round_trip() {
        let root = TempDir::new().unwrap();
        let service = service_over(&root);
        write_session(&root, "-work-app", "s1", &[USER_LINE, ASSISTANT_LINE]);

        let fresh = service.session_detail_cached("s1", "/work/app").unwrap();
        let cached = service.session_detail_cached("s1", "/work/app").unwrap();
        assert_eq!(fresh, cached);

        // the cache entry landed under the dashboard cache dir
        let cache_dir = root.path().join("dash").join("cache");
        assert!(cache_dir.join("detail-s1.cache.json").is_file());
    }

    #[test]
    fn test_session_messages_pagination() {
        let root = TempDir::new().unwrap();
        let service = service_over(&root);
        write_session(&root, "-work-app", "s1", &[USER_LINE, ASSISTANT_LINE]);

        let page = service.session_messages("s1", "/work/app", 0, 1).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.messages.len(), 1);
    }

    #[test]
    fn test_settings_round_trip() {
        let root = TempDir::new().unwrap();
        let service = service_over(&root);

        let defaults = service.settings();
        assert!(defaults.updated_at.is_none());

        let saved = service.save_settings(&defaults).unwrap();
        assert!(saved.updated_at.is_some());
        assert_eq!(service.settings(), saved);
    }

    #[test]
    fn test_history_missing_file() {
        let root = TempDir::new().unwrap();
        let service = service_over(&root);
        assert!(service.history(None).unwrap().is_empty());
    }

    #[test]
    fn test_stats_missing_file() {
        let root = TempDir::new().unwrap();
        let service = service_over(&root);
        assert!(service.stats().unwrap().is_none());
    }

    #[test]
    fn test_project_analytics() {
        let root = TempDir::new().unwrap();
        let service = service_over(&root);
        write_session(&root, "-work-app", "s1", &[USER_LINE, ASSISTANT_LINE]);
        write_session(&root, "-work-app", "s2", &[USER_LINE]);

        let projects = service.project_analytics().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].project_path, "/work/app");
        assert_eq!(projects[0].total_sessions, 2);
    }

    #[test]
    fn test_session_file_resolution() {
        let root = TempDir::new().unwrap();
        let service = service_over(&root);
        write_session(&root, "-work-app", "s1", &[USER_LINE]);

        let path = service.session_file("s1", "/work/app").unwrap();
        assert!(path.ends_with(Path::new("-work-app/s1.jsonl")));
    }
}
