//! Per-project aggregation over session summaries.

use serde::Serialize;
use std::collections::HashMap;

use crate::types::SessionSummary;

/// Rollup of every session belonging to one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalytics {
    pub project_path: String,
    pub project_name: String,
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub total_messages: u64,
    pub total_duration_ms: i64,
    pub first_session_at: String,
    pub last_session_at: String,
}

/// Group sessions by project path and aggregate, most recently active
/// project first.
pub fn aggregate_project_analytics(all_sessions: &[SessionSummary]) -> Vec<ProjectAnalytics> {
    let mut by_project: HashMap<&str, Vec<&SessionSummary>> = HashMap::new();
    for session in all_sessions {
        by_project
            .entry(session.project_path.as_str())
            .or_default()
            .push(session);
    }

    let mut projects: Vec<ProjectAnalytics> = by_project
        .into_iter()
        .map(|(project_path, sessions)| {
            let first_session_at = sessions
                .iter()
                .map(|s| s.started_at.as_str())
                .min()
                .unwrap_or_default()
                .to_string();
            let last_session_at = sessions
                .iter()
                .map(|s| s.last_active_at.as_str())
                .max()
                .unwrap_or_default()
                .to_string();
            ProjectAnalytics {
                project_path: project_path.to_string(),
                project_name: sessions[0].project_name.clone(),
                total_sessions: sessions.len(),
                active_sessions: sessions.iter().filter(|s| s.is_active).count(),
                total_messages: sessions.iter().map(|s| s.message_count as u64).sum(),
                total_duration_ms: sessions.iter().map(|s| s.duration_ms).sum(),
                first_session_at,
                last_session_at,
            }
        })
        .collect();

    projects.sort_by(|a, b| b.last_session_at.cmp(&a.last_session_at));
    projects
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(
        id: &str,
        project: &str,
        started: &str,
        last: &str,
        active: bool,
        messages: u32,
    ) -> SessionSummary {
        SessionSummary {
            session_id: id.to_string(),
            project_path: format!("/work/{project}"),
            project_name: project.to_string(),
            branch: None,
            cwd: None,
            started_at: started.to_string(),
            last_active_at: last.to_string(),
            duration_ms: 1000,
            message_count: messages,
            user_message_count: 0,
            assistant_message_count: 0,
            is_active: active,
            model: None,
            version: None,
            file_size_bytes: 0,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_project_analytics(&[]).is_empty());
    }

    #[test]
    fn test_aggregation_and_sort() {
        let sessions = vec![
            session("s1", "alpha", "2026-01-01T09:00:00Z", "2026-01-01T10:00:00Z", false, 10),
            session("s2", "alpha", "2026-01-02T09:00:00Z", "2026-01-02T10:00:00Z", true, 20),
            session("s3", "beta", "2026-03-01T09:00:00Z", "2026-03-01T10:00:00Z", false, 5),
        ];

        let projects = aggregate_project_analytics(&sessions);
        assert_eq!(projects.len(), 2);

        // beta was active most recently, so it sorts first
        assert_eq!(projects[0].project_name, "beta");
        assert_eq!(projects[0].total_sessions, 1);

        let alpha = &projects[1];
        assert_eq!(alpha.project_path, "/work/alpha");
        assert_eq!(alpha.total_sessions, 2);
        assert_eq!(alpha.active_sessions, 1);
        assert_eq!(alpha.total_messages, 30);
        assert_eq!(alpha.total_duration_ms, 2000);
        assert_eq!(alpha.first_session_at, "2026-01-01T09:00:00Z");
        assert_eq!(alpha.last_session_at, "2026-01-02T10:00:00Z");
    }
}
