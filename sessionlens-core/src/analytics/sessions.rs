//! Session list filtering and pagination
//!
//! Pure functions over a materialized list of summaries. The filter
//! pipeline is search, then status, then project, composed with AND;
//! pagination clamps out-of-range pages to the nearest valid page rather
//! than returning a silently empty one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::SessionSummary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

/// Query parameters for the session list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionQuery {
    pub page: usize,
    pub page_size: usize,
    pub search: Option<String>,
    pub status: StatusFilter,
    pub project: Option<String>,
}

/// One page of the session list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPage {
    pub sessions: Vec<SessionSummary>,
    pub total_count: usize,
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
    /// Distinct project names across the full unfiltered input, sorted.
    pub projects: Vec<String>,
}

fn matches_search(session: &SessionSummary, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    let mut fields = [
        Some(session.project_name.as_str()),
        session.branch.as_deref(),
        Some(session.session_id.as_str()),
        session.cwd.as_deref(),
    ]
    .into_iter()
    .flatten();
    fields.any(|f| f.to_lowercase().contains(&needle))
}

/// Filter, then page. The `projects` facet always reflects the full input
/// so filter dropdowns never shrink to match their own selection.
pub fn paginate_and_filter_sessions(
    all_sessions: Vec<SessionSummary>,
    query: &SessionQuery,
) -> SessionPage {
    let projects: Vec<String> = all_sessions
        .iter()
        .map(|s| s.project_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut filtered: Vec<SessionSummary> = all_sessions;
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        filtered.retain(|s| matches_search(s, search));
    }
    match query.status {
        StatusFilter::All => {}
        StatusFilter::Active => filtered.retain(|s| s.is_active),
        StatusFilter::Completed => filtered.retain(|s| !s.is_active),
    }
    if let Some(project) = query.project.as_deref().filter(|p| !p.is_empty()) {
        filtered.retain(|s| s.project_name == project);
    }

    let page_size = query.page_size.max(1);
    let total_count = filtered.len();
    let total_pages = ((total_count + page_size - 1) / page_size).max(1);
    let page = query.page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let sessions: Vec<SessionSummary> = filtered
        .into_iter()
        .skip(start)
        .take(page_size)
        .collect();

    SessionPage {
        sessions,
        total_count,
        total_pages,
        page,
        page_size,
        projects,
    }
}
