//! Derived views over parsed session data: list pagination/filtering,
//! heatmap intensity binning, and per-project rollups.

pub mod heatmap;
pub mod project;
pub mod sessions;

pub use heatmap::{compute_percentiles, daily_intensities, intensity_level, Percentiles};
pub use project::{aggregate_project_analytics, ProjectAnalytics};
pub use sessions::{paginate_and_filter_sessions, SessionPage, SessionQuery, StatusFilter};
