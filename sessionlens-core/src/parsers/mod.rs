//! Transcript and artifact parsers
//!
//! - [`raw`]: typed serde shapes for the JSONL session format
//! - [`summary`]: bounded head/tail index parse
//! - [`detail`]: full streaming session parse
//! - [`stats`]: precomputed stats blob reader
//! - [`history`]: prompt history log

pub mod detail;
pub mod history;
pub mod raw;
pub mod stats;
pub mod summary;

pub use detail::{parse_detail, read_session_messages};
pub use history::{parse_history, HistoryEntry};
pub use stats::{StatsCache, StatsReader};
pub use summary::parse_summary;
