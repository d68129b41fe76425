//! Precomputed stats blob reader
//!
//! The assistant maintains an aggregate stats file (`stats-cache.json`)
//! alongside its transcripts. This module deserializes it into a typed
//! model and memoizes the result keyed by file mtime, so repeated
//! dashboard renders between stats recomputes cost one stat call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::cache::file_mtime_ms;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: String,
    pub message_count: u64,
    pub session_count: u64,
    pub tool_call_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyModelTokens {
    pub date: String,
    pub tokens_by_model: HashMap<String, u64>,
}

impl DailyModelTokens {
    pub fn total(&self) -> u64 {
        self.tokens_by_model.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cache_creation_input_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search_requests: Option<u64>,
    #[serde(
        default,
        rename = "costUSD",
        skip_serializing_if = "Option::is_none"
    )]
    pub cost_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongestSession {
    pub session_id: String,
    pub duration: u64,
    pub message_count: u64,
    pub timestamp: String,
}

/// Typed model of `stats-cache.json`. Deserialization doubles as schema
/// validation; a blob that fails it is reported as corrupt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsCache {
    pub version: u64,
    pub last_computed_date: String,
    pub daily_activity: Vec<DailyActivity>,
    pub daily_model_tokens: Vec<DailyModelTokens>,
    pub model_usage: HashMap<String, ModelUsageTotals>,
    pub total_sessions: u64,
    pub total_messages: u64,
    pub longest_session: LongestSession,
    pub first_session_date: String,
    /// Hour of day ("0".."23") to message count
    pub hour_counts: HashMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_speculation_time_saved_ms: Option<u64>,
}

/// Reads the stats blob with an mtime-keyed in-memory memo.
pub struct StatsReader {
    path: PathBuf,
    cached: Mutex<Option<(i64, Arc<StatsCache>)>>,
}

impl StatsReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    /// Read the stats blob. `Ok(None)` when the file does not exist (stats
    /// have not been computed yet); parse failures are real errors since
    /// the blob is machine-written.
    pub fn read(&self) -> Result<Option<Arc<StatsCache>>> {
        let Some(mtime_ms) = file_mtime_ms(&self.path) else {
            return Ok(None);
        };

        if let Ok(guard) = self.cached.lock() {
            if let Some((cached_mtime, stats)) = guard.as_ref() {
                if *cached_mtime == mtime_ms {
                    return Ok(Some(Arc::clone(stats)));
                }
            }
        }

        let raw = fs::read_to_string(&self.path)?;
        let stats: Arc<StatsCache> = Arc::new(serde_json::from_str(&raw)?);

        if let Ok(mut guard) = self.cached.lock() {
            *guard = Some((mtime_ms, Arc::clone(&stats)));
        }
        Ok(Some(stats))
    }
}
