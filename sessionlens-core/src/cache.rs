//! Disk cache for expensive derived artifacts
//!
//! A generic mtime-keyed JSON cache. Each entry is an envelope recording
//! the source file and its modification time; an entry is only valid when
//! the stored mtime exactly matches the current one, so any change to the
//! source invalidates the cache without bookkeeping.
//!
//! Every corruption class — missing file, unparseable JSON, wrong envelope
//! version, stale mtime, payload failing typed deserialization — degrades
//! to a cache miss with a warning. Cache failures never surface as errors;
//! computation falls through to the authoritative source.
//!
//! Writes are atomic: the entry is written to a temp path and renamed over
//! the final path, so readers never observe a partial write.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEnvelope<T> {
    version: u32,
    source_file: String,
    source_mtime_ms: i64,
    cached_at: String,
    data: T,
}

/// A directory of `<key>.cache.json` entries.
///
/// Constructed per process with an explicit directory so tests can use
/// isolated instances; there is no shared global state.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.cache.json"))
    }

    /// Read a cached value. Returns `None` unless the entry exists, carries
    /// the expected version and an exactly matching source mtime, and its
    /// payload deserializes into `T`.
    pub fn read<T: DeserializeOwned>(&self, key: &str, source_mtime_ms: i64) -> Option<T> {
        let path = self.entry_path(key);

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key, error = %e, "disk cache read failed");
                return None;
            }
        };

        let envelope: CacheEnvelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(key, error = %e, "disk cache entry failed validation");
                return None;
            }
        };

        if envelope.version != CACHE_VERSION {
            debug!(key, version = envelope.version, "disk cache version mismatch");
            return None;
        }

        if envelope.source_mtime_ms != source_mtime_ms {
            debug!(key, "disk cache entry is stale");
            return None;
        }

        Some(envelope.data)
    }

    /// Write a value to the cache. Failures are logged and swallowed.
    pub fn write<T: Serialize>(
        &self,
        key: &str,
        source_file: &Path,
        source_mtime_ms: i64,
        data: &T,
    ) {
        if let Err(e) = self.try_write(key, source_file, source_mtime_ms, data) {
            warn!(key, error = %e, "disk cache write failed");
        }
    }

    fn try_write<T: Serialize>(
        &self,
        key: &str,
        source_file: &Path,
        source_mtime_ms: i64,
        data: &T,
    ) -> crate::error::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let envelope = CacheEnvelope {
            version: CACHE_VERSION,
            source_file: source_file.display().to_string(),
            source_mtime_ms,
            cached_at: Utc::now().to_rfc3339(),
            data,
        };
        let json = serde_json::to_string(&envelope)?;

        let path = self.entry_path(key);
        let tmp = self.dir.join(format!("{key}.cache.json.tmp"));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Modification time of `path` in milliseconds since the Unix epoch.
/// `None` when the file cannot be stat'ed.
pub fn file_mtime_ms(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    Some(since_epoch.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Blob {
        name: String,
        count: u64,
    }

    fn sample() -> Blob {
        Blob {
            name: "stats".into(),
            count: 7,
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());

        cache.write("k1", Path::new("/src/file.jsonl"), 1000, &sample());
        let read: Option<Blob> = cache.read("k1", 1000);
        assert_eq!(read, Some(sample()));
    }

    #[test]
    fn test_mtime_mismatch_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());

        cache.write("k1", Path::new("/src/file.jsonl"), 1000, &sample());
        let read: Option<Blob> = cache.read("k1", 2000);
        assert_eq!(read, None);
    }

    #[test]
    fn test_missing_entry_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let read: Option<Blob> = cache.read("nope", 0);
        assert_eq!(read, None);
    }

    #[test]
    fn test_corrupt_json_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        std::fs::write(dir.path().join("k1.cache.json"), "{not json").unwrap();

        let read: Option<Blob> = cache.read("k1", 1000);
        assert_eq!(read, None);
    }

    #[test]
    fn test_wrong_version_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        std::fs::write(
            dir.path().join("k1.cache.json"),
            r#"{"version":99,"sourceFile":"/src","sourceMtimeMs":1000,"cachedAt":"2026-01-01T00:00:00Z","data":{"name":"x","count":1}}"#,
        )
        .unwrap();

        let read: Option<Blob> = cache.read("k1", 1000);
        assert_eq!(read, None);
    }

    #[test]
    fn test_schema_violation_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        std::fs::write(
            dir.path().join("k1.cache.json"),
            r#"{"version":1,"sourceFile":"/src","sourceMtimeMs":1000,"cachedAt":"2026-01-01T00:00:00Z","data":{"wrong":"shape"}}"#,
        )
        .unwrap();

        let read: Option<Blob> = cache.read("k1", 1000);
        assert_eq!(read, None);
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::new(dir.path());

        cache.write("k1", Path::new("/src"), 1000, &sample());
        let updated = Blob {
            name: "stats".into(),
            count: 8,
        };
        cache.write("k1", Path::new("/src"), 2000, &updated);

        assert_eq!(cache.read::<Blob>("k1", 1000), None);
        assert_eq!(cache.read::<Blob>("k1", 2000), Some(updated));
    }

    #[test]
    fn test_file_mtime_ms() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, "x").unwrap();
        assert!(file_mtime_ms(&path).unwrap() > 0);
        assert!(file_mtime_ms(&dir.path().join("missing")).is_none());
    }
}
