//! History response cache.
//!
//! Layout: `{cache_dir}/{company_id}_{security_id}_{start}_{end}.json`, one
//! raw decoded response per requested range.
//!
//! - Writes are atomic (write to .tmp, rename into place), so an interrupted
//!   run never leaves a half-written entry behind
//! - A missing, unreadable, or corrupt entry is a cache miss, never an error
//! - [`NoCache`] is the disabled variant; swapping it in changes only how
//!   many network calls a run makes

use crate::domain::Company;
use crate::error::DataError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Identity of one history request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub company_id: String,
    pub security_id: String,
    pub start_date: String,
    pub end_date: String,
}

impl CacheKey {
    /// Key for a company and payload-formatted date range.
    pub fn new(company: &Company, start_date: &str, end_date: &str) -> Self {
        Self {
            company_id: company.company_id.clone(),
            security_id: company.security_id.clone(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.json",
            self.company_id, self.security_id, self.start_date, self.end_date
        )
    }
}

/// Optional durable store for raw history responses.
pub trait ResponseCache {
    /// The payload stored under `key`, or `None` on any kind of miss.
    fn try_read(&self, key: &CacheKey) -> Option<Value>;

    /// Persist `payload` under `key`. Callers treat failure as non-fatal.
    fn write(&self, key: &CacheKey, payload: &Value) -> Result<(), DataError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Caching disabled: every read misses, every write is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl ResponseCache for NoCache {
    fn try_read(&self, _key: &CacheKey) -> Option<Value> {
        None
    }

    fn write(&self, _key: &CacheKey, _payload: &Value) -> Result<(), DataError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// One JSON file per key under a cache directory.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    cache_dir: PathBuf,
}

impl JsonFileCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.file_name())
    }
}

impl ResponseCache for JsonFileCache {
    fn try_read(&self, key: &CacheKey) -> Option<Value> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Unreadable cache file {}: {e}", path.display());
                }
                return None;
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(value) if value.is_object() => {
                debug!("Cache hit: {}", path.display());
                Some(value)
            }
            Ok(_) => {
                warn!("Ignoring cache file {} (not a JSON object)", path.display());
                None
            }
            Err(e) => {
                warn!("Ignoring corrupt cache file {}: {e}", path.display());
                None
            }
        }
    }

    fn write(&self, key: &CacheKey, payload: &Value) -> Result<(), DataError> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| DataError::io(&self.cache_dir, e))?;

        let path = self.entry_path(key);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| DataError::MalformedPayload(format!("cache serialization: {e}")))?;

        fs::write(&tmp_path, bytes).map_err(|e| DataError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::io(&path, e)
        })?;
        Ok(())
    }
}

/// File cache under `cache_dir`, or [`NoCache`] when `None`.
pub fn cache_for(cache_dir: Option<&Path>) -> Box<dyn ResponseCache> {
    match cache_dir {
        Some(dir) => Box::new(JsonFileCache::new(dir)),
        None => Box::new(NoCache),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> CacheKey {
        CacheKey::new(
            &Company::new("123", "456", "Acme", "ACM"),
            "01-01-1900",
            "01-02-2024",
        )
    }

    #[test]
    fn file_name_is_deterministic() {
        assert_eq!(key().file_name(), "123_456_01-01-1900_01-02-2024.json");
        assert_eq!(key(), key());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path().join("cache"));
        let payload = json!({"chartData": [{"CHART_DATE": "Jan 02, 2024 00:00:00"}]});

        assert!(cache.try_read(&key()).is_none());
        cache.write(&key(), &payload).unwrap();
        assert_eq!(cache.try_read(&key()), Some(payload));
        assert!(!cache.entry_path(&key()).with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path());
        fs::write(cache.entry_path(&key()), "{\"chartData\": [").unwrap();
        assert!(cache.try_read(&key()).is_none());
    }

    #[test]
    fn non_object_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileCache::new(dir.path());
        fs::write(cache.entry_path(&key()), "[1, 2, 3]").unwrap();
        assert!(cache.try_read(&key()).is_none());
    }

    #[test]
    fn write_failure_is_reported_not_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "file").unwrap();
        let cache = JsonFileCache::new(&blocker);
        assert!(cache.write(&key(), &json!({})).is_err());
    }

    #[test]
    fn disabled_cache_never_hits() {
        let cache = cache_for(None);
        assert!(!cache.is_enabled());
        cache.write(&key(), &json!({"chartData": []})).unwrap();
        assert!(cache.try_read(&key()).is_none());
    }
}
