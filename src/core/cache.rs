//! Cache Store: content-hash -> last-scan record with TTL and invalidation
//! (spec.md §3, §4.2).
//!
//! Grounded on the teacher's `io::cache::StopMotifCacheManager` atomic
//! write-temp-then-rename persistence pattern, generalized from a single
//! whole-codebase cache entry into a per-path keyed store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::errors::Result;
use crate::io::persistence::write_atomic_json;

/// Default cache TTL (spec.md §4.2 step 3).
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-file scan record owned by the Cache Store (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Repository-relative path.
    pub path: String,
    /// SHA-256 hash of the file's bytes at the time of the last scan.
    pub hash: String,
    /// Filesystem last-modified timestamp.
    pub last_modified: DateTime<Utc>,
    /// When this record was created (first scan).
    pub created_at: DateTime<Utc>,
    /// When this file was last actually scanned (analysis ran).
    pub last_scanned: DateTime<Utc>,
    /// Issue count observed on the last scan.
    pub last_issue_count: usize,
}

/// Compute the SHA-256 hash of file bytes, matching the teacher's
/// `StopMotifCacheManager::compute_codebase_signature` use of `sha2`.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Concurrent, upsert-by-path Cache Store.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    records: Arc<DashMap<String, FileRecord>>,
}

impl CacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a previously persisted JSON snapshot, tolerating a
    /// missing file (first run).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let records: HashMap<String, FileRecord> = serde_json::from_str(&content)?;
        let map = DashMap::new();
        for (k, v) in records {
            map.insert(k, v);
        }
        Ok(Self {
            records: Arc::new(map),
        })
    }

    /// Persist the store atomically (write-temp-then-rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot: HashMap<String, FileRecord> = self
            .records
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        write_atomic_json(path, &snapshot)
    }

    /// Upsert a file record by path.
    pub fn upsert(&self, record: FileRecord) {
        self.records.insert(record.path.clone(), record);
    }

    /// Fetch a record by path.
    pub fn get(&self, path: &str) -> Option<FileRecord> {
        self.records.get(path).map(|r| r.value().clone())
    }

    /// Delete a record by path (file-watcher invalidation, spec.md §9(a)).
    pub fn invalidate(&self, path: &str) {
        self.records.remove(path);
    }

    /// Whether a cached record exists for `path` with a matching hash and
    /// an age within `ttl` (spec.md §4.2 step 3). File-watcher invalidation
    /// always wins over TTL: callers must invalidate on external change
    /// before this check runs (spec.md §9(a)).
    pub fn is_fresh(&self, path: &str, current_hash: &str, ttl: Duration, now: DateTime<Utc>) -> bool {
        match self.get(path) {
            Some(record) if record.hash == current_hash => {
                let age = now.signed_duration_since(record.last_scanned);
                age.to_std().map(|age| age <= ttl).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records whose last recorded issue count is below `threshold`
    /// health-score analogue -- used by Work Selector source 3. Returns
    /// paths ordered by ascending score (lowest = highest priority),
    /// capped at `limit`.
    pub fn low_health_paths(&self, threshold: usize, limit: usize) -> Vec<String> {
        let mut entries: Vec<(String, usize, DateTime<Utc>)> = self
            .records
            .iter()
            .filter(|e| e.value().last_issue_count >= threshold)
            .map(|e| {
                (
                    e.key().clone(),
                    e.value().last_issue_count,
                    e.value().last_scanned,
                )
            })
            .collect();
        // Highest issue count (lowest health) first; ties broken newest-first.
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));
        entries.into_iter().take(limit).map(|(p, _, _)| p).collect()
    }
}
