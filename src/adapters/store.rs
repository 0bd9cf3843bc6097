//! Store: key-value plus typed collections (spec.md §6) backing
//! cross-process health scores used by Work Selector source 3.
//!
//! The JSON-file fallback implementation reuses
//! [`crate::io::persistence::write_atomic_json`], the same atomic-write
//! helper the Cache Store and Run Stats use.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::io::persistence::{read_json_opt, write_atomic_json};

/// A file's stored health score (spec.md §4.1 source 3, §6 `file_health`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHealth {
    /// Repository-relative path.
    pub path: String,
    /// Health score; lower means worse (more/severer issues).
    pub score: f64,
}

/// Key-value plus typed-collection backing store (spec.md §6).
#[async_trait]
pub trait Store: Send + Sync {
    /// Upsert a file's health score.
    async fn upsert_file_health(&self, health: FileHealth) -> Result<()>;

    /// Select file-health rows with a score below `threshold`, capped at
    /// `limit`, newest/highest-priority first (spec.md §4.1 source 3).
    async fn select_file_health_below(&self, threshold: f64, limit: usize) -> Result<Vec<FileHealth>>;
}

/// JSON-file backed [`Store`] implementation, used when no external
/// database is configured (spec.md §6 "Persisted state layout").
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    health: Arc<RwLock<HashMap<String, FileHealth>>>,
}

impl JsonFileStore {
    /// Load (or initialize) a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let health = read_json_opt::<HashMap<String, FileHealth>>(&path)
            .ok()
            .flatten()
            .unwrap_or_default();
        Self {
            path,
            health: Arc::new(RwLock::new(health)),
        }
    }

    fn persist(&self) -> Result<()> {
        write_atomic_json(&self.path, &*self.health.read())
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn upsert_file_health(&self, health: FileHealth) -> Result<()> {
        self.health.write().insert(health.path.clone(), health);
        self.persist()
    }

    async fn select_file_health_below(&self, threshold: f64, limit: usize) -> Result<Vec<FileHealth>> {
        let guard = self.health.read();
        let mut rows: Vec<FileHealth> = guard
            .values()
            .filter(|h| h.score < threshold)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        rows.truncate(limit);
        Ok(rows)
    }
}

/// In-memory-only [`Store`] used by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    health: Arc<RwLock<HashMap<String, FileHealth>>>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_file_health(&self, health: FileHealth) -> Result<()> {
        self.health.write().insert(health.path.clone(), health);
        Ok(())
    }

    async fn select_file_health_below(&self, threshold: f64, limit: usize) -> Result<Vec<FileHealth>> {
        let guard = self.health.read();
        let mut rows: Vec<FileHealth> = guard
            .values()
            .filter(|h| h.score < threshold)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_memory_store_filters_and_sorts() {
        let store = MemoryStore::default();
        store.upsert_file_health(FileHealth { path: "a.js".into(), score: 40.0 }).await.unwrap();
        store.upsert_file_health(FileHealth { path: "b.js".into(), score: 60.0 }).await.unwrap();
        store.upsert_file_health(FileHealth { path: "c.js".into(), score: 90.0 }).await.unwrap();

        let results = store.select_file_health_below(70.0, 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].path, "a.js");
    }

    #[tokio::test]
    async fn test_json_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health.json");

        {
            let store = JsonFileStore::new(&path);
            store.upsert_file_health(FileHealth { path: "a.js".into(), score: 50.0 }).await.unwrap();
        }

        let reloaded = JsonFileStore::new(&path);
        let results = reloaded.select_file_health_below(100.0, 10).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
