//! Atomic write-temp-then-rename JSON persistence, grounded on the
//! teacher's `StopMotifCacheManager::save_cache` (`io/cache.rs`): write to a
//! sibling `.tmp` path, then rename over the destination so readers never
//! observe a partially written file.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::errors::{Result, WardenError};

/// Serialize `value` as pretty JSON and persist it to `path` atomically.
pub fn write_atomic_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Read and deserialize a JSON file, returning `Ok(None)` if it does not
/// exist rather than erroring (first-run tolerance).
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&content).map_err(|e| {
        WardenError::internal(format!("malformed persisted state at {}: {e}", path.display()))
    })?;
    Ok(Some(value))
}
