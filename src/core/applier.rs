//! Applier: at-most-once write of a validated, gate-approved candidate
//! (spec.md §4.5).
//!
//! The per-path lock table generalizes the teacher's `dashmap`/`parking_lot`
//! shared-state idiom (see `core::cache::CacheStore`) from a keyed data map
//! into a keyed mutex map, so two workers touching different files never
//! contend but two workers racing the same path serialize.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::core::errors::Result;

/// Outcome of an apply attempt (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The candidate was written successfully.
    Applied,
    /// Both the atomic and direct-write paths failed; caller should
    /// degrade the issue to `needs_review`.
    Failed {
        /// Diagnostic message for the Outcome Log.
        reason: String,
    },
}

/// Per-path lock table plus write logic for the Applier.
#[derive(Debug, Clone, Default)]
pub struct Applier {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Applier {
    /// Create a new Applier with an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, path: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Apply `content` to `path`: write-temp-then-rename, with a single
    /// direct-write retry on failure (spec.md §4.5 step 1, §7
    /// FileSystemError-on-write). Serializes with any other apply to the
    /// same path via a per-path lock.
    pub fn apply(&self, path: &Path, content: &str) -> ApplyOutcome {
        let key = path.to_string_lossy().to_string();
        let lock = self.lock_for(&key);
        let _guard = lock.lock();

        match Self::write_atomic(path, content) {
            Ok(()) => ApplyOutcome::Applied,
            Err(first_err) => match Self::write_direct(path, content) {
                Ok(()) => ApplyOutcome::Applied,
                Err(second_err) => ApplyOutcome::Failed {
                    reason: format!(
                        "atomic write failed ({first_err}); direct-write retry also failed ({second_err})"
                    ),
                },
            },
        }
    }

    fn write_atomic(path: &Path, content: &str) -> Result<()> {
        let temp_path = path.with_extension(format!(
            "{}.tmp",
            path.extension().and_then(|e| e.to_str()).unwrap_or("warden")
        ));
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }

    fn write_direct(path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_apply_writes_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.js");
        std::fs::write(&path, "old").unwrap();

        let applier = Applier::new();
        let outcome = applier.apply(&path, "new content");
        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new content");
    }

    #[test]
    fn test_apply_leaves_no_tmp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.js");
        std::fs::write(&path, "old").unwrap();
        let applier = Applier::new();
        applier.apply(&path, "new");
        let tmp = path.with_extension("js.tmp");
        assert!(!tmp.exists());
    }

    #[test]
    fn test_fails_when_parent_directory_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-subdir").join("a.js");
        let applier = Applier::new();
        let outcome = applier.apply(&path, "new");
        assert!(matches!(outcome, ApplyOutcome::Failed { .. }));
    }
}
