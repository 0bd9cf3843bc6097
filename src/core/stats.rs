//! Run Stats: aggregate counters for a single engine run (spec.md §3, §4.8).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Snapshot of run-wide counters, persisted every 10 files and at run end
/// (spec.md §3). Survives process restart via [`crate::io::persistence`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunStats {
    /// Files visited by the Scheduler.
    pub files_scanned: u64,
    /// Files skipped due to cache freshness, size ceiling, or trivial
    /// content.
    pub files_skipped: u64,
    /// Files for which at least one issue was found.
    pub files_with_issues: u64,
    /// Total issues found across the run.
    pub issues_found: u64,
    /// Issues resolved via an auto-applied candidate.
    pub issues_auto_fixed: u64,
    /// Issues routed to `needs_review`.
    pub issues_needing_review: u64,
    /// Errors encountered (file read failures, adapter failures, etc.).
    pub errors: u64,
    /// Run start time.
    pub start_time: Option<DateTime<Utc>>,
    /// Run end time, set once the run completes or is cancelled.
    pub end_time: Option<DateTime<Utc>>,
}

impl RunStats {
    /// Start a fresh stats block with `start_time` set to now.
    pub fn started() -> Self {
        Self {
            start_time: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Mark the run as finished.
    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }
}

/// Serializing counter shared across Scheduler worker tasks (spec.md §5:
/// "Run Stats use a serializing mutex because all workers increment
/// counters").
#[derive(Debug, Clone, Default)]
pub struct SharedRunStats {
    inner: Arc<Mutex<RunStats>>,
}

impl SharedRunStats {
    /// Start a new shared stats block.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RunStats::started())),
        }
    }

    /// Snapshot the current counters.
    pub fn snapshot(&self) -> RunStats {
        self.inner.lock().clone()
    }

    /// Increment `files_scanned`.
    pub fn record_file_scanned(&self) {
        self.inner.lock().files_scanned += 1;
    }

    /// Increment `files_skipped`.
    pub fn record_file_skipped(&self) {
        self.inner.lock().files_skipped += 1;
    }

    /// Record that a file had `issue_count` issues (increments
    /// `files_with_issues` and `issues_found`).
    pub fn record_issues_found(&self, issue_count: u64) {
        let mut stats = self.inner.lock();
        if issue_count > 0 {
            stats.files_with_issues += 1;
        }
        stats.issues_found += issue_count;
    }

    /// Increment `issues_auto_fixed`.
    pub fn record_auto_fixed(&self) {
        self.inner.lock().issues_auto_fixed += 1;
    }

    /// Increment `issues_needing_review`.
    pub fn record_needs_review(&self) {
        self.inner.lock().issues_needing_review += 1;
    }

    /// Increment `errors`.
    pub fn record_error(&self) {
        self.inner.lock().errors += 1;
    }

    /// Mark the run as finished.
    pub fn finish(&self) {
        self.inner.lock().finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = SharedRunStats::new();
        stats.record_file_scanned();
        stats.record_file_scanned();
        stats.record_issues_found(3);
        stats.record_auto_fixed();
        stats.record_needs_review();
        stats.record_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.files_scanned, 2);
        assert_eq!(snapshot.files_with_issues, 1);
        assert_eq!(snapshot.issues_found, 3);
        assert_eq!(snapshot.issues_auto_fixed, 1);
        assert_eq!(snapshot.issues_needing_review, 1);
        assert_eq!(snapshot.errors, 1);
    }

    #[test]
    fn test_finish_sets_end_time() {
        let stats = SharedRunStats::new();
        stats.finish();
        assert!(stats.snapshot().end_time.is_some());
    }

    #[test]
    fn test_zero_issues_does_not_mark_file_with_issues() {
        let stats = SharedRunStats::new();
        stats.record_issues_found(0);
        assert_eq!(stats.snapshot().files_with_issues, 0);
    }
}
