//! File Analyzer: per-path gating before the Fix Pipeline runs (spec.md
//! §4.2).

use std::path::Path;

use chrono::Utc;

use crate::adapters::review::ReviewClient;
use crate::core::cache::{hash_bytes, CacheStore, FileRecord};
use crate::core::config::AnalyzerConfig;
use crate::core::issue::Issue;
use crate::core::stats::SharedRunStats;

/// Minimum trimmed content length required to invoke the Review Client
/// (spec.md §4.2 step 4).
pub const MIN_CONTENT_LEN: usize = 10;

/// Outcome of running the File Analyzer over one path.
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// The file was skipped: cache-fresh, too large, or trivially short.
    Skipped,
    /// The Review Client failed; caller should increment `errors`.
    ReviewFailed,
    /// Issues were obtained, paired with the file's bytes for the Fix
    /// Pipeline's working copy.
    Analyzed {
        /// Current file content.
        content: String,
        /// Issues found by the Review Client.
        issues: Vec<Issue>,
        /// SHA-256 hash of `content`, for the post-pipeline cache update.
        hash: String,
    },
}

/// Run the File Analyzer's gating sequence for `path` (spec.md §4.2 steps
/// 1-5). Step 6 (updating the File Record after the pipeline completes) is
/// the caller's responsibility via [`finalize`], since it depends on the
/// Fix Pipeline's outcome.
pub async fn analyze(
    path: &Path,
    cache: &CacheStore,
    config: &AnalyzerConfig,
    review_client: &dyn ReviewClient,
    stats: &SharedRunStats,
) -> AnalysisOutcome {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => {
            stats.record_error();
            return AnalysisOutcome::Skipped;
        }
    };
    if metadata.len() > config.max_file_size_bytes {
        stats.record_file_skipped();
        return AnalysisOutcome::Skipped;
    }

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(_) => {
            stats.record_error();
            return AnalysisOutcome::Skipped;
        }
    };
    let hash = hash_bytes(&bytes);

    let path_key = path.to_string_lossy().to_string();
    if cache.is_fresh(&path_key, &hash, config.ttl(), Utc::now()) {
        stats.record_file_skipped();
        return AnalysisOutcome::Skipped;
    }

    let content = String::from_utf8_lossy(&bytes).into_owned();
    if content.trim().len() < MIN_CONTENT_LEN {
        stats.record_file_skipped();
        return AnalysisOutcome::Skipped;
    }

    stats.record_file_scanned();
    match review_client.review(&content, &path_key).await {
        Ok(issues) => AnalysisOutcome::Analyzed { content, issues, hash },
        Err(_) => {
            stats.record_error();
            AnalysisOutcome::ReviewFailed
        }
    }
}

/// Update the Cache Store's File Record after the Fix Pipeline has
/// finished with `path` (spec.md §4.2 step 6).
pub fn finalize(cache: &CacheStore, path: &Path, hash: String, issue_count: usize) {
    let now = Utc::now();
    let path_key = path.to_string_lossy().to_string();
    let created_at = cache.get(&path_key).map(|r| r.created_at).unwrap_or(now);
    cache.upsert(FileRecord {
        path: path_key,
        hash,
        last_modified: now,
        created_at,
        last_scanned: now,
        last_issue_count: issue_count,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::Result;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct StubReviewClient {
        issues: Vec<Issue>,
    }

    #[async_trait]
    impl ReviewClient for StubReviewClient {
        async fn review(&self, _source: &str, _path: &str) -> Result<Vec<Issue>> {
            Ok(self.issues.clone())
        }
    }

    #[tokio::test]
    async fn test_skips_oversized_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.js");
        std::fs::write(&path, vec![0u8; 200]).unwrap();

        let mut config = AnalyzerConfig::default();
        config.max_file_size_bytes = 100;

        let cache = CacheStore::new();
        let stats = SharedRunStats::new();
        let client = StubReviewClient { issues: vec![] };

        let outcome = analyze(&path, &cache, &config, &client, &stats).await;
        assert!(matches!(outcome, AnalysisOutcome::Skipped));
        assert_eq!(stats.snapshot().files_skipped, 1);
    }

    #[tokio::test]
    async fn test_skips_trivially_short_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.js");
        std::fs::write(&path, "x").unwrap();

        let config = AnalyzerConfig::default();
        let cache = CacheStore::new();
        let stats = SharedRunStats::new();
        let client = StubReviewClient { issues: vec![] };

        let outcome = analyze(&path, &cache, &config, &client, &stats).await;
        assert!(matches!(outcome, AnalysisOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_fresh_cache_entry_skips_rescan() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.js");
        let content = "function ok() { return 1; }";
        std::fs::write(&path, content).unwrap();

        let config = AnalyzerConfig::default();
        let cache = CacheStore::new();
        let hash = hash_bytes(content.as_bytes());
        cache.upsert(FileRecord {
            path: path.to_string_lossy().to_string(),
            hash,
            last_modified: Utc::now(),
            created_at: Utc::now(),
            last_scanned: Utc::now(),
            last_issue_count: 0,
        });
        let stats = SharedRunStats::new();
        let client = StubReviewClient { issues: vec![] };

        let outcome = analyze(&path, &cache, &config, &client, &stats).await;
        assert!(matches!(outcome, AnalysisOutcome::Skipped));
        assert_eq!(stats.snapshot().files_scanned, 0);
    }
}
