//! Work Selector: a prioritized, de-duplicated list of paths to analyze
//! (spec.md §4.1).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::adapters::search::{SearchQuery, SearchService};
use crate::adapters::store::Store;
use crate::core::config::SelectorConfig;
use crate::core::issue::IssueStatus;
use crate::core::outcome::OutcomeLog;
use crate::io::walk::walk_source_files;
use crate::vcs::{self, Checkpoint};

/// Directory names excluded from the full-walk fallback (spec.md §4.1:
/// "build outputs, VCS metadata, dependency caches, logs, backups").
pub const EXCLUDED_DIR_NAMES: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    ".git",
    "__pycache__",
    "logs",
    "backups",
];

/// Default health-score threshold for source 3 (spec.md §4.1).
pub const DEFAULT_HEALTH_THRESHOLD: f64 = 70.0;
/// Cap on source-3 results (spec.md §4.1).
pub const HEALTH_SOURCE_CAP: usize = 1_000;

/// Fixed seed phrases used to query the search service for source 4
/// (spec.md §4.1). These describe recurring issue patterns rather than
/// any one file, matching the teacher's `default_exclude_patterns`-style
/// hardcoded seed list in `core::pipeline::file_discovery`.
pub const SEED_SEARCH_PHRASES: &[&str] = &[
    "console.log debug statement",
    "loose equality comparison",
    "unused variable declaration",
    "trailing whitespace",
    "missing semicolon",
];

/// Select and order the next batch of paths to analyze (spec.md §4.1).
pub async fn select(
    root: &Path,
    config: &SelectorConfig,
    outcome_log: &OutcomeLog,
    checkpoint: &Checkpoint,
    store: &dyn Store,
    search: &dyn SearchService,
    extensions: &[String],
) -> (Vec<PathBuf>, Checkpoint) {
    let mut collected: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    // Source 1: paths of issues flagged "pending" (needs_review) in the
    // Outcome Log.
    for outcome in outcome_log.snapshot() {
        if outcome.status == IssueStatus::NeedsReview {
            push_unique(&mut collected, &mut seen, PathBuf::from(&outcome.file_path));
        }
    }

    // Source 2: paths changed since the previous VCS checkpoint.
    let (changed, new_checkpoint) = vcs::changed_since(root, checkpoint);
    for path in changed {
        if has_allowed_extension(&path, extensions) {
            push_unique(&mut collected, &mut seen, path);
        }
    }

    // Source 3: paths whose stored health score is below the threshold.
    match store
        .select_file_health_below(DEFAULT_HEALTH_THRESHOLD, HEALTH_SOURCE_CAP)
        .await
    {
        Ok(rows) => {
            for row in rows {
                push_unique(&mut collected, &mut seen, PathBuf::from(row.path));
            }
        }
        Err(err) => warn!("work selector source 3 (health scores) failed: {err}"),
    }

    // Source 4: paths surfaced by semantic search over seed phrases.
    for phrase in SEED_SEARCH_PHRASES {
        let query = SearchQuery {
            query: phrase.to_string(),
            limit: 20,
            threshold: 0.5,
            file_filter: None,
        };
        match search.semantic_search(query).await {
            Ok(results) => {
                for result in results {
                    push_unique(&mut collected, &mut seen, PathBuf::from(result.path));
                }
            }
            Err(err) => warn!("work selector source 4 (semantic search) failed: {err}"),
        }
    }

    // Fallback: if every source yielded nothing, do a full recursive walk.
    if collected.is_empty() {
        let walked = walk_source_files(root, extensions, u64::MAX)
            .into_iter()
            .filter(|p| !excluded_by_directory(p));
        for path in walked {
            push_unique(&mut collected, &mut seen, path);
        }
    }

    collected.truncate(config.batch_size);

    (collected, new_checkpoint)
}

fn push_unique(collected: &mut Vec<PathBuf>, seen: &mut HashSet<PathBuf>, path: PathBuf) {
    if seen.insert(path.clone()) {
        collected.push(path);
    }
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

fn excluded_by_directory(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| EXCLUDED_DIR_NAMES.contains(&s))
            .unwrap_or(false)
    })
}
