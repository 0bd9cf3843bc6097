//! Scheduler: drives the Work Selector, runs bounded-concurrency File
//! Analyzer -> Fix Pipeline -> Validator -> Applier -> Learner chains per
//! file, and periodically persists Run Stats (spec.md §4.8, §5).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::adapters::generators::{FixGenerator, GeneratorHints};
use crate::adapters::notifier::{NotificationEvent, Notifier};
use crate::adapters::review::ReviewClient;
use crate::adapters::search::SearchService;
use crate::adapters::store::Store;
use crate::core::applier::{Applier, ApplyOutcome};
use crate::core::cache::CacheStore;
use crate::core::config::WardenConfig;
use crate::core::file_analyzer::{self, AnalysisOutcome};
use crate::core::fix_pipeline::{self, Specialist};
use crate::core::gate;
use crate::core::issue::{Issue, IssueKind, Safety};
use crate::core::learner::Learner;
use crate::core::outcome::{OutcomeLog, OutcomeRecord};
use crate::core::pattern::PatternRegistry;
use crate::core::stats::{RunStats, SharedRunStats};
use crate::core::validator;
use crate::io::persistence::write_atomic_json;
use crate::vcs::Checkpoint;

/// Persist Run Stats after this many completed files (spec.md §4.8).
pub const STATS_FLUSH_EVERY_N_FILES: usize = 10;

/// Every stateful collaborator and adapter the Scheduler needs to drive one
/// run. Owned by [`crate::api::engine::WardenEngine`] and passed by
/// reference so the Scheduler itself holds no process-wide singletons
/// (spec.md §9 "Global mutable state").
pub struct SchedulerDeps {
    /// Per-file scan cache.
    pub cache: CacheStore,
    /// Registered text-rewrite patterns.
    pub pattern_registry: PatternRegistry,
    /// Durable record of fix attempts.
    pub outcome_log: OutcomeLog,
    /// Calibration and pattern-evolution bookkeeping.
    pub learner: Learner,
    /// At-most-once file writer.
    pub applier: Applier,
    /// Run-wide counters.
    pub stats: SharedRunStats,
    /// External issue source.
    pub review_client: Box<dyn ReviewClient>,
    /// Generator cascade backends, in invocation order.
    pub generator_backends: Vec<Box<dyn FixGenerator>>,
    /// Specialist router, keyed by issue kind.
    pub specialists: HashMap<IssueKind, Box<dyn Specialist>>,
    /// Semantic search hint source.
    pub search: Box<dyn SearchService>,
    /// Cross-process health-score backing store.
    pub store: Box<dyn Store>,
    /// Run-completion notification sink.
    pub notifier: Box<dyn Notifier>,
}

/// Outcome of a full Scheduler run: final stats plus the checkpoint to
/// persist for the next invocation's Work Selector source 2.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Final Run Stats snapshot.
    pub stats: RunStats,
    /// VCS checkpoint observed during this run.
    pub checkpoint: Checkpoint,
}

/// On-disk Run Stats document (spec.md §6 "Persisted state layout").
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    stats: RunStats,
    #[serde(rename = "lastUpdated")]
    last_updated: i64,
}

/// Persist the current Run Stats snapshot to `config.io.run_stats_path()`.
fn persist_stats(config: &WardenConfig, stats: &SharedRunStats) {
    let document = PersistedStats {
        stats: stats.snapshot(),
        last_updated: chrono::Utc::now().timestamp_millis(),
    };
    if let Err(err) = write_atomic_json(&config.io.run_stats_path(), &document) {
        warn!("failed to persist run stats: {err}");
    }
}

/// Run the Scheduler to completion (or cancellation) starting from
/// `checkpoint`. Drives repeated Work Selector batches until one returns
/// empty, or the `cancel` token fires (spec.md §4.8).
pub async fn run(
    root: &Path,
    config: &WardenConfig,
    deps: &SchedulerDeps,
    mut checkpoint: Checkpoint,
    cancel: &CancellationToken,
) -> RunSummary {
    let completed = AtomicUsize::new(0);
    let concurrency = config.scheduler.effective_concurrency();
    // Work Selector sources (notably the full-walk fallback) have no
    // drain condition of their own: a file keeps reappearing in every
    // batch until something external changes it. Track what this run has
    // already dispatched so the loop terminates once no *new* path
    // emerges, rather than re-selecting the same files forever.
    let mut already_selected: std::collections::HashSet<PathBuf> = std::collections::HashSet::new();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let (raw_batch, new_checkpoint) = crate::core::work_selector::select(
            root,
            &config.selector,
            &deps.outcome_log,
            &checkpoint,
            deps.store.as_ref(),
            deps.search.as_ref(),
            &config.analyzer.extensions,
        )
        .await;
        checkpoint = new_checkpoint;

        let batch: Vec<PathBuf> = raw_batch.into_iter().filter(|p| already_selected.insert(p.clone())).collect();

        if batch.is_empty() {
            break;
        }

        stream::iter(batch)
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .for_each_concurrent(concurrency, |path| {
                let completed = &completed;
                async move {
                    process_file(&path, config, deps).await;
                    let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if n.is_multiple_of(STATS_FLUSH_EVERY_N_FILES) {
                        persist_stats(config, &deps.stats);
                    }
                }
            })
            .await;
    }

    deps.stats.finish();
    persist_stats(config, &deps.stats);

    let snapshot = deps.stats.snapshot();
    if let Err(err) = deps
        .notifier
        .notify(NotificationEvent {
            summary: format!(
                "run complete: {} scanned, {} auto-fixed, {} need review, {} errors",
                snapshot.files_scanned, snapshot.issues_auto_fixed, snapshot.issues_needing_review, snapshot.errors
            ),
            stats: snapshot.clone(),
        })
        .await
    {
        warn!("notifier delivery failed: {err}");
    }

    RunSummary {
        stats: snapshot,
        checkpoint,
    }
}

/// Run the File Analyzer -> Fix Pipeline -> Validator -> Applier -> Learner
/// chain for a single path, processing its issues sequentially since each
/// applied candidate mutates the working copy the next issue is evaluated
/// against (spec.md §5 "Ordering guarantees").
async fn process_file(path: &Path, config: &WardenConfig, deps: &SchedulerDeps) {
    let outcome = file_analyzer::analyze(
        path,
        &deps.cache,
        &config.analyzer,
        deps.review_client.as_ref(),
        &deps.stats,
    )
    .await;

    let (mut working_copy, issues, hash) = match outcome {
        AnalysisOutcome::Analyzed { content, issues, hash } => (content, issues, hash),
        AnalysisOutcome::Skipped | AnalysisOutcome::ReviewFailed => return,
    };

    deps.stats.record_issues_found(issues.len() as u64);

    let path_str = path.to_string_lossy().to_string();
    for issue in &issues {
        process_issue(issue, &path_str, path, &mut working_copy, config, deps).await;
    }

    file_analyzer::finalize(&deps.cache, path, hash, issues.len());
}

async fn process_issue(
    issue: &Issue,
    path_str: &str,
    path: &Path,
    working_copy: &mut String,
    config: &WardenConfig,
    deps: &SchedulerDeps,
) {
    if issue.safety == Safety::Risky {
        deps.outcome_log.append(OutcomeRecord::needs_review(issue));
        deps.stats.record_needs_review();
        return;
    }

    let hints = GeneratorHints::default();
    let domain = hints.domain.clone().unwrap_or_default();

    let pipeline_result = fix_pipeline::run(
        issue,
        working_copy,
        path_str,
        &deps.outcome_log,
        &deps.pattern_registry,
        &deps.generator_backends,
        &deps.specialists,
        &hints,
    )
    .await;

    let Ok(mut candidate) = pipeline_result else {
        deps.outcome_log.append(OutcomeRecord::needs_review(issue));
        deps.stats.record_needs_review();
        return;
    };

    let validation = validator::validate(working_copy, &candidate.content, &config.validator);
    candidate.calibrated_confidence = Some(deps.learner.calibrate(
        candidate.method,
        issue.kind,
        &domain,
        candidate.raw_confidence,
    ));

    let decision = gate::decide(&candidate, issue.severity, &validation, &config.gate);

    if !decision.applies() {
        let record = OutcomeRecord::gate_declined(
            issue,
            candidate.method,
            candidate.raw_confidence,
            candidate.calibrated_confidence,
            validation.verified,
        );
        deps.learner.observe(&record, &deps.pattern_registry, &domain);
        deps.outcome_log.append(record);
        deps.stats.record_needs_review();
        return;
    }

    if !config.scheduler.auto_fix {
        deps.outcome_log.append(OutcomeRecord::needs_review(issue));
        deps.stats.record_needs_review();
        return;
    }

    match deps.applier.apply(path, &candidate.content) {
        ApplyOutcome::Applied => {
            let record = OutcomeRecord::resolved(
                issue,
                candidate.method,
                candidate.raw_confidence,
                candidate.calibrated_confidence,
                working_copy.clone(),
                candidate.content.clone(),
            );
            deps.learner.observe(&record, &deps.pattern_registry, &domain);
            deps.outcome_log.append(record);
            deps.stats.record_auto_fixed();
            *working_copy = candidate.content;
        }
        ApplyOutcome::Failed { reason } => {
            let mut record = OutcomeRecord::needs_review(issue);
            record.post_application_error = Some(reason);
            deps.outcome_log.append(record);
            deps.stats.record_needs_review();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notifier::NullNotifier;
    use crate::adapters::review::ReviewClient;
    use crate::adapters::search::StubSearchService;
    use crate::adapters::store::MemoryStore;
    use crate::core::errors::Result;
    use crate::core::issue::{IssueKind, Safety, Severity, SourceSpan};
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct FixedReviewClient {
        issue: Issue,
    }

    #[async_trait]
    impl ReviewClient for FixedReviewClient {
        async fn review(&self, _source: &str, _path: &str) -> Result<Vec<Issue>> {
            Ok(vec![self.issue.clone()])
        }
    }

    fn trailing_whitespace_issue(path: &str) -> Issue {
        Issue {
            file_path: path.to_string(),
            span: SourceSpan { line_start: 1, line_end: 1, column: None },
            kind: IssueKind::Style,
            severity: Severity::Low,
            message: "trailing whitespace".to_string(),
            code: None,
            hint: None,
            safety: Safety::Safe,
        }
    }

    fn test_deps(issue: Issue) -> SchedulerDeps {
        SchedulerDeps {
            cache: CacheStore::new(),
            pattern_registry: PatternRegistry::new(),
            outcome_log: OutcomeLog::new(),
            learner: Learner::new(),
            applier: Applier::new(),
            stats: SharedRunStats::new(),
            review_client: Box::new(FixedReviewClient { issue }),
            generator_backends: Vec::new(),
            specialists: HashMap::new(),
            search: Box::new(StubSearchService),
            store: Box::new(MemoryStore::default()),
            notifier: Box::new(NullNotifier),
        }
    }

    #[tokio::test]
    async fn test_process_file_applies_simple_line_rewrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.js");
        std::fs::write(&path, "let y = 2;   \n").unwrap();

        let issue = trailing_whitespace_issue(&path.to_string_lossy());
        let deps = test_deps(issue);
        let config = WardenConfig::default();

        process_file(&path, &config, &deps).await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "let y = 2;\n");
        assert_eq!(deps.stats.snapshot().issues_auto_fixed, 1);
    }

    #[tokio::test]
    async fn test_risky_issue_skips_pipeline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.js");
        std::fs::write(&path, "let y = 2;   \n").unwrap();

        let mut issue = trailing_whitespace_issue(&path.to_string_lossy());
        issue.safety = Safety::Risky;
        let deps = test_deps(issue);
        let config = WardenConfig::default();

        process_file(&path, &config, &deps).await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "let y = 2;   \n");
        assert_eq!(deps.stats.snapshot().issues_needing_review, 1);
    }

    #[tokio::test]
    async fn test_full_run_persists_stats_at_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.js");
        std::fs::write(&path, "let y = 2;   \n").unwrap();

        let issue = trailing_whitespace_issue(&path.to_string_lossy());
        let deps = test_deps(issue);
        let mut config = WardenConfig::default();
        config.io.state_dir = dir.path().join(".warden");

        let cancel = CancellationToken::new();
        let summary = run(dir.path(), &config, &deps, Checkpoint::default(), &cancel).await;

        assert!(summary.stats.end_time.is_some());
        assert!(config.io.run_stats_path().exists());
    }
}
