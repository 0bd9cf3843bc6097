//! `WardenEngine`: the public facade wiring every stateful collaborator
//! and adapter together behind the Scheduler (spec.md §3, §9).
//!
//! Construction resolves each [`crate::core::config::AdapterConfig`]
//! endpoint to either an HTTP-backed adapter or its no-op stub, and loads
//! every piece of persisted state from `config.io.state_dir` so a run
//! resumes where the previous one left off (spec.md §6 "Persisted state
//! layout").

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::generators::{FixGenerator, HttpFixGenerator, StubFixGenerator};
use crate::adapters::notifier::{NullNotifier, Notifier, WebhookNotifier};
use crate::adapters::review::{ReviewClient, StubReviewClient};
use crate::adapters::search::{HttpSearchService, SearchService, StubSearchService};
use crate::adapters::store::{JsonFileStore, Store};
use crate::core::applier::Applier;
use crate::core::cache::CacheStore;
use crate::core::candidate::Method;
use crate::core::config::WardenConfig;
use crate::core::errors::Result;
use crate::core::fix_pipeline::Specialist;
use crate::core::issue::IssueKind;
use crate::core::learner::Learner;
use crate::core::outcome::OutcomeLog;
use crate::core::pattern::PatternRegistry;
use crate::core::scheduler::{self, RunSummary, SchedulerDeps};
use crate::core::stats::{RunStats, SharedRunStats};
use crate::io::persistence::{read_json_opt, write_atomic_json};
use crate::vcs::Checkpoint;

/// The generator-cascade backend names an [`crate::core::config::AdapterConfig`]
/// may configure an endpoint for (spec.md §4.3 stage 4).
const GENERATOR_METHODS: [(Method, &str); 3] = [
    (Method::GeneratorCtx, "ctx"),
    (Method::GeneratorCodebase, "codebase"),
    (Method::GeneratorAdvanced, "advanced"),
];

/// Owns every stateful collaborator for one codebase root and drives runs
/// of the Scheduler against it.
pub struct WardenEngine {
    root: PathBuf,
    config: WardenConfig,
    deps: SchedulerDeps,
}

impl WardenEngine {
    /// Build an engine for `root`, loading any persisted state found under
    /// `config.io.state_dir` and resolving adapters from
    /// `config.adapters` (spec.md §6, §9).
    pub async fn new(root: impl Into<PathBuf>, config: WardenConfig) -> Result<Self> {
        config.validate()?;
        let root = root.into();

        let cache = CacheStore::load(&config.io.cache_path())?;
        let pattern_registry = PatternRegistry::load(&config.io.pattern_registry_path())?;
        let outcome_log = OutcomeLog::load(&config.io.outcome_log_path())?;

        let timeout = Duration::from_millis(config.adapters.request_timeout_ms.max(1));

        let review_client: Box<dyn ReviewClient> = Box::new(StubReviewClient);

        let search: Box<dyn SearchService> = match &config.adapters.search_endpoint {
            Some(url) => Box::new(HttpSearchService::new(url.clone(), timeout)),
            None => Box::new(StubSearchService),
        };

        let store: Box<dyn Store> = Box::new(JsonFileStore::new(config.io.health_store_path()));

        let notifier: Box<dyn Notifier> = match &config.adapters.notifier_webhook {
            Some(url) => Box::new(WebhookNotifier::new(url.clone())),
            None => Box::new(NullNotifier),
        };

        let generator_backends: Vec<Box<dyn FixGenerator>> = GENERATOR_METHODS
            .iter()
            .map(|(method, key)| -> Box<dyn FixGenerator> {
                match config.adapters.generator_endpoints.get(*key) {
                    Some(url) => Box::new(HttpFixGenerator::new(url.clone(), *method, timeout)),
                    None => Box::new(StubFixGenerator::new(*method)),
                }
            })
            .collect();

        let specialists: HashMap<IssueKind, Box<dyn Specialist>> = HashMap::new();

        info!(root = %root.display(), "warden engine initialized");

        Ok(Self {
            root,
            config,
            deps: SchedulerDeps {
                cache,
                pattern_registry,
                outcome_log,
                learner: Learner::new(),
                applier: Applier::new(),
                stats: SharedRunStats::new(),
                review_client,
                generator_backends,
                specialists,
                search,
                store,
                notifier,
            },
        })
    }

    /// Run the Scheduler to completion against the current checkpoint,
    /// persisting the new checkpoint and every stateful collaborator
    /// snapshot once the run finishes or `cancel` fires (spec.md §4.8,
    /// §6).
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary> {
        let checkpoint = load_checkpoint(&self.config.io.checkpoint_path())?;

        let summary = scheduler::run(&self.root, &self.config, &self.deps, checkpoint, cancel).await;

        save_checkpoint(&self.config.io.checkpoint_path(), &summary.checkpoint)?;
        self.deps.cache.save(&self.config.io.cache_path())?;
        self.deps.pattern_registry.save(&self.config.io.pattern_registry_path())?;
        self.deps.outcome_log.save(&self.config.io.outcome_log_path())?;

        Ok(summary)
    }

    /// Current Run Stats snapshot, used by the `status` CLI command.
    pub fn stats(&self) -> RunStats {
        self.deps.stats.snapshot()
    }

    /// The codebase root this engine is scoped to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The resolved configuration this engine was built from.
    pub fn config(&self) -> &WardenConfig {
        &self.config
    }
}

fn load_checkpoint(path: &Path) -> Result<Checkpoint> {
    Ok(read_json_opt::<Checkpoint>(path)?.unwrap_or_default())
}

fn save_checkpoint(path: &Path, checkpoint: &Checkpoint) -> Result<()> {
    write_atomic_json(path, checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_engine_runs_against_empty_directory() {
        let dir = tempdir().unwrap();
        let mut config = WardenConfig::default();
        config.io.state_dir = dir.path().join(".warden");

        let engine = WardenEngine::new(dir.path(), config).await.unwrap();
        let cancel = CancellationToken::new();
        let summary = engine.run(&cancel).await.unwrap();

        assert!(summary.stats.end_time.is_some());
    }

    #[tokio::test]
    async fn test_engine_persists_and_reloads_state() {
        let dir = tempdir().unwrap();
        let mut config = WardenConfig::default();
        config.io.state_dir = dir.path().join(".warden");

        {
            let engine = WardenEngine::new(dir.path(), config.clone()).await.unwrap();
            let cancel = CancellationToken::new();
            engine.run(&cancel).await.unwrap();
        }

        assert!(config.io.checkpoint_path().exists());
        assert!(config.io.cache_path().exists());
        assert!(config.io.outcome_log_path().exists());
        assert!(config.io.pattern_registry_path().exists());

        // A second engine should load the persisted state without error.
        let reloaded = WardenEngine::new(dir.path(), config).await.unwrap();
        assert_eq!(reloaded.stats().files_scanned, 0);
    }
}
