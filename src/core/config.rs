//! Configuration types for warden-rs.
//!
//! Grounded on the teacher's `ValknutConfig`: a single nested, serde-derived
//! struct loaded from YAML with a `validate()` pass, sub-structs per
//! concern, and programmatic defaults covering every field.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, WardenError};

/// Root configuration for the warden engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Work Selector behavior.
    pub selector: SelectorConfig,
    /// File Analyzer gating.
    pub analyzer: AnalyzerConfig,
    /// Validator behavior.
    pub validator: ValidatorConfig,
    /// Gate policy.
    pub gate: GateConfig,
    /// Scheduler / concurrency.
    pub scheduler: SchedulerConfig,
    /// Persistence paths.
    pub io: IoConfig,
    /// External adapter endpoints.
    pub adapters: AdapterConfig,
}

impl WardenConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| WardenError::io(format!("failed to read config file: {}", path.display()), e))?;
        serde_yaml::from_str(&content).map_err(Into::into)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .map_err(|e| WardenError::io(format!("failed to write config file: {}", path.display()), e))
    }

    /// Validate all sub-configurations.
    pub fn validate(&self) -> Result<()> {
        self.selector.validate()?;
        self.analyzer.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }
}

/// Work Selector configuration (spec.md §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Maximum work items returned per cycle across all four sources.
    pub batch_size: usize,
    /// Weight given to explicit task-queue entries (source 1) vs. others.
    pub explicit_task_weight: f64,
    /// Maximum files considered by the full-walk fallback (source 4).
    pub full_walk_cap: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            explicit_task_weight: 1.0,
            full_walk_cap: 5_000,
        }
    }
}

impl SelectorConfig {
    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(WardenError::config_field("batch_size must be > 0", "selector.batch_size"));
        }
        Ok(())
    }
}

/// File Analyzer gating configuration (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Cache TTL in seconds before a file is re-analyzed unconditionally.
    pub cache_ttl_seconds: u64,
    /// Files larger than this are skipped entirely.
    pub max_file_size_bytes: u64,
    /// Source file extensions considered for analysis (without the dot).
    pub extensions: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 24 * 60 * 60,
            max_file_size_bytes: 2 * 1024 * 1024,
            extensions: vec![
                "js".to_string(),
                "ts".to_string(),
                "jsx".to_string(),
                "tsx".to_string(),
                "py".to_string(),
                "rs".to_string(),
                "go".to_string(),
            ],
        }
    }
}

impl AnalyzerConfig {
    fn validate(&self) -> Result<()> {
        if self.max_file_size_bytes == 0 {
            return Err(WardenError::config_field(
                "max_file_size_bytes must be > 0",
                "analyzer.max_file_size_bytes",
            ));
        }
        Ok(())
    }

    /// Convenience accessor for the TTL as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

/// Validator configuration (spec.md §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Maximum allowed difference between opening and closing delimiter
    /// counts in each class before a candidate is rejected.
    pub delimiter_tolerance: usize,
    /// Timeout for an optional parse check, in milliseconds.
    pub parse_check_timeout_ms: u64,
    /// Timeout for an optional lint check, in milliseconds.
    pub lint_check_timeout_ms: u64,
    /// Timeout for an optional test check, in milliseconds.
    pub test_check_timeout_ms: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            delimiter_tolerance: 2,
            parse_check_timeout_ms: 5_000,
            lint_check_timeout_ms: 10_000,
            test_check_timeout_ms: 60_000,
        }
    }
}

/// Gate policy configuration (spec.md §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Enables the 0.25 ultra-aggressive confidence tier for non-critical,
    /// reversible, low-cost fixes.
    pub ultra_aggressive: bool,
    /// Confidence floor used by the ultra-aggressive tier.
    pub ultra_aggressive_threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ultra_aggressive: false,
            ultra_aggressive_threshold: 0.25,
        }
    }
}

/// Scheduler / concurrency configuration (spec.md §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Explicit concurrency cap; `None` derives `max(cpu_count, 10)`.
    pub max_concurrency: Option<usize>,
    /// How often run statistics are persisted, in seconds.
    pub stats_flush_interval_seconds: u64,
    /// Whether gate-approved candidates are actually written by the
    /// Applier. When `false` every issue that would otherwise auto-apply
    /// is instead recorded `needs_review`, giving a report-only run (the
    /// CLI's `crawl --auto-fix` flag, §6).
    pub auto_fix: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            stats_flush_interval_seconds: 30,
            auto_fix: true,
        }
    }
}

impl SchedulerConfig {
    fn validate(&self) -> Result<()> {
        if let Some(0) = self.max_concurrency {
            return Err(WardenError::config_field(
                "max_concurrency must be > 0 when set",
                "scheduler.max_concurrency",
            ));
        }
        Ok(())
    }

    /// Resolve the effective concurrency: `max(cpu_count, 10)` unless
    /// overridden (spec.md §5).
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .max(10)
        })
    }
}

/// Persistence paths (spec.md §3, §9(b)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    /// Root directory for all persisted engine state.
    pub state_dir: PathBuf,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".warden"),
        }
    }
}

impl IoConfig {
    /// Path to the Cache Store snapshot.
    pub fn cache_path(&self) -> PathBuf {
        self.state_dir.join("cache.json")
    }

    /// Path to the Outcome Log snapshot.
    pub fn outcome_log_path(&self) -> PathBuf {
        self.state_dir.join("outcomes.json")
    }

    /// Path to the Pattern Registry snapshot.
    pub fn pattern_registry_path(&self) -> PathBuf {
        self.state_dir.join("patterns.json")
    }

    /// Path to the persisted [`crate::core::stats::RunStats`].
    pub fn run_stats_path(&self) -> PathBuf {
        self.state_dir.join("run_stats.json")
    }

    /// Path to the persisted [`crate::vcs::Checkpoint`].
    pub fn checkpoint_path(&self) -> PathBuf {
        self.state_dir.join("checkpoint.json")
    }

    /// Path to the [`crate::adapters::store::JsonFileStore`] health-score
    /// snapshot.
    pub fn health_store_path(&self) -> PathBuf {
        self.state_dir.join("health.json")
    }
}

/// External adapter endpoint configuration (SPEC_FULL.md §6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdapterConfig {
    /// Generator backend base URLs, keyed by backend name
    /// (`ctx`, `codebase`, `advanced`).
    pub generator_endpoints: HashMap<String, String>,
    /// Specialist router base URL.
    pub specialist_endpoint: Option<String>,
    /// Code search backend base URL.
    pub search_endpoint: Option<String>,
    /// Human review queue webhook URL.
    pub review_webhook: Option<String>,
    /// Notification webhook URL (Slack/email bridge).
    pub notifier_webhook: Option<String>,
    /// Request timeout in milliseconds shared by all HTTP adapters.
    pub request_timeout_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_validates() {
        WardenConfig::default().validate().unwrap();
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("warden.yaml");
        let config = WardenConfig::default();
        config.to_yaml_file(&path).unwrap();
        let loaded = WardenConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.selector.batch_size, config.selector.batch_size);
    }

    #[test]
    fn test_effective_concurrency_floor() {
        let config = SchedulerConfig::default();
        assert!(config.effective_concurrency() >= 10);
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let mut config = WardenConfig::default();
        config.selector.batch_size = 0;
        assert!(config.validate().is_err());
    }
}
