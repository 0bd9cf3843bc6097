//! Pattern Registry: compiled regex/transform patterns with success stats
//! (spec.md §3, §4.3 stage 2, §4.7).
//!
//! Grounded on the teacher's `io::cache::StopMotifCacheManager` atomic
//! persistence pattern and `PatternMiner` support-count bookkeeping,
//! generalized from boilerplate-mining into a live, learning registry of
//! text-rewrite rules.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::errors::{Result, WardenError};
use crate::io::persistence::{read_json_opt, write_atomic_json};

/// Minimum pattern-match confidence for stage 2 of the Fix Pipeline to
/// accept a candidate (spec.md §4.3).
pub const PATTERN_ACCEPT_THRESHOLD: f64 = 0.7;
/// Base confidence before the occurrence bonus.
const CONFIDENCE_BASE: f64 = 0.6;
/// Divisor for the occurrence-count bonus term.
const CONFIDENCE_DIVISOR: f64 = 333.0;
/// Cap on occurrence count considered for the bonus term.
const CONFIDENCE_OCCURRENCE_CAP: u64 = 100;
/// Ceiling on pattern-match confidence regardless of occurrence count.
const CONFIDENCE_CEILING: f64 = 0.9;
/// Pattern evolution: a literal rewrite becomes a new pattern after this
/// many cross-file successes (spec.md §4.7(c)(ii)).
pub const EVOLVE_SUCCESS_THRESHOLD: u32 = 3;
/// Pattern evolution: a pattern retires once its rolling success rate
/// drops below this over at least `RETIRE_MIN_TRIALS` trials.
pub const RETIRE_SUCCESS_RATE: f64 = 0.2;
/// Minimum trial count before retirement is considered.
pub const RETIRE_MIN_TRIALS: u32 = 10;

/// A compiled text-rewrite rule tracked by the Pattern Registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Stable fingerprint derived from the matcher text.
    pub fingerprint: String,
    /// Regex source used to match candidate lines/spans.
    pub matcher: String,
    /// Replacement template: `$1`-style capture-group references or a
    /// literal replacement string.
    pub replacement: String,
    /// Cumulative times this pattern has matched a candidate site.
    pub occurrence_count: u64,
    /// Times an application of this pattern was accepted (applied and not
    /// later reverted/failed validation).
    pub success_count: u32,
    /// Times an application of this pattern failed validation or was
    /// reverted.
    pub failure_count: u32,
}

impl Pattern {
    /// Create and register a new pattern from matcher/replacement text,
    /// rejecting it per spec.md §3 if its transform would unbalance
    /// delimiters when applied to an empty-balanced probe string.
    pub fn new(matcher: impl Into<String>, replacement: impl Into<String>) -> Result<Self> {
        let matcher = matcher.into();
        let replacement = replacement.into();
        let compiled = Regex::new(&matcher)
            .map_err(|e| WardenError::pattern(format!("invalid matcher regex: {e}")))?;

        // Registration-time safety check: applying the transform to a
        // trivially balanced probe must not introduce a delimiter
        // imbalance (spec.md §3 invariant).
        let probe = "{ ( [ ] ) }";
        if compiled.is_match(probe) {
            let rewritten = compiled.replace_all(probe, replacement.as_str());
            if !crate::core::validator::delimiters_exactly_balanced(&rewritten) {
                return Err(WardenError::pattern(
                    "pattern transform would unbalance delimiters",
                ));
            }
        }

        Ok(Self {
            fingerprint: Self::fingerprint_for(&matcher, &replacement),
            matcher,
            replacement,
            occurrence_count: 0,
            success_count: 0,
            failure_count: 0,
        })
    }

    /// Stable fingerprint for a (matcher, replacement) pair.
    pub fn fingerprint_for(matcher: &str, replacement: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(matcher.as_bytes());
        hasher.update(b"\0");
        hasher.update(replacement.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Derived success rate: `success / (success + failure + eps)`.
    pub fn success_rate(&self) -> f64 {
        let denom = f64::from(self.success_count) + f64::from(self.failure_count) + f64::EPSILON;
        f64::from(self.success_count) / denom
    }

    /// Confidence formula from spec.md §4.3: `0.6 + min(occurrence, 100) /
    /// 333`, capped at 0.9. Monotonic non-decreasing in occurrence count
    /// and never selected when `occurrence_count == 0`.
    pub fn confidence(&self) -> f64 {
        if self.occurrence_count == 0 {
            return 0.0;
        }
        let capped = self.occurrence_count.min(CONFIDENCE_OCCURRENCE_CAP) as f64;
        (CONFIDENCE_BASE + capped / CONFIDENCE_DIVISOR).min(CONFIDENCE_CEILING)
    }

    /// Total trials recorded against this pattern.
    pub fn trials(&self) -> u32 {
        self.success_count + self.failure_count
    }

    /// Whether this pattern should be retired per spec.md §4.7(c)(iii).
    pub fn should_retire(&self) -> bool {
        self.trials() >= RETIRE_MIN_TRIALS && self.success_rate() < RETIRE_SUCCESS_RATE
    }

    /// Attempt to apply this pattern's transform to `source`, returning the
    /// rewritten text if the matcher hit at least once.
    pub fn try_apply(&self, source: &str) -> Result<Option<String>> {
        let compiled = Regex::new(&self.matcher)
            .map_err(|e| WardenError::pattern(format!("invalid matcher regex: {e}")))?;
        if !compiled.is_match(source) {
            return Ok(None);
        }
        let rewritten = compiled.replace_all(source, self.replacement.as_str());
        Ok(Some(rewritten.into_owned()))
    }
}

/// Registry of active patterns, keyed by fingerprint, with success/failure
/// bookkeeping and the evolution routine of spec.md §4.7(c).
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    inner: Arc<RwLock<HashMap<String, Pattern>>>,
}

impl PatternRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a previously persisted JSON snapshot,
    /// tolerating a missing file (first run).
    pub fn load(path: &Path) -> Result<Self> {
        let patterns = read_json_opt::<Vec<Pattern>>(path)?.unwrap_or_default();
        let map = patterns
            .into_iter()
            .map(|p| (p.fingerprint.clone(), p))
            .collect::<HashMap<_, _>>();
        Ok(Self {
            inner: Arc::new(RwLock::new(map)),
        })
    }

    /// Persist the registry atomically (write-temp-then-rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot: Vec<Pattern> = self.inner.read().values().cloned().collect();
        write_atomic_json(path, &snapshot)
    }

    /// Register a new pattern, rejecting malformed transforms (spec.md §3).
    /// Returns the existing pattern unchanged if one with the same
    /// fingerprint is already registered.
    pub fn register(&self, pattern: Pattern) -> Result<()> {
        let mut guard = self.inner.write();
        guard.entry(pattern.fingerprint.clone()).or_insert(pattern);
        Ok(())
    }

    /// All patterns whose compiled matcher yields at least one hit against
    /// `source`, ordered by descending confidence (spec.md §4.3 stage 2).
    pub fn matching(&self, source: &str) -> Vec<Pattern> {
        let guard = self.inner.read();
        let mut matches: Vec<Pattern> = guard
            .values()
            .filter(|p| p.occurrence_count > 0)
            .filter(|p| {
                Regex::new(&p.matcher)
                    .map(|re| re.is_match(source))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.confidence()
                .partial_cmp(&a.confidence())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches
    }

    /// Record an occurrence (the pattern matched a candidate site,
    /// regardless of outcome).
    pub fn record_occurrence(&self, fingerprint: &str) {
        if let Some(p) = self.inner.write().get_mut(fingerprint) {
            p.occurrence_count += 1;
        }
    }

    /// Record a successful application outcome (Learner step (a),
    /// spec.md §4.7).
    pub fn record_success(&self, fingerprint: &str) {
        if let Some(p) = self.inner.write().get_mut(fingerprint) {
            p.success_count += 1;
        }
    }

    /// Record a failed application outcome.
    pub fn record_failure(&self, fingerprint: &str) {
        if let Some(p) = self.inner.write().get_mut(fingerprint) {
            p.failure_count += 1;
        }
    }

    /// Run the evolution routine (spec.md §4.7(c)): retire patterns whose
    /// rolling success rate has collapsed. Deriving brand-new patterns from
    /// repeated literal rewrites (ii) is driven by the Learner, which calls
    /// [`PatternRegistry::register`] directly once it observes three
    /// cross-file successes of the same rewrite.
    pub fn evolve(&self) -> Vec<String> {
        let mut guard = self.inner.write();
        let retiring: Vec<String> = guard
            .values()
            .filter(|p| p.should_retire())
            .map(|p| p.fingerprint.clone())
            .collect();
        for fp in &retiring {
            guard.remove(fp);
        }
        retiring
    }

    /// Number of registered patterns.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the registry has no patterns.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a pattern by fingerprint.
    pub fn get(&self, fingerprint: &str) -> Option<Pattern> {
        self.inner.read().get(fingerprint).cloned()
    }
}
