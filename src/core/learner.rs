//! Learner: updates pattern stats, calibration buckets, and drives pattern
//! evolution after each Outcome Record (spec.md §4.7).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::candidate::Method;
use crate::core::issue::IssueKind;
use crate::core::outcome::OutcomeRecord;
use crate::core::pattern::{Pattern, PatternRegistry, EVOLVE_SUCCESS_THRESHOLD};

/// Key into the calibration-bucket map: (method, issue kind, domain hint)
/// (spec.md §4.7(b)). `domain` is the free-text hint a Generator backend
/// may attach to a candidate (see SPEC_FULL.md §6's `hints` bag).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalibrationKey {
    /// The method that produced the candidate.
    pub method: Method,
    /// The issue kind the candidate addressed.
    pub kind: IssueKind,
    /// Generator-supplied domain hint, or an empty string when absent.
    pub domain: String,
}

/// Binary success-rate bucket for one [`CalibrationKey`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationBucket {
    /// Successful outcomes recorded in this bucket.
    pub successes: u32,
    /// Failed outcomes recorded in this bucket.
    pub failures: u32,
}

/// Prior strength (in pseudo-trials) given to a candidate's own raw
/// confidence before any outcomes have been observed for its bucket. A
/// fresh bucket must calibrate to the raw confidence unchanged — spec.md
/// §8 scenario 2 expects a first-ever trailing-whitespace fix to auto-apply
/// with no prior learning — so the rate is a Beta-smoothed blend of
/// `raw_confidence` (weighted `PRIOR_STRENGTH`) and the observed
/// successes/failures, converging to the empirical rate as trials
/// accumulate.
const PRIOR_STRENGTH: f64 = 5.0;

impl CalibrationBucket {
    /// Calibrated success rate, used to scale a candidate's raw confidence.
    /// `raw_confidence` seeds the Beta prior so a bucket with no observed
    /// outcomes yet returns `raw_confidence` unchanged.
    pub fn rate(&self, raw_confidence: f64) -> f64 {
        let total = f64::from(self.successes + self.failures);
        let prior_successes = raw_confidence * PRIOR_STRENGTH;
        (prior_successes + f64::from(self.successes)) / (PRIOR_STRENGTH + total)
    }
}

/// Tracks literal "before -> after" rewrites pending promotion to a
/// registered [`Pattern`] once they have succeeded across enough distinct
/// files (spec.md §4.7(c)(ii)).
#[derive(Debug, Default)]
struct PendingRewrite {
    files: std::collections::HashSet<String>,
}

/// The Learner: stateful bookkeeping driven by completed outcomes.
#[derive(Debug, Clone)]
pub struct Learner {
    calibration: Arc<RwLock<HashMap<CalibrationKey, CalibrationBucket>>>,
    pending_rewrites: Arc<RwLock<HashMap<(String, String), PendingRewrite>>>,
}

impl Default for Learner {
    fn default() -> Self {
        Self {
            calibration: Arc::new(RwLock::new(HashMap::new())),
            pending_rewrites: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Learner {
    /// Create a new Learner with empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one completed [`OutcomeRecord`] against the given
    /// [`PatternRegistry`] (spec.md §4.7 (a)-(c)).
    pub fn observe(&self, outcome: &OutcomeRecord, registry: &PatternRegistry, domain: &str) {
        let Some(method) = outcome.method else {
            return;
        };
        let succeeded = outcome.applied && outcome.validated.unwrap_or(false);

        self.update_calibration(method, outcome.kind, domain, succeeded);

        if method == Method::Pattern {
            self.update_pattern_stats(outcome, registry, succeeded);
        }

        if succeeded {
            if let (Some(before), Some(after)) = (&outcome.before, &outcome.after) {
                self.track_rewrite_for_evolution(before, after, &outcome.file_path, registry);
            }
        }
    }

    fn update_calibration(&self, method: Method, kind: IssueKind, domain: &str, succeeded: bool) {
        let key = CalibrationKey {
            method,
            kind,
            domain: domain.to_string(),
        };
        let mut guard = self.calibration.write();
        let bucket = guard.entry(key).or_default();
        if succeeded {
            bucket.successes += 1;
        } else {
            bucket.failures += 1;
        }
    }

    fn update_pattern_stats(&self, outcome: &OutcomeRecord, registry: &PatternRegistry, succeeded: bool) {
        let Some((before, after)) = outcome.before.as_ref().zip(outcome.after.as_ref()) else {
            return;
        };
        let fingerprint = Pattern::fingerprint_for(before, after);
        if succeeded {
            registry.record_success(&fingerprint);
        } else {
            registry.record_failure(&fingerprint);
        }
    }

    /// Spec.md §4.7(c)(ii): derive a new Pattern once the same literal
    /// rewrite has succeeded across >= 3 distinct files.
    fn track_rewrite_for_evolution(
        &self,
        before: &str,
        after: &str,
        file_path: &str,
        registry: &PatternRegistry,
    ) {
        let key = (before.to_string(), after.to_string());
        let mut guard = self.pending_rewrites.write();
        let entry = guard.entry(key).or_default();
        entry.files.insert(file_path.to_string());

        if entry.files.len() as u32 >= EVOLVE_SUCCESS_THRESHOLD {
            if let Ok(pattern) = Pattern::new(regex::escape(before), after) {
                let fingerprint = pattern.fingerprint.clone();
                if registry.register(pattern).is_ok() {
                    registry.record_occurrence(&fingerprint);
                }
            }
        }
    }

    /// Calibrated confidence fed to the Gate (spec.md §4.6, §4.7(b)): the
    /// (method, kind, domain) bucket's Beta-smoothed success rate, seeded
    /// by the candidate's own raw confidence so a bucket with no observed
    /// outcomes yet calibrates to `raw_confidence` unchanged.
    pub fn calibrate(&self, method: Method, kind: IssueKind, domain: &str, raw_confidence: f64) -> f64 {
        self.calibration_rate(method, kind, domain, raw_confidence).clamp(0.0, 1.0)
    }

    /// Calibrated confidence rate for a (method, kind, domain) bucket.
    pub fn calibration_rate(&self, method: Method, kind: IssueKind, domain: &str, raw_confidence: f64) -> f64 {
        let key = CalibrationKey {
            method,
            kind,
            domain: domain.to_string(),
        };
        self.calibration
            .read()
            .get(&key)
            .map(|bucket| bucket.rate(raw_confidence))
            .unwrap_or(raw_confidence)
    }

    /// Run [`PatternRegistry::evolve`] to retire collapsed patterns
    /// (spec.md §4.7(c)(iii)).
    pub fn evolve(&self, registry: &PatternRegistry) -> Vec<String> {
        registry.evolve()
    }
}
