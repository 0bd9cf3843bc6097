//! The `FixCandidate` data model (spec.md §3).

use serde::{Deserialize, Serialize};

/// Which Fix Pipeline stage produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Reused a literal rewrite from a similar resolved outcome.
    Reused,
    /// Applied a registered [`crate::core::pattern::Pattern`] transform.
    Pattern,
    /// A small, well-defined mechanical rewrite (stage 3 of spec.md §4.3).
    SimpleLine,
    /// Context-aware generator backend.
    GeneratorCtx,
    /// Codebase-aware generator backend.
    GeneratorCodebase,
    /// Advanced generator backend.
    GeneratorAdvanced,
    /// Specialist router backend.
    Specialist,
}

impl Method {
    /// The minimum calibrated confidence this method requires to
    /// auto-apply under the non-critical gate (spec.md §4.6).
    pub fn non_critical_threshold(self) -> f64 {
        match self {
            Method::Reused | Method::Pattern => 0.80,
            Method::GeneratorCtx | Method::GeneratorCodebase | Method::GeneratorAdvanced => 0.70,
            Method::SimpleLine => 0.75,
            Method::Specialist => 0.70,
        }
    }

    /// The minimum calibrated confidence this method requires to
    /// auto-apply a critical-security issue (spec.md §4.6). `SimpleLine`
    /// has no elevated tier: it is never used for critical issues.
    pub fn critical_threshold(self) -> Option<f64> {
        match self {
            Method::Reused | Method::Pattern => Some(0.90),
            Method::GeneratorCtx | Method::GeneratorCodebase | Method::GeneratorAdvanced => {
                Some(0.85)
            }
            Method::Specialist => Some(0.85),
            Method::SimpleLine => None,
        }
    }

    /// Whether this method is one of the three generator-cascade
    /// backends, which share a confidence tier.
    pub fn is_generator(self) -> bool {
        matches!(
            self,
            Method::GeneratorCtx | Method::GeneratorCodebase | Method::GeneratorAdvanced
        )
    }
}

/// A prediction of whether applying a candidate risks breaking behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactPrediction {
    /// Whether the predicted risk is high.
    pub high_risk: bool,
    /// Count of predicted breaking changes.
    pub breaking_changes: usize,
}

/// Recommended disposition from a cost/benefit analysis of applying a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiRecommendation {
    /// Apply immediately; benefit clearly exceeds cost.
    FixImmediately,
    /// Proceed under the normal gate thresholds.
    Normal,
    /// Do not auto-apply regardless of confidence.
    Defer,
}

/// Cost/benefit assessment of a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBenefit {
    /// Return-on-investment score; negative means net-negative to apply.
    pub roi: f64,
    /// The recommendation derived from `roi` and other signals.
    pub recommendation: RoiRecommendation,
}

/// A proposed replacement for a file produced by one Fix Pipeline stage
/// (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixCandidate {
    /// The full resulting file content if this candidate is applied.
    pub content: String,
    /// The stage that produced this candidate.
    pub method: Method,
    /// Raw (uncalibrated) confidence in `[0, 1]`.
    pub raw_confidence: f64,
    /// Confidence after the Learner's calibration bucket is applied.
    pub calibrated_confidence: Option<f64>,
    /// Optional impact prediction from an external analyzer.
    pub impact: Option<ImpactPrediction>,
    /// Optional cost/benefit record.
    pub cost_benefit: Option<CostBenefit>,
}

impl FixCandidate {
    /// Confidence to use for gating: calibrated if present, else raw.
    pub fn effective_confidence(&self) -> f64 {
        self.calibrated_confidence.unwrap_or(self.raw_confidence)
    }
}
