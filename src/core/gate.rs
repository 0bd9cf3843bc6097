//! Gate policy: decides whether a validated [`FixCandidate`] is safe to
//! auto-apply (spec.md §4.6).

use serde::{Deserialize, Serialize};

use crate::core::candidate::{FixCandidate, RoiRecommendation};
use crate::core::config::GateConfig;
use crate::core::issue::Severity;
use crate::core::validator::ValidationResult;

/// Confidence floor required when the impact predictor reports high risk
/// with at least one breaking change, overriding the method's own
/// threshold (spec.md §4.6).
pub const HIGH_RISK_FLOOR: f64 = 0.90;
/// Relaxed floor applied when the cost/benefit analysis recommends
/// immediate fixing.
pub const FIX_IMMEDIATELY_FLOOR: f64 = 0.70;
/// Calibrated confidence above which validator warnings (verified=false)
/// are overridden (spec.md §4.6).
pub const VALIDATION_OVERRIDE_FLOOR: f64 = 0.85;

/// Outcome of the gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Apply the candidate.
    AutoApply,
    /// Apply only under the ultra-aggressive last-resort tier.
    UltraAggressiveApply,
    /// Do not apply; route to `needs_review`.
    NeedsReview,
}

impl GateDecision {
    /// Whether this decision results in the candidate being applied.
    pub fn applies(self) -> bool {
        matches!(self, Self::AutoApply | Self::UltraAggressiveApply)
    }
}

/// Decide whether `candidate` may be auto-applied for an issue of the
/// given `severity`, given its `validation` result and the engine's
/// [`GateConfig`] (spec.md §4.6, verbatim).
pub fn decide(
    candidate: &FixCandidate,
    severity: Severity,
    validation: &ValidationResult,
    config: &GateConfig,
) -> GateDecision {
    let confidence = candidate.effective_confidence();

    if let Some(cost_benefit) = &candidate.cost_benefit {
        if cost_benefit.roi < 0.0 {
            return GateDecision::NeedsReview;
        }
    }

    if !validation.verified && confidence < VALIDATION_OVERRIDE_FLOOR {
        return GateDecision::NeedsReview;
    }

    if let Some(impact) = &candidate.impact {
        if impact.high_risk && impact.breaking_changes >= 1 && confidence < HIGH_RISK_FLOOR {
            return GateDecision::NeedsReview;
        }
    }

    let is_critical = severity.is_critical();
    let base_threshold = if is_critical {
        match candidate.method.critical_threshold() {
            Some(t) => t,
            None => return GateDecision::NeedsReview,
        }
    } else {
        candidate.method.non_critical_threshold()
    };

    let threshold = if matches!(
        candidate.cost_benefit.as_ref().map(|cb| cb.recommendation),
        Some(RoiRecommendation::FixImmediately)
    ) {
        base_threshold.min(FIX_IMMEDIATELY_FLOOR)
    } else {
        base_threshold
    };

    if confidence >= threshold {
        return GateDecision::AutoApply;
    }

    if config.ultra_aggressive
        && validation.verified
        && confidence >= config.ultra_aggressive_threshold
    {
        return GateDecision::UltraAggressiveApply;
    }

    GateDecision::NeedsReview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::{CostBenefit, ImpactPrediction, Method};

    fn candidate(method: Method, confidence: f64) -> FixCandidate {
        FixCandidate {
            content: String::new(),
            method,
            raw_confidence: confidence,
            calibrated_confidence: Some(confidence),
            impact: None,
            cost_benefit: None,
        }
    }

    fn ok_validation() -> ValidationResult {
        super::super::validator::validate("a", "a", &crate::core::config::ValidatorConfig::default())
    }

    #[test]
    fn test_reused_meets_non_critical_threshold() {
        let c = candidate(Method::Reused, 0.80);
        let decision = decide(&c, Severity::Low, &ok_validation(), &GateConfig::default());
        assert_eq!(decision, GateDecision::AutoApply);
    }

    #[test]
    fn test_reused_below_threshold_needs_review() {
        let c = candidate(Method::Reused, 0.79);
        let decision = decide(&c, Severity::Low, &ok_validation(), &GateConfig::default());
        assert_eq!(decision, GateDecision::NeedsReview);
    }

    #[test]
    fn test_critical_requires_elevated_threshold() {
        let c = candidate(Method::Pattern, 0.85);
        let decision = decide(&c, Severity::Critical, &ok_validation(), &GateConfig::default());
        assert_eq!(decision, GateDecision::NeedsReview);

        let c = candidate(Method::Pattern, 0.90);
        let decision = decide(&c, Severity::Critical, &ok_validation(), &GateConfig::default());
        assert_eq!(decision, GateDecision::AutoApply);
    }

    #[test]
    fn test_simple_line_never_applies_to_critical() {
        let c = candidate(Method::SimpleLine, 0.99);
        let decision = decide(&c, Severity::Critical, &ok_validation(), &GateConfig::default());
        assert_eq!(decision, GateDecision::NeedsReview);
    }

    #[test]
    fn test_negative_roi_always_blocked() {
        let mut c = candidate(Method::Reused, 0.99);
        c.cost_benefit = Some(CostBenefit {
            roi: -0.5,
            recommendation: RoiRecommendation::Normal,
        });
        let decision = decide(&c, Severity::Low, &ok_validation(), &GateConfig::default());
        assert_eq!(decision, GateDecision::NeedsReview);
    }

    #[test]
    fn test_fix_immediately_relaxes_threshold() {
        let mut c = candidate(Method::Reused, 0.70);
        c.cost_benefit = Some(CostBenefit {
            roi: 1.0,
            recommendation: RoiRecommendation::FixImmediately,
        });
        let decision = decide(&c, Severity::Low, &ok_validation(), &GateConfig::default());
        assert_eq!(decision, GateDecision::AutoApply);
    }

    #[test]
    fn test_high_risk_breaking_change_requires_0_90() {
        let mut c = candidate(Method::Reused, 0.85);
        c.impact = Some(ImpactPrediction {
            high_risk: true,
            breaking_changes: 1,
        });
        let decision = decide(&c, Severity::Low, &ok_validation(), &GateConfig::default());
        assert_eq!(decision, GateDecision::NeedsReview);
    }

    #[test]
    fn test_unverified_overridden_by_high_confidence() {
        let validation = ValidationResult {
            verified: false,
            errors: vec!["minor warning".to_string()],
            applied: false,
        };
        let c = candidate(Method::Reused, 0.90);
        let decision = decide(&c, Severity::Low, &validation, &GateConfig::default());
        assert_eq!(decision, GateDecision::AutoApply);
    }

    #[test]
    fn test_ultra_aggressive_last_resort() {
        let mut config = GateConfig::default();
        config.ultra_aggressive = true;
        let c = candidate(Method::Specialist, 0.30);
        let decision = decide(&c, Severity::Low, &ok_validation(), &config);
        assert_eq!(decision, GateDecision::UltraAggressiveApply);
    }

    #[test]
    fn test_ultra_aggressive_disabled_by_default() {
        let c = candidate(Method::Specialist, 0.30);
        let decision = decide(&c, Severity::Low, &ok_validation(), &GateConfig::default());
        assert_eq!(decision, GateDecision::NeedsReview);
    }
}
