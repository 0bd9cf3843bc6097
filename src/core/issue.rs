//! The `Issue` data model (spec.md §3).

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, WardenError};

/// Severity of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Lowest priority; safe to batch-fix.
    Low,
    /// Default priority for routine quality issues.
    Medium,
    /// Elevated priority; requires a higher confidence bar to auto-apply.
    High,
    /// Highest priority; security-sensitive or otherwise dangerous.
    Critical,
}

impl Severity {
    /// Whether this severity is eligible for auto-fix under the baseline
    /// policy gate (spec.md §4.3): only low/medium are auto-fix eligible
    /// by default; critical/high can still be auto-fixed later if a stage
    /// clears the elevated confidence bar (§4.6).
    pub fn baseline_auto_fix_eligible(self) -> bool {
        matches!(self, Severity::Low | Severity::Medium)
    }

    /// Whether this severity counts as "critical security" for the
    /// elevated gate thresholds of spec.md §4.6.
    pub fn is_critical(self) -> bool {
        matches!(self, Severity::Critical)
    }
}

/// Kind of issue; determines which generators are eligible (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    /// Syntax-level defect.
    Syntax,
    /// Style/formatting issue.
    Style,
    /// Security-relevant issue.
    Security,
    /// Performance issue.
    Performance,
    /// Excess complexity.
    Complexity,
    /// Unused code.
    Unused,
    /// Anything not covered above.
    Other,
}

/// Safety classification used by the policy gate (spec.md §4.3): an issue
/// whose fix could plausibly change externally visible behavior is
/// "risky" and is routed directly to `needs_review` regardless of
/// severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Safety {
    /// Safe to attempt auto-fix.
    Safe,
    /// Must go to human review.
    Risky,
}

/// Final disposition of an issue once the Fix Pipeline has run to
/// completion for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// A candidate was validated and applied.
    AutoFixed,
    /// No stage produced an auto-applicable candidate; flagged for a human.
    NeedsReview,
    /// Explicitly postponed (e.g. by operator policy).
    Deferred,
    /// Every stage failed to produce any candidate at all.
    Unfixable,
}

/// A single-line/column source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// First line of the issue, 1-indexed.
    pub line_start: usize,
    /// Last line of the issue, 1-indexed (equal to `line_start` for
    /// single-line issues).
    pub line_end: usize,
    /// Column within `line_start`, 1-indexed, if known.
    pub column: Option<usize>,
}

/// A defect or quality issue detected in a single file (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Issue {
    /// Repository-relative path the issue was found in.
    pub file_path: String,
    /// Source location of the issue.
    pub span: SourceSpan,
    /// Category of the issue.
    pub kind: IssueKind,
    /// Severity of the issue.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Optional machine-readable rule code (e.g. linter rule id).
    pub code: Option<String>,
    /// Optional hint text a generator can use to bias its rewrite.
    pub hint: Option<String>,
    /// Safety classification for the policy gate.
    pub safety: Safety,
}

impl Issue {
    /// Validate the invariants from spec.md §3: `line >= 1` and a
    /// well-formed severity/kind. Called at the Review Client decode
    /// boundary so malformed external payloads never enter the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.span.line_start < 1 {
            return Err(WardenError::validation_field(
                "issue line must be >= 1",
                "span.line_start",
            ));
        }
        if self.span.line_end < self.span.line_start {
            return Err(WardenError::validation_field(
                "issue line_end must be >= line_start",
                "span.line_end",
            ));
        }
        if self.file_path.trim().is_empty() {
            return Err(WardenError::validation_field(
                "issue file_path must not be empty",
                "file_path",
            ));
        }
        Ok(())
    }

    /// Stable key used to correlate an issue across scans and in the
    /// Outcome Log: (path, starting line, kind).
    pub fn correlation_key(&self) -> (String, usize, IssueKind) {
        (self.file_path.clone(), self.span.line_start, self.kind)
    }

    /// Whether this issue is eligible for auto-fix under the baseline
    /// policy gate of spec.md §4.3.
    pub fn auto_fix_eligible(&self) -> bool {
        self.severity.baseline_auto_fix_eligible() && self.safety == Safety::Safe
    }
}
