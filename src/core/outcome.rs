//! Outcome Log: durable record of each fix attempt and its result
//! (spec.md §3, §4.7; also used by the Reuse stage of §4.3).

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::candidate::Method;
use crate::core::errors::Result;
use crate::core::issue::{Issue, IssueKind, IssueStatus, Severity};
use crate::io::persistence::{read_json_opt, write_atomic_json};

/// A durable record of one issue's final disposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Repository-relative path the issue was found in.
    pub file_path: String,
    /// Starting line of the issue.
    pub line: usize,
    /// Issue kind.
    pub kind: IssueKind,
    /// Issue severity.
    pub severity: Severity,
    /// Issue message, retained for similarity scoring in the Reuse stage.
    pub message: String,
    /// The method that produced the winning (or best attempted) candidate.
    pub method: Option<Method>,
    /// Raw confidence of the attempted candidate, if any.
    pub raw_confidence: Option<f64>,
    /// Calibrated confidence of the attempted candidate, if any.
    pub calibrated_confidence: Option<f64>,
    /// Whether the validator reported the candidate as verified.
    pub validated: Option<bool>,
    /// Whether the candidate was actually applied to disk.
    pub applied: bool,
    /// The literal "before" text this outcome resolved, if the fix was a
    /// pure textual rewrite (used by the Reuse stage).
    pub before: Option<String>,
    /// The literal "after" text, paired with `before`.
    pub after: Option<String>,
    /// Post-application error, if applying succeeded but something else
    /// about the write failed.
    pub post_application_error: Option<String>,
    /// Final disposition.
    pub status: IssueStatus,
    /// When this outcome was recorded.
    pub timestamp: DateTime<Utc>,
}

impl OutcomeRecord {
    /// Build a resolved ("applied") outcome for an issue whose fix was a
    /// literal before/after rewrite.
    pub fn resolved(
        issue: &Issue,
        method: Method,
        raw_confidence: f64,
        calibrated_confidence: Option<f64>,
        before: String,
        after: String,
    ) -> Self {
        Self {
            file_path: issue.file_path.clone(),
            line: issue.span.line_start,
            kind: issue.kind,
            severity: issue.severity,
            message: issue.message.clone(),
            method: Some(method),
            raw_confidence: Some(raw_confidence),
            calibrated_confidence,
            validated: Some(true),
            applied: true,
            before: Some(before),
            after: Some(after),
            post_application_error: None,
            status: IssueStatus::AutoFixed,
            timestamp: Utc::now(),
        }
    }

    /// Build a `needs_review` outcome for an issue where a stage produced a
    /// candidate but the Gate declined to apply it. Unlike
    /// [`OutcomeRecord::needs_review`], `method`/`raw_confidence` are
    /// retained so the Learner still updates the calibration bucket for
    /// this (method, kind, domain) as a failure.
    pub fn gate_declined(
        issue: &Issue,
        method: Method,
        raw_confidence: f64,
        calibrated_confidence: Option<f64>,
        validated: bool,
    ) -> Self {
        Self {
            file_path: issue.file_path.clone(),
            line: issue.span.line_start,
            kind: issue.kind,
            severity: issue.severity,
            message: issue.message.clone(),
            method: Some(method),
            raw_confidence: Some(raw_confidence),
            calibrated_confidence,
            validated: Some(validated),
            applied: false,
            before: None,
            after: None,
            post_application_error: None,
            status: IssueStatus::NeedsReview,
            timestamp: Utc::now(),
        }
    }

    /// Build a `needs_review` outcome for an issue no stage could confidently
    /// resolve.
    pub fn needs_review(issue: &Issue) -> Self {
        Self {
            file_path: issue.file_path.clone(),
            line: issue.span.line_start,
            kind: issue.kind,
            severity: issue.severity,
            message: issue.message.clone(),
            method: None,
            raw_confidence: None,
            calibrated_confidence: None,
            validated: None,
            applied: false,
            before: None,
            after: None,
            post_application_error: None,
            status: IssueStatus::NeedsReview,
            timestamp: Utc::now(),
        }
    }
}

/// Similarity-ranked candidate from the Outcome Log, used by the Reuse
/// stage (spec.md §4.3 stage 1).
#[derive(Debug, Clone)]
pub struct ReuseCandidate {
    /// The matched outcome record.
    pub outcome: OutcomeRecord,
    /// Aggregate similarity score (0-100) per spec.md's named constants.
    pub score: u32,
}

/// Append-only, in-memory-backed durable outcome log. Queried by the Reuse
/// stage and updated by the Learner after every pipeline completion.
#[derive(Debug, Clone, Default)]
pub struct OutcomeLog {
    records: Arc<RwLock<Vec<OutcomeRecord>>>,
}

impl OutcomeLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a log from a previously persisted JSON snapshot, tolerating a
    /// missing file (first run).
    pub fn load(path: &Path) -> Result<Self> {
        let records = read_json_opt::<Vec<OutcomeRecord>>(path)?.unwrap_or_default();
        Ok(Self {
            records: Arc::new(RwLock::new(records)),
        })
    }

    /// Persist the log atomically (write-temp-then-rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic_json(path, &*self.records.read())
    }

    /// Append a new outcome record.
    pub fn append(&self, record: OutcomeRecord) {
        self.records.write().push(record);
    }

    /// Snapshot all records (cheap clone of an `Arc<RwLock<Vec<_>>>`
    /// contents, used by persistence and the `status` CLI command).
    pub fn snapshot(&self) -> Vec<OutcomeRecord> {
        self.records.read().clone()
    }

    /// Exact/type/keyword similarity scoring against resolved outcomes for
    /// a new issue, per spec.md §4.3 stage 1's named constants: exact match
    /// 50 pts, type+severity match 30 pts, keyword overlap up to 20 pts
    /// (top ≥ 4 chars, top-3 keywords).
    pub fn best_reuse_candidate(&self, issue: &Issue) -> Option<ReuseCandidate> {
        let issue_keywords = crate::core::similarity::top_keywords(&issue.message, 3, 4);
        let guard = self.records.read();
        guard
            .iter()
            .filter(|r| r.status == IssueStatus::AutoFixed && r.before.is_some() && r.after.is_some())
            .filter_map(|r| {
                let score = crate::core::similarity::score(issue, r, &issue_keywords);
                if score > 0 {
                    Some(ReuseCandidate {
                        outcome: r.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .max_by_key(|c| c.score)
    }

    /// Number of records in the log.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::issue::{Safety, SourceSpan};

    fn issue(message: &str) -> Issue {
        Issue {
            file_path: "a.js".to_string(),
            span: SourceSpan {
                line_start: 1,
                line_end: 1,
                column: None,
            },
            kind: IssueKind::Style,
            severity: Severity::Low,
            message: message.to_string(),
            code: None,
            hint: None,
            safety: Safety::Safe,
        }
    }

    #[test]
    fn test_reuse_exact_match_scores_highest() {
        let log = OutcomeLog::new();
        let original = issue("loose equality check");
        log.append(OutcomeRecord::resolved(
            &original,
            Method::Pattern,
            0.8,
            Some(0.85),
            "== null".to_string(),
            "=== null".to_string(),
        ));

        let new_issue = issue("loose equality check");
        let best = log.best_reuse_candidate(&new_issue).unwrap();
        assert_eq!(best.score, 100);
    }

    #[test]
    fn test_no_match_returns_none() {
        let log = OutcomeLog::new();
        let new_issue = issue("anything");
        assert!(log.best_reuse_candidate(&new_issue).is_none());
    }
}
