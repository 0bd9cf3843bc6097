//! Validator: structural checks, dangerous-pattern rejection, and optional
//! parse/lint/test sub-checks (spec.md §4.4).
//!
//! The dangerous-pattern table is grounded on the `DangerousPattern`/
//! `DangerousPatternType` shape seen in the retrieval pack's consensus
//! analyzers (`other_examples/.../operation_intelligence.rs`), adapted to
//! regex-based detection over candidate source text.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::config::ValidatorConfig;

/// Maximum imbalance tolerated in any one delimiter class before a
/// candidate is rejected (spec.md §4.4).
pub const DELIMITER_TOLERANCE: usize = 2;

/// Timeout for the optional parse check.
pub const PARSE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for the optional lint check.
pub const LINT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for the optional test invocation.
pub const TEST_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of running the Validator over a candidate (spec.md §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the candidate is safe to hand to the Applier.
    pub verified: bool,
    /// Human-readable reasons the candidate failed, if any.
    pub errors: Vec<String>,
    /// Always false: the Validator never writes.
    pub applied: bool,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            verified: true,
            errors: Vec::new(),
            applied: false,
        }
    }

    fn failed(errors: Vec<String>) -> Self {
        Self {
            verified: false,
            errors,
            applied: false,
        }
    }
}

static DANGEROUS_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("eval(", Regex::new(r"\beval\s*\(").unwrap()),
        ("dynamic Function(", Regex::new(r"\bFunction\s*\(").unwrap()),
        (
            "direct HTML-sink assignment",
            Regex::new(r"\.innerHTML\s*=").unwrap(),
        ),
        (
            "document-writing call",
            Regex::new(r"\bdocument\.write(ln)?\s*\(").unwrap(),
        ),
    ]
});

/// Count of each delimiter class's open/close characters in `text`.
pub(crate) fn delimiter_counts(text: &str, open: char, close: char) -> (usize, usize) {
    let opens = text.chars().filter(|c| *c == open).count();
    let closes = text.chars().filter(|c| *c == close).count();
    (opens, closes)
}

/// Whether `text`'s `{}`, `()`, `[]` counts are each balanced within
/// [`DELIMITER_TOLERANCE`] (spec.md §4.4 validator check).
pub fn delimiters_balanced(text: &str) -> bool {
    [('{', '}'), ('(', ')'), ('[', ']')]
        .iter()
        .all(|(open, close)| {
            let (o, c) = delimiter_counts(text, *open, *close);
            o.abs_diff(c) <= DELIMITER_TOLERANCE
        })
}

/// Whether `text`'s `{}`, `()`, `[]` counts are each exactly equal, with
/// zero tolerance. Used by [`crate::core::pattern::Pattern::new`] as a
/// registration-time guard (spec.md §3): unlike the Validator's own
/// post-application check, registration must reject any imbalance at all.
pub fn delimiters_exactly_balanced(text: &str) -> bool {
    [('{', '}'), ('(', ')'), ('[', ']')]
        .iter()
        .all(|(open, close)| {
            let (o, c) = delimiter_counts(text, *open, *close);
            o == c
        })
}

/// New dangerous patterns introduced by `candidate` that were not already
/// present in `original` (spec.md §4.4's dangerous-pattern check).
fn newly_introduced_dangers(original: &str, candidate: &str) -> Vec<&'static str> {
    DANGEROUS_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(candidate) && !re.is_match(original))
        .map(|(label, _)| *label)
        .collect()
}

/// Run the structural and dangerous-pattern checks over `candidate`
/// relative to `original`. The parse/lint/test sub-checks are optional,
/// best-effort external calls (spec.md §4.4) and are not run here — see
/// `adapters::review::ReviewClient::quick_parse_check` for that path; this
/// function covers everything the Validator can decide locally.
pub fn validate(original: &str, candidate: &str, _config: &ValidatorConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if !delimiters_balanced(candidate) {
        errors.push("delimiter imbalance exceeds tolerance".to_string());
    }

    let dangers = newly_introduced_dangers(original, candidate);
    for danger in dangers {
        errors.push(format!("candidate introduces dangerous pattern: {danger}"));
    }

    if errors.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::failed(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_text_passes() {
        assert!(delimiters_balanced("if (x) { return [1, 2]; }"));
    }

    #[test]
    fn test_large_imbalance_fails() {
        assert!(!delimiters_balanced("(((((x"));
    }

    #[test]
    fn test_small_imbalance_tolerated() {
        // Two stray closers from delimiters embedded in a string literal.
        assert!(delimiters_balanced(r#"let s = "))"; foo();"#));
    }

    #[test]
    fn test_rejects_newly_introduced_eval() {
        let config = ValidatorConfig::default();
        let result = validate("const x = 1;", "eval('x')", &config);
        assert!(!result.verified);
        assert!(result.errors.iter().any(|e| e.contains("eval(")));
    }

    #[test]
    fn test_preexisting_danger_not_flagged() {
        let config = ValidatorConfig::default();
        let original = "eval(userInput);";
        let candidate = "eval(userInput); // trimmed trailing space";
        let result = validate(original, candidate, &config);
        assert!(result.verified);
    }

    #[test]
    fn test_clean_rewrite_validates() {
        let config = ValidatorConfig::default();
        let result = validate("if (v == null) return;", "if (v === null) return;", &config);
        assert!(result.verified);
        assert!(result.errors.is_empty());
    }
}
