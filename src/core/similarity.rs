//! Similarity scoring formalizing spec.md §4.3 stage 1 ("duck-typed
//! similarity", per spec.md §9): exact message match scores 50 points,
//! type+severity match scores 30 points, keyword overlap scores up to 20
//! points using the top-3 keywords of length >= 4 characters.

use std::collections::HashSet;

use crate::core::issue::Issue;
use crate::core::outcome::OutcomeRecord;

/// Points awarded for an exact message match.
pub const EXACT_MATCH_POINTS: u32 = 50;
/// Points awarded for a (kind, severity) match.
pub const TYPE_SEVERITY_POINTS: u32 = 30;
/// Maximum points awardable from keyword overlap.
pub const KEYWORD_MAX_POINTS: u32 = 20;
/// Minimum keyword length considered for overlap scoring.
pub const KEYWORD_MIN_LEN: usize = 4;
/// Number of top keywords considered per message.
pub const KEYWORD_TOP_N: usize = 3;
/// Aggregate score at/above which a reuse candidate is accepted
/// (spec.md §4.3 stage 1).
pub const REUSE_ACCEPT_THRESHOLD: u32 = 85;

/// Extract up to `top_n` keywords of at least `min_len` characters from
/// `text`, ordered by first occurrence, lowercased.
pub fn top_keywords(text: &str, top_n: usize, min_len: usize) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= min_len)
        .fold(Vec::new(), |mut acc, word| {
            if !acc.contains(&word) {
                acc.push(word);
            }
            acc
        })
        .into_iter()
        .take(top_n)
        .collect()
}

/// Aggregate similarity score (0-100) between a new `issue` and a
/// previously resolved `outcome`, using the precomputed `issue_keywords`.
/// The three components are additive (spec.md §4.3 stage 1), so an issue
/// that repeats a prior one verbatim scores the exact-match points plus
/// the type/severity and keyword-overlap points it also satisfies.
pub fn score(issue: &Issue, outcome: &OutcomeRecord, issue_keywords: &[String]) -> u32 {
    let mut total = 0u32;

    if issue.message.trim().eq_ignore_ascii_case(outcome.message.trim()) {
        total += EXACT_MATCH_POINTS;
    }

    if issue.kind == outcome.kind && issue.severity == outcome.severity {
        total += TYPE_SEVERITY_POINTS;
    }

    let outcome_keywords: HashSet<String> = top_keywords(&outcome.message, KEYWORD_TOP_N, KEYWORD_MIN_LEN)
        .into_iter()
        .collect();
    let overlap = issue_keywords
        .iter()
        .filter(|k| outcome_keywords.contains(*k))
        .count();
    if !issue_keywords.is_empty() {
        let per_keyword = KEYWORD_MAX_POINTS as f64 / KEYWORD_TOP_N as f64;
        total += (overlap as f64 * per_keyword).round() as u32;
    }

    total.min(EXACT_MATCH_POINTS + TYPE_SEVERITY_POINTS + KEYWORD_MAX_POINTS)
}
