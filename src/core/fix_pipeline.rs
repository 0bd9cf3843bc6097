//! Fix Pipeline: the six ordered stages that turn one Issue into either a
//! [`FixCandidate`] or a `needs_review` disposition (spec.md §4.3).

use std::collections::HashMap;

use crate::adapters::generators::{run_cascade, FixGenerator, GeneratorHints};
use crate::core::candidate::{FixCandidate, Method};
use crate::core::issue::{Issue, IssueKind, Safety, SourceSpan};
use crate::core::outcome::OutcomeLog;
use crate::core::pattern::{PatternRegistry, PATTERN_ACCEPT_THRESHOLD};
use crate::core::similarity::REUSE_ACCEPT_THRESHOLD;

/// Column at which the line-length-break rule looks for its last
/// operator/comma (spec.md §4.3 stage 3).
const LINE_LENGTH_LIMIT: usize = 100;
/// Characters the line-length-break rule treats as a valid break point.
const BREAK_CHARS: [char; 10] = [',', '+', '-', '*', '/', '&', '|', '=', '<', '>'];

/// Raw confidence assigned to a reused candidate (spec.md §4.3 stage 1).
pub const REUSE_CONFIDENCE: f64 = 0.85;
/// Raw confidence assigned to a simple-line rewrite (spec.md §4.3 stage 3).
pub const SIMPLE_LINE_CONFIDENCE: f64 = 0.75;

/// A named specialist backend, keyed by the issue kind it handles
/// (spec.md §4.3 stage 5).
pub trait Specialist: Send + Sync {
    /// Attempt a fix for `issue` against `source`. `Ok(None)` means the
    /// specialist declined (not an error).
    fn attempt(&self, issue: &Issue, source: &str) -> Option<String>;
}

/// Stage 6 outcome: every stage declined.
pub struct NoCandidate;

/// Run the Fix Pipeline for one issue against the current working copy
/// `source`. Returns `Ok(candidate)` from whichever stage first succeeds,
/// or `Err(NoCandidate)` if every stage yields nothing (spec.md §4.3 stage
/// 6, "Give up").
///
/// The policy gate ("eligible for auto-fix iff severity in {low, medium}
/// and safety != risky") is evaluated by the caller via
/// [`Issue::auto_fix_eligible`] before invoking this function; an
/// ineligible issue still runs through the stages below so a sufficiently
/// high-confidence candidate can clear the elevated critical-severity
/// threshold at the Gate (spec.md §4.3, §4.6).
#[allow(clippy::too_many_arguments)]
pub async fn run(
    issue: &Issue,
    source: &str,
    path: &str,
    outcome_log: &OutcomeLog,
    pattern_registry: &PatternRegistry,
    generator_backends: &[Box<dyn FixGenerator>],
    specialists: &HashMap<crate::core::issue::IssueKind, Box<dyn Specialist>>,
    hints: &GeneratorHints,
) -> Result<FixCandidate, NoCandidate> {
    if let Some(candidate) = reuse_stage(issue, outcome_log, source) {
        return Ok(candidate);
    }

    if let Some(candidate) = pattern_stage(source, pattern_registry) {
        return Ok(candidate);
    }

    if let Some(candidate) = simple_line_stage(issue, source) {
        return Ok(candidate);
    }

    if let Some((method, fix)) = run_cascade(generator_backends, issue, source, path, hints).await {
        return Ok(FixCandidate {
            content: fix.code,
            method,
            raw_confidence: fix.confidence,
            calibrated_confidence: None,
            impact: None,
            cost_benefit: None,
        });
    }

    if let Some(candidate) = specialist_stage(issue, source, specialists) {
        return Ok(candidate);
    }

    Err(NoCandidate)
}

/// Stage 1: Reuse (spec.md §4.3 stage 1).
fn reuse_stage(issue: &Issue, outcome_log: &OutcomeLog, source: &str) -> Option<FixCandidate> {
    let best = outcome_log.best_reuse_candidate(issue)?;
    if best.score < REUSE_ACCEPT_THRESHOLD {
        return None;
    }
    let before = best.outcome.before.as_ref()?;
    let after = best.outcome.after.as_ref()?;
    if before == after {
        return None;
    }
    // The stored rewrite only applies if its recorded "before" actually
    // recurs in the current source; otherwise this outcome's rewrite has
    // nothing to do with the file in front of us.
    let content = if source.contains(before.as_str()) {
        Some(source.replace(before.as_str(), after.as_str()))
    } else {
        None
    }?;
    Some(FixCandidate {
        content,
        method: Method::Reused,
        raw_confidence: REUSE_CONFIDENCE,
        calibrated_confidence: None,
        impact: None,
        cost_benefit: None,
    })
}

/// Stage 2: Pattern match (spec.md §4.3 stage 2).
fn pattern_stage(source: &str, registry: &PatternRegistry) -> Option<FixCandidate> {
    let candidates = registry.matching(source);
    let best = candidates.into_iter().find(|p| p.confidence() >= PATTERN_ACCEPT_THRESHOLD)?;
    let rewritten = best.try_apply(source).ok().flatten()?;
    Some(FixCandidate {
        content: rewritten,
        method: Method::Pattern,
        raw_confidence: best.confidence(),
        calibrated_confidence: None,
        impact: None,
        cost_benefit: None,
    })
}

/// Stage 3: a small table of well-defined mechanical rewrites (spec.md
/// §4.3 stage 3).
fn simple_line_stage(issue: &Issue, source: &str) -> Option<FixCandidate> {
    if issue.safety == Safety::Risky {
        return None;
    }
    let rewritten = simple_line_rewrite(issue, source)?;
    if rewritten == source {
        return None;
    }
    Some(FixCandidate {
        content: rewritten,
        method: Method::SimpleLine,
        raw_confidence: SIMPLE_LINE_CONFIDENCE,
        calibrated_confidence: None,
        impact: None,
        cost_benefit: None,
    })
}

/// Dispatch to the single rule among spec.md §4.3 stage 3's five that
/// matches what `issue` actually reports, so an issue of one kind never
/// triggers an unrelated rewrite elsewhere in the file.
pub fn simple_line_rewrite(issue: &Issue, source: &str) -> Option<String> {
    let message = issue.message.to_lowercase();

    if message.contains("trailing whitespace") {
        return trim_trailing_whitespace(source);
    }
    if message.contains("console") {
        return remove_console_calls(source);
    }
    if message.contains("line too long") || message.contains("line length") || message.contains("line exceeds") {
        return break_long_line(source, &issue.span);
    }
    if issue.kind == IssueKind::Unused || message.contains("unused") {
        return comment_unused_declaration(source, &issue.span);
    }
    if message.contains("missing") && (message.contains("terminator") || message.contains("newline")) {
        return append_missing_terminator(source);
    }

    None
}

/// Trim trailing whitespace from every line (spec.md §4.3 stage 3).
fn trim_trailing_whitespace(source: &str) -> Option<String> {
    let trimmed: String = source
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = if source.ends_with('\n') { format!("{trimmed}\n") } else { trimmed };
    (trimmed != source).then_some(trimmed)
}

/// Remove `console.*` debug calls (spec.md §4.3 stage 3).
fn remove_console_calls(source: &str) -> Option<String> {
    let console_call = regex::Regex::new(r"(?m)^\s*console\.(log|debug|warn|error)\([^\n]*\);?\s*\n?").unwrap();
    let rewritten = console_call.replace_all(source, "").into_owned();
    (rewritten != source).then_some(rewritten)
}

/// Split `source` into its lines, reporting whether it ended with `\n` so
/// the split can be reassembled losslessly by [`join_lines`].
fn split_lines(source: &str) -> (Vec<String>, bool) {
    let trailing_newline = source.ends_with('\n');
    let mut lines: Vec<String> = source.split('\n').map(str::to_string).collect();
    if trailing_newline {
        lines.pop();
    }
    (lines, trailing_newline)
}

fn join_lines(lines: Vec<String>, trailing_newline: bool) -> String {
    let mut joined = lines.join("\n");
    if trailing_newline {
        joined.push('\n');
    }
    joined
}

/// Break `span.line_start` at the last operator or comma before column
/// [`LINE_LENGTH_LIMIT`], preserving the line's indentation on the
/// continuation (spec.md §4.3 stage 3).
fn break_long_line(source: &str, span: &SourceSpan) -> Option<String> {
    let (mut lines, trailing_newline) = split_lines(source);
    let idx = span.line_start.checked_sub(1)?;
    let line = lines.get(idx)?;
    if line.chars().count() <= LINE_LENGTH_LIMIT {
        return None;
    }

    let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
    let break_pos = line
        .char_indices()
        .take(LINE_LENGTH_LIMIT)
        .filter(|(_, c)| BREAK_CHARS.contains(c))
        .last()
        .map(|(i, c)| i + c.len_utf8())?;

    let (left, right) = line.split_at(break_pos);
    let right = right.trim_start();
    if right.is_empty() {
        return None;
    }

    lines[idx] = format!("{left}\n{indent}{right}");
    Some(join_lines(lines, trailing_newline))
}

/// Comment out the declaration spanning `span.line_start..=span.line_end`
/// (spec.md §4.3 stage 3, "a declaration flagged unused").
fn comment_unused_declaration(source: &str, span: &SourceSpan) -> Option<String> {
    let (mut lines, trailing_newline) = split_lines(source);
    let start = span.line_start.checked_sub(1)?;
    let end = span.line_end.checked_sub(1).unwrap_or(start).max(start);
    if start >= lines.len() {
        return None;
    }

    let mut changed = false;
    for line in lines.iter_mut().take(end + 1).skip(start) {
        let indent_len = line.len() - line.trim_start().len();
        let (indent, rest) = line.split_at(indent_len);
        if rest.is_empty() || rest.trim_start().starts_with("//") {
            continue;
        }
        *line = format!("{indent}// {rest}");
        changed = true;
    }
    changed.then(|| join_lines(lines, trailing_newline))
}

/// Append the missing line-terminator at end of file (spec.md §4.3 stage
/// 3; required for the §8 round-trip property).
fn append_missing_terminator(source: &str) -> Option<String> {
    if source.is_empty() || source.ends_with('\n') {
        None
    } else {
        Some(format!("{source}\n"))
    }
}

/// Stage 5: specialist router (spec.md §4.3 stage 5).
fn specialist_stage(
    issue: &Issue,
    source: &str,
    specialists: &HashMap<crate::core::issue::IssueKind, Box<dyn Specialist>>,
) -> Option<FixCandidate> {
    let specialist = specialists.get(&issue.kind)?;
    let content = specialist.attempt(issue, source)?;
    Some(FixCandidate {
        content,
        method: Method::Specialist,
        raw_confidence: Method::Specialist.non_critical_threshold(),
        calibrated_confidence: None,
        impact: None,
        cost_benefit: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidate::Method as CandidateMethod;
    use crate::core::issue::{IssueKind, Severity, SourceSpan};
    use crate::core::outcome::OutcomeRecord;

    fn issue(message: &str) -> Issue {
        Issue {
            file_path: "a.js".to_string(),
            span: SourceSpan { line_start: 1, line_end: 1, column: None },
            kind: IssueKind::Style,
            severity: Severity::Low,
            message: message.to_string(),
            code: None,
            hint: None,
            safety: Safety::Safe,
        }
    }

    #[tokio::test]
    async fn test_reuse_stage_short_circuits() {
        let log = OutcomeLog::new();
        let original = issue("trailing whitespace");
        log.append(OutcomeRecord::resolved(
            &original,
            CandidateMethod::Pattern,
            0.8,
            Some(0.85),
            "let x = 1;   ".to_string(),
            "let x = 1;".to_string(),
        ));

        let registry = PatternRegistry::new();
        let generators: Vec<Box<dyn FixGenerator>> = Vec::new();
        let specialists: HashMap<IssueKind, Box<dyn Specialist>> = HashMap::new();

        let new_issue = issue("trailing whitespace");
        let result = run(
            &new_issue,
            "let x = 1;   ",
            "a.js",
            &log,
            &registry,
            &generators,
            &specialists,
            &GeneratorHints::default(),
        )
        .await;

        let candidate = result.ok().unwrap();
        assert_eq!(candidate.method, Method::Reused);
        assert_eq!(candidate.content, "let x = 1;");
    }

    #[tokio::test]
    async fn test_simple_line_removes_console_call() {
        let log = OutcomeLog::new();
        let registry = PatternRegistry::new();
        let generators: Vec<Box<dyn FixGenerator>> = Vec::new();
        let specialists: HashMap<IssueKind, Box<dyn Specialist>> = HashMap::new();

        let i = issue("console statement");
        let source = "function f() {\n  console.log('debug');\n  return 1;\n}\n";
        let result = run(
            &i,
            source,
            "a.js",
            &log,
            &registry,
            &generators,
            &specialists,
            &GeneratorHints::default(),
        )
        .await;

        let candidate = result.ok().unwrap();
        assert_eq!(candidate.method, Method::SimpleLine);
        assert!(!candidate.content.contains("console.log"));
    }

    #[tokio::test]
    async fn test_gives_up_when_every_stage_declines() {
        let log = OutcomeLog::new();
        let registry = PatternRegistry::new();
        let generators: Vec<Box<dyn FixGenerator>> = Vec::new();
        let specialists: HashMap<IssueKind, Box<dyn Specialist>> = HashMap::new();

        let i = issue("unfixable issue");
        let source = "already clean source";
        let result = run(
            &i,
            source,
            "a.js",
            &log,
            &registry,
            &generators,
            &specialists,
            &GeneratorHints::default(),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reuse_stage_declines_when_before_does_not_recur() {
        let log = OutcomeLog::new();
        let original = issue("null comparison");
        log.append(OutcomeRecord::resolved(
            &original,
            CandidateMethod::Pattern,
            0.8,
            Some(0.85),
            "if (v == null) return;\n".to_string(),
            "if (v === null) return;\n".to_string(),
        ));

        let registry = PatternRegistry::new();
        let generators: Vec<Box<dyn FixGenerator>> = Vec::new();
        let specialists: HashMap<IssueKind, Box<dyn Specialist>> = HashMap::new();

        let new_issue = issue("null comparison");
        let result = run(
            &new_issue,
            "totally unrelated source\n",
            "a.js",
            &log,
            &registry,
            &generators,
            &specialists,
            &GeneratorHints::default(),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reuse_stage_applies_rewrite_literally_within_source() {
        let log = OutcomeLog::new();
        let original = issue("null comparison");
        log.append(OutcomeRecord::resolved(
            &original,
            CandidateMethod::Pattern,
            0.8,
            Some(0.85),
            "if (v == null) return;\n".to_string(),
            "if (v === null) return;\n".to_string(),
        ));

        let registry = PatternRegistry::new();
        let generators: Vec<Box<dyn FixGenerator>> = Vec::new();
        let specialists: HashMap<IssueKind, Box<dyn Specialist>> = HashMap::new();

        let new_issue = issue("null comparison");
        let result = run(
            &new_issue,
            "if (v == null) return;\n",
            "a.js",
            &log,
            &registry,
            &generators,
            &specialists,
            &GeneratorHints::default(),
        )
        .await;

        let candidate = result.ok().unwrap();
        assert_eq!(candidate.method, Method::Reused);
        assert_eq!(candidate.content, "if (v === null) return;\n");
    }

    #[tokio::test]
    async fn test_simple_line_breaks_long_line_at_last_operator() {
        let log = OutcomeLog::new();
        let registry = PatternRegistry::new();
        let generators: Vec<Box<dyn FixGenerator>> = Vec::new();
        let specialists: HashMap<IssueKind, Box<dyn Specialist>> = HashMap::new();

        let long_line = format!(
            "  const total = {};",
            (0..30).map(|n| format!("value{n}")).collect::<Vec<_>>().join(" + ")
        );
        assert!(long_line.chars().count() > LINE_LENGTH_LIMIT);

        let mut i = issue("line too long");
        i.span = SourceSpan { line_start: 1, line_end: 1, column: None };
        let result = run(
            &i,
            &long_line,
            "a.js",
            &log,
            &registry,
            &generators,
            &specialists,
            &GeneratorHints::default(),
        )
        .await;

        let candidate = result.ok().unwrap();
        assert_eq!(candidate.method, Method::SimpleLine);
        let broken_lines: Vec<&str> = candidate.content.lines().collect();
        assert_eq!(broken_lines.len(), 2);
        assert!(broken_lines[0].chars().count() <= LINE_LENGTH_LIMIT);
        assert!(broken_lines[1].starts_with("  "));
    }

    #[tokio::test]
    async fn test_simple_line_comments_out_unused_declaration() {
        let log = OutcomeLog::new();
        let registry = PatternRegistry::new();
        let generators: Vec<Box<dyn FixGenerator>> = Vec::new();
        let specialists: HashMap<IssueKind, Box<dyn Specialist>> = HashMap::new();

        let mut i = issue("unused variable 'helper'");
        i.kind = IssueKind::Unused;
        i.span = SourceSpan { line_start: 2, line_end: 2, column: None };
        let source = "function f() {\n  const helper = 1;\n  return 2;\n}\n";
        let result = run(
            &i,
            source,
            "a.js",
            &log,
            &registry,
            &generators,
            &specialists,
            &GeneratorHints::default(),
        )
        .await;

        let candidate = result.ok().unwrap();
        assert_eq!(candidate.method, Method::SimpleLine);
        assert!(candidate.content.contains("// const helper = 1;"));
    }

    #[tokio::test]
    async fn test_simple_line_appends_missing_terminator() {
        let log = OutcomeLog::new();
        let registry = PatternRegistry::new();
        let generators: Vec<Box<dyn FixGenerator>> = Vec::new();
        let specialists: HashMap<IssueKind, Box<dyn Specialist>> = HashMap::new();

        let i = issue("missing line terminator");
        let source = "let x = 1;";
        let result = run(
            &i,
            source,
            "a.js",
            &log,
            &registry,
            &generators,
            &specialists,
            &GeneratorHints::default(),
        )
        .await;

        let candidate = result.ok().unwrap();
        assert_eq!(candidate.method, Method::SimpleLine);
        assert_eq!(candidate.content, "let x = 1;\n");
    }

    #[tokio::test]
    async fn test_unrelated_issue_does_not_trigger_whitespace_trim() {
        let log = OutcomeLog::new();
        let registry = PatternRegistry::new();
        let generators: Vec<Box<dyn FixGenerator>> = Vec::new();
        let specialists: HashMap<IssueKind, Box<dyn Specialist>> = HashMap::new();

        let i = issue("unfixable issue");
        let source = "let y = 2;   \n";
        let result = run(
            &i,
            source,
            "a.js",
            &log,
            &registry,
            &generators,
            &specialists,
            &GeneratorHints::default(),
        )
        .await;

        assert!(result.is_err());
    }
}
