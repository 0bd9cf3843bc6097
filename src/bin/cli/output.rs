//! Output formatting for the `warden` binary: a `tabled` summary table for
//! `status` and a one-line colored summary for `crawl`/`watch`, matching
//! the teacher's `src/bin/cli/output` rich-console conventions.

use console::style;
use tabled::{Table, Tabled};

use warden_core::core::stats::RunStats;

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "metric")]
    metric: String,
    #[tabled(rename = "value")]
    value: String,
}

/// Render the persisted Run Stats as a table (`warden status`).
pub fn print_stats_table(stats: &RunStats, last_updated_ms: i64) {
    let rows = vec![
        StatRow { metric: "files_scanned".into(), value: stats.files_scanned.to_string() },
        StatRow { metric: "files_skipped".into(), value: stats.files_skipped.to_string() },
        StatRow { metric: "files_with_issues".into(), value: stats.files_with_issues.to_string() },
        StatRow { metric: "issues_found".into(), value: stats.issues_found.to_string() },
        StatRow { metric: "issues_auto_fixed".into(), value: stats.issues_auto_fixed.to_string() },
        StatRow { metric: "issues_needing_review".into(), value: stats.issues_needing_review.to_string() },
        StatRow { metric: "errors".into(), value: stats.errors.to_string() },
        StatRow { metric: "last_updated_ms".into(), value: last_updated_ms.to_string() },
    ];
    println!("{}", Table::new(rows));
}

/// Print a one-line colored summary after a `crawl`/`watch` cycle.
pub fn print_run_summary(stats: &RunStats) {
    let summary = format!(
        "scanned {} skipped {} fixed {} review {} errors {}",
        stats.files_scanned, stats.files_skipped, stats.issues_auto_fixed, stats.issues_needing_review, stats.errors
    );
    if stats.errors > 0 {
        println!("{}", style(summary).yellow());
    } else {
        println!("{}", style(summary).green());
    }
}
