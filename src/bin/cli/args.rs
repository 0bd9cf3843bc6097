//! CLI argument structures for the `warden` binary (spec.md §6 "CLI
//! surface"), mirroring the teacher's `clap` derive conventions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Autonomous codebase maintenance engine: scan, fix, and learn.
#[derive(Parser)]
#[command(name = "warden")]
#[command(version = VERSION)]
#[command(about = "Autonomous codebase maintenance engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a YAML config file; falls back to built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one scan-fix-learn pass over a codebase.
    Crawl(CrawlArgs),
    /// Print the last persisted Run Stats.
    Status(StatusArgs),
    /// Repeatedly crawl on an interval, reusing the VCS-diff source to
    /// pick up changes (spec.md §6; SPEC_FULL.md §11).
    Watch(WatchArgs),
}

#[derive(clap::Args)]
pub struct CrawlArgs {
    /// Root directory to scan.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Write gate-approved candidates to disk. Without this flag the run
    /// is report-only: every issue that would auto-apply is instead
    /// recorded `needs_review`.
    #[arg(long)]
    pub auto_fix: bool,

    /// Bounded worker concurrency; defaults to `max(cpu_count, 10)`.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Comma-separated extension list (without dots), overriding the
    /// configured default.
    #[arg(long, value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Skip files whose cached hash is unchanged and within TTL. Without
    /// this flag every selected file is re-analyzed regardless of cache
    /// freshness.
    #[arg(long)]
    pub skip_unchanged: bool,

    /// Accepted for CLI compatibility with the teacher's optimization
    /// surface; the multi-dimensional scoring/optimization modules are
    /// out of scope for this engine (spec.md §1 Non-goals), so this flag
    /// has no effect.
    #[arg(long)]
    pub no_optimize: bool,
}

#[derive(clap::Args)]
pub struct StatusArgs {
    /// Root directory whose persisted state directory to read.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

#[derive(clap::Args)]
pub struct WatchArgs {
    /// Root directory to watch and scan.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Seconds between crawl cycles.
    #[arg(long, default_value_t = 30)]
    pub interval_seconds: u64,

    /// Forwarded to each crawl cycle; see [`CrawlArgs::auto_fix`].
    #[arg(long)]
    pub auto_fix: bool,
}
