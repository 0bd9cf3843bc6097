//! `warden watch`: repeatedly crawl on an interval (SPEC_FULL.md §11 —
//! a `notify`-free polling loop reusing the Work Selector's VCS-diff
//! source; no OS file-watcher plumbing, which is an out-of-scope external
//! collaborator per spec.md §1).

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use warden_core::api::engine::WardenEngine;

use crate::cli::args::{CrawlArgs, WatchArgs};
use crate::cli::commands::exit_code;
use crate::cli::config_builder::build_crawl_config;
use crate::cli::output::print_run_summary;

/// Run `watch`, looping `crawl` cycles until cancelled. Returns the
/// process exit code observed on the cycle that ends the loop.
pub async fn watch_command(args: WatchArgs) -> i32 {
    let crawl_args = CrawlArgs {
        root: args.root.clone(),
        auto_fix: args.auto_fix,
        concurrency: None,
        extensions: None,
        skip_unchanged: true,
        no_optimize: false,
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    loop {
        if cancel.is_cancelled() {
            return exit_code::CANCELLED;
        }

        let config = match build_crawl_config(None, &crawl_args) {
            Ok(config) => config,
            Err(err) => {
                error!("configuration error: {err}");
                return exit_code::MISCONFIGURATION;
            }
        };

        let engine = match WardenEngine::new(&args.root, config).await {
            Ok(engine) => engine,
            Err(err) => {
                error!("failed to initialize engine: {err}");
                return exit_code::MISCONFIGURATION;
            }
        };

        match engine.run(&cancel).await {
            Ok(summary) => {
                print_run_summary(&summary.stats);
                if cancel.is_cancelled() {
                    return exit_code::CANCELLED;
                }
                if summary.stats.errors > 0 {
                    info!("cycle completed with errors, continuing to watch");
                }
            }
            Err(err) => {
                error!("run failed: {err}");
                return exit_code::MISCONFIGURATION;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(args.interval_seconds)) => {}
            _ = cancel.cancelled() => return exit_code::CANCELLED,
        }
    }
}
