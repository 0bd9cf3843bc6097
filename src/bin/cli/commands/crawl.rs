//! `warden crawl`: run one scan-fix-learn pass (spec.md §6).

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use warden_core::api::engine::WardenEngine;

use crate::cli::args::CrawlArgs;
use crate::cli::commands::exit_code;
use crate::cli::config_builder::build_crawl_config;
use crate::cli::output::print_run_summary;

/// Run `crawl`, returning the process exit code (spec.md §6).
pub async fn crawl_command(args: CrawlArgs, config_path: Option<&std::path::Path>) -> i32 {
    let config = match build_crawl_config(config_path, &args) {
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

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("cancellation requested, finishing in-flight files");
            signal_cancel.cancel();
        }
    });

    let summary = match engine.run(&cancel).await {
        Ok(summary) => summary,
        Err(err) => {
            error!("run failed: {err}");
            return exit_code::MISCONFIGURATION;
        }
    };

    print_run_summary(&summary.stats);

    if cancel.is_cancelled() {
        return exit_code::CANCELLED;
    }
    if summary.stats.errors > 0 {
        return exit_code::ERRORS;
    }
    exit_code::CLEAN
}
