//! `warden status`: print the last persisted Run Stats (spec.md §6
//! "Persisted state layout").

use tracing::error;

use warden_core::core::config::WardenConfig;
use warden_core::core::stats::RunStats;
use warden_core::io::persistence::read_json_opt;

use crate::cli::args::StatusArgs;
use crate::cli::commands::exit_code;
use crate::cli::output::print_stats_table;

#[derive(serde::Deserialize)]
struct PersistedStats {
    stats: RunStats,
    #[serde(rename = "lastUpdated")]
    last_updated: i64,
}

/// Run `status`, returning the process exit code.
pub fn status_command(args: StatusArgs) -> i32 {
    let config = WardenConfig {
        io: warden_core::core::config::IoConfig {
            state_dir: args.root.join(".warden"),
        },
        ..WardenConfig::default()
    };

    match read_json_opt::<PersistedStats>(&config.io.run_stats_path()) {
        Ok(Some(doc)) => {
            print_stats_table(&doc.stats, doc.last_updated);
            exit_code::CLEAN
        }
        Ok(None) => {
            println!("no run stats found under {}", config.io.state_dir.display());
            exit_code::CLEAN
        }
        Err(err) => {
            error!("failed to read run stats: {err}");
            exit_code::MISCONFIGURATION
        }
    }
}
