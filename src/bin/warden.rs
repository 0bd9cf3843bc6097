//! `warden` CLI: scan, fix, and learn (spec.md §6).

use clap::Parser;

mod cli;

use cli::args::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).with_target(false).init();

    let code = match cli.command {
        Commands::Crawl(args) => cli::commands::crawl_command(args, cli.config.as_deref()).await,
        Commands::Status(args) => cli::commands::status_command(args),
        Commands::Watch(args) => cli::commands::watch_command(args).await,
    };

    std::process::exit(code);
}
