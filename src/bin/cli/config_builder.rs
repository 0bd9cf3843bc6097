//! Builds a [`WardenConfig`] from CLI arguments layered over a config file
//! (spec.md §6, SPEC_FULL.md §10 "Configuration": defaults -> YAML file ->
//! CLI flags).

use std::path::Path;

use warden_core::core::config::WardenConfig;
use warden_core::core::errors::Result;

use crate::cli::args::CrawlArgs;

/// Load the base configuration, then apply `crawl`-specific overrides.
pub fn build_crawl_config(config_path: Option<&Path>, args: &CrawlArgs) -> Result<WardenConfig> {
    let mut config = load_base(config_path)?;

    config.io.state_dir = args.root.join(".warden");
    config.scheduler.auto_fix = args.auto_fix;

    if let Some(concurrency) = args.concurrency {
        config.scheduler.max_concurrency = Some(concurrency);
    }
    if let Some(extensions) = &args.extensions {
        config.analyzer.extensions = extensions.clone();
    }
    if !args.skip_unchanged {
        config.analyzer.cache_ttl_seconds = 0;
    }

    config.validate()?;
    Ok(config)
}

/// Load the base configuration from `config_path`, or built-in defaults
/// when absent.
pub fn load_base(config_path: Option<&Path>) -> Result<WardenConfig> {
    match config_path {
        Some(path) => WardenConfig::from_yaml_file(path),
        None => Ok(WardenConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_unchanged_absent_zeroes_ttl() {
        let args = CrawlArgs {
            root: std::path::PathBuf::from("."),
            auto_fix: false,
            concurrency: None,
            extensions: None,
            skip_unchanged: false,
            no_optimize: false,
        };
        let config = build_crawl_config(None, &args).unwrap();
        assert_eq!(config.analyzer.cache_ttl_seconds, 0);
    }

    #[test]
    fn test_skip_unchanged_present_keeps_default_ttl() {
        let args = CrawlArgs {
            root: std::path::PathBuf::from("."),
            auto_fix: true,
            concurrency: Some(2),
            extensions: Some(vec!["rs".to_string()]),
            skip_unchanged: true,
            no_optimize: false,
        };
        let config = build_crawl_config(None, &args).unwrap();
        assert!(config.analyzer.cache_ttl_seconds > 0);
        assert!(config.scheduler.auto_fix);
        assert_eq!(config.scheduler.max_concurrency, Some(2));
        assert_eq!(config.analyzer.extensions, vec!["rs".to_string()]);
    }
}
