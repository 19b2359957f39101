//! preflightctl - compile, inspect and dry-run the host preflight pipeline

pub mod cli;
pub mod commands;
pub mod host;
pub mod logging;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use preflight_common::{
    paths, PipelineBuilder, PreflightConfig, SettingsRegistry, StepCatalog, TraversalMode,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The config file named on the command line, or the default one.
pub fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(paths::config_path)
}

/// Parse the config file at `path`; a missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<PreflightConfig> {
    PreflightConfig::load(path)
        .with_context(|| format!("cannot load config from {}", path.display()))
}

/// Reject options in `config` that the registry does not know.
pub fn validate_config(
    config: &PreflightConfig,
    registry: &SettingsRegistry,
    path: &Path,
) -> Result<()> {
    config
        .validate(registry)
        .with_context(|| format!("invalid config in {}", path.display()))
}

/// Run one command. The binding is verified before anything else; a broken
/// binding is fatal.
pub fn execute(
    cli: &Cli,
    catalog: &StepCatalog,
    registry: &SettingsRegistry,
    config: &PreflightConfig,
) -> Result<String> {
    preflight_common::verify_binding(catalog, registry)
        .context("preflight configuration binding is broken")?;

    match &cli.command {
        Commands::Verify => commands::verify(catalog, registry),
        Commands::Settings { json } => commands::settings(registry, config, *json),
        Commands::Plan { json } => {
            let facts = host::detect_facts(&cli.host, config)?;
            let pipeline = PipelineBuilder::new(catalog).build(&facts);
            commands::plan(&pipeline, &facts, config, *json)
        }
        Commands::Run { mode, json } => {
            let facts = host::detect_facts(&cli.host, config)?;
            let pipeline = PipelineBuilder::new(catalog).build(&facts);
            let mode = mode
                .map(TraversalMode::from)
                .unwrap_or_else(|| pipeline.mode());
            debug!(mode = %mode, "dry run");
            commands::run(&pipeline, &facts, config, mode, *json)
        }
    }
}
