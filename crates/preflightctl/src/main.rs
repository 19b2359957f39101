//! preflightctl - host preflight pipeline CLI

use anyhow::{Context, Result};
use clap::Parser;
use preflight_common::{verify_binding, SettingsRegistry, StepCatalog};
use preflightctl::cli::Cli;
use preflightctl::{config_path, execute, load_config, logging, validate_config};
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let catalog = StepCatalog::new();
    let registry = SettingsRegistry::for_catalog(&catalog);
    verify_binding(&catalog, &registry).context("preflight configuration binding is broken")?;

    let path = config_path(&cli);
    let config = load_config(&path)?;
    logging::init(cli.log_level.as_deref(), &config.log.level);
    debug!(path = %path.display(), "preflight config loaded");
    validate_config(&config, &registry, &path)?;

    let output = execute(&cli, &catalog, &registry, &config)?;
    println!("{}", output);
    Ok(())
}
