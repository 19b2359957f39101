//! Command line definition for preflightctl

use clap::{Args, Parser, Subcommand, ValueEnum};
use preflight_common::TraversalMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "preflightctl")]
#[command(about = "Compile and run the host preflight pipeline", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: $PREFLIGHT_CONFIG or the XDG config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter, overrides the config file and RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(flatten)]
    pub host: HostArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for detected host facts
#[derive(Args, Debug, Default, Clone)]
pub struct HostArgs {
    /// Distribution ID instead of the one in os-release
    #[arg(long, global = true)]
    pub distro: Option<String>,

    /// ID_LIKE value to use with --distro
    #[arg(long, global = true)]
    pub id_like: Option<String>,

    /// Network mode (system or user)
    #[arg(long, global = true)]
    pub network_mode: Option<String>,

    /// Whether systemd-resolved is expected on the host
    #[arg(long, global = true)]
    pub systemd_resolved: Option<bool>,

    /// Preset (openshift, microshift or okd)
    #[arg(long, global = true)]
    pub preset: Option<String>,

    /// Bundle path
    #[arg(long, global = true)]
    pub bundle: Option<PathBuf>,

    /// Teardown pass: walk cleanups instead of checks
    #[arg(long, global = true)]
    pub teardown: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the compiled pipeline for this host
    Plan {
        #[arg(long)]
        json: bool,
    },

    /// List registered options
    Settings {
        #[arg(long)]
        json: bool,
    },

    /// Verify the step / option binding
    Verify,

    /// Walk the pipeline without touching the host
    Run {
        /// Traversal mode (default: cleanup with --teardown, setup otherwise)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Check,
    Setup,
    Cleanup,
}

impl From<ModeArg> for TraversalMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Check => TraversalMode::Check,
            ModeArg::Setup => TraversalMode::Setup,
            ModeArg::Cleanup => TraversalMode::Cleanup,
        }
    }
}
