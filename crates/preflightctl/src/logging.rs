//! Tracing setup for preflightctl
//!
//! Filter priority: --log-level, then RUST_LOG, then the config file's
//! `[log] level`.

use tracing_subscriber::EnvFilter;

pub fn filter(cli_level: Option<&str>, config_level: &str) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level))
}

/// Install the global subscriber. Logs go to stderr so stdout stays parseable.
pub fn init(cli_level: Option<&str>, config_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(cli_level, config_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
