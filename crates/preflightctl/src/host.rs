//! Host probing: turns os-release, the resolver setup, the config file and
//! command line overrides into EnvironmentFacts.

use crate::cli::HostArgs;
use anyhow::{Context, Result};
use preflight_common::facts::systemd_resolved_expected;
use preflight_common::paths;
use preflight_common::{EnvironmentFacts, NetworkMode, OsRelease, PreflightConfig, Preset};
use std::path::Path;
use tracing::{debug, warn};

const RESOLV_CONF: &str = "/etc/resolv.conf";

fn distro(args: &HostArgs) -> OsRelease {
    if let Some(id) = &args.distro {
        let release = OsRelease::new(&id.to_lowercase(), "");
        return match &args.id_like {
            Some(like) => release.with_id_like(&like.to_lowercase()),
            None => release,
        };
    }

    match OsRelease::detect() {
        Ok(release) => release,
        Err(e) => {
            warn!(error = %e, "cannot read os-release, assuming an unknown distribution");
            OsRelease::default()
        }
    }
}

/// Build the facts for this invocation.
pub fn detect_facts(args: &HostArgs, config: &PreflightConfig) -> Result<EnvironmentFacts> {
    let network_mode = match &args.network_mode {
        Some(mode) => mode
            .parse::<NetworkMode>()
            .context("invalid --network-mode")?,
        None => config.network_mode().context("invalid network-mode in config")?,
    };
    let preset = match &args.preset {
        Some(preset) => preset.parse::<Preset>().context("invalid --preset")?,
        None => config.preset().context("invalid preset in config")?,
    };
    let systemd_resolved = args
        .systemd_resolved
        .unwrap_or_else(|| systemd_resolved_expected(Path::new(RESOLV_CONF)));

    let bundle = args
        .bundle
        .clone()
        .or_else(|| config.bundle_path())
        .unwrap_or_else(|| paths::default_bundle_path(preset));

    let facts = EnvironmentFacts::new(distro(args), network_mode, systemd_resolved)
        .with_preset(preset)
        .with_bundle_path(bundle)
        .with_teardown(args.teardown);

    debug!(
        distro = facts.distro_id(),
        family = %facts.family(),
        network_mode = %facts.network_mode(),
        systemd_resolved = facts.systemd_resolved(),
        preset = %facts.preset(),
        bundle = %facts.bundle_path().display(),
        teardown = facts.is_teardown(),
        "host facts"
    );
    Ok(facts)
}
