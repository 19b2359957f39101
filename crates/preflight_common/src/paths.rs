//! Path helpers for the machine home, cache and config file

use crate::facts::Preset;
use std::path::PathBuf;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "PREFLIGHT_CONFIG";

const MACHINE_HOME: &str = ".crc";
const OPENSHIFT_VERSION: &str = "4.14.3";
const MICROSHIFT_VERSION: &str = "4.14.3";
const OKD_VERSION: &str = "4.14.0-0.okd-2023-12-01-064308";

/// Machine home directory (~/.crc)
pub fn machine_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(MACHINE_HOME)
}

/// Directory holding downloaded bundles
pub fn cache_dir() -> PathBuf {
    machine_home().join("cache")
}

/// Config file path
///
/// Priority:
/// 1. $PREFLIGHT_CONFIG
/// 2. $XDG_CONFIG_HOME/preflight/config.toml
/// 3. ~/.crc/preflight.toml
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    match dirs::config_dir() {
        Some(dir) => dir.join("preflight/config.toml"),
        None => machine_home().join("preflight.toml"),
    }
}

fn bundle_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}

/// File name of the default bundle for a preset
pub fn bundle_name(preset: Preset) -> String {
    let (prefix, version) = match preset {
        Preset::OpenShift => ("crc_libvirt", OPENSHIFT_VERSION),
        Preset::MicroShift => ("crc_microshift_libvirt", MICROSHIFT_VERSION),
        Preset::Okd => ("crc_okd_libvirt", OKD_VERSION),
    };
    format!("{}_{}_{}.crcbundle", prefix, version, bundle_arch())
}

pub fn default_bundle_path(preset: Preset) -> PathBuf {
    cache_dir().join(bundle_name(preset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_name_per_preset() {
        let openshift = bundle_name(Preset::OpenShift);
        assert!(openshift.starts_with("crc_libvirt_4.14.3_"));
        assert!(openshift.ends_with(".crcbundle"));
        assert!(bundle_name(Preset::MicroShift).starts_with("crc_microshift_libvirt_"));
        assert!(bundle_name(Preset::Okd).contains("okd"));
    }

    #[test]
    fn test_default_bundle_under_cache() {
        let path = default_bundle_path(Preset::OpenShift);
        assert!(path.starts_with(cache_dir()));
    }

    #[test]
    fn test_config_path_env_override() {
        std::env::set_var(CONFIG_ENV, "/tmp/preflight-test.toml");
        assert_eq!(config_path(), PathBuf::from("/tmp/preflight-test.toml"));
        std::env::remove_var(CONFIG_ENV);
    }
}
