//! Environment facts: the immutable input to pipeline compilation.
//!
//! Facts are detected by the caller (distro detection, network mode
//! selection) and handed to the builder as a finished value. Nothing in
//! here is consulted again once a pipeline has been built.

use crate::error::PreflightError;
use crate::os_release::{DistroFamily, OsRelease};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Address the systemd-resolved stub listener binds to
const RESOLVED_STUB_ADDR: &str = "127.0.0.53";

/// Network backend the machine is started with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Host NetworkManager, dnsmasq and libvirt networking
    #[default]
    System,
    /// User-mode networking over vsock, no host network changes
    User,
}

impl NetworkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::System => "system",
            NetworkMode::User => "user",
        }
    }
}

impl std::fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkMode {
    type Err = PreflightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system" => Ok(NetworkMode::System),
            "user" => Ok(NetworkMode::User),
            other => Err(PreflightError::InvalidValue {
                field: "network-mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Target workload type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    OpenShift,
    MicroShift,
    Okd,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::OpenShift => "openshift",
            Preset::MicroShift => "microshift",
            Preset::Okd => "okd",
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = PreflightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openshift" => Ok(Preset::OpenShift),
            "microshift" => Ok(Preset::MicroShift),
            "okd" => Ok(Preset::Okd),
            other => Err(PreflightError::InvalidValue {
                field: "preset",
                value: other.to_string(),
            }),
        }
    }
}

/// Snapshot of the host and of the run mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFacts {
    distro: OsRelease,
    family: DistroFamily,
    network_mode: NetworkMode,
    systemd_resolved: bool,
    preset: Preset,
    bundle_path: PathBuf,
    is_teardown: bool,
}

impl EnvironmentFacts {
    /// Facts for a normal run with the preset's default bundle.
    pub fn new(distro: OsRelease, network_mode: NetworkMode, systemd_resolved: bool) -> Self {
        let family = distro.family();
        let preset = Preset::default();
        Self {
            distro,
            family,
            network_mode,
            systemd_resolved,
            preset,
            bundle_path: paths::default_bundle_path(preset),
            is_teardown: false,
        }
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_bundle_path(mut self, bundle_path: impl Into<PathBuf>) -> Self {
        self.bundle_path = bundle_path.into();
        self
    }

    pub fn with_teardown(mut self, is_teardown: bool) -> Self {
        self.is_teardown = is_teardown;
        self
    }

    pub fn distro(&self) -> &OsRelease {
        &self.distro
    }

    pub fn distro_id(&self) -> &str {
        &self.distro.id
    }

    pub fn family(&self) -> DistroFamily {
        self.family
    }

    pub fn network_mode(&self) -> NetworkMode {
        self.network_mode
    }

    /// Only meaningful under [`NetworkMode::System`].
    pub fn systemd_resolved(&self) -> bool {
        self.systemd_resolved
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }

    pub fn is_teardown(&self) -> bool {
        self.is_teardown
    }
}

/// Whether the resolver configuration at `resolv_conf` hands queries to
/// the systemd-resolved stub.
pub fn systemd_resolved_expected(resolv_conf: &Path) -> bool {
    if let Ok(target) = fs::read_link(resolv_conf) {
        if target.to_string_lossy().contains("systemd/resolve") {
            return true;
        }
    }

    fs::read_to_string(resolv_conf)
        .map(|content| {
            content.lines().any(|line| {
                let mut parts = line.split_whitespace();
                parts.next() == Some("nameserver") && parts.next() == Some(RESOLVED_STUB_ADDR)
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os_release::UBUNTU;
    use tempfile::tempdir;

    #[test]
    fn test_network_mode_parse() {
        assert_eq!(
            "system".parse::<NetworkMode>().unwrap(),
            NetworkMode::System
        );
        assert_eq!(" User ".parse::<NetworkMode>().unwrap(), NetworkMode::User);
        assert!("vpnkit".parse::<NetworkMode>().is_err());
    }

    #[test]
    fn test_preset_parse_and_display() {
        for preset in [Preset::OpenShift, Preset::MicroShift, Preset::Okd] {
            assert_eq!(preset.to_string().parse::<Preset>().unwrap(), preset);
        }
        assert!("podman".parse::<Preset>().is_err());
    }

    #[test]
    fn test_facts_derive_family() {
        let facts =
            EnvironmentFacts::new(OsRelease::new(UBUNTU, "20.04"), NetworkMode::User, false);
        assert_eq!(facts.family(), DistroFamily::Debian);
        assert_eq!(facts.distro().version_id, "20.04");
        assert_eq!(facts.preset(), Preset::OpenShift);
        assert!(!facts.is_teardown());
    }

    #[test]
    fn test_resolved_stub_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("resolv.conf");
        fs::write(&path, "# generated\nnameserver 127.0.0.53\noptions edns0\n").unwrap();
        assert!(systemd_resolved_expected(&path));

        fs::write(&path, "nameserver 192.168.1.1\n").unwrap();
        assert!(!systemd_resolved_expected(&path));
    }

    #[test]
    fn test_missing_resolv_conf() {
        let dir = tempdir().unwrap();
        assert!(!systemd_resolved_expected(&dir.path().join("missing")));
    }
}
