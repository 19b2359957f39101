//! Step Catalog
//!
//! Declares every preflight step in pipeline order. This is the single
//! source of truth for ordering: the builder filters it but never
//! reorders it. Cleanup entries sit next to the setup steps they undo.

use crate::applicability::{Applicability, SYSTEM_WITHOUT_RESOLVED, SYSTEM_WITH_RESOLVED};
use crate::facts::NetworkMode;
use crate::os_release::DistroFamily;
use serde::Serialize;
use std::collections::HashSet;

/// Prefix of the config option that disables a step
pub const SKIP_PREFIX: &str = "skip-";

/// Unique identifier for each step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    // === Prelude ===
    CheckRunningAsNormalUser,
    CheckRunningInsideWsl2,
    CheckAdminHelperCached,
    CheckSupportedCpuArch,
    CheckSymlink,
    CheckRam,
    CheckPodmanInOcBinDir,

    // === Machine cleanup ===
    RemoveMachinesDir,
    RemoveAllLogs,
    ForgetPullSecret,
    RemoveHostsFileEntry,
    RemoveKnownHostsEntries,
    RemoveManPages,

    // === Virtualization ===
    CheckVirtualizationEnabled,
    CheckKvmEnabled,
    CheckLibvirtInstalled,
    CheckUserInLibvirtGroup,
    CheckLibvirtGroupActive,
    CheckLibvirtServiceRunning,
    CheckLibvirtVersion,
    CheckLibvirtDriverInstalled,

    // === Hypervisor cleanup ===
    RemoveLibvirtStoragePool,
    RemoveVm,

    // === Daemon ===
    CheckDaemonSystemdService,
    CheckDaemonSystemdSockets,

    // === Distro extras ===
    CheckAppArmorProfile,

    // === System networking ===
    CheckSystemdNetworkdNotRunning,
    CheckNetworkManagerInstalled,
    CheckNetworkManagerRunning,
    CheckDnsmasqAndNetworkManagerConfig,
    CheckSystemdResolvedRunning,
    CheckNetworkManagerDispatcherFile,
    CheckNetworkManagerConfig,
    CheckDnsmasqConfig,
    CheckLibvirtNetworkAvailable,
    CheckLibvirtNetworkActive,

    // === User networking ===
    CheckVsock,

    // === Epilogue ===
    CheckBundleExtracted,
}

impl StepId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckRunningAsNormalUser => "check_running_as_normal_user",
            Self::CheckRunningInsideWsl2 => "check_running_inside_wsl2",
            Self::CheckAdminHelperCached => "check_admin_helper_cached",
            Self::CheckSupportedCpuArch => "check_supported_cpu_arch",
            Self::CheckSymlink => "check_symlink",
            Self::CheckRam => "check_ram",
            Self::CheckPodmanInOcBinDir => "check_podman_in_oc_bin_dir",
            Self::RemoveMachinesDir => "remove_machines_dir",
            Self::RemoveAllLogs => "remove_all_logs",
            Self::ForgetPullSecret => "forget_pull_secret",
            Self::RemoveHostsFileEntry => "remove_hosts_file_entry",
            Self::RemoveKnownHostsEntries => "remove_known_hosts_entries",
            Self::RemoveManPages => "remove_man_pages",
            Self::CheckVirtualizationEnabled => "check_virtualization_enabled",
            Self::CheckKvmEnabled => "check_kvm_enabled",
            Self::CheckLibvirtInstalled => "check_libvirt_installed",
            Self::CheckUserInLibvirtGroup => "check_user_in_libvirt_group",
            Self::CheckLibvirtGroupActive => "check_libvirt_group_active",
            Self::CheckLibvirtServiceRunning => "check_libvirt_service_running",
            Self::CheckLibvirtVersion => "check_libvirt_version",
            Self::CheckLibvirtDriverInstalled => "check_libvirt_driver_installed",
            Self::RemoveLibvirtStoragePool => "remove_libvirt_storage_pool",
            Self::RemoveVm => "remove_vm",
            Self::CheckDaemonSystemdService => "check_daemon_systemd_service",
            Self::CheckDaemonSystemdSockets => "check_daemon_systemd_sockets",
            Self::CheckAppArmorProfile => "check_apparmor_profile",
            Self::CheckSystemdNetworkdNotRunning => "check_systemd_networkd_not_running",
            Self::CheckNetworkManagerInstalled => "check_network_manager_installed",
            Self::CheckNetworkManagerRunning => "check_network_manager_running",
            Self::CheckDnsmasqAndNetworkManagerConfig => "check_dnsmasq_and_network_manager_config",
            Self::CheckSystemdResolvedRunning => "check_systemd_resolved_running",
            Self::CheckNetworkManagerDispatcherFile => "check_network_manager_dispatcher_file",
            Self::CheckNetworkManagerConfig => "check_network_manager_config",
            Self::CheckDnsmasqConfig => "check_dnsmasq_config",
            Self::CheckLibvirtNetworkAvailable => "check_libvirt_network_available",
            Self::CheckLibvirtNetworkActive => "check_libvirt_network_active",
            Self::CheckVsock => "check_vsock",
            Self::CheckBundleExtracted => "check_bundle_extracted",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which of a step's operations is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Check,
    Fix,
    Cleanup,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Check => write!(f, "check"),
            Phase::Fix => write!(f, "fix"),
            Phase::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Named reference to one operation of one step.
///
/// Each step owns at most one operation per phase, so the pair is unique
/// and compares by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OperationRef {
    pub step: StepId,
    pub phase: Phase,
}

impl std::fmt::Display for OperationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.phase, self.step)
    }
}

/// Step flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StepFlags(u8);

impl StepFlags {
    pub const NONE: StepFlags = StepFlags(0);
    /// A failing check is reported, never repaired
    pub const NO_FIX: StepFlags = StepFlags(1);
    /// Runs during setup only
    pub const SETUP_ONLY: StepFlags = StepFlags(1 << 1);
    /// Runs before starting the machine only
    pub const STARTUP_ONLY: StepFlags = StepFlags(1 << 2);

    pub fn contains(self, other: StepFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for StepFlags {
    type Output = StepFlags;

    fn bitor(self, rhs: StepFlags) -> StepFlags {
        StepFlags(self.0 | rhs.0)
    }
}

/// What a step does. A step is a validation or a cleanup, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    Check {
        description: &'static str,
        fix: Option<&'static str>,
    },
    Cleanup {
        description: &'static str,
    },
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: StepId,
    pub action: StepAction,
    pub config_key_suffix: Option<&'static str>,
    pub flags: StepFlags,
    pub applicability: Applicability,
}

impl Step {
    fn check(id: StepId, config_key_suffix: &'static str, description: &'static str) -> Self {
        Self {
            id,
            action: StepAction::Check {
                description,
                fix: None,
            },
            config_key_suffix: Some(config_key_suffix),
            flags: StepFlags::NO_FIX,
            applicability: Applicability::Always,
        }
    }

    fn cleanup(id: StepId, description: &'static str) -> Self {
        Self {
            id,
            action: StepAction::Cleanup { description },
            config_key_suffix: None,
            flags: StepFlags::NONE,
            applicability: Applicability::Always,
        }
    }

    fn fix(mut self, fix_description: &'static str) -> Self {
        if let StepAction::Check { fix, .. } = &mut self.action {
            *fix = Some(fix_description);
        }
        self.flags = StepFlags(self.flags.0 & !StepFlags::NO_FIX.0);
        self
    }

    fn flagged(mut self, flags: StepFlags) -> Self {
        self.flags = self.flags | flags;
        self
    }

    fn when(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    pub fn description(&self) -> &'static str {
        match self.action {
            StepAction::Check { description, .. } => description,
            StepAction::Cleanup { description } => description,
        }
    }

    pub fn fix_description(&self) -> Option<&'static str> {
        match self.action {
            StepAction::Check { fix, .. } => fix,
            StepAction::Cleanup { .. } => None,
        }
    }

    pub fn is_cleanup(&self) -> bool {
        matches!(self.action, StepAction::Cleanup { .. })
    }

    pub fn check_op(&self) -> Option<OperationRef> {
        match self.action {
            StepAction::Check { .. } => Some(self.op(Phase::Check)),
            StepAction::Cleanup { .. } => None,
        }
    }

    pub fn fix_op(&self) -> Option<OperationRef> {
        match self.action {
            StepAction::Check { fix: Some(_), .. } => Some(self.op(Phase::Fix)),
            _ => None,
        }
    }

    pub fn cleanup_op(&self) -> Option<OperationRef> {
        match self.action {
            StepAction::Cleanup { .. } => Some(self.op(Phase::Cleanup)),
            StepAction::Check { .. } => None,
        }
    }

    /// Whether a failing check may be repaired automatically
    pub fn is_auto_fixable(&self) -> bool {
        self.fix_op().is_some() && !self.flags.contains(StepFlags::NO_FIX)
    }

    /// Name of the config option that disables this step
    pub fn skip_setting_name(&self) -> Option<String> {
        self.config_key_suffix
            .map(|suffix| format!("{}{}", SKIP_PREFIX, suffix))
    }

    fn op(&self, phase: Phase) -> OperationRef {
        OperationRef {
            step: self.id,
            phase,
        }
    }
}

/// Get the complete step list, in pipeline order
pub fn step_catalog() -> Vec<Step> {
    use StepId::*;

    vec![
        // === Prelude ===
        Step::check(
            CheckRunningAsNormalUser,
            "check-root-user",
            "Checking if running as non-root",
        ),
        Step::check(
            CheckRunningInsideWsl2,
            "check-wsl2",
            "Checking if running inside WSL2",
        ),
        Step::check(
            CheckAdminHelperCached,
            "check-admin-helper-cached",
            "Checking if the admin helper executable is cached",
        )
        .fix("Caching the admin helper executable"),
        Step::check(
            CheckSupportedCpuArch,
            "check-supported-cpu-arch",
            "Checking if running on a supported CPU architecture",
        ),
        Step::check(
            CheckSymlink,
            "check-symlink",
            "Checking if the executable symlink exists",
        )
        .fix("Creating the executable symlink"),
        Step::check(CheckRam, "check-ram", "Checking minimum RAM requirements"),
        Step::check(
            CheckPodmanInOcBinDir,
            "check-podman-in-oc-bin-dir",
            "Checking if a podman binary is left in the oc binary directory",
        )
        .fix("Removing the podman binary from the oc binary directory"),
        // === Machine cleanup ===
        Step::cleanup(RemoveMachinesDir, "Removing the machine instance directory"),
        Step::cleanup(RemoveAllLogs, "Removing older logs"),
        Step::cleanup(
            ForgetPullSecret,
            "Removing the pull secret from the keyring",
        ),
        Step::cleanup(
            RemoveHostsFileEntry,
            "Removing hosts file records added by the machine",
        ),
        Step::cleanup(
            RemoveKnownHostsEntries,
            "Removing machine entries from SSH known hosts",
        ),
        Step::cleanup(RemoveManPages, "Removing installed man pages"),
        // === Virtualization ===
        Step::check(
            CheckVirtualizationEnabled,
            "check-virt-enabled",
            "Checking if virtualization is enabled",
        ),
        Step::check(
            CheckKvmEnabled,
            "check-kvm-enabled",
            "Checking if KVM is enabled",
        )
        .fix("Setting up KVM"),
        Step::check(
            CheckLibvirtInstalled,
            "check-libvirt-installed",
            "Checking if libvirt is installed",
        )
        .fix("Installing libvirt service and dependencies"),
        Step::check(
            CheckUserInLibvirtGroup,
            "check-user-in-libvirt-group",
            "Checking if user is part of libvirt group",
        )
        .fix("Adding user to libvirt group"),
        Step::check(
            CheckLibvirtGroupActive,
            "check-libvirt-group-active",
            "Checking if active user/process is currently part of the libvirt group",
        )
        .flagged(StepFlags::STARTUP_ONLY),
        Step::check(
            CheckLibvirtServiceRunning,
            "check-libvirt-running",
            "Checking if libvirt daemon is running",
        )
        .fix("Starting libvirt service"),
        Step::check(
            CheckLibvirtVersion,
            "check-libvirt-version",
            "Checking if a supported libvirt version is installed",
        ),
        Step::check(
            CheckLibvirtDriverInstalled,
            "check-libvirt-driver",
            "Checking if the libvirt machine driver is installed",
        )
        .fix("Installing the libvirt machine driver"),
        // === Hypervisor cleanup ===
        Step::cleanup(
            RemoveLibvirtStoragePool,
            "Removing the libvirt storage pool",
        ),
        Step::cleanup(RemoveVm, "Removing the machine instance"),
        // === Daemon ===
        Step::check(
            CheckDaemonSystemdService,
            "check-daemon-systemd-unit",
            "Checking the background daemon systemd service",
        )
        .fix("Setting up the background daemon systemd service")
        .flagged(StepFlags::SETUP_ONLY),
        Step::check(
            CheckDaemonSystemdSockets,
            "check-daemon-systemd-sockets",
            "Checking the background daemon systemd sockets",
        )
        .fix("Setting up the background daemon systemd sockets")
        .flagged(StepFlags::SETUP_ONLY),
        // === Distro extras ===
        Step::check(
            CheckAppArmorProfile,
            "check-apparmor-profile-setup",
            "Checking if AppArmor is configured",
        )
        .fix("Updating AppArmor configuration")
        .when(Applicability::Family(DistroFamily::Debian)),
        // === System networking ===
        Step::check(
            CheckSystemdNetworkdNotRunning,
            "check-systemd-networkd-running",
            "Checking if systemd-networkd is running",
        )
        .when(Applicability::Network(NetworkMode::System)),
        Step::check(
            CheckNetworkManagerInstalled,
            "check-network-manager-installed",
            "Checking if NetworkManager is installed",
        )
        .when(Applicability::Network(NetworkMode::System)),
        Step::check(
            CheckNetworkManagerRunning,
            "check-network-manager-running",
            "Checking if NetworkManager service is running",
        )
        .when(Applicability::Network(NetworkMode::System)),
        Step::check(
            CheckDnsmasqAndNetworkManagerConfig,
            "check-network-manager-dnsmasq-config",
            "Checking if the dnsmasq configuration file exists for NetworkManager",
        )
        .fix("Writing dnsmasq config for NetworkManager")
        .when(SYSTEM_WITH_RESOLVED),
        Step::check(
            CheckSystemdResolvedRunning,
            "check-systemd-resolved-running",
            "Checking if the systemd-resolved service is running",
        )
        .fix("Starting the systemd-resolved service")
        .when(SYSTEM_WITH_RESOLVED),
        Step::check(
            CheckNetworkManagerDispatcherFile,
            "check-network-manager-dispatcher-file",
            "Checking if the NetworkManager dispatcher file exists",
        )
        .fix("Writing NetworkManager dispatcher file")
        .when(SYSTEM_WITH_RESOLVED),
        Step::check(
            CheckNetworkManagerConfig,
            "check-network-manager-config",
            "Checking if NetworkManager configuration exists",
        )
        .fix("Writing NetworkManager config")
        .when(SYSTEM_WITHOUT_RESOLVED),
        Step::check(
            CheckDnsmasqConfig,
            "check-dnsmasq-file",
            "Checking if the dnsmasq configuration file exists",
        )
        .fix("Writing dnsmasq config")
        .when(SYSTEM_WITHOUT_RESOLVED),
        Step::check(
            CheckLibvirtNetworkAvailable,
            "check-libvirt-network",
            "Checking if the libvirt network is available",
        )
        .fix("Setting up the libvirt network")
        .when(Applicability::Network(NetworkMode::System)),
        Step::check(
            CheckLibvirtNetworkActive,
            "check-libvirt-network-active",
            "Checking if the libvirt network is active",
        )
        .fix("Starting the libvirt network")
        .when(Applicability::Network(NetworkMode::System)),
        // === User networking ===
        Step::check(
            CheckVsock,
            "check-vsock",
            "Checking if vsock is correctly configured",
        )
        .fix("Setting up vsock support")
        .when(Applicability::Network(NetworkMode::User)),
        // === Epilogue ===
        Step::check(
            CheckBundleExtracted,
            "check-bundle-extracted",
            "Checking if the bundle is extracted",
        )
        .fix("Getting the bundle for the machine"),
    ]
}

/// The immutable, process-wide step list.
///
/// Built once and shared by reference; pipelines hold references into it.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<Step>,
}

impl Default for StepCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl StepCatalog {
    pub fn new() -> Self {
        Self::from_steps(step_catalog())
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Steps that declare a config key, in catalog order
    pub fn keyed_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps
            .iter()
            .filter(|step| step.config_key_suffix.is_some_and(|k| !k.is_empty()))
    }

    /// Step ids that appear more than once
    pub fn duplicate_ids(&self) -> Vec<StepId> {
        let mut seen = HashSet::new();
        self.steps
            .iter()
            .filter(|step| !seen.insert(step.id))
            .map(|step| step.id)
            .collect()
    }
}
