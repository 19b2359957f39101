//! Pipeline selection for every distro / network mode / resolver combination.

use preflight_common::catalog::StepId::{self, *};
use preflight_common::os_release::{FEDORA, RHEL, UBUNTU};
use preflight_common::*;

fn fedora() -> OsRelease {
    OsRelease::new(FEDORA, "35")
}

fn rhel() -> OsRelease {
    OsRelease::new(RHEL, "8.3").with_id_like(FEDORA)
}

fn ubuntu() -> OsRelease {
    OsRelease::new(UBUNTU, "20.04")
}

fn unexpected() -> OsRelease {
    OsRelease::new("unexpected", "1234")
}

const PRELUDE: &[StepId] = &[
    CheckRunningAsNormalUser,
    CheckRunningInsideWsl2,
    CheckAdminHelperCached,
    CheckSupportedCpuArch,
    CheckSymlink,
    CheckRam,
    CheckPodmanInOcBinDir,
    RemoveMachinesDir,
    RemoveAllLogs,
    ForgetPullSecret,
    RemoveHostsFileEntry,
    RemoveKnownHostsEntries,
    RemoveManPages,
    CheckVirtualizationEnabled,
    CheckKvmEnabled,
    CheckLibvirtInstalled,
    CheckUserInLibvirtGroup,
    CheckLibvirtGroupActive,
    CheckLibvirtServiceRunning,
    CheckLibvirtVersion,
    CheckLibvirtDriverInstalled,
    RemoveLibvirtStoragePool,
    RemoveVm,
    CheckDaemonSystemdService,
    CheckDaemonSystemdSockets,
];

const SYSTEM_RESOLVED: &[StepId] = &[
    CheckSystemdNetworkdNotRunning,
    CheckNetworkManagerInstalled,
    CheckNetworkManagerRunning,
    CheckDnsmasqAndNetworkManagerConfig,
    CheckSystemdResolvedRunning,
    CheckNetworkManagerDispatcherFile,
    CheckLibvirtNetworkAvailable,
    CheckLibvirtNetworkActive,
];

const SYSTEM_NO_RESOLVED: &[StepId] = &[
    CheckSystemdNetworkdNotRunning,
    CheckNetworkManagerInstalled,
    CheckNetworkManagerRunning,
    CheckNetworkManagerConfig,
    CheckDnsmasqConfig,
    CheckLibvirtNetworkAvailable,
    CheckLibvirtNetworkActive,
];

const USER: &[StepId] = &[CheckVsock];

fn expected(apparmor: bool, network: &[StepId]) -> Vec<StepId> {
    let mut ids = PRELUDE.to_vec();
    if apparmor {
        ids.push(CheckAppArmorProfile);
    }
    ids.extend_from_slice(network);
    ids.push(CheckBundleExtracted);
    ids
}

fn assert_expected_preflights(
    distro: OsRelease,
    mode: NetworkMode,
    resolved: bool,
    want: Vec<StepId>,
) {
    let catalog = StepCatalog::new();
    let facts =
        EnvironmentFacts::new(distro.clone(), mode, resolved).with_preset(Preset::OpenShift);
    let pipeline = PipelineBuilder::new(&catalog).build(&facts);

    let label = format!("{} {} resolved={}", distro.id, mode, resolved);
    assert_eq!(pipeline.len(), want.len(), "{}", label);
    assert_eq!(pipeline.ids(), want, "{}", label);
}

/// System networking with and without systemd-resolved, then user networking
fn assert_distro_pipelines(distro: OsRelease, apparmor: bool) {
    let cases = [
        (NetworkMode::System, true, SYSTEM_RESOLVED),
        (NetworkMode::System, false, SYSTEM_NO_RESOLVED),
        (NetworkMode::User, false, USER),
    ];
    for (mode, resolved, network) in cases {
        assert_expected_preflights(distro.clone(), mode, resolved, expected(apparmor, network));
    }
}

#[test]
fn test_fedora_pipelines() {
    assert_distro_pipelines(fedora(), false);
}

#[test]
fn test_rhel_pipelines() {
    assert_distro_pipelines(rhel(), false);
}

#[test]
fn test_unexpected_distro_pipelines() {
    assert_distro_pipelines(unexpected(), false);
}

#[test]
fn test_ubuntu_pipelines() {
    assert_distro_pipelines(ubuntu(), true);
}

#[test]
fn test_fedora_system_resolved_length() {
    let catalog = StepCatalog::new();
    let facts = EnvironmentFacts::new(fedora(), NetworkMode::System, true);
    assert_eq!(PipelineBuilder::new(&catalog).build(&facts).len(), 34);
}

#[test]
fn test_user_networking_ignores_resolved_flag() {
    for distro in [fedora(), rhel(), ubuntu(), unexpected()] {
        let catalog = StepCatalog::new();
        let builder = PipelineBuilder::new(&catalog);
        let with = builder.build(&EnvironmentFacts::new(distro.clone(), NetworkMode::User, true));
        let without = builder.build(&EnvironmentFacts::new(distro, NetworkMode::User, false));
        assert_eq!(with.ids(), without.ids());
        assert!(with.contains(CheckVsock));
        assert!(!with.contains(CheckNetworkManagerInstalled));
    }
}

#[test]
fn test_ubuntu_derivative_gets_apparmor() {
    let mint = OsRelease::new("linuxmint", "21").with_id_like("ubuntu debian");
    let catalog = StepCatalog::new();
    let facts = EnvironmentFacts::new(mint, NetworkMode::User, false);
    let pipeline = PipelineBuilder::new(&catalog).build(&facts);
    assert!(pipeline.contains(CheckAppArmorProfile));
}

#[test]
fn test_builds_are_identity_equal() {
    let catalog = StepCatalog::new();
    let builder = PipelineBuilder::new(&catalog);
    let facts = EnvironmentFacts::new(ubuntu(), NetworkMode::System, true);

    let first = builder.build(&facts);
    let second = builder.build(&facts.clone());
    assert_eq!(first.len(), second.len());
    assert!(first
        .steps()
        .iter()
        .zip(second.steps())
        .all(|(a, b)| std::ptr::eq(*a, *b)));
}

#[test]
fn test_pipeline_preserves_catalog_order() {
    let catalog = StepCatalog::new();
    let facts = EnvironmentFacts::new(ubuntu(), NetworkMode::System, false);
    let pipeline = PipelineBuilder::new(&catalog).build(&facts);

    let steps = catalog.steps();
    let positions: Vec<usize> = pipeline
        .iter()
        .map(|step| steps.iter().position(|s| std::ptr::eq(s, step)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_catalog_is_shareable_across_threads() {
    let catalog = StepCatalog::new();
    let facts = EnvironmentFacts::new(fedora(), NetworkMode::System, true);
    let reference = PipelineBuilder::new(&catalog).build(&facts).ids();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| PipelineBuilder::new(&catalog).build(&facts).ids()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), reference);
        }
    });
}
