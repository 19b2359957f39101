//! Applicability rules: one predicate per axis, composed per catalog entry.
//!
//! The axes are independent (distro family, network mode, systemd-resolved)
//! and each has its own predicate so it can be verified on its own. Catalog
//! entries combine them with [`Applicability::All`].

use crate::facts::{EnvironmentFacts, NetworkMode};
use crate::os_release::DistroFamily;
use serde::Serialize;

pub fn always(_facts: &EnvironmentFacts) -> bool {
    true
}

pub fn in_family(facts: &EnvironmentFacts, family: DistroFamily) -> bool {
    facts.family() == family
}

pub fn uses_network_mode(facts: &EnvironmentFacts, mode: NetworkMode) -> bool {
    facts.network_mode() == mode
}

pub fn resolved_matches(facts: &EnvironmentFacts, expected: bool) -> bool {
    facts.systemd_resolved() == expected
}

/// Rule deciding whether a catalog entry appears in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    Always,
    Family(DistroFamily),
    Network(NetworkMode),
    /// systemd-resolved expectation equals the value
    Resolved(bool),
    /// Every rule must hold
    All(&'static [Applicability]),
}

/// System networking with systemd-resolved expected
pub const SYSTEM_WITH_RESOLVED: Applicability = Applicability::All(&[
    Applicability::Network(NetworkMode::System),
    Applicability::Resolved(true),
]);

/// System networking without systemd-resolved
pub const SYSTEM_WITHOUT_RESOLVED: Applicability = Applicability::All(&[
    Applicability::Network(NetworkMode::System),
    Applicability::Resolved(false),
]);

impl Applicability {
    pub fn applies(&self, facts: &EnvironmentFacts) -> bool {
        match self {
            Applicability::Always => always(facts),
            Applicability::Family(family) => in_family(facts, *family),
            Applicability::Network(mode) => uses_network_mode(facts, *mode),
            Applicability::Resolved(expected) => resolved_matches(facts, *expected),
            Applicability::All(rules) => rules.iter().all(|rule| rule.applies(facts)),
        }
    }

    pub fn is_unconditional(&self) -> bool {
        match self {
            Applicability::Always => true,
            Applicability::All(rules) => rules.iter().all(Applicability::is_unconditional),
            _ => false,
        }
    }
}

impl std::fmt::Display for Applicability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Applicability::Always => write!(f, "always"),
            Applicability::Family(family) => write!(f, "family={}", family),
            Applicability::Network(mode) => write!(f, "network={}", mode),
            Applicability::Resolved(expected) => write!(f, "systemd-resolved={}", expected),
            Applicability::All(rules) => {
                let parts: Vec<String> = rules.iter().map(|r| r.to_string()).collect();
                write!(f, "{}", parts.join(" & "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os_release::{OsRelease, FEDORA, RHEL, UBUNTU};

    fn facts(distro: OsRelease, mode: NetworkMode, resolved: bool) -> EnvironmentFacts {
        EnvironmentFacts::new(distro, mode, resolved)
    }

    #[test]
    fn test_family_axis() {
        let debian = Applicability::Family(DistroFamily::Debian);
        let ubuntu = facts(OsRelease::new(UBUNTU, "20.04"), NetworkMode::System, true);
        let rhel = facts(
            OsRelease::new(RHEL, "8.3").with_id_like(FEDORA),
            NetworkMode::System,
            true,
        );
        let unknown = facts(
            OsRelease::new("unexpected", "1234"),
            NetworkMode::System,
            true,
        );

        assert!(debian.applies(&ubuntu));
        assert!(!debian.applies(&rhel));
        assert!(!debian.applies(&unknown));
        assert!(in_family(&rhel, DistroFamily::Fedora));
    }

    #[test]
    fn test_network_axis() {
        let user = facts(OsRelease::new(FEDORA, "35"), NetworkMode::User, true);
        assert!(Applicability::Network(NetworkMode::User).applies(&user));
        assert!(!Applicability::Network(NetworkMode::System).applies(&user));
        assert!(uses_network_mode(&user, NetworkMode::User));
    }

    #[test]
    fn test_resolved_axis_requires_system_networking() {
        let user = facts(OsRelease::new(FEDORA, "35"), NetworkMode::User, true);
        assert!(resolved_matches(&user, true));
        assert!(!SYSTEM_WITH_RESOLVED.applies(&user));
        assert!(!SYSTEM_WITHOUT_RESOLVED.applies(&user));

        let system = facts(OsRelease::new(FEDORA, "35"), NetworkMode::System, false);
        assert!(!SYSTEM_WITH_RESOLVED.applies(&system));
        assert!(SYSTEM_WITHOUT_RESOLVED.applies(&system));
    }

    #[test]
    fn test_display() {
        assert_eq!(Applicability::Always.to_string(), "always");
        assert_eq!(
            SYSTEM_WITH_RESOLVED.to_string(),
            "network=system & systemd-resolved=true"
        );
        assert!(Applicability::All(&[Applicability::Always]).is_unconditional());
        assert!(!SYSTEM_WITH_RESOLVED.is_unconditional());
    }
}
