//! Distribution identity from os-release.
//!
//! Only the fields that influence step selection are kept: `ID`,
//! `VERSION_ID` and `ID_LIKE`. The family is derived from `ID` first and
//! then from the `ID_LIKE` tokens, in declaration order.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

pub const FEDORA: &str = "fedora";
pub const RHEL: &str = "rhel";
pub const CENTOS: &str = "centos";
pub const DEBIAN: &str = "debian";
pub const UBUNTU: &str = "ubuntu";

const OS_RELEASE_PATHS: [&str; 2] = ["/etc/os-release", "/usr/lib/os-release"];

/// Distribution families that change which steps run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistroFamily {
    Fedora,
    Debian,
    Unknown,
}

impl DistroFamily {
    fn from_id(id: &str) -> Option<Self> {
        match id {
            FEDORA | RHEL | CENTOS => Some(DistroFamily::Fedora),
            DEBIAN | UBUNTU => Some(DistroFamily::Debian),
            _ => None,
        }
    }
}

impl std::fmt::Display for DistroFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistroFamily::Fedora => write!(f, "fedora"),
            DistroFamily::Debian => write!(f, "debian"),
            DistroFamily::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsRelease {
    pub id: String,
    pub version_id: String,
    /// Space separated list of distributions this one behaves like
    #[serde(default)]
    pub id_like: String,
}

impl OsRelease {
    pub fn new(id: &str, version_id: &str) -> Self {
        Self {
            id: id.to_string(),
            version_id: version_id.to_string(),
            id_like: String::new(),
        }
    }

    pub fn with_id_like(mut self, id_like: &str) -> Self {
        self.id_like = id_like.to_string();
        self
    }

    /// Parse os-release content. Unknown keys and comments are ignored.
    pub fn parse(content: &str) -> Self {
        let mut release = OsRelease::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            match key.trim() {
                "ID" => release.id = value.to_lowercase(),
                "VERSION_ID" => release.version_id = value,
                "ID_LIKE" => release.id_like = value.to_lowercase(),
                _ => {}
            }
        }

        release
    }

    /// Read the host's os-release, trying /etc first then /usr/lib.
    pub fn detect() -> io::Result<Self> {
        let mut last_err = None;
        for path in OS_RELEASE_PATHS {
            match Self::from_path(Path::new(path)) {
                Ok(release) => return Ok(release),
                Err(e) => {
                    debug!(path, error = %e, "os-release not readable");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| io::ErrorKind::NotFound.into()))
    }

    pub fn from_path(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn id_like_tokens(&self) -> impl Iterator<Item = &str> {
        self.id_like.split_whitespace()
    }

    pub fn family(&self) -> DistroFamily {
        DistroFamily::from_id(&self.id)
            .or_else(|| self.id_like_tokens().find_map(DistroFamily::from_id))
            .unwrap_or(DistroFamily::Unknown)
    }
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_and_unquoted() {
        let content = r#"
NAME="Red Hat Enterprise Linux"
ID="rhel"
ID_LIKE="fedora"
VERSION_ID="8.3"
# comment
PRETTY_NAME='RHEL 8.3'
"#;
        let release = OsRelease::parse(content);
        assert_eq!(release.id, "rhel");
        assert_eq!(release.version_id, "8.3");
        assert_eq!(release.id_like, "fedora");
    }

    #[test]
    fn test_family_from_id() {
        assert_eq!(OsRelease::new(FEDORA, "35").family(), DistroFamily::Fedora);
        assert_eq!(
            OsRelease::new(UBUNTU, "20.04").family(),
            DistroFamily::Debian
        );
        assert_eq!(OsRelease::new(DEBIAN, "12").family(), DistroFamily::Debian);
    }

    #[test]
    fn test_family_from_id_like() {
        let mint = OsRelease::new("linuxmint", "21").with_id_like("ubuntu debian");
        assert_eq!(mint.family(), DistroFamily::Debian);

        let alma = OsRelease::new("almalinux", "9.2").with_id_like("rhel centos fedora");
        assert_eq!(alma.family(), DistroFamily::Fedora);
    }

    #[test]
    fn test_unexpected_distro_is_unknown() {
        let release = OsRelease::new("unexpected", "1234");
        assert_eq!(release.family(), DistroFamily::Unknown);
        let arch = OsRelease::new("arch", "").with_id_like("archlinux");
        assert_eq!(arch.family(), DistroFamily::Unknown);
    }

    #[test]
    fn test_parse_ignores_garbage_lines() {
        let release = OsRelease::parse("not a pair\nID=ubuntu\n=\n");
        assert_eq!(release.id, "ubuntu");
        assert_eq!(release.version_id, "");
    }
}
