//! Settings registry and the preflight configuration binding.
//!
//! Every step that declares a config key gets exactly one `skip-<key>`
//! boolean option. The binding is verified once at startup; a mismatch
//! means the catalog and the registry were edited out of step.

use crate::catalog::{StepCatalog, SKIP_PREFIX};
use crate::error::{PreflightError, Result};
use crate::facts::{NetworkMode, Preset};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

pub const NETWORK_MODE: &str = "network-mode";
pub const PRESET: &str = "preset";
pub const BUNDLE: &str = "bundle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    /// Disables one preflight step
    PreflightSkip,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A registered option
#[derive(Debug, Clone, Serialize)]
pub struct Setting {
    pub name: String,
    pub default: SettingValue,
    pub help: String,
    pub kind: SettingKind,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsRegistry {
    settings: Vec<Setting>,
}

impl SettingsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the general options and one skip option per keyed step
    pub fn for_catalog(catalog: &StepCatalog) -> Self {
        let mut registry = Self::new();
        register_general_settings(&mut registry);
        register_preflight_settings(catalog, &mut registry);
        registry
    }

    /// Register an option. Registering a name twice is kept so that
    /// [`verify_binding`] can report it.
    pub fn add(&mut self, setting: Setting) {
        if self.get(&setting.name).is_some() {
            debug!(name = %setting.name, "setting registered more than once");
        }
        self.settings.push(setting);
    }

    pub fn get(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.name == name)
    }

    pub fn all(&self) -> &[Setting] {
        &self.settings
    }

    pub fn preflight_settings(&self) -> impl Iterator<Item = &Setting> {
        self.settings
            .iter()
            .filter(|s| s.kind == SettingKind::PreflightSkip)
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

fn register_general_settings(registry: &mut SettingsRegistry) {
    registry.add(Setting {
        name: NETWORK_MODE.to_string(),
        default: SettingValue::Text(NetworkMode::default().to_string()),
        help: "Network mode (system or user)".to_string(),
        kind: SettingKind::General,
    });
    registry.add(Setting {
        name: PRESET.to_string(),
        default: SettingValue::Text(Preset::default().to_string()),
        help: "Virtual machine preset (openshift, microshift or okd)".to_string(),
        kind: SettingKind::General,
    });
    registry.add(Setting {
        name: BUNDLE.to_string(),
        default: SettingValue::Text(String::new()),
        help: "Bundle path (empty for the preset's default bundle)".to_string(),
        kind: SettingKind::General,
    });
}

/// Register `skip-<key>` for every keyed step in the catalog
pub fn register_preflight_settings(catalog: &StepCatalog, registry: &mut SettingsRegistry) {
    for step in catalog.keyed_steps() {
        if let Some(name) = step.skip_setting_name() {
            registry.add(Setting {
                name,
                default: SettingValue::Bool(false),
                help: "Skip preflight check (true/false, default: false)".to_string(),
                kind: SettingKind::PreflightSkip,
            });
        }
    }
}

/// Check that keyed steps and preflight options match one to one.
pub fn verify_binding(catalog: &StepCatalog, registry: &SettingsRegistry) -> Result<()> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for setting in registry.preflight_settings() {
        *counts.entry(setting.name.as_str()).or_default() += 1;
    }

    let mut problems = Vec::new();
    let mut expected = BTreeSet::new();

    for step in catalog.keyed_steps() {
        let Some(name) = step.skip_setting_name() else {
            continue;
        };
        match counts.get(name.as_str()).copied().unwrap_or(0) {
            1 => {}
            0 => problems.push(format!("{} has no '{}' option", step.id, name)),
            n => problems.push(format!("'{}' is registered {} times", name, n)),
        }
        if !expected.insert(name.clone()) {
            problems.push(format!("config key of {} is used by another step", step.id));
        }
    }

    let mut extra: Vec<&str> = counts
        .keys()
        .copied()
        .filter(|name| !expected.contains(*name))
        .collect();
    extra.sort_unstable();
    for name in extra {
        problems.push(format!("'{}' does not belong to any step", name));
    }

    for setting in registry.all() {
        if setting.kind == SettingKind::General && setting.name.starts_with(SKIP_PREFIX) {
            problems.push(format!("'{}' looks like a skip option but is not one", setting.name));
        }
    }

    let registered = registry.preflight_settings().count();
    if problems.is_empty() && registered != expected.len() {
        problems.push(format!(
            "{} preflight options registered for {} keyed steps",
            registered,
            expected.len()
        ));
    }

    if problems.is_empty() {
        info!(
            options = registered,
            "preflight configuration binding verified"
        );
        Ok(())
    } else {
        Err(PreflightError::Binding(problems.join("; ")))
    }
}
