//! Preflight configuration file
//!
//! TOML, flat option names matching the settings registry:
//!
//! ```toml
//! network-mode = "user"
//! skip-check-ram = true
//!
//! [log]
//! level = "debug"
//! ```
//!
//! Every top-level key must be a registered option and carry a value of the
//! option's type.

use crate::error::{PreflightError, Result};
use crate::facts::{NetworkMode, Preset};
use crate::settings::{self, SettingValue, SettingsRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreflightConfig {
    /// Registered options, keyed by option name
    #[serde(flatten)]
    pub values: BTreeMap<String, toml::Value>,

    #[serde(default)]
    pub log: LogConfig,
}

impl PreflightConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading preflight config");
                Self::parse(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| PreflightError::Config(format!("cannot serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject keys the registry does not know and values of the wrong type.
    pub fn validate(&self, registry: &SettingsRegistry) -> Result<()> {
        for (key, value) in &self.values {
            let setting = registry
                .get(key)
                .ok_or_else(|| PreflightError::Config(format!("unknown option '{}'", key)))?;
            let (type_ok, expected) = match setting.default {
                SettingValue::Bool(_) => (value.is_bool(), "boolean"),
                SettingValue::Text(_) => (value.is_str(), "string"),
            };
            if !type_ok {
                return Err(PreflightError::Config(format!(
                    "option '{}' expects a {} value, got {}",
                    key,
                    expected,
                    value.type_str()
                )));
            }
        }
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: SettingValue) {
        let value = match value {
            SettingValue::Bool(b) => toml::Value::Boolean(b),
            SettingValue::Text(s) => toml::Value::String(s),
        };
        self.values.insert(key.to_string(), value);
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.values
            .get(key)
            .and_then(toml::Value::as_bool)
            .unwrap_or(false)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(toml::Value::as_str)
    }

    /// Whether the option named `skip_setting` is set to true
    pub fn is_skipped(&self, skip_setting: &str) -> bool {
        self.get_bool(skip_setting)
    }

    pub fn network_mode(&self) -> Result<NetworkMode> {
        self.get_str(settings::NETWORK_MODE)
            .map(str::parse)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    pub fn preset(&self) -> Result<Preset> {
        self.get_str(settings::PRESET)
            .map(str::parse)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    pub fn bundle_path(&self) -> Option<PathBuf> {
        match self.get_str(settings::BUNDLE) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            Some(_) => {
                warn!("empty bundle option, using the preset's default bundle");
                None
            }
            None => None,
        }
    }
}
