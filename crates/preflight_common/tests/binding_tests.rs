//! Startup consistency between the step catalog and the settings registry.

use preflight_common::settings::{register_preflight_settings, Setting, SettingKind, SettingValue};
use preflight_common::*;

#[test]
fn test_count_configuration_options() {
    let catalog = StepCatalog::new();
    let mut registry = SettingsRegistry::new();
    register_preflight_settings(&catalog, &mut registry);

    let options = registry.all().len();
    let keyed = catalog
        .steps()
        .iter()
        .filter(|step| step.config_key_suffix.is_some_and(|k| !k.is_empty()))
        .count();
    assert_eq!(options, keyed, "unexpected number of preflight options");
}

#[test]
fn test_every_keyed_step_has_one_option() {
    let catalog = StepCatalog::new();
    let registry = SettingsRegistry::for_catalog(&catalog);

    for step in catalog.keyed_steps() {
        let name = step.skip_setting_name().unwrap();
        let matches = registry.all().iter().filter(|s| s.name == name).count();
        assert_eq!(matches, 1, "{} -> {}", step.id, name);
    }
    assert!(verify_binding(&catalog, &registry).is_ok());
}

#[test]
fn test_catalog_missing_a_step_fails_binding() {
    let full = StepCatalog::new();
    let registry = SettingsRegistry::for_catalog(&full);

    let trimmed: Vec<Step> = full
        .steps()
        .iter()
        .filter(|s| s.id != StepId::CheckBundleExtracted)
        .cloned()
        .collect();
    let trimmed = StepCatalog::from_steps(trimmed);

    let err = verify_binding(&trimmed, &registry).unwrap_err();
    assert!(matches!(err, PreflightError::Binding(_)));
    assert!(err.to_string().contains("skip-check-bundle-extracted"));
}

#[test]
fn test_general_option_named_like_skip_fails_binding() {
    let catalog = StepCatalog::new();
    let mut registry = SettingsRegistry::for_catalog(&catalog);
    registry.add(Setting {
        name: "skip-everything".to_string(),
        default: SettingValue::Bool(false),
        help: String::new(),
        kind: SettingKind::General,
    });
    assert!(verify_binding(&catalog, &registry).is_err());
}
