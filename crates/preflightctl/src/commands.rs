//! Command implementations. Each returns the text to print on stdout.

use anyhow::{Context, Result};
use preflight_common::settings::SettingValue;
use preflight_common::{
    verify_binding, EnvironmentFacts, ExecutionReport, Executor, OperationRef, Outcome, Pipeline,
    PreflightConfig, RecordingRunner, SettingsRegistry, StepCatalog, TraversalMode,
};
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Serialize)]
struct PlanEntry {
    index: usize,
    id: String,
    kind: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_key: Option<String>,
    skipped: bool,
    applicability: String,
}

#[derive(Debug, Serialize)]
struct PlanView<'a> {
    distro: &'a str,
    version: &'a str,
    family: String,
    network_mode: String,
    systemd_resolved: bool,
    preset: String,
    bundle: String,
    mode: TraversalMode,
    steps: Vec<PlanEntry>,
}

fn plan_entries(pipeline: &Pipeline<'_>, config: &PreflightConfig) -> Vec<PlanEntry> {
    pipeline
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let config_key = step.skip_setting_name();
            let skipped = config_key.as_deref().is_some_and(|k| config.is_skipped(k));
            PlanEntry {
                index: i + 1,
                id: step.id.to_string(),
                kind: if step.is_cleanup() { "cleanup" } else { "check" },
                description: step.description(),
                fix: step.fix_description(),
                config_key,
                skipped,
                applicability: step.applicability.to_string(),
            }
        })
        .collect()
}

/// The compiled pipeline for `facts`
pub fn plan(
    pipeline: &Pipeline<'_>,
    facts: &EnvironmentFacts,
    config: &PreflightConfig,
    json: bool,
) -> Result<String> {
    let entries = plan_entries(pipeline, config);

    if json {
        let view = PlanView {
            distro: facts.distro_id(),
            version: &facts.distro().version_id,
            family: facts.family().to_string(),
            network_mode: facts.network_mode().to_string(),
            systemd_resolved: facts.systemd_resolved(),
            preset: facts.preset().to_string(),
            bundle: facts.bundle_path().display().to_string(),
            mode: pipeline.mode(),
            steps: entries,
        };
        return serde_json::to_string_pretty(&view).context("cannot serialize plan");
    }

    let mut out = String::new();
    let distro = if facts.distro_id().is_empty() {
        "unknown"
    } else {
        facts.distro_id()
    };
    writeln!(
        out,
        "Preflight plan: {} {} ({}), network {}, systemd-resolved {}, preset {}",
        distro,
        facts.distro().version_id,
        facts.family(),
        facts.network_mode(),
        facts.systemd_resolved(),
        facts.preset()
    )?;
    writeln!(out, "Bundle: {}", facts.bundle_path().display())?;
    writeln!(out, "Mode: {}", pipeline.mode())?;
    writeln!(out)?;

    for entry in &entries {
        let skip = if entry.skipped { " [skipped]" } else { "" };
        writeln!(
            out,
            "{:>3}. {:<7} {:<42} {}{}",
            entry.index, entry.kind, entry.id, entry.description, skip
        )?;
    }
    writeln!(out)?;
    write!(out, "{} steps", entries.len())?;
    Ok(out)
}

#[derive(Debug, Serialize)]
struct SettingView<'a> {
    name: &'a str,
    value: String,
    default: String,
    help: &'a str,
}

/// Registered options with their current values
pub fn settings(
    registry: &SettingsRegistry,
    config: &PreflightConfig,
    json: bool,
) -> Result<String> {
    let views: Vec<SettingView<'_>> = registry
        .all()
        .iter()
        .map(|setting| {
            let value = match &setting.default {
                SettingValue::Bool(default) => {
                    let set = config.values.get(&setting.name).and_then(|v| v.as_bool());
                    set.unwrap_or(*default).to_string()
                }
                SettingValue::Text(default) => {
                    let set = config.get_str(&setting.name);
                    set.unwrap_or(default).to_string()
                }
            };
            SettingView {
                name: &setting.name,
                value,
                default: setting.default.to_string(),
                help: &setting.help,
            }
        })
        .collect();

    if json {
        return serde_json::to_string_pretty(&views).context("cannot serialize settings");
    }

    let mut out = String::new();
    for view in &views {
        writeln!(out, "{:<42} {:<10} {}", view.name, view.value, view.help)?;
    }
    write!(out, "{} options", views.len())?;
    Ok(out)
}

/// Binding check summary; errors when the binding is broken
pub fn verify(catalog: &StepCatalog, registry: &SettingsRegistry) -> Result<String> {
    verify_binding(catalog, registry).context("preflight configuration binding is broken")?;
    Ok(format!(
        "OK: {} steps, {} preflight options bound",
        catalog.len(),
        registry.preflight_settings().count()
    ))
}

#[derive(Debug, Serialize)]
struct RunView {
    mode: TraversalMode,
    operations: Vec<String>,
    report: ExecutionReport,
}

/// Walk the pipeline with a recording runner; nothing on the host changes.
pub fn run(
    pipeline: &Pipeline<'_>,
    facts: &EnvironmentFacts,
    config: &PreflightConfig,
    mode: TraversalMode,
    json: bool,
) -> Result<String> {
    let executor = Executor::new(RecordingRunner::new(), config);
    let report = executor
        .run(pipeline, facts, mode)
        .with_context(|| format!("{} run failed", mode))?;
    let operations: Vec<OperationRef> = executor.runner().calls();

    if json {
        let view = RunView {
            mode,
            operations: operations.iter().map(|op| op.to_string()).collect(),
            report,
        };
        return serde_json::to_string_pretty(&view).context("cannot serialize run report");
    }

    let mut out = String::new();
    writeln!(out, "Dry run ({}):", mode)?;
    for op in &operations {
        writeln!(out, "  would run {}", op)?;
    }
    for outcome in &report.outcomes {
        if outcome.outcome == Outcome::Skipped {
            writeln!(out, "  skipped {}", outcome.step)?;
        }
    }
    write!(out, "{} operations", operations.len())?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_common::{NetworkMode, OsRelease, PipelineBuilder};

    fn setup() -> (StepCatalog, EnvironmentFacts) {
        let facts =
            EnvironmentFacts::new(OsRelease::new("ubuntu", "22.04"), NetworkMode::User, false);
        (StepCatalog::new(), facts)
    }

    #[test]
    fn test_plan_text() {
        let (catalog, facts) = setup();
        let pipeline = PipelineBuilder::new(&catalog).build(&facts);
        let mut config = PreflightConfig::default();
        config.set("skip-check-ram", SettingValue::Bool(true));

        let out = plan(&pipeline, &facts, &config, false).unwrap();
        assert!(out.starts_with("Preflight plan: ubuntu 22.04 (debian)"));
        assert!(out.contains("check_apparmor_profile"));
        assert!(out.contains("check_vsock"));
        assert!(!out.contains("check_network_manager_installed"));
        assert!(out.contains("[skipped]"));
        assert!(out.ends_with(&format!("{} steps", pipeline.len())));
    }

    #[test]
    fn test_plan_json() {
        let (catalog, facts) = setup();
        let pipeline = PipelineBuilder::new(&catalog).build(&facts);
        let out = plan(&pipeline, &facts, &PreflightConfig::default(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["family"], "debian");
        assert_eq!(value["version"], "22.04");
        assert_eq!(value["steps"].as_array().unwrap().len(), pipeline.len());
        assert_eq!(value["steps"][0]["id"], "check_running_as_normal_user");
        assert_eq!(value["steps"][7]["kind"], "cleanup");
    }

    #[test]
    fn test_settings_reflect_config() {
        let catalog = StepCatalog::new();
        let registry = SettingsRegistry::for_catalog(&catalog);
        let config = PreflightConfig::parse("skip-check-vsock = true\n").unwrap();
        let out = settings(&registry, &config, false).unwrap();
        let line = out.lines().find(|l| l.starts_with("skip-check-vsock"));
        assert!(line.unwrap().contains("true"));
    }

    #[test]
    fn test_verify_ok() {
        let catalog = StepCatalog::new();
        let registry = SettingsRegistry::for_catalog(&catalog);
        assert!(verify(&catalog, &registry).unwrap().starts_with("OK:"));
    }

    #[test]
    fn test_dry_run_cleanup() {
        let (catalog, facts) = setup();
        let pipeline = PipelineBuilder::new(&catalog).build(&facts);
        let config = PreflightConfig::default();
        let out = run(&pipeline, &facts, &config, TraversalMode::Cleanup, false).unwrap();
        assert!(out.contains("would run cleanup:remove_vm"));
        assert!(out.ends_with("8 operations"));
    }
}
