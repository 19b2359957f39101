//! Pipeline Builder
//!
//! Compiles the ordered step list for one set of facts. The result holds
//! references into the catalog, so two builds from equal facts yield the
//! same steps by identity, in the same order.

use crate::catalog::{Step, StepCatalog, StepId};
use crate::facts::EnvironmentFacts;
use serde::Serialize;
use tracing::debug;

/// How the executor should walk a pipeline.
///
/// The teardown flag never changes which steps are selected; it only picks
/// the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    /// Run checks, fixing failures when allowed
    Setup,
    /// Run checks only, before starting the machine
    Check,
    /// Run cleanups
    Cleanup,
}

impl TraversalMode {
    /// Default traversal for the facts: cleanup on teardown, setup otherwise
    pub fn for_facts(facts: &EnvironmentFacts) -> Self {
        if facts.is_teardown() {
            TraversalMode::Cleanup
        } else {
            TraversalMode::Setup
        }
    }
}

impl std::fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraversalMode::Setup => write!(f, "setup"),
            TraversalMode::Check => write!(f, "check"),
            TraversalMode::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Ordered, applicable steps for one run
#[derive(Debug, Clone, Serialize)]
pub struct Pipeline<'a> {
    steps: Vec<&'a Step>,
    mode: TraversalMode,
}

impl<'a> Pipeline<'a> {
    pub fn steps(&self) -> &[&'a Step] {
        &self.steps
    }

    pub fn ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|step| step.id).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, id: StepId) -> bool {
        self.steps.iter().any(|step| step.id == id)
    }

    pub fn mode(&self) -> TraversalMode {
        self.mode
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &'a Step> + '_ {
        self.steps.iter().copied()
    }
}

pub struct PipelineBuilder<'a> {
    catalog: &'a StepCatalog,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(catalog: &'a StepCatalog) -> Self {
        Self { catalog }
    }

    /// Keep the catalog entries whose rule holds for `facts`, in order.
    pub fn build(&self, facts: &EnvironmentFacts) -> Pipeline<'a> {
        let steps: Vec<&'a Step> = self
            .catalog
            .steps()
            .iter()
            .filter(|step| step.applicability.applies(facts))
            .collect();

        debug!(
            distro = facts.distro_id(),
            family = %facts.family(),
            network_mode = %facts.network_mode(),
            systemd_resolved = facts.systemd_resolved(),
            selected = steps.len(),
            catalog = self.catalog.len(),
            "compiled preflight pipeline"
        );

        Pipeline {
            steps,
            mode: TraversalMode::for_facts(facts),
        }
    }
}
