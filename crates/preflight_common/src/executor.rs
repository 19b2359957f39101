//! Executor - runs a compiled pipeline against the host.
//!
//! The bodies of the operations live behind [`StepRunner`]; the executor
//! only owns ordering, skip flags and the check-then-fix policy.

use crate::builder::{Pipeline, TraversalMode};
use crate::catalog::{OperationRef, Step, StepFlags, StepId};
use crate::config::PreflightConfig;
use crate::error::{PreflightError, Result};
use crate::facts::EnvironmentFacts;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct OperationError(pub String);

pub type OperationResult = std::result::Result<(), OperationError>;

/// Runs the body of one step operation
pub trait StepRunner {
    fn run(&self, op: OperationRef, facts: &EnvironmentFacts) -> OperationResult;
}

impl<F> StepRunner for F
where
    F: Fn(OperationRef, &EnvironmentFacts) -> OperationResult,
{
    fn run(&self, op: OperationRef, facts: &EnvironmentFacts) -> OperationResult {
        self(op, facts)
    }
}

/// Runner that executes nothing and records what it was asked to run.
///
/// Operations listed with [`RecordingRunner::failing`] return an error.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<OperationRef>>,
    failing: HashSet<OperationRef>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, op: OperationRef) -> Self {
        self.failing.insert(op);
        self
    }

    pub fn calls(&self) -> Vec<OperationRef> {
        self.calls.borrow().clone()
    }
}

impl StepRunner for RecordingRunner {
    fn run(&self, op: OperationRef, _facts: &EnvironmentFacts) -> OperationResult {
        self.calls.borrow_mut().push(op);
        if self.failing.contains(&op) {
            Err(OperationError(format!("{} failed", op)))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Fixed,
    /// Disabled by its skip option
    Skipped,
    CleanedUp,
    /// Cleanup failed; the run continued
    CleanupFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: StepId,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub outcomes: Vec<StepOutcome>,
}

impl ExecutionReport {
    fn record(&mut self, step: StepId, outcome: Outcome) {
        self.outcomes.push(StepOutcome { step, outcome });
    }

    pub fn count(&self, outcome: &Outcome) -> usize {
        self.outcomes
            .iter()
            .filter(|o| &o.outcome == outcome)
            .count()
    }
}

pub struct Executor<'c, R> {
    runner: R,
    config: &'c PreflightConfig,
}

impl<'c, R: StepRunner> Executor<'c, R> {
    pub fn new(runner: R, config: &'c PreflightConfig) -> Self {
        Self { runner, config }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Walk the pipeline in the given mode.
    pub fn run(
        &self,
        pipeline: &Pipeline<'_>,
        facts: &EnvironmentFacts,
        mode: TraversalMode,
    ) -> Result<ExecutionReport> {
        info!(mode = %mode, steps = pipeline.len(), "running preflight pipeline");
        match mode {
            TraversalMode::Check => self.run_checks(pipeline, facts, false),
            TraversalMode::Setup => self.run_checks(pipeline, facts, true),
            TraversalMode::Cleanup => self.run_cleanups(pipeline, facts),
        }
    }

    fn run_checks(
        &self,
        pipeline: &Pipeline<'_>,
        facts: &EnvironmentFacts,
        fix: bool,
    ) -> Result<ExecutionReport> {
        let excluded = if fix {
            StepFlags::STARTUP_ONLY
        } else {
            StepFlags::SETUP_ONLY
        };
        let mut report = ExecutionReport::default();

        for step in pipeline.iter() {
            let Some(check) = step.check_op() else {
                continue;
            };
            if step.flags.contains(excluded) {
                debug!(step = %step.id, "not part of this mode");
                continue;
            }
            if self.is_skipped(step) {
                warn!(step = %step.id, "Skipping above check...");
                report.record(step.id, Outcome::Skipped);
                continue;
            }

            info!("{}", step.description());
            let Err(e) = self.runner.run(check, facts) else {
                report.record(step.id, Outcome::Passed);
                continue;
            };
            debug!(step = %step.id, error = %e, "check failed");

            if !fix {
                return Err(PreflightError::StepFailed {
                    step: step.id,
                    reason: e.0,
                });
            }
            self.fix(step, facts, e)?;
            report.record(step.id, Outcome::Fixed);
        }

        Ok(report)
    }

    fn fix(&self, step: &Step, facts: &EnvironmentFacts, cause: OperationError) -> Result<()> {
        let Some(fix_op) = step.fix_op().filter(|_| step.is_auto_fixable()) else {
            return Err(PreflightError::FixNotAvailable {
                step: step.id,
                reason: cause.0,
            });
        };

        if let Some(description) = step.fix_description() {
            info!("{}", description);
        }
        self.runner
            .run(fix_op, facts)
            .map_err(|e| PreflightError::FixFailed {
                step: step.id,
                reason: e.0,
            })
    }

    /// Cleanups run in reverse pipeline order and keep going past failures.
    fn run_cleanups(
        &self,
        pipeline: &Pipeline<'_>,
        facts: &EnvironmentFacts,
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();
        let mut errors = Vec::new();

        for step in pipeline.iter().rev() {
            let Some(cleanup) = step.cleanup_op() else {
                continue;
            };
            info!("{}", step.description());
            match self.runner.run(cleanup, facts) {
                Ok(()) => report.record(step.id, Outcome::CleanedUp),
                Err(e) => {
                    debug!(step = %step.id, error = %e, "cleanup failed");
                    errors.push(format!("{}: {}", step.id, e));
                    report.record(step.id, Outcome::CleanupFailed(e.0));
                }
            }
        }

        if errors.is_empty() {
            Ok(report)
        } else {
            Err(PreflightError::Cleanup(errors))
        }
    }

    fn is_skipped(&self, step: &Step) -> bool {
        step.skip_setting_name()
            .is_some_and(|name| self.config.is_skipped(&name))
    }
}
