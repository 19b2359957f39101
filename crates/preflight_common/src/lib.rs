//! Preflight Common - host readiness pipeline for the cluster virtual machine
//!
//! Compiles the ordered list of preflight steps (checks, fixes, cleanups)
//! for a given host, verifies the step/config binding and executes the
//! result through a pluggable runner.

pub mod applicability;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod facts;
pub mod os_release;
pub mod paths;
pub mod settings;

pub use applicability::Applicability;
pub use builder::{Pipeline, PipelineBuilder, TraversalMode};
pub use catalog::{OperationRef, Phase, Step, StepAction, StepCatalog, StepFlags, StepId};
pub use config::PreflightConfig;
pub use error::PreflightError;
pub use executor::{
    ExecutionReport, Executor, OperationError, Outcome, RecordingRunner, StepRunner,
};
pub use facts::{EnvironmentFacts, NetworkMode, Preset};
pub use os_release::{DistroFamily, OsRelease};
pub use settings::{verify_binding, SettingsRegistry};
