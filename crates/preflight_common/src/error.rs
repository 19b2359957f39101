//! Error types for the preflight pipeline.

use crate::catalog::StepId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreflightError {
    /// The catalog and the settings registry disagree. Programming error.
    #[error("Configuration binding mismatch: {0}")]
    Binding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },

    #[error("{step} failed: {reason}")]
    StepFailed { step: StepId, reason: String },

    #[error("{step} failed and cannot be fixed automatically: {reason}")]
    FixNotAvailable { step: StepId, reason: String },

    #[error("{step} fix failed: {reason}")]
    FixFailed { step: StepId, reason: String },

    #[error("{} cleanup step(s) failed: {}", .0.len(), .0.join("; "))]
    Cleanup(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PreflightError {
    pub fn code(&self) -> i32 {
        match self {
            PreflightError::Binding(_) => 70,
            PreflightError::Config(_) => 78,
            PreflightError::InvalidValue { .. } => 64,
            PreflightError::StepFailed { .. } => 1,
            PreflightError::FixNotAvailable { .. } => 2,
            PreflightError::FixFailed { .. } => 3,
            PreflightError::Cleanup(_) => 4,
            PreflightError::Io(_) => 74,
            PreflightError::Toml(_) => 78,
        }
    }
}

pub type Result<T> = std::result::Result<T, PreflightError>;
