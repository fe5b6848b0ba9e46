//! Typed error hierarchy for step execution.
//!
//! `StepError` is what a step's action returns. The sequencer decides from the
//! variant and the step's declared policy whether the failure stops the run:
//! - `Spawn` and `Precondition` always stop it
//! - `ProcessExit`, `Io` and `Other` stop it only for fatal steps
//! - `Cancelled` is not a failure at all and ends the run as cancelled

use std::fmt;
use std::process::ExitStatus;
use thiserror::Error;

/// How a child process ended when it did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitDetail {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExitDetail {
    pub fn code(code: i32) -> Self {
        Self { code: Some(code) }
    }
}

impl From<ExitStatus> for ExitDetail {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ExitDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "termination by signal"),
        }
    }
}

/// Errors returned by a step's action.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with {detail}")]
    ProcessExit { command: String, detail: ExitDetail },

    #[error("Precondition not met: {0}")]
    Precondition(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StepError {
    pub fn precondition(reason: impl Into<String>) -> Self {
        StepError::Precondition(reason.into())
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, StepError::Cancelled)
    }

    /// Failures that stop the run regardless of the step's policy.
    pub fn always_fatal(&self) -> bool {
        matches!(self, StepError::Spawn { .. } | StepError::Precondition(_))
    }
}

/// Rejected progress tuning values.
#[derive(Debug, Error, PartialEq)]
pub enum TuningError {
    #[error("chunk_increment must be greater than 0 (got {0})")]
    NonPositiveIncrement(f64),

    #[error("step_ceiling must be in [0, 1) (got {0})")]
    CeilingOutOfRange(f64),
}
