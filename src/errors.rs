//! User-facing terminal conditions of the CLI.
//!
//! Everything else travels as `anyhow::Error`; these variants exist so `main`
//! can pick the process exit code.

use thiserror::Error;

/// Exit code for a failed run or invalid input.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for a run stopped by the user (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Setup cancelled by user")]
    Aborted,

    #[error("No project name given and stdin is not a terminal; pass a name as the first argument")]
    NonInteractive,

    #[error("Invalid project name '{raw}': {reason}")]
    InvalidProjectName { raw: String, reason: String },

    #[error("Step '{step}' failed: {reason}")]
    RunFailed { step: String, reason: String },

    #[error("Run cancelled")]
    RunCancelled,
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Aborted | CliError::RunCancelled => EXIT_CANCELLED,
            CliError::NonInteractive
            | CliError::InvalidProjectName { .. }
            | CliError::RunFailed { .. } => EXIT_FAILURE,
        }
    }
}

/// Exit code for any error that reached `main`.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CliError>()
        .map(CliError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}
