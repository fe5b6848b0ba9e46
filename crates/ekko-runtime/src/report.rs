//! The terminal result of a run, handed to the presentation shell.

use crate::progress::ProgressState;
use serde::Serialize;
use std::time::Duration;

/// A soft failure that was absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub step: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Failed {
        step: String,
        reason: String,
        /// Every line the failed step produced, in arrival order.
        output: Vec<String>,
    },
    Cancelled,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub warnings: Vec<Warning>,
    pub progress: ProgressState,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn overall_fraction(&self) -> f64 {
        self.progress.overall_fraction()
    }
}
