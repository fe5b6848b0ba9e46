//! Steps: named units of provisioning work.

use crate::chunk::Emitter;
use crate::context::{Gate, PipelineContext};
use crate::error::StepError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Whether a failing step stops the run. Fixed when the step is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// Any failure stops the sequence.
    Fatal,
    /// Failure is logged as a warning and the sequence continues.
    Soft,
}

impl fmt::Display for StepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepPolicy::Fatal => write!(f, "fatal"),
            StepPolicy::Soft => write!(f, "soft"),
        }
    }
}

/// Everything a running action may touch.
pub struct StepContext {
    pub cancel: CancellationToken,
    pub emit: Emitter,
    /// Write access for the running step only; earlier steps' facts are read here.
    pub pipeline: PipelineContext,
}

/// The executable part of a step.
#[async_trait]
pub trait StepAction: Send + Sync {
    async fn run(&self, cx: &mut StepContext) -> Result<(), StepError>;
}

/// A named unit of work with a fixed failure policy.
pub struct Step {
    title: String,
    policy: StepPolicy,
    provides: Option<Gate>,
    action: Box<dyn StepAction>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("title", &self.title)
            .field("policy", &self.policy)
            .field("provides", &self.provides)
            .finish_non_exhaustive()
    }
}

impl Step {
    pub fn new(
        title: impl Into<String>,
        policy: StepPolicy,
        action: impl StepAction + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            policy,
            provides: None,
            action: Box::new(action),
        }
    }

    pub fn fatal(title: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self::new(title, StepPolicy::Fatal, action)
    }

    pub fn soft(title: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self::new(title, StepPolicy::Soft, action)
    }

    /// Declare the gate this step opens on success and closes on failure.
    pub fn providing(mut self, gate: Gate) -> Self {
        self.provides = Some(gate);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn policy(&self) -> StepPolicy {
        self.policy
    }

    pub fn provides(&self) -> Option<Gate> {
        self.provides
    }

    /// Run the action. Consumes the step, so it can run at most once.
    pub async fn execute(self, cx: &mut StepContext) -> Result<(), StepError> {
        self.action.run(cx).await
    }
}

/// Result of one step as seen by the sequencer.
#[derive(Debug)]
pub enum StepOutcome {
    Success,
    /// A soft step failed; the message is logged and the run continues.
    SoftFailure(String),
    /// The run stops with this error.
    FatalFailure(StepError),
    /// The step observed cancellation; the run ends as cancelled.
    Cancelled,
}

impl StepOutcome {
    /// Classify an action's result under `policy`.
    ///
    /// Spawn and precondition failures are fatal even for soft steps.
    pub fn classify(policy: StepPolicy, result: Result<(), StepError>) -> Self {
        match result {
            Ok(()) => StepOutcome::Success,
            Err(err) if err.is_cancellation() => StepOutcome::Cancelled,
            Err(err) if err.always_fatal() => StepOutcome::FatalFailure(err),
            Err(err) => match policy {
                StepPolicy::Fatal => StepOutcome::FatalFailure(err),
                StepPolicy::Soft => StepOutcome::SoftFailure(err.to_string()),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }

    pub fn status(&self) -> StepStatus {
        match self {
            StepOutcome::Success => StepStatus::Succeeded,
            StepOutcome::SoftFailure(_) => StepStatus::SoftFailed,
            StepOutcome::FatalFailure(_) => StepStatus::Failed,
            StepOutcome::Cancelled => StepStatus::Cancelled,
        }
    }
}

/// Payload-free form of [`StepOutcome`] for events and renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    SoftFailed,
    Failed,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExitDetail;

    struct Noop;

    #[async_trait]
    impl StepAction for Noop {
        async fn run(&self, _cx: &mut StepContext) -> Result<(), StepError> {
            Ok(())
        }
    }

    fn exit_error() -> StepError {
        StepError::ProcessExit {
            command: "pnpm dlx shadcn@latest init".into(),
            detail: ExitDetail::code(1),
        }
    }

    #[test]
    fn test_step_builders() {
        let gate = Gate::new("shadcn-ready");
        let step = Step::soft("Initialize shadcn", Noop).providing(gate);
        assert_eq!(step.title(), "Initialize shadcn");
        assert_eq!(step.policy(), StepPolicy::Soft);
        assert_eq!(step.provides(), Some(gate));
        assert_eq!(Step::fatal("Scaffold", Noop).provides(), None);
    }

    #[test]
    fn test_classify_exit_error_by_policy() {
        assert!(matches!(
            StepOutcome::classify(StepPolicy::Soft, Err(exit_error())),
            StepOutcome::SoftFailure(msg) if msg.contains("exit code 1")
        ));
        assert!(matches!(
            StepOutcome::classify(StepPolicy::Fatal, Err(exit_error())),
            StepOutcome::FatalFailure(StepError::ProcessExit { .. })
        ));
    }

    #[test]
    fn test_classify_precondition_is_fatal_for_soft_steps() {
        let outcome = StepOutcome::classify(
            StepPolicy::Soft,
            Err(StepError::precondition("shadcn not initialised")),
        );
        assert_eq!(outcome.status(), StepStatus::Failed);
    }

    #[test]
    fn test_classify_cancelled() {
        let outcome = StepOutcome::classify(StepPolicy::Fatal, Err(StepError::Cancelled));
        assert_eq!(outcome.status(), StepStatus::Cancelled);
        assert!(StepOutcome::classify(StepPolicy::Fatal, Ok(())).is_success());
    }
}
