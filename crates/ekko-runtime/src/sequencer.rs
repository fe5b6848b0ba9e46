//! Step sequencer.
//!
//! Owns the ordered steps and the pipeline context. Steps are handed out one
//! at a time and never overlap: the next one is only launched after the
//! previous one has been completed through [`Sequencer::complete`]. A fatal
//! failure or cancellation halts the sequence; soft failures are absorbed.

use crate::chunk::{Chunk, Emitter};
use crate::context::{Gate, PipelineContext};
use crate::error::StepError;
use crate::step::{Step, StepContext, StepOutcome, StepPolicy};
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What a finished step task hands back: the context it worked on and its result.
pub type StepJoin = (PipelineContext, Result<(), StepError>);

/// Mutable bookkeeping of one run.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Index of the running (or most recently run) step. Only moves forward.
    pub current_index: usize,
    /// Per step index: did the step succeed.
    pub step_flags: BTreeMap<usize, bool>,
}

/// Identity of a launched step.
#[derive(Debug, Clone)]
pub struct StepTicket {
    pub index: usize,
    pub title: String,
    pub policy: StepPolicy,
    pub provides: Option<Gate>,
}

/// A step running on its own task.
pub struct LaunchedStep {
    pub ticket: StepTicket,
    /// Closes once the action and every process reader have dropped their emitters.
    pub chunks: UnboundedReceiver<Chunk>,
    pub handle: JoinHandle<StepJoin>,
}

pub struct Sequencer {
    pending: VecDeque<Step>,
    total: usize,
    launched: usize,
    halted: bool,
    context: PipelineContext,
    state: RunState,
}

impl Sequencer {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            total: steps.len(),
            pending: steps.into(),
            launched: 0,
            halted: false,
            context: PipelineContext::new(),
            state: RunState::default(),
        }
    }

    /// Seed the pipeline context, e.g. with paths known before the run.
    pub fn with_context(mut self, context: PipelineContext) -> Self {
        self.context = context;
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Context as of the last completed step.
    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Stop handing out steps, e.g. after cancellation.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    /// Start the next step on a new task, or `None` when the sequence is over.
    ///
    /// The task works on a copy of the context; the sequencer keeps the
    /// pre-step snapshot until [`Sequencer::complete`] swaps the result in.
    pub fn launch(&mut self, cancel: &CancellationToken) -> Option<LaunchedStep> {
        if self.halted {
            return None;
        }
        let step = self.pending.pop_front()?;

        let index = self.launched;
        self.launched += 1;
        self.state.current_index = index;

        let ticket = StepTicket {
            index,
            title: step.title().to_string(),
            policy: step.policy(),
            provides: step.provides(),
        };
        info!(step = index, title = %ticket.title, policy = %ticket.policy, "starting step");

        let (emit, chunks) = Emitter::channel();
        let mut cx = StepContext {
            cancel: cancel.clone(),
            emit,
            pipeline: self.context.clone(),
        };
        let handle = tokio::spawn(async move {
            let result = step.execute(&mut cx).await;
            (cx.pipeline, result)
        });

        Some(LaunchedStep {
            ticket,
            chunks,
            handle,
        })
    }

    /// Record how a launched step ended and decide whether the run continues.
    ///
    /// The step's gate, if any, is opened on success and closed otherwise.
    pub fn complete(
        &mut self,
        ticket: &StepTicket,
        joined: Result<StepJoin, JoinError>,
    ) -> StepOutcome {
        let result = match joined {
            Ok((context, result)) => {
                self.context = context;
                result
            }
            Err(err) if err.is_cancelled() => Err(StepError::Cancelled),
            Err(err) => {
                warn!(step = ticket.index, error = %err, "step task panicked");
                Err(StepError::Other(anyhow::anyhow!("step task panicked: {}", err)))
            }
        };

        let outcome = StepOutcome::classify(ticket.policy, result);
        let succeeded = outcome.is_success();
        if let Some(gate) = ticket.provides {
            self.context.set(gate, succeeded);
        }
        self.state.step_flags.insert(ticket.index, succeeded);

        match &outcome {
            StepOutcome::Success => {
                info!(step = ticket.index, title = %ticket.title, "step succeeded");
            }
            StepOutcome::SoftFailure(message) => {
                info!(
                    step = ticket.index,
                    title = %ticket.title,
                    %message,
                    "soft step failed; continuing"
                );
            }
            StepOutcome::FatalFailure(err) => {
                info!(
                    step = ticket.index,
                    title = %ticket.title,
                    error = %err,
                    "fatal step failed; halting"
                );
                self.halted = true;
            }
            StepOutcome::Cancelled => {
                info!(step = ticket.index, title = %ticket.title, "step cancelled");
                self.halted = true;
            }
        }
        outcome
    }
}
