//! The event loop.
//!
//! A single consumer that owns the view state. For each step it waits on
//! whichever comes first: cancellation, an output chunk, the step's terminal
//! result, or a layout change. Every state change is applied to the
//! [`RunModel`] and then rendered.

use crate::chunk::Chunk;
use crate::layout::{Layout, LayoutEvent};
use crate::model::{EngineEvent, RunModel};
use crate::progress::ProgressTuning;
use crate::render::Renderer;
use crate::report::{RunOutcome, RunReport};
use crate::sequencer::{LaunchedStep, Sequencer, StepJoin};
use crate::step::{StepOutcome, StepStatus};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinError;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long a step gets to wind down after cancellation before it is aborted.
pub const CANCEL_GRACE: Duration = Duration::from_secs(5);

pub struct Engine {
    title: String,
    tuning: ProgressTuning,
    layout: Layout,
    layout_events: Option<UnboundedReceiver<LayoutEvent>>,
}

impl Engine {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tuning: ProgressTuning::default(),
            layout: Layout::default(),
            layout_events: None,
        }
    }

    pub fn with_tuning(mut self, tuning: ProgressTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_layout_events(mut self, events: UnboundedReceiver<LayoutEvent>) -> Self {
        self.layout_events = Some(events);
        self
    }

    /// Run every step of `sequencer` and return the terminal report.
    ///
    /// This is the only way a run ends: all steps finished, the first fatal
    /// failure, or `cancel` firing.
    pub async fn run(
        self,
        mut sequencer: Sequencer,
        cancel: CancellationToken,
        renderer: &mut dyn Renderer,
    ) -> RunReport {
        let started = Instant::now();
        let Engine {
            title,
            tuning,
            layout,
            mut layout_events,
        } = self;
        let mut model = RunModel::new(title, sequencer.total(), tuning, layout);
        renderer.render(&model.view());

        let outcome = loop {
            if cancel.is_cancelled() {
                sequencer.halt();
                break RunOutcome::Cancelled;
            }
            let Some(mut launched) = sequencer.launch(&cancel) else {
                break RunOutcome::Completed;
            };
            let index = launched.ticket.index;
            model.apply(EngineEvent::StepStarted {
                index,
                title: launched.ticket.title.clone(),
            });
            renderer.render(&model.view());

            let (joined, cancelled) = drive_step(
                &mut launched,
                &cancel,
                &mut layout_events,
                &mut model,
                renderer,
            )
            .await;
            let outcome = sequencer.complete(&launched.ticket, joined);

            if cancelled {
                sequencer.halt();
                model.apply(EngineEvent::StepFinished {
                    index,
                    status: StepStatus::Cancelled,
                    message: None,
                });
                break RunOutcome::Cancelled;
            }

            let status = outcome.status();
            match outcome {
                StepOutcome::Success => {
                    model.apply(EngineEvent::StepFinished {
                        index,
                        status,
                        message: None,
                    });
                }
                StepOutcome::SoftFailure(message) => {
                    model.apply(EngineEvent::StepFinished {
                        index,
                        status,
                        message: Some(message),
                    });
                }
                StepOutcome::FatalFailure(err) => {
                    let reason = err.to_string();
                    model.apply(EngineEvent::StepFinished {
                        index,
                        status,
                        message: Some(reason.clone()),
                    });
                    break RunOutcome::Failed {
                        step: launched.ticket.title,
                        reason,
                        output: model.transcript().to_vec(),
                    };
                }
                StepOutcome::Cancelled => {
                    model.apply(EngineEvent::StepFinished {
                        index,
                        status,
                        message: None,
                    });
                    break RunOutcome::Cancelled;
                }
            }
            renderer.render(&model.view());
        };

        match &outcome {
            RunOutcome::Completed => model.apply(EngineEvent::Completed),
            RunOutcome::Cancelled => model.apply(EngineEvent::Cancelled),
            RunOutcome::Failed { .. } => {}
        }
        renderer.render(&model.view());

        let report = RunReport {
            outcome,
            warnings: model.warnings().to_vec(),
            progress: model.progress(),
            elapsed: started.elapsed(),
        };
        info!(
            phase = ?model.phase(),
            warnings = report.warnings.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "run finished"
        );
        renderer.finish(&report);
        report
    }
}

/// Pump events for one step until it ends. The flag is `true` when the
/// step ended because of cancellation.
async fn drive_step(
    launched: &mut LaunchedStep,
    cancel: &CancellationToken,
    layout_events: &mut Option<UnboundedReceiver<LayoutEvent>>,
    model: &mut RunModel,
    renderer: &mut dyn Renderer,
) -> (Result<StepJoin, JoinError>, bool) {
    let mut chunks_open = true;
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                let step = launched.ticket.index;
                debug!(step, "cancellation observed; waiting for step to stop");
                // Output still buffered from here on is logged but no longer moves progress.
                model.apply(EngineEvent::Cancelled);
                let joined = match timeout(CANCEL_GRACE, &mut launched.handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(step, "step did not stop within grace period; aborting");
                        launched.handle.abort();
                        (&mut launched.handle).await
                    }
                };
                drain_buffered(&mut launched.chunks, model);
                renderer.render(&model.view());
                return (joined, true);
            }

            chunk = launched.chunks.recv(), if chunks_open => match chunk {
                Some(chunk) => {
                    model.apply(EngineEvent::Chunk(chunk));
                    renderer.render(&model.view());
                }
                None => chunks_open = false,
            },

            joined = &mut launched.handle => {
                // Readers are joined before the action returns, so whatever
                // they produced is already buffered.
                drain_buffered(&mut launched.chunks, model);
                renderer.render(&model.view());
                return (joined, false);
            }

            event = next_layout(layout_events) => match event {
                Some(event) => {
                    model.apply(EngineEvent::Layout(event));
                    renderer.render(&model.view());
                }
                None => *layout_events = None,
            },
        }
    }
}

fn drain_buffered(chunks: &mut UnboundedReceiver<Chunk>, model: &mut RunModel) {
    while let Ok(chunk) = chunks.try_recv() {
        model.apply(EngineEvent::Chunk(chunk));
    }
}

async fn next_layout(events: &mut Option<UnboundedReceiver<LayoutEvent>>) -> Option<LayoutEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
