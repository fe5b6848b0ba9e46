//! Step execution and live-progress engine.
//!
//! A run is an ordered list of [`Step`]s handed to a [`Sequencer`] and driven
//! by the [`Engine`] event loop:
//!
//! - steps run strictly one after another, each on its own task
//! - a step that runs processes uses [`ProcessExecutor`], which streams both
//!   output streams as [`Chunk`]s while the process runs
//! - progress is synthesized from chunk and step events by the
//!   [`ProgressAggregator`] and never moves backwards
//! - facts later steps depend on live in the [`PipelineContext`]
//! - the run ends as [`RunOutcome::Completed`], [`RunOutcome::Failed`] or
//!   [`RunOutcome::Cancelled`]
//!
//! Drawing is left to a [`Renderer`]; this crate has no terminal dependencies.

pub mod chunk;
pub mod context;
pub mod engine;
pub mod error;
pub mod layout;
pub mod log_buffer;
pub mod model;
pub mod process;
pub mod progress;
pub mod render;
pub mod report;
pub mod sequencer;
pub mod step;

pub use chunk::{Chunk, Emitter, StreamSource};
pub use context::{Gate, PipelineContext};
pub use engine::{CANCEL_GRACE, Engine};
pub use error::{ExitDetail, StepError, TuningError};
pub use layout::{Layout, LayoutEvent};
pub use log_buffer::LogBuffer;
pub use model::{EngineEvent, RunModel, RunPhase};
pub use process::{
    CommandSpec, ProcessExecutor, ProcessResult, ProcessSpawner, READER_DRAIN_TIMEOUT,
    SystemSpawner,
};
pub use progress::{ProgressAggregator, ProgressState, ProgressTuning};
pub use render::{HELP_TEXT, NullRenderer, Renderer, RunView, StepBanner};
pub use report::{RunOutcome, RunReport, Warning};
pub use sequencer::{LaunchedStep, RunState, Sequencer, StepTicket};
pub use step::{Step, StepAction, StepContext, StepOutcome, StepPolicy, StepStatus};
