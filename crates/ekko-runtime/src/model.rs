//! View state of a run, driven purely by events.
//!
//! The event loop turns everything that happens (a step starting, a line of
//! output, a step ending, a resize, cancellation) into an [`EngineEvent`] and
//! feeds it to [`RunModel::apply`]. Replaying the same events always yields
//! the same model, which is what renderers draw from.

use crate::chunk::Chunk;
use crate::layout::{Layout, LayoutEvent};
use crate::log_buffer::LogBuffer;
use crate::progress::{ProgressAggregator, ProgressState, ProgressTuning};
use crate::render::{HELP_TEXT, RunView, StepBanner};
use crate::report::Warning;
use crate::step::StepStatus;
use serde::Serialize;

/// Run state machine.
///
/// `Idle -> Running(i) -> Running(i+1) | SoftContinuing(i+1) | Failed | Cancelled | Completed`.
/// `SoftContinuing` marks a step that started after its predecessor failed softly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "step", rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running(usize),
    SoftContinuing(usize),
    Failed,
    Cancelled,
    Completed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Failed | RunPhase::Cancelled | RunPhase::Completed
        )
    }

    pub fn step_index(&self) -> Option<usize> {
        match self {
            RunPhase::Running(index) | RunPhase::SoftContinuing(index) => Some(*index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StepStarted {
        index: usize,
        title: String,
    },
    Chunk(Chunk),
    StepFinished {
        index: usize,
        status: StepStatus,
        message: Option<String>,
    },
    Layout(LayoutEvent),
    Cancelled,
    Completed,
}

#[derive(Debug, Clone)]
pub struct RunModel {
    header: String,
    total: usize,
    phase: RunPhase,
    progress: ProgressAggregator,
    log: LogBuffer,
    layout: Layout,
    current: Option<(usize, String)>,
    transcript: Vec<String>,
    warnings: Vec<Warning>,
    previous_soft_failed: bool,
}

impl RunModel {
    pub fn new(
        header: impl Into<String>,
        total: usize,
        tuning: ProgressTuning,
        layout: Layout,
    ) -> Self {
        Self {
            header: header.into(),
            total,
            phase: RunPhase::Idle,
            progress: ProgressAggregator::new(total, tuning),
            log: LogBuffer::new(layout.wrap_width()),
            layout,
            current: None,
            transcript: Vec::new(),
            warnings: Vec::new(),
            previous_soft_failed: false,
        }
    }

    pub fn apply(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::StepStarted { index, title } => {
                if self.phase.is_terminal() {
                    return;
                }
                self.phase = if std::mem::take(&mut self.previous_soft_failed) {
                    RunPhase::SoftContinuing(index)
                } else {
                    RunPhase::Running(index)
                };
                self.progress.step_started();
                self.log.push_header(&title);
                self.transcript.clear();
                self.current = Some((index, title));
            }
            EngineEvent::Chunk(chunk) => {
                // Chunks drained after cancellation are still logged.
                if !self.phase.is_terminal() {
                    self.progress.on_chunk();
                }
                self.log.push(&chunk.text);
                self.transcript.push(chunk.text);
            }
            EngineEvent::StepFinished {
                index,
                status,
                message,
            } => self.step_finished(index, status, message),
            EngineEvent::Layout(event) => {
                self.layout.apply(event);
                self.log.set_wrap_width(self.layout.wrap_width());
            }
            EngineEvent::Cancelled => {
                if !self.phase.is_terminal() {
                    self.phase = RunPhase::Cancelled;
                    self.log.push("cancelled");
                }
            }
            EngineEvent::Completed => {
                if !self.phase.is_terminal() {
                    self.phase = RunPhase::Completed;
                }
            }
        }
    }

    fn step_finished(&mut self, index: usize, status: StepStatus, message: Option<String>) {
        if self.phase.is_terminal() {
            return;
        }
        let title = match &self.current {
            Some((current, title)) if *current == index => title.clone(),
            _ => format!("step {}", index + 1),
        };
        let message = message.unwrap_or_default();
        match status {
            StepStatus::Succeeded => self.progress.on_step_finished(),
            StepStatus::SoftFailed => {
                self.progress.on_step_finished();
                self.log.push_warning(&title, &message);
                self.warnings.push(Warning {
                    step: title,
                    message,
                });
                self.previous_soft_failed = true;
            }
            StepStatus::Failed => {
                self.progress.on_step_finished();
                self.log.push_error(&title, &message);
                self.phase = RunPhase::Failed;
            }
            StepStatus::Cancelled => {
                self.phase = RunPhase::Cancelled;
                self.log.push("cancelled");
            }
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn progress(&self) -> ProgressState {
        self.progress.state()
    }

    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Output of the current (or last) step.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn current_title(&self) -> Option<&str> {
        self.current.as_ref().map(|(_, title)| title.as_str())
    }

    pub fn view(&self) -> RunView<'_> {
        RunView {
            header: &self.header,
            phase: self.phase,
            step: self.current.as_ref().map(|(index, title)| StepBanner {
                index: *index,
                total: self.total,
                title,
            }),
            progress: self.progress.state(),
            log: self.log.lines(),
            viewport: self.layout.viewport_height(),
            help: HELP_TEXT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(total: usize) -> RunModel {
        RunModel::new("create-ekko-app", total, ProgressTuning::default(), Layout::default())
    }

    fn started(index: usize, title: &str) -> EngineEvent {
        EngineEvent::StepStarted {
            index,
            title: title.to_string(),
        }
    }

    fn finished(index: usize, status: StepStatus, message: Option<&str>) -> EngineEvent {
        EngineEvent::StepFinished {
            index,
            status,
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn test_soft_failure_moves_to_soft_continuing() {
        let mut m = model(3);
        assert_eq!(m.phase(), RunPhase::Idle);

        m.apply(started(0, "scaffold"));
        assert_eq!(m.phase(), RunPhase::Running(0));
        m.apply(finished(0, StepStatus::Succeeded, None));

        m.apply(started(1, "ui-init"));
        m.apply(finished(1, StepStatus::SoftFailed, Some("exit code 1")));
        m.apply(started(2, "install-deps"));
        assert_eq!(m.phase(), RunPhase::SoftContinuing(2));
        m.apply(finished(2, StepStatus::Succeeded, None));
        m.apply(EngineEvent::Completed);

        assert_eq!(m.phase(), RunPhase::Completed);
        assert_eq!(m.progress().overall_fraction(), 1.0);
        assert_eq!(m.warnings().len(), 1);
        assert!(
            m.log()
                .lines()
                .iter()
                .any(|line| line.starts_with("warning:") && line.contains("ui-init"))
        );
    }

    #[test]
    fn test_fatal_failure_is_terminal() {
        let mut m = model(2);
        m.apply(started(0, "scaffold"));
        m.apply(EngineEvent::Chunk(Chunk::stderr("boom")));
        m.apply(finished(0, StepStatus::Failed, Some("exit code 2")));
        assert_eq!(m.phase(), RunPhase::Failed);

        m.apply(started(1, "install"));
        m.apply(EngineEvent::Completed);
        assert_eq!(m.phase(), RunPhase::Failed);
        assert_eq!(m.transcript(), ["boom"]);
        assert_eq!(m.current_title(), Some("scaffold"));
    }

    #[test]
    fn test_transcript_resets_per_step() {
        let mut m = model(2);
        m.apply(started(0, "one"));
        m.apply(EngineEvent::Chunk(Chunk::stdout("a")));
        m.apply(finished(0, StepStatus::Succeeded, None));
        m.apply(started(1, "two"));
        m.apply(EngineEvent::Chunk(Chunk::stdout("b")));
        assert_eq!(m.transcript(), ["b"]);
        assert_eq!(m.log().lines(), ["## one", "a", "", "## two", "b"]);
    }

    #[test]
    fn test_cancel_keeps_progress_and_logs_late_chunks() {
        let mut m = model(2);
        m.apply(started(0, "scaffold"));
        m.apply(EngineEvent::Chunk(Chunk::stdout("line")));
        let before = m.progress();
        m.apply(EngineEvent::Cancelled);
        m.apply(EngineEvent::Chunk(Chunk::stdout("late")));
        assert_eq!(m.phase(), RunPhase::Cancelled);
        assert_eq!(m.progress(), before);
        assert!(m.log().lines().iter().any(|line| line == "late"));
    }

    #[test]
    fn test_resize_changes_view() {
        let mut m = model(1);
        m.apply(EngineEvent::Layout(LayoutEvent::Resize {
            width: 30,
            height: 100,
        }));
        assert_eq!(m.view().viewport, 18);
        m.apply(started(0, "step"));
        m.apply(EngineEvent::Chunk(Chunk::stdout("word ".repeat(10))));
        assert!(m.log().lines().iter().all(|line| line.len() <= 22));
    }

    #[test]
    fn test_view_banner() {
        let mut m = model(4);
        assert!(m.view().step.is_none());
        m.apply(started(1, "Install dependencies"));
        let view = m.view();
        let banner = view.step.unwrap();
        assert_eq!(banner.index, 1);
        assert_eq!(banner.total, 4);
        assert_eq!(banner.title, "Install dependencies");
        assert_eq!(view.help, HELP_TEXT);
    }
}
