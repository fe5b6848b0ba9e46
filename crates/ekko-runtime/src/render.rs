//! Read-only view of a run and the seam renderers plug into.

use crate::model::RunPhase;
use crate::progress::ProgressState;
use crate::report::RunReport;

pub const HELP_TEXT: &str = "ctrl+c to cancel";

/// The step shown in the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBanner<'a> {
    /// Zero-based.
    pub index: usize,
    pub total: usize,
    pub title: &'a str,
}

/// Snapshot of everything a renderer may draw.
///
/// Rendering is a pure function of this value; renderers never feed
/// anything back into the run.
#[derive(Debug, Clone, Copy)]
pub struct RunView<'a> {
    pub header: &'a str,
    pub phase: RunPhase,
    pub step: Option<StepBanner<'a>>,
    pub progress: ProgressState,
    /// Full log, oldest first.
    pub log: &'a [String],
    /// Rows of log the viewport shows.
    pub viewport: usize,
    pub help: &'static str,
}

impl<'a> RunView<'a> {
    pub fn overall_fraction(&self) -> f64 {
        self.progress.overall_fraction()
    }

    /// Log rows visible with the viewport scrolled to the bottom.
    pub fn visible_log(&self) -> &'a [String] {
        let start = self.log.len().saturating_sub(self.viewport);
        &self.log[start..]
    }
}

pub trait Renderer: Send {
    /// Draw the current state. Called after every state change.
    fn render(&mut self, view: &RunView<'_>);

    /// Called once with the final report, after the last `render`.
    fn finish(&mut self, _report: &RunReport) {}
}

/// Draws nothing. For headless runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _view: &RunView<'_>) {}
}
