//! Line-oriented output for pipes and CI logs.

use crate::ui::{LogCursor, format_duration};
use ekko_runtime::{Renderer, RunOutcome, RunReport, RunView};
use std::io::{self, Write};

/// Writes every log line once, as it appears, followed by a one-line result.
pub struct PlainRenderer<W: Write + Send = io::Stdout> {
    out: W,
    cursor: LogCursor,
}

impl PlainRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> PlainRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cursor: LogCursor::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Renderer for PlainRenderer<W> {
    fn render(&mut self, view: &RunView<'_>) {
        for line in self.cursor.advance(view.log) {
            let _ = writeln!(self.out, "{}", line);
        }
        let _ = self.out.flush();
    }

    fn finish(&mut self, report: &RunReport) {
        let line = match &report.outcome {
            RunOutcome::Completed => format!(
                "Done in {} ({} warning(s))",
                format_duration(report.elapsed),
                report.warnings.len()
            ),
            RunOutcome::Failed { step, reason, .. } => format!("Failed: {}: {}", step, reason),
            RunOutcome::Cancelled => "Cancelled".to_string(),
        };
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekko_runtime::{HELP_TEXT, ProgressState, RunPhase};
    use std::time::Duration;

    fn view(log: &[String]) -> RunView<'_> {
        RunView {
            header: "create-ekko-app",
            phase: RunPhase::Running(0),
            step: None,
            progress: ProgressState {
                completed_steps: 0,
                total_steps: 1,
                current_step_fraction: 0.0,
            },
            log,
            viewport: 8,
            help: HELP_TEXT,
        }
    }

    #[test]
    fn test_lines_are_written_once() {
        let mut renderer = PlainRenderer::new(Vec::new());
        let mut log = vec!["## Create".to_string(), "one".to_string()];
        renderer.render(&view(&log));
        renderer.render(&view(&log));
        log.push("two".to_string());
        renderer.render(&view(&log));

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "## Create\none\ntwo\n");
    }

    #[test]
    fn test_finish_reports_failure() {
        let mut renderer = PlainRenderer::new(Vec::new());
        renderer.finish(&RunReport {
            outcome: RunOutcome::Failed {
                step: "Install selected dependencies".into(),
                reason: "`pnpm add` failed with exit code 1".into(),
                output: Vec::new(),
            },
            warnings: Vec::new(),
            progress: ProgressState {
                completed_steps: 1,
                total_steps: 2,
                current_step_fraction: 0.0,
            },
            elapsed: Duration::from_secs(3),
        });
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.contains("Failed: Install selected dependencies: `pnpm add` failed"));
    }
}
