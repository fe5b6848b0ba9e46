//! One JSON object per line for every state change.

use crate::ui::LogCursor;
use ekko_runtime::{Renderer, RunOutcome, RunPhase, RunReport, RunView, Warning};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum UiEvent<'a> {
    StepStarted {
        index: usize,
        total: usize,
        title: &'a str,
    },
    Log {
        line: &'a str,
    },
    Progress {
        fraction: f64,
    },
    Phase {
        phase: RunPhase,
    },
    Finished {
        outcome: &'a RunOutcome,
        warnings: &'a [Warning],
        fraction: f64,
        elapsed_ms: u64,
        finished_at: String,
    },
}

pub struct JsonRenderer<W: Write + Send = io::Stdout> {
    out: W,
    cursor: LogCursor,
    step: Option<usize>,
    fraction: Option<f64>,
    phase: Option<RunPhase>,
}

impl JsonRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cursor: LogCursor::default(),
            step: None,
            fraction: None,
            phase: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, event: &UiEvent<'_>) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(self.out, "{}", json);
        }
    }
}

impl<W: Write + Send> Renderer for JsonRenderer<W> {
    fn render(&mut self, view: &RunView<'_>) {
        if let Some(step) = view.step {
            if self.step != Some(step.index) {
                self.step = Some(step.index);
                self.emit(&UiEvent::StepStarted {
                    index: step.index,
                    total: step.total,
                    title: step.title,
                });
            }
        }

        for line in self.cursor.advance(view.log) {
            self.emit(&UiEvent::Log { line });
        }

        let fraction = view.overall_fraction();
        if self.fraction != Some(fraction) {
            self.fraction = Some(fraction);
            self.emit(&UiEvent::Progress { fraction });
        }

        if self.phase != Some(view.phase) {
            self.phase = Some(view.phase);
            self.emit(&UiEvent::Phase { phase: view.phase });
        }
        let _ = self.out.flush();
    }

    fn finish(&mut self, report: &RunReport) {
        self.emit(&UiEvent::Finished {
            outcome: &report.outcome,
            warnings: &report.warnings,
            fraction: report.overall_fraction(),
            elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            finished_at: chrono::Utc::now().to_rfc3339(),
        });
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekko_runtime::{HELP_TEXT, ProgressState, StepBanner};
    use std::time::Duration;

    fn progress(completed: usize) -> ProgressState {
        ProgressState {
            completed_steps: completed,
            total_steps: 2,
            current_step_fraction: 0.0,
        }
    }

    fn lines(renderer: JsonRenderer<Vec<u8>>) -> Vec<serde_json::Value> {
        String::from_utf8(renderer.into_inner())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_emits_only_changes() {
        let mut renderer = JsonRenderer::new(Vec::new());
        let log = vec!["## Create Next.js project".to_string()];
        let view = RunView {
            header: "create-ekko-app",
            phase: RunPhase::Running(0),
            step: Some(StepBanner {
                index: 0,
                total: 2,
                title: "Create Next.js project",
            }),
            progress: progress(0),
            log: &log,
            viewport: 8,
            help: HELP_TEXT,
        };
        renderer.render(&view);
        renderer.render(&view);

        let events = lines(renderer);
        let types: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["step_started", "log", "progress", "phase"]);
        assert_eq!(events[0]["title"], "Create Next.js project");
        assert_eq!(events[3]["phase"]["phase"], "running");
        assert_eq!(events[3]["phase"]["step"], 0);
    }

    #[test]
    fn test_finish_serializes_outcome() {
        let mut renderer = JsonRenderer::new(Vec::new());
        renderer.finish(&RunReport {
            outcome: RunOutcome::Completed,
            warnings: vec![Warning {
                step: "Initialize shadcn (zinc)".into(),
                message: "exit code 1".into(),
            }],
            progress: progress(2),
            elapsed: Duration::from_millis(1500),
        });

        let events = lines(renderer);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["type"], "finished");
        assert_eq!(events[0]["outcome"]["outcome"], "completed");
        assert_eq!(events[0]["warnings"][0]["step"], "Initialize shadcn (zinc)");
        assert_eq!(events[0]["fraction"], 1.0);
        assert_eq!(events[0]["elapsed_ms"], 1500);
        assert!(events[0]["finished_at"].as_str().is_some());
    }
}
