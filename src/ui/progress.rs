use crate::ui::icons::{CROSS, RUNNING, SPARKLE, STOP, WARN};
use crate::ui::format_duration;
use console::style;
use ekko_runtime::{Renderer, RunOutcome, RunReport, RunView};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Resolution of the progress bar; the overall fraction is scaled to this.
const BAR_LENGTH: u64 = 1000;

/// Terminal UI for a run, rendered via `indicatif` progress bars.
///
/// Three pinned regions, top to bottom:
/// - Log viewport showing the newest `view.viewport` rows
/// - Progress bar with the overall percentage and the current step banner
/// - Help row
pub struct TerminalRenderer {
    multi: MultiProgress,
    log_bar: ProgressBar,
    progress_bar: ProgressBar,
    help_bar: ProgressBar,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let text_style = ProgressStyle::default_bar()
            .template("{msg}")
            .expect("progress bar template is a valid static string");

        let log_bar = multi.add(ProgressBar::new(0));
        log_bar.set_style(text_style.clone());

        let progress_style = ProgressStyle::default_bar()
            .template("{spinner} {prefix:.bold} [{bar:40.cyan/blue}] {percent:>3}% {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let progress_bar = multi.add(ProgressBar::new(BAR_LENGTH));
        progress_bar.set_style(progress_style);
        progress_bar.enable_steady_tick(Duration::from_millis(100));

        let help_bar = multi.add(ProgressBar::new(0));
        help_bar.set_style(text_style);

        Self {
            multi,
            log_bar,
            progress_bar,
            help_bar,
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` if the rich UI fails.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, view: &RunView<'_>) {
        self.log_bar.set_message(viewport_text(view));

        self.progress_bar.set_prefix(view.header.to_string());
        if let Some(step) = view.step {
            self.progress_bar.set_message(format!(
                "{} {}",
                style(format!("[{}/{}]", step.index + 1, step.total)).yellow(),
                step.title
            ));
        }
        let position = (view.overall_fraction() * BAR_LENGTH as f64).round() as u64;
        self.progress_bar.set_position(position.min(BAR_LENGTH));

        if view.phase.is_terminal() {
            self.progress_bar.disable_steady_tick();
            self.help_bar.set_message("");
        } else {
            self.help_bar.set_message(style(view.help).dim().to_string());
        }
    }

    fn finish(&mut self, report: &RunReport) {
        // A failure keeps its last rows of output on screen.
        if matches!(report.outcome, RunOutcome::Failed { .. }) {
            self.log_bar.finish();
        } else {
            self.log_bar.finish_and_clear();
        }
        self.progress_bar.finish_and_clear();
        self.help_bar.finish_and_clear();

        self.print_line("");
        match &report.outcome {
            RunOutcome::Completed => self.print_line(format!(
                "{}{} in {}",
                SPARKLE,
                style("Setup complete").green().bold(),
                format_duration(report.elapsed)
            )),
            RunOutcome::Failed { step, reason, .. } => self.print_line(format!(
                "{}{} {}: {}",
                CROSS,
                style("Failed").red().bold(),
                style(step).bold(),
                reason
            )),
            RunOutcome::Cancelled => {
                self.print_line(format!("{}{}", STOP, style("Cancelled").yellow().bold()))
            }
        }

        for warning in &report.warnings {
            self.print_line(format!(
                "{}{}: {}",
                WARN,
                style(&warning.step).yellow(),
                warning.message
            ));
        }
    }
}

/// The viewport rows, styled and joined into one multi-line message.
fn viewport_text(view: &RunView<'_>) -> String {
    view.visible_log()
        .iter()
        .map(|line| style_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Colour one log row by what produced it.
fn style_line(line: &str) -> String {
    if let Some(title) = line.strip_prefix("## ") {
        format!("{}{}", RUNNING, style(title).bold())
    } else if line.starts_with("warning: ") {
        style(line).yellow().to_string()
    } else if line.starts_with("error: ") {
        style(line).red().to_string()
    } else if line.starts_with("$ ") {
        style(line).cyan().to_string()
    } else {
        format!("  {}", style(line).dim())
    }
}
