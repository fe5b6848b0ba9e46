//! Renderers for a scaffolding run.
//!
//! Three output modes are supported:
//! - `full`: progress bar with the step banner and a scrolling log
//! - `plain`: log lines only, for pipes and CI
//! - `json`: one JSON object per state change, for machine consumption

pub mod icons;
pub mod json;
pub mod plain;
pub mod progress;

pub use json::JsonRenderer;
pub use plain::PlainRenderer;
pub use progress::TerminalRenderer;

use clap::ValueEnum;
use ekko_runtime::Renderer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Output mode for a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UiMode {
    /// Progress bar, step banner and live log
    #[default]
    Full,
    /// Log lines only
    Plain,
    /// JSON-formatted events
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("Unknown UI mode '{}'. Valid values: full, plain, json", other),
        }
    }
}

impl fmt::Display for UiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UiMode::Full => "full",
            UiMode::Plain => "plain",
            UiMode::Json => "json",
        })
    }
}

impl UiMode {
    /// `full` degrades to `plain` when stdout is not a terminal.
    pub fn effective(self, is_terminal: bool) -> Self {
        match self {
            UiMode::Full if !is_terminal => UiMode::Plain,
            mode => mode,
        }
    }
}

/// Build the renderer for `mode`, writing to stdout.
pub fn renderer_for(mode: UiMode) -> Box<dyn Renderer> {
    match mode {
        UiMode::Full => Box::new(TerminalRenderer::new()),
        UiMode::Plain => Box::new(PlainRenderer::stdout()),
        UiMode::Json => Box::new(JsonRenderer::stdout()),
    }
}

/// Tracks how much of the append-only run log has been written out.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogCursor {
    seen: usize,
}

impl LogCursor {
    /// Lines appended since the previous call.
    pub(crate) fn advance<'a>(&mut self, log: &'a [String]) -> &'a [String] {
        let start = self.seen.min(log.len());
        self.seen = log.len();
        &log[start..]
    }
}

/// Format a duration for display.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", d.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_mode_from_str() {
        assert_eq!("json".parse::<UiMode>().unwrap(), UiMode::Json);
        assert_eq!("PLAIN".parse::<UiMode>().unwrap(), UiMode::Plain);
        assert_eq!(" full ".parse::<UiMode>().unwrap(), UiMode::Full);
        assert!("minimal".parse::<UiMode>().is_err());
    }

    #[test]
    fn test_ui_mode_display_round_trips() {
        for mode in [UiMode::Full, UiMode::Plain, UiMode::Json] {
            assert_eq!(mode.to_string().parse::<UiMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_full_degrades_without_terminal() {
        assert_eq!(UiMode::Full.effective(false), UiMode::Plain);
        assert_eq!(UiMode::Full.effective(true), UiMode::Full);
        assert_eq!(UiMode::Json.effective(false), UiMode::Json);
    }

    #[test]
    fn test_log_cursor_yields_each_line_once() {
        let mut cursor = LogCursor::default();
        let mut log = vec!["a".to_string(), "b".to_string()];
        assert_eq!(cursor.advance(&log), ["a", "b"]);
        assert!(cursor.advance(&log).is_empty());
        log.push("c".to_string());
        assert_eq!(cursor.advance(&log), ["c"]);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
