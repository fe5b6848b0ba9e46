//! Output chunks and the handle steps use to publish them.

use serde::Serialize;
use tokio::sync::mpsc;

/// Where a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamSource {
    Stdout,
    Stderr,
    /// A line written by the step itself rather than a child process.
    Notice,
}

/// One line of captured output tagged by source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub source: StreamSource,
    pub text: String,
}

impl Chunk {
    pub fn new(source: StreamSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
        }
    }

    pub fn stdout(text: impl Into<String>) -> Self {
        Self::new(StreamSource::Stdout, text)
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self::new(StreamSource::Stderr, text)
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(StreamSource::Notice, text)
    }
}

/// Reduce a raw line of child output to what a log viewer should show.
///
/// Drops ANSI escapes, the trailing newline, and any carriage-return
/// redraws (only the last non-empty segment survives).
pub fn clean_line(raw: &str) -> String {
    let stripped = console::strip_ansi_codes(raw);
    let trimmed = stripped.trim_end_matches(['\n', '\r']);
    trimmed
        .rsplit('\r')
        .find(|segment| !segment.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Cloneable sink for chunks produced while a step runs.
///
/// The channel closes once every clone has been dropped, which is how the
/// event loop learns that a step can produce no more output.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<Chunk>,
}

impl Emitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Chunk>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish a chunk. Dropped silently once the consumer has gone away.
    pub fn emit(&self, chunk: Chunk) {
        let _ = self.tx.send(chunk);
    }

    pub fn notice(&self, text: impl Into<String>) {
        self.emit(Chunk::notice(text));
    }
}
