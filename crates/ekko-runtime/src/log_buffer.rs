//! Append-only, width-aware log of everything a run printed.

/// Ordered log lines. Lines are wrapped at the width in effect when they
/// are appended; a resize only affects lines appended afterwards.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: Vec<String>,
    wrap_width: usize,
}

impl LogBuffer {
    pub fn new(wrap_width: usize) -> Self {
        Self {
            lines: Vec::new(),
            wrap_width: wrap_width.max(1),
        }
    }

    pub fn set_wrap_width(&mut self, width: usize) {
        self.wrap_width = width.max(1);
    }

    pub fn wrap_width(&self) -> usize {
        self.wrap_width
    }

    /// Append one logical line, wrapped into as many rows as needed.
    pub fn push(&mut self, text: &str) {
        if text.is_empty() {
            self.lines.push(String::new());
            return;
        }
        self.lines.extend(
            textwrap::wrap(text, self.wrap_width)
                .into_iter()
                .map(|row| row.into_owned()),
        );
    }

    /// Start a new section for a step, separated from the previous one by a blank row.
    pub fn push_header(&mut self, title: &str) {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.push(&format!("## {}", title));
    }

    pub fn push_warning(&mut self, step: &str, message: &str) {
        self.push(&format!("warning: {}: {}", step, message));
    }

    pub fn push_error(&mut self, step: &str, message: &str) {
        self.push(&format!("error: {}: {}", step, message));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_separated() {
        let mut log = LogBuffer::new(72);
        log.push_header("Scaffold");
        log.push("done");
        log.push_header("Install");
        assert_eq!(log.lines(), ["## Scaffold", "done", "", "## Install"]);
    }

    #[test]
    fn test_long_lines_wrap_at_current_width() {
        let mut log = LogBuffer::new(10);
        log.push("aaaa bbbb cccc");
        assert_eq!(log.lines(), ["aaaa bbbb", "cccc"]);

        log.set_wrap_width(40);
        log.push("aaaa bbbb cccc");
        assert_eq!(log.len(), 3);
        assert_eq!(log.lines()[2], "aaaa bbbb cccc");
    }

    #[test]
    fn test_warning_prefix() {
        let mut log = LogBuffer::new(72);
        log.push_warning("ui-init", "exit code 1");
        assert!(log.lines()[0].starts_with("warning:"));
        assert!(log.lines()[0].contains("ui-init"));
    }
}
