//! Terminal geometry as seen by the event loop.

use serde::Serialize;

const MIN_VIEWPORT_ROWS: usize = 8;
const MAX_VIEWPORT_ROWS: usize = 18;
const MIN_CONTENT_WIDTH: usize = 20;

/// A change in the space available to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutEvent {
    Resize { width: u16, height: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: u16,
    pub height: u16,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
        }
    }
}

impl Layout {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn apply(&mut self, event: LayoutEvent) {
        match event {
            LayoutEvent::Resize { width, height } => {
                self.width = width;
                self.height = height;
            }
        }
    }

    /// Columns available to a log line after the frame and indent.
    pub fn wrap_width(&self) -> usize {
        (self.width as usize).saturating_sub(4).max(MIN_CONTENT_WIDTH) - 4
    }

    /// Rows of log shown at once.
    pub fn viewport_height(&self) -> usize {
        (self.height as usize / 2)
            .saturating_sub(4)
            .clamp(MIN_VIEWPORT_ROWS, MAX_VIEWPORT_ROWS)
    }
}
