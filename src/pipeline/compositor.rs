//! Frame compositor: grid + theme + sequence number → immutable frame.

use std::time::Duration;

use crate::frame::{Frame, GlyphGrid, Theme};

/// Stamps glyph grids into frames with strictly increasing sequence numbers.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    theme: Theme,
    next_sequence: u64,
}

impl FrameCompositor {
    /// Creates a compositor whose first frame is sequence 0.
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            next_sequence: 0,
        }
    }

    /// Theme stamped on new frames.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Sequence number the next frame will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Wraps `grid` into a frame.
    pub fn compose(&mut self, grid: GlyphGrid, timestamp: Duration, level: f32) -> Frame {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Frame::new(grid, self.theme, sequence, timestamp, level)
    }
}
