//! Rendered frames and the glyph grid they carry.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Colour polarity applied by the display surface.
///
/// The theme never influences glyph selection; it travels with the frame so
/// the display knows how to paint it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    /// Black glyphs on a white background.
    Light,
    /// White glyphs on a black background.
    #[default]
    Dark,
}

impl Theme {
    /// Glyph colour as RGB.
    #[must_use]
    pub fn foreground(self) -> [u8; 3] {
        match self {
            Self::Light => [0, 0, 0],
            Self::Dark => [255, 255, 255],
        }
    }

    /// Background colour as RGB.
    #[must_use]
    pub fn background(self) -> [u8; 3] {
        match self {
            Self::Light => [255, 255, 255],
            Self::Dark => [0, 0, 0],
        }
    }

    /// Returns the opposite polarity.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => f.write_str("light"),
            Self::Dark => f.write_str("dark"),
        }
    }
}

/// One character cell: the glyph and its index in the density palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphCell {
    /// Character drawn in the cell.
    pub glyph: char,
    /// Index into the palette, 0 = sparsest.
    pub level: u8,
}

/// A fixed-size `rows × columns` grid of glyph cells in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlyphGrid {
    rows: usize,
    columns: usize,
    cells: Vec<GlyphCell>,
}

impl GlyphGrid {
    /// Creates a grid filled with `fill`.
    pub fn filled(rows: usize, columns: usize, fill: GlyphCell) -> Self {
        Self {
            rows,
            columns,
            cells: vec![fill; rows * columns],
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Returns the cell at `(row, column)`, or `None` when out of range.
    pub fn get(&self, row: usize, column: usize) -> Option<&GlyphCell> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.cells.get(row * self.columns + column)
    }

    pub(crate) fn set(&mut self, row: usize, column: usize, cell: GlyphCell) {
        if row < self.rows && column < self.columns {
            self.cells[row * self.columns + column] = cell;
        }
    }

    /// All cells, row-major.
    pub fn cells(&self) -> &[GlyphCell] {
        &self.cells
    }

    /// Iterates over rows as cell slices.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[GlyphCell]> {
        self.cells.chunks(self.columns.max(1))
    }
}

/// An immutable snapshot of the glyph grid, ready for display.
///
/// The grid is held behind an `Arc`, so cloning a frame to hand it to several
/// display sinks does not copy the cells. Nothing in the crate mutates a frame
/// after it has been composed.
///
/// # Example
///
/// ```
/// use ascii_wave::{Frame, GlyphCell, GlyphGrid, Theme};
/// use std::time::Duration;
///
/// let grid = GlyphGrid::filled(2, 3, GlyphCell { glyph: '.', level: 1 });
/// let frame = Frame::new(grid, Theme::Light, 0, Duration::ZERO, 0.0);
/// assert_eq!(frame.to_text(), "...\n...");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    grid: Arc<GlyphGrid>,
    theme: Theme,
    sequence: u64,
    timestamp: Duration,
    level: f32,
}

impl Frame {
    /// Creates a frame. Normally done by the compositor.
    pub fn new(
        grid: GlyphGrid,
        theme: Theme,
        sequence: u64,
        timestamp: Duration,
        level: f32,
    ) -> Self {
        Self {
            grid: Arc::new(grid),
            theme,
            sequence,
            timestamp,
            level,
        }
    }

    /// The glyph grid.
    pub fn grid(&self) -> &GlyphGrid {
        &self.grid
    }

    /// Theme the display should paint this frame with.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Monotonic sequence number, starting at 0 for each session.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Time since the session started when this frame was composed.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Mean normalized envelope level in `[0, 1]`.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Returns the grid as text lines, one `String` per row.
    pub fn lines(&self) -> Vec<String> {
        self.grid
            .iter_rows()
            .map(|row| row.iter().map(|cell| cell.glyph).collect())
            .collect()
    }

    /// Returns the grid as a single newline-separated string.
    pub fn to_text(&self) -> String {
        self.lines().join("\n")
    }
}
