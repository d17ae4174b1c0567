//! Glyph mapper: envelope → character grid.

use std::sync::Arc;

use crate::config::WaveShape;
use crate::frame::{GlyphCell, GlyphGrid};
use crate::pipeline::Envelope;
use crate::AsciiWaveError;

/// Density ramp used when none is configured.
pub const DEFAULT_PALETTE: &str = " .:-=+*#%@";

/// Ordered glyphs from sparsest to densest visual weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlyphPalette {
    glyphs: Arc<[char]>,
}

impl GlyphPalette {
    /// Creates a palette from the characters of `ramp`, sparsest first.
    ///
    /// Call [`validate`](Self::validate) (or let the builder do it) before use.
    pub fn new(ramp: &str) -> Self {
        Self {
            glyphs: ramp.chars().collect(),
        }
    }

    /// Number of intensity levels.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Returns `true` for an empty palette.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Glyph for `level`, clamped to the densest glyph.
    pub fn glyph(&self, level: u8) -> char {
        let index = usize::from(level).min(self.glyphs.len().saturating_sub(1));
        self.glyphs.get(index).copied().unwrap_or(' ')
    }

    /// Cell for `level`.
    pub fn cell(&self, level: u8) -> GlyphCell {
        GlyphCell {
            glyph: self.glyph(level),
            level,
        }
    }

    /// Maps a value in `[0, 1]` to a level.
    ///
    /// Level `k` covers `(k/K, (k+1)/K]`, so a value sitting exactly on a
    /// boundary takes the sparser glyph. Zero and below map to level 0.
    pub fn quantize(&self, value: f32) -> u8 {
        let levels = self.glyphs.len();
        if levels == 0 || value.is_nan() || value <= 0.0 {
            return 0;
        }
        let value = value.min(1.0);
        let count = levels as f32;
        let mut level = ((value * count).ceil() as usize).clamp(1, levels) - 1;

        // The product can round across a boundary; the boundary itself decides.
        if level > 0 && value <= level as f32 / count {
            level -= 1;
        } else if level + 1 < levels && value > (level + 1) as f32 / count {
            level += 1;
        }
        level as u8
    }

    /// Checks that the palette can be used for rendering.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationInvalid` for fewer than two glyphs, more than
    /// 256, or a repeated glyph.
    pub fn validate(&self) -> Result<(), AsciiWaveError> {
        if self.glyphs.len() < 2 {
            return Err(AsciiWaveError::invalid("palette", "needs at least two glyphs"));
        }
        if self.glyphs.len() > usize::from(u8::MAX) + 1 {
            return Err(AsciiWaveError::invalid(
                "palette",
                format!("{} glyphs exceeds the 256 level limit", self.glyphs.len()),
            ));
        }
        for (i, glyph) in self.glyphs.iter().enumerate() {
            if self.glyphs[..i].contains(glyph) {
                return Err(AsciiWaveError::invalid(
                    "palette",
                    format!("glyph {glyph:?} appears more than once"),
                ));
            }
        }
        Ok(())
    }
}

impl Default for GlyphPalette {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE)
    }
}

/// Turns envelopes into glyph grids.
///
/// Mapping is a pure function of the envelope: identical input gives an
/// identical grid.
#[derive(Debug, Clone)]
pub struct GlyphMapper {
    palette: GlyphPalette,
    rows: usize,
    columns: usize,
    shape: WaveShape,
}

impl GlyphMapper {
    /// Creates a mapper producing `rows × columns` grids.
    pub fn new(palette: GlyphPalette, rows: usize, columns: usize, shape: WaveShape) -> Self {
        Self {
            palette,
            rows,
            columns,
            shape,
        }
    }

    /// The palette in use.
    pub fn palette(&self) -> &GlyphPalette {
        &self.palette
    }

    /// Row holding the midline.
    pub fn midline(&self) -> usize {
        self.rows / 2
    }

    /// Builds the grid for `envelope`.
    ///
    /// Every column lights its midline cell with the column's level, then
    /// extends away from the midline by a number of rows proportional to the
    /// level. [`WaveShape::Wave`] extends upward for a positive peak and
    /// downward for a negative one; [`WaveShape::Bars`] extends both ways.
    /// The last cell of a run is drawn sparser in proportion to how much of it
    /// is covered.
    pub fn map(&self, envelope: &Envelope) -> GlyphGrid {
        let mut grid = GlyphGrid::filled(self.rows, self.columns, self.palette.cell(0));
        let mid = self.midline();
        let rows_above = mid;
        let rows_below = self.rows.saturating_sub(mid + 1);

        for column in 0..self.columns {
            let value = envelope.normalized(column);
            if value <= 0.0 {
                continue;
            }
            grid.set(mid, column, self.palette.cell(self.palette.quantize(value)));

            let negative = envelope.negative.get(column).copied().unwrap_or(false);
            let (up, down) = match self.shape {
                WaveShape::Wave => (!negative, negative),
                WaveShape::Bars => (true, true),
            };
            if up {
                self.extend(&mut grid, column, value, rows_above, |d| mid - d);
            }
            if down {
                self.extend(&mut grid, column, value, rows_below, |d| mid + d);
            }
        }

        grid
    }

    fn extend(
        &self,
        grid: &mut GlyphGrid,
        column: usize,
        value: f32,
        side_rows: usize,
        row_at: impl Fn(usize) -> usize,
    ) {
        let reach = value * side_rows as f32;
        for distance in 1..=side_rows {
            let coverage = (reach - (distance - 1) as f32).clamp(0.0, 1.0);
            if coverage <= 0.0 {
                break;
            }
            let level = self.palette.quantize(value * coverage);
            grid.set(row_at(distance), column, self.palette.cell(level));
        }
    }
}
