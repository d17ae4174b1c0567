//! Waveform extractor: sample window → per-column envelope.

use crate::config::Normalization;

/// Lowest reference level the adaptive tracker decays to.
///
/// Keeps near-silence from being stretched to full height.
const ADAPTIVE_FLOOR: f32 = 1e-3;

/// One tick's envelope: a magnitude per display column.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Smoothed peak magnitude per column, non-negative.
    pub magnitudes: Vec<f32>,
    /// Whether each column's peak sample was negative.
    pub negative: Vec<bool>,
    /// Full-scale value the magnitudes should be divided by.
    pub reference: f32,
    /// Normalized values below this read as zero.
    pub gate: f32,
}

impl Envelope {
    /// A silent envelope of `columns` zeros against a unit reference.
    pub fn silent(columns: usize) -> Self {
        Self {
            magnitudes: vec![0.0; columns],
            negative: vec![false; columns],
            reference: 1.0,
            gate: 0.0,
        }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    /// Returns `true` if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Column magnitude scaled into `[0, 1]` by the reference, with values
    /// under the gate cut to zero.
    pub fn normalized(&self, column: usize) -> f32 {
        let value = self.magnitudes.get(column).copied().unwrap_or(0.0);
        if self.reference <= 0.0 {
            return 0.0;
        }
        let scaled = (value / self.reference).clamp(0.0, 1.0);
        if scaled < self.gate {
            0.0
        } else {
            scaled
        }
    }

    /// Mean normalized value across all columns.
    pub fn mean_level(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let sum: f32 = (0..self.len()).map(|c| self.normalized(c)).sum();
        sum / self.len() as f32
    }
}

/// Half-open sample range `[start, end)` covered by `column`.
///
/// Sub-windows partition the window evenly. When the window is shorter than
/// the column count, neighbouring columns share samples so that every column
/// covers at least one.
pub fn sub_window(column: usize, columns: usize, window_len: usize) -> (usize, usize) {
    if window_len == 0 || columns == 0 {
        return (0, 0);
    }
    let start = (column * window_len / columns).min(window_len - 1);
    let end = ((column + 1) * window_len / columns).max(start + 1).min(window_len);
    (start, end)
}

/// Reduces sample windows to envelopes, carrying smoothing state across ticks.
///
/// The only state is the previous tick's envelope and, with adaptive
/// normalization, the tracked peak. [`reset`](Self::reset) clears both.
#[derive(Debug, Clone)]
pub struct WaveformExtractor {
    columns: usize,
    alpha: f32,
    normalization: Normalization,
    gate: f32,
    previous: Vec<f32>,
    tracked_peak: f32,
}

impl WaveformExtractor {
    /// Creates an extractor for `columns` columns with smoothing factor `alpha`.
    pub fn new(columns: usize, alpha: f32, normalization: Normalization) -> Self {
        Self {
            columns,
            alpha,
            normalization,
            gate: 0.0,
            previous: vec![0.0; columns],
            tracked_peak: ADAPTIVE_FLOOR,
        }
    }

    /// Cuts normalized levels below `gate` to silence.
    ///
    /// Applied after smoothing, so the carried state is unaffected.
    #[must_use]
    pub fn with_noise_gate(mut self, gate: f32) -> Self {
        self.gate = gate;
        self
    }

    /// Number of columns each envelope will have.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Computes this tick's envelope from `window`.
    ///
    /// Each column takes the peak absolute sample of its sub-window, then is
    /// blended with the previous tick: `α·raw + (1-α)·previous`.
    pub fn extract(&mut self, window: &[f32]) -> Envelope {
        let mut magnitudes = Vec::with_capacity(self.columns);
        let mut negative = Vec::with_capacity(self.columns);

        for column in 0..self.columns {
            let (start, end) = sub_window(column, self.columns, window.len());
            let (raw, sign_negative) = peak(&window[start..end]);

            let smoothed = self.alpha * raw + (1.0 - self.alpha) * self.previous[column];
            self.previous[column] = smoothed;

            magnitudes.push(smoothed);
            negative.push(sign_negative);
        }

        let reference = self.reference_for(&magnitudes);
        Envelope {
            magnitudes,
            negative,
            reference,
            gate: self.gate,
        }
    }

    fn reference_for(&mut self, magnitudes: &[f32]) -> f32 {
        match self.normalization {
            Normalization::Fixed(max) => max,
            Normalization::Adaptive { decay } => {
                let loudest = magnitudes.iter().copied().fold(0.0f32, f32::max);
                self.tracked_peak = (self.tracked_peak * decay).max(loudest).max(ADAPTIVE_FLOOR);
                self.tracked_peak
            }
        }
    }

    /// Forgets all smoothing history.
    pub fn reset(&mut self) {
        self.previous.fill(0.0);
        self.tracked_peak = ADAPTIVE_FLOOR;
    }
}

/// Peak absolute value of `samples` and whether that peak was negative.
fn peak(samples: &[f32]) -> (f32, bool) {
    let mut best = 0.0f32;
    let mut negative = false;
    for &s in samples {
        let magnitude = s.abs();
        if magnitude > best {
            best = magnitude;
            negative = s < 0.0;
        }
    }
    (best.min(1.0), negative)
}
