//! Configuration types for the rendering pipeline.

use std::time::Duration;

use crate::{AsciiWaveError, GlyphPalette, Theme};

/// Upper bound on `frame_rate`, keeping the tick interval at 1ms or more.
pub const MAX_FRAME_RATE: f64 = 1000.0;

/// Seconds of audio the ring buffer retains by default.
const RING_SECONDS: usize = 2;

/// Default `ring_capacity` for `sample_rate`: two seconds of mono samples.
pub fn ring_capacity_for(sample_rate: u32) -> usize {
    (sample_rate as usize).saturating_mul(RING_SECONDS)
}

/// How envelope magnitudes are scaled into `[0, 1]` before glyph mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Divide by a constant full-scale value.
    Fixed(f32),
    /// Divide by a running peak that decays by `decay` every tick.
    ///
    /// Quiet sources fill the grid instead of hugging the midline. The peak
    /// tracker is part of the extractor's carried state.
    Adaptive {
        /// Per-tick multiplier applied to the tracked peak, in `(0, 1)`.
        decay: f32,
    },
}

impl Default for Normalization {
    fn default() -> Self {
        Self::Fixed(1.0)
    }
}

/// How a column's intensity is laid out across the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveShape {
    /// Extends from the midline toward the side given by the sign of the
    /// column's peak sample, tracing a waveform silhouette.
    #[default]
    Wave,
    /// Extends symmetrically above and below the midline.
    Bars,
}

/// Configuration read once when the pipeline is constructed.
///
/// Changing `columns` or `rows` requires building a new pipeline.
///
/// # Example
///
/// ```
/// use ascii_wave::{PipelineConfig, Theme};
///
/// let config = PipelineConfig {
///     columns: 120,
///     rows: 32,
///     theme: Theme::Light,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Requested device sample rate in Hz.
    ///
    /// Default: 48000
    pub sample_rate: u32,

    /// Requested device channel count. Input is down-mixed to mono.
    ///
    /// Default: 1
    pub channels: u16,

    /// Requested device callback size in frames.
    ///
    /// Default: 1024
    pub block_size: u32,

    /// Samples retained by the ring buffer. Rounded up to a power of two.
    ///
    /// Default: 96000, two seconds at the default `sample_rate`. The
    /// builder's `sample_rate` setter keeps it at two seconds of the new rate.
    pub ring_capacity: usize,

    /// Samples read from the ring buffer each tick.
    ///
    /// Default: 2048
    pub window_len: usize,

    /// Grid width in character cells.
    ///
    /// Default: 80
    pub columns: usize,

    /// Grid height in character cells.
    ///
    /// Default: 24
    pub rows: usize,

    /// Target ticks per second.
    ///
    /// Default: 30.0
    pub frame_rate: f64,

    /// Exponential smoothing factor α, in `(0, 1]`. Higher is more responsive.
    ///
    /// Default: 0.5
    pub smoothing: f32,

    /// Display theme attached to each frame.
    ///
    /// Default: [`Theme::Dark`]
    pub theme: Theme,

    /// Ordered glyphs from sparsest to densest.
    ///
    /// Default: `" .:-=+*#%@"`
    pub palette: GlyphPalette,

    /// Scaling of envelope values before quantization.
    ///
    /// Default: `Fixed(1.0)`
    pub normalization: Normalization,

    /// Normalized levels below this are drawn as silence, in `[0, 1)`.
    ///
    /// Keeps the noise floor of a live microphone from flickering. Default: 0.0 (off)
    pub noise_gate: f32,

    /// Row layout of each column.
    ///
    /// Default: [`WaveShape::Wave`]
    pub shape: WaveShape,

    /// Upper bound on the device open call.
    ///
    /// Default: 3 seconds
    pub device_timeout: Duration,

    /// How long silent frames are shown after an interruption before the
    /// single reconnect attempt.
    ///
    /// Default: 250ms
    pub reconnect_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
            block_size: 1024,
            ring_capacity: ring_capacity_for(48000),
            window_len: 2048,
            columns: 80,
            rows: 24,
            frame_rate: 30.0,
            smoothing: 0.5,
            theme: Theme::default(),
            palette: GlyphPalette::default(),
            normalization: Normalization::default(),
            noise_gate: 0.0,
            shape: WaveShape::default(),
            device_timeout: Duration::from_secs(3),
            reconnect_delay: Duration::from_millis(250),
        }
    }
}

impl PipelineConfig {
    /// Checks every field, returning the first problem found.
    ///
    /// # Errors
    ///
    /// Returns [`AsciiWaveError::ConfigurationInvalid`] naming the field.
    pub fn validate(&self) -> Result<(), AsciiWaveError> {
        if self.sample_rate == 0 {
            return Err(AsciiWaveError::invalid("sample_rate", "must be greater than zero"));
        }
        if self.channels == 0 {
            return Err(AsciiWaveError::invalid("channels", "must be greater than zero"));
        }
        if self.block_size == 0 {
            return Err(AsciiWaveError::invalid("block_size", "must be greater than zero"));
        }
        if self.columns == 0 {
            return Err(AsciiWaveError::invalid("columns", "must be greater than zero"));
        }
        if self.rows == 0 {
            return Err(AsciiWaveError::invalid("rows", "must be greater than zero"));
        }
        if self.window_len == 0 {
            return Err(AsciiWaveError::invalid("window_len", "must be greater than zero"));
        }
        if self.ring_capacity < self.window_len {
            return Err(AsciiWaveError::invalid(
                "ring_capacity",
                format!(
                    "{} is smaller than the window length {}",
                    self.ring_capacity, self.window_len
                ),
            ));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(AsciiWaveError::invalid(
                "frame_rate",
                format!("{} is not a positive frame rate", self.frame_rate),
            ));
        }
        if self.frame_rate > MAX_FRAME_RATE {
            return Err(AsciiWaveError::invalid(
                "frame_rate",
                format!("{} exceeds {MAX_FRAME_RATE} fps", self.frame_rate),
            ));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(AsciiWaveError::invalid(
                "smoothing",
                format!("{} is outside (0, 1]", self.smoothing),
            ));
        }
        match self.normalization {
            Normalization::Fixed(max) if !(max.is_finite() && max > 0.0) => {
                return Err(AsciiWaveError::invalid(
                    "normalization",
                    format!("fixed maximum {max} must be positive"),
                ));
            }
            Normalization::Adaptive { decay } if !(decay > 0.0 && decay < 1.0) => {
                return Err(AsciiWaveError::invalid(
                    "normalization",
                    format!("adaptive decay {decay} is outside (0, 1)"),
                ));
            }
            _ => {}
        }
        if !(self.noise_gate >= 0.0 && self.noise_gate < 1.0) {
            return Err(AsciiWaveError::invalid(
                "noise_gate",
                format!("{} is outside [0, 1)", self.noise_gate),
            ));
        }
        self.palette.validate()
    }

    /// Interval between ticks.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), AsciiWaveError>) -> &'static str {
        match result {
            Err(AsciiWaveError::ConfigurationInvalid { field, .. }) => field,
            other => panic!("expected ConfigurationInvalid, got {other:?}"),
        }
    }

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.columns, 80);
        assert_eq!(config.rows, 24);
        assert_eq!(config.smoothing, 0.5);
        assert_eq!(config.normalization, Normalization::Fixed(1.0));
        assert_eq!(config.shape, WaveShape::Wave);
        assert_eq!(config.ring_capacity, 96000);
        assert_eq!(config.noise_gate, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ring_capacity_for_rate() {
        assert_eq!(ring_capacity_for(44100), 88200);
        assert_eq!(ring_capacity_for(16000), 32000);
    }

    #[test]
    fn test_rejects_noise_gate_out_of_range() {
        for noise_gate in [-0.1, 1.0, f32::NAN] {
            let config = PipelineConfig {
                noise_gate,
                ..Default::default()
            };
            assert_eq!(field_of(config.validate()), "noise_gate");
        }
    }

    #[test]
    fn test_tick_interval() {
        let config = PipelineConfig {
            frame_rate: 50.0,
            ..Default::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_rejects_zero_columns() {
        let config = PipelineConfig {
            columns: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "columns");
    }

    #[test]
    fn test_rejects_zero_rows() {
        let config = PipelineConfig {
            rows: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "rows");
    }

    #[test]
    fn test_rejects_non_positive_frame_rate() {
        for frame_rate in [0.0, -30.0, f64::NAN, f64::INFINITY, 5000.0] {
            let config = PipelineConfig {
                frame_rate,
                ..Default::default()
            };
            assert_eq!(field_of(config.validate()), "frame_rate");
        }
    }

    #[test]
    fn test_rejects_smoothing_out_of_range() {
        for smoothing in [0.0, -0.1, 1.5] {
            let config = PipelineConfig {
                smoothing,
                ..Default::default()
            };
            assert_eq!(field_of(config.validate()), "smoothing");
        }
    }

    #[test]
    fn test_rejects_ring_smaller_than_window() {
        let config = PipelineConfig {
            ring_capacity: 100,
            window_len: 200,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "ring_capacity");
    }

    #[test]
    fn test_rejects_bad_normalization() {
        let fixed = PipelineConfig {
            normalization: Normalization::Fixed(0.0),
            ..Default::default()
        };
        assert_eq!(field_of(fixed.validate()), "normalization");

        let adaptive = PipelineConfig {
            normalization: Normalization::Adaptive { decay: 1.0 },
            ..Default::default()
        };
        assert_eq!(field_of(adaptive.validate()), "normalization");
    }

    #[test]
    fn test_rejects_short_palette() {
        let config = PipelineConfig {
            palette: GlyphPalette::new("#"),
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "palette");
    }
}
