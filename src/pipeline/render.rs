//! One render tick: window → envelope → grid → frame.

use std::time::Duration;

use crate::config::PipelineConfig;
use crate::frame::Frame;
use crate::pipeline::{Envelope, FrameCompositor, GlyphMapper, SampleBuffer, WaveformExtractor};

/// Where a tick takes its samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickInput {
    /// The most recent window from the ring buffer.
    Live,
    /// An all-zero window, used while the capture stream is interrupted.
    Silent,
}

/// The Extract → Map → Compose chain, driven one tick at a time.
///
/// The scheduler calls [`tick`](Self::tick) on its timer. A host UI loop can
/// call it directly instead of running the scheduler.
///
/// # Example
///
/// ```
/// use ascii_wave::{create_sample_buffer, PipelineConfig, RenderPipeline, TickInput};
/// use std::time::Duration;
///
/// let config = PipelineConfig { columns: 8, rows: 3, ..Default::default() };
/// let (_writer, buffer) = create_sample_buffer(config.ring_capacity);
/// let mut pipeline = RenderPipeline::new(&config, buffer).unwrap();
///
/// let frame = pipeline.tick(TickInput::Live, Duration::ZERO);
/// assert_eq!(frame.to_text(), "        \n        \n        ");
/// ```
pub struct RenderPipeline {
    buffer: SampleBuffer,
    extractor: WaveformExtractor,
    mapper: GlyphMapper,
    compositor: FrameCompositor,
    window: Vec<f32>,
}

impl RenderPipeline {
    /// Builds a pipeline reading from `buffer`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationInvalid` if `config` fails validation.
    pub fn new(
        config: &PipelineConfig,
        buffer: SampleBuffer,
    ) -> Result<Self, crate::AsciiWaveError> {
        config.validate()?;
        Ok(Self {
            buffer,
            extractor: WaveformExtractor::new(
                config.columns,
                config.smoothing,
                config.normalization,
            )
            .with_noise_gate(config.noise_gate),
            mapper: GlyphMapper::new(
                config.palette.clone(),
                config.rows,
                config.columns,
                config.shape,
            ),
            compositor: FrameCompositor::new(config.theme),
            window: vec![0.0; config.window_len],
        })
    }

    /// Runs one tick and returns its frame.
    pub fn tick(&mut self, input: TickInput, timestamp: Duration) -> Frame {
        match input {
            TickInput::Live => self.buffer.read_window_into(&mut self.window),
            TickInput::Silent => {
                // Keep draining so live input resumes from current audio.
                self.buffer.sync();
                self.window.fill(0.0);
            }
        }
        let envelope = self.extractor.extract(&self.window);
        self.compose(&envelope, timestamp)
    }

    /// Maps and composes an already computed envelope.
    pub fn compose(&mut self, envelope: &Envelope, timestamp: Duration) -> Frame {
        let grid = self.mapper.map(envelope);
        self.compositor.compose(grid, timestamp, envelope.mean_level())
    }

    /// The sample buffer, e.g. to drain it while paused or swap its queue.
    pub fn buffer_mut(&mut self) -> &mut SampleBuffer {
        &mut self.buffer
    }

    /// The sample buffer.
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Sequence number of the next frame.
    pub fn next_sequence(&self) -> u64 {
        self.compositor.next_sequence()
    }
}
