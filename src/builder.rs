//! Builder pattern for `AsciiWave`.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::config::ring_capacity_for;
use crate::scheduler::{spawn_render_thread, SchedulerParts};
use crate::session::{Session, SessionState};
use crate::sink::FrameSink;
use crate::source::{CaptureSource, DeviceConfig, DeviceSelection, DeviceSource};
use crate::{
    event_callback, AsciiWaveError, EventCallback, GlyphPalette, Normalization, PipelineConfig,
    PipelineEvent, Theme, WaveShape,
};

/// Where the pipeline takes its audio from.
pub struct AudioSource {
    kind: SourceKind,
}

enum SourceKind {
    Device(DeviceSelection),
    Custom(Box<dyn CaptureSource>),
}

impl AudioSource {
    /// Capture from the system default input device.
    pub fn default_device() -> Self {
        Self {
            kind: SourceKind::Device(DeviceSelection::SystemDefault),
        }
    }

    /// Capture from a specific device by name.
    pub fn device(name: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Device(DeviceSelection::ByName(name.into())),
        }
    }

    /// Capture from any [`CaptureSource`], e.g. a
    /// [`MockSource`](crate::source::MockSource) in tests.
    pub fn custom<S: CaptureSource + 'static>(source: S) -> Self {
        Self {
            kind: SourceKind::Custom(Box::new(source)),
        }
    }

    fn label(&self) -> String {
        match &self.kind {
            SourceKind::Device(DeviceSelection::SystemDefault) => "default".to_string(),
            SourceKind::Device(DeviceSelection::ByName(name)) => name.clone(),
            SourceKind::Custom(source) => source.name(),
        }
    }

    fn into_capture_source(self, config: &PipelineConfig) -> Box<dyn CaptureSource> {
        match self.kind {
            SourceKind::Device(selection) => {
                Box::new(DeviceSource::new(selection, DeviceConfig::from(config)))
            }
            SourceKind::Custom(source) => source,
        }
    }
}

impl Default for AudioSource {
    fn default() -> Self {
        Self::default_device()
    }
}

/// Builder for configuring and starting the render pipeline.
///
/// Use [`AsciiWave::builder()`] to create a new builder.
///
/// # Example
///
/// ```ignore
/// use ascii_wave::{AsciiWave, AudioSource, ChannelSink, Theme};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel(4);
///
/// let session = AsciiWave::builder()
///     .source(AudioSource::default_device())
///     .columns(120)
///     .rows(30)
///     .theme(Theme::Light)
///     .add_sink(ChannelSink::new(tx))
///     .start()
///     .await?;
///
/// while let Some(frame) = rx.recv().await {
///     println!("{}", frame.to_text());
/// }
/// ```
///
/// [`AsciiWave::builder()`]: crate::AsciiWave::builder
#[must_use]
pub struct AsciiWaveBuilder {
    source: AudioSource,
    config: PipelineConfig,
    palette_error: Option<AsciiWaveError>,
    sinks: Vec<Arc<dyn FrameSink>>,
    event_callback: Option<EventCallback>,
}

impl Default for AsciiWaveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AsciiWaveBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            source: AudioSource::default(),
            config: PipelineConfig::default(),
            palette_error: None,
            sinks: Vec::new(),
            event_callback: None,
        }
    }

    /// Set the audio source. Default: the system default input device.
    pub fn source(mut self, source: AudioSource) -> Self {
        self.source = source;
        self
    }

    /// Replace the whole pipeline configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Requested capture sample rate in Hz.
    ///
    /// Also resizes the ring buffer to two seconds at this rate.
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self.config.ring_capacity = ring_capacity_for(sample_rate);
        self
    }

    /// Samples analysed per tick.
    pub fn window_len(mut self, window_len: usize) -> Self {
        self.config.window_len = window_len;
        self
    }

    /// Grid width.
    pub fn columns(mut self, columns: usize) -> Self {
        self.config.columns = columns;
        self
    }

    /// Grid height.
    pub fn rows(mut self, rows: usize) -> Self {
        self.config.rows = rows;
        self
    }

    /// Target frames per second.
    pub fn frame_rate(mut self, frame_rate: f64) -> Self {
        self.config.frame_rate = frame_rate;
        self
    }

    /// Smoothing factor α in (0, 1]; 1 disables smoothing.
    pub fn smoothing(mut self, smoothing: f32) -> Self {
        self.config.smoothing = smoothing;
        self
    }

    /// Draws normalized levels below `gate` as silence.
    pub fn noise_gate(mut self, gate: f32) -> Self {
        self.config.noise_gate = gate;
        self
    }

    /// Display theme stamped on every frame.
    pub fn theme(mut self, theme: Theme) -> Self {
        self.config.theme = theme;
        self
    }

    /// Glyphs ordered from sparsest to densest.
    ///
    /// An invalid palette is reported by [`start()`](Self::start).
    pub fn palette(mut self, glyphs: &str) -> Self {
        let palette = GlyphPalette::new(glyphs);
        match palette.validate() {
            Ok(()) => {
                self.config.palette = palette;
                self.palette_error = None;
            }
            Err(e) => self.palette_error = Some(e),
        }
        self
    }

    /// How envelope values are scaled into `[0, 1]`.
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.config.normalization = normalization;
        self
    }

    /// Waveform silhouette or symmetric bars.
    pub fn shape(mut self, shape: WaveShape) -> Self {
        self.config.shape = shape;
        self
    }

    /// Add a sink to receive every frame.
    pub fn add_sink<S: FrameSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include interruptions, reconnects, dropped frames, buffer
    /// overflows and sink errors.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(PipelineEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Returns the configuration the pipeline will be built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validates the builder configuration.
    fn validate(&self) -> Result<(), AsciiWaveError> {
        if let Some(e) = &self.palette_error {
            return Err(e.clone());
        }
        if self.sinks.is_empty() {
            return Err(AsciiWaveError::NoSinksConfigured);
        }
        self.config.validate()
    }

    async fn start_sinks(&self) -> Result<(), AsciiWaveError> {
        for sink in &self.sinks {
            sink.on_start()
                .await
                .map_err(|e| AsciiWaveError::SinkStartFailed {
                    sink_name: sink.name().to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    async fn stop_sinks(sinks: &[Arc<dyn FrameSink>]) {
        for sink in sinks {
            if let Err(e) = sink.on_stop().await {
                tracing::warn!("Sink {} failed to stop: {}", sink.name(), e);
            }
        }
    }

    /// Open the device and start rendering.
    ///
    /// Returns a [`Session`] handle once the device is streaming.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - No sinks are configured
    /// - Any sink fails to start
    /// - The audio device cannot be opened, or opening it takes longer than
    ///   the configured `device_timeout`
    pub async fn start(self) -> Result<Session, AsciiWaveError> {
        self.validate()?;
        self.start_sinks().await?;

        let Self {
            source,
            config,
            sinks,
            event_callback,
            ..
        } = self;

        let source_label = source.label();
        let device_timeout = config.device_timeout;
        let state = Arc::new(SessionState::new());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let parts = SchedulerParts {
            source: source.into_capture_source(&config),
            config,
            sinks: sinks.clone(),
            shared: Arc::clone(&state),
            event_callback,
        };

        let render_thread = match spawn_render_thread(parts, cmd_rx, ready_tx) {
            Ok(handle) => handle,
            Err(e) => {
                Self::stop_sinks(&sinks).await;
                return Err(e);
            }
        };

        let startup = match tokio::time::timeout(device_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(AsciiWaveError::BackendError(
                "render thread exited during startup".to_string(),
            )),
            Err(_) => Err(AsciiWaveError::device_unavailable(
                source_label.as_str(),
                format!("device did not open within {device_timeout:?}"),
            )),
        };

        if let Err(e) = startup {
            // The thread releases the device on its own once it sees nobody is waiting.
            Self::stop_sinks(&sinks).await;
            return Err(e);
        }

        tracing::info!("Rendering from {}", source_label);
        Ok(Session::new(state, cmd_tx, render_thread))
    }
}

/// Main entry point for ascii-wave.
///
/// Use [`AsciiWave::builder()`] to start configuring the pipeline.
pub struct AsciiWave;

impl AsciiWave {
    /// Creates a new builder for configuring the pipeline.
    pub fn builder() -> AsciiWaveBuilder {
        AsciiWaveBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelSink;
    use crate::source::MockSource;

    #[test]
    fn test_builder_default() {
        let builder = AsciiWaveBuilder::new();
        assert!(builder.sinks.is_empty());
        assert_eq!(builder.config(), &PipelineConfig::default());
        assert_eq!(builder.source.label(), "default");
    }

    #[test]
    fn test_builder_setters() {
        let builder = AsciiWave::builder()
            .columns(40)
            .rows(10)
            .frame_rate(60.0)
            .smoothing(0.8)
            .theme(Theme::Light)
            .shape(WaveShape::Bars)
            .noise_gate(0.05)
            .sample_rate(16000)
            .palette(" .oO");

        let config = builder.config();
        assert_eq!(config.columns, 40);
        assert_eq!(config.rows, 10);
        assert_eq!(config.frame_rate, 60.0);
        assert_eq!(config.smoothing, 0.8);
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.shape, WaveShape::Bars);
        assert_eq!(config.palette.len(), 4);
        assert_eq!(config.noise_gate, 0.05);
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.ring_capacity, 32000);
    }

    #[test]
    fn test_builder_source_labels() {
        let builder = AsciiWave::builder().source(AudioSource::device("USB Mic"));
        assert_eq!(builder.source.label(), "USB Mic");

        let builder =
            AsciiWave::builder().source(AudioSource::custom(MockSource::new(48000, 1)));
        assert_eq!(builder.source.label(), "mock");
    }

    #[test]
    fn test_builder_rejects_no_sinks() {
        let builder = AsciiWave::builder();
        assert!(matches!(
            builder.validate(),
            Err(AsciiWaveError::NoSinksConfigured)
        ));
    }

    #[test]
    fn test_builder_rejects_bad_palette() {
        let builder = AsciiWave::builder()
            .palette("#")
            .add_sink(ChannelSink::new(mpsc::channel(1).0));
        assert!(matches!(
            builder.validate(),
            Err(AsciiWaveError::ConfigurationInvalid { field: "palette", .. })
        ));
    }

    #[test]
    fn test_builder_rejects_zero_frame_rate() {
        let builder = AsciiWave::builder()
            .frame_rate(0.0)
            .add_sink(ChannelSink::new(mpsc::channel(1).0));
        assert!(matches!(
            builder.validate(),
            Err(AsciiWaveError::ConfigurationInvalid {
                field: "frame_rate",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_start_fails_fast_when_device_unavailable() {
        let mock = MockSource::new(48000, 1);
        mock.controller().set_available(false);

        let result = AsciiWave::builder()
            .source(AudioSource::custom(mock))
            .add_sink(ChannelSink::new(mpsc::channel(1).0))
            .start()
            .await;
        assert!(matches!(
            result,
            Err(AsciiWaveError::DeviceUnavailable { .. })
        ));
    }
}
