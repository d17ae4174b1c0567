//! CPAL device wrapper for audio capture.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, Device, SampleFormat, SampleRate, SizedSample, Stream,
    StreamConfig as CpalStreamConfig, SupportedBufferSize, SupportedStreamConfig,
};

use super::{CaptureHealth, CaptureSource, CaptureStream};
use crate::format::{downmix, i16_to_f32, u16_to_f32};
use crate::pipeline::{sample_queue, SampleQueue, SampleWriter};
use crate::{AsciiWaveError, PipelineConfig};

/// Which input device to open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceSelection {
    /// The system's default input device.
    #[default]
    SystemDefault,
    /// A specific device by name, as chosen by the host application.
    ByName(String),
}

impl DeviceSelection {
    fn label(&self) -> &str {
        match self {
            Self::SystemDefault => "default",
            Self::ByName(name) => name,
        }
    }
}

/// Requested capture format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Target sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels to request (input is down-mixed to mono).
    pub channels: u16,
    /// Frames per device callback.
    pub block_size: u32,
    /// Capacity of the queue between callback and renderer, in samples.
    pub queue_capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for DeviceConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            block_size: config.block_size,
            queue_capacity: config.ring_capacity,
        }
    }
}

/// Captures from a CPAL input device.
///
/// The device is looked up on every [`start_capture`](CaptureSource::start_capture)
/// call, so a reconnect picks up a device that was unplugged and plugged
/// back in.
#[derive(Debug, Clone)]
pub struct DeviceSource {
    selection: DeviceSelection,
    config: DeviceConfig,
}

impl DeviceSource {
    /// Creates a source for `selection` with the given format request.
    pub fn new(selection: DeviceSelection, config: DeviceConfig) -> Self {
        Self { selection, config }
    }

    /// The system default input device.
    pub fn default_device() -> Self {
        Self::new(DeviceSelection::SystemDefault, DeviceConfig::default())
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn open_device(&self) -> Result<Device, AsciiWaveError> {
        let host = cpal::default_host();
        match &self.selection {
            DeviceSelection::SystemDefault => host.default_input_device().ok_or_else(|| {
                AsciiWaveError::device_unavailable("default", "no default input device configured")
            }),
            DeviceSelection::ByName(name) => {
                let devices = host
                    .input_devices()
                    .map_err(|e| AsciiWaveError::device_unavailable(name.as_str(), e.to_string()))?;
                for device in devices {
                    if device.name().is_ok_and(|n| n == *name) {
                        return Ok(device);
                    }
                }
                Err(AsciiWaveError::device_unavailable(name.as_str(), "device not found"))
            }
        }
    }

    /// Picks a supported config matching the request, or the device default.
    fn negotiate(&self, device: &Device) -> Result<SupportedStreamConfig, AsciiWaveError> {
        let label = self.selection.label();
        let rate = self.config.sample_rate;

        let matching = device.supported_input_configs().ok().and_then(|mut configs| {
            configs.find(|c| {
                c.channels() == self.config.channels
                    && c.min_sample_rate().0 <= rate
                    && rate <= c.max_sample_rate().0
            })
        });

        match matching {
            Some(range) => Ok(range.with_sample_rate(SampleRate(rate))),
            None => {
                let fallback = device
                    .default_input_config()
                    .map_err(|e| AsciiWaveError::device_unavailable(label, e.to_string()))?;
                tracing::warn!(
                    "Device {} cannot capture {}Hz/{}ch, using {}Hz/{}ch",
                    label,
                    rate,
                    self.config.channels,
                    fallback.sample_rate().0,
                    fallback.channels()
                );
                Ok(fallback)
            }
        }
    }

    fn stream_config(&self, supported: &SupportedStreamConfig) -> CpalStreamConfig {
        let mut config = supported.config();
        if let SupportedBufferSize::Range { min, max } = supported.buffer_size() {
            if (*min..=*max).contains(&self.config.block_size) {
                config.buffer_size = BufferSize::Fixed(self.config.block_size);
            }
        }
        config
    }

    fn build_stream<T>(
        &self,
        device: &Device,
        config: &CpalStreamConfig,
        mut writer: SampleWriter,
        health: &Arc<CaptureHealth>,
        to_f32: fn(T) -> f32,
    ) -> Result<Stream, AsciiWaveError>
    where
        T: SizedSample + 'static,
    {
        let channels = usize::from(config.channels);
        let data_health = Arc::clone(health);
        let error_health = Arc::clone(health);

        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    // Non-blocking push - drops samples if the renderer is behind
                    let mut dropped = 0u64;
                    downmix(data, channels, to_f32, |sample| {
                        if !writer.write(sample) {
                            dropped += 1;
                        }
                    });
                    if dropped > 0 {
                        data_health.record_overflow(dropped);
                    }
                },
                move |err| {
                    tracing::error!("Audio stream error: {}", err);
                    error_health.interrupt(err.to_string());
                },
                None,
            )
            .map_err(|e| AsciiWaveError::device_unavailable(self.selection.label(), e.to_string()))
    }
}

impl CaptureSource for DeviceSource {
    fn name(&self) -> String {
        self.selection.label().to_string()
    }

    fn start_capture(
        &mut self,
        health: &Arc<CaptureHealth>,
    ) -> Result<(CaptureStream, SampleQueue), AsciiWaveError> {
        let device = self.open_device()?;
        let supported = self.negotiate(&device)?;
        let sample_format = supported.sample_format();
        let config = self.stream_config(&supported);

        let (writer, queue) = sample_queue(self.config.queue_capacity);

        let stream = match sample_format {
            SampleFormat::F32 => {
                self.build_stream::<f32>(&device, &config, writer, health, |s| s)?
            }
            SampleFormat::I16 => {
                self.build_stream::<i16>(&device, &config, writer, health, i16_to_f32)?
            }
            SampleFormat::U16 => {
                self.build_stream::<u16>(&device, &config, writer, health, u16_to_f32)?
            }
            format => {
                return Err(AsciiWaveError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        };

        stream.play().map_err(|e| {
            AsciiWaveError::device_unavailable(self.selection.label(), e.to_string())
        })?;

        tracing::info!(
            "Capturing from {}: {}Hz/{}ch {:?}, buffer {:?}",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate.0,
            config.channels,
            sample_format,
            config.buffer_size
        );

        Ok((CaptureStream::new(stream), queue))
    }
}
