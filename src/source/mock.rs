//! Mock capture source for testing without hardware.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{CaptureHealth, CaptureSource, CaptureStream};
use crate::format::downmix;
use crate::pipeline::{sample_queue, SampleQueue, SampleWriter};
use crate::AsciiWaveError;

const DEFAULT_QUEUE_CAPACITY: usize = 1 << 16;

/// State shared by the source, its controller and the live stream guard.
struct MockShared {
    channels: u16,
    writer: Mutex<Option<SampleWriter>>,
    health: Mutex<Option<Arc<CaptureHealth>>>,
    available: AtomicBool,
    opens: AtomicUsize,
}

/// A capture source fed from test code instead of a device.
///
/// Samples generated before the pipeline starts are delivered as soon as the
/// stream opens. While running, a [`MockController`] pushes more samples,
/// simulates a disconnect, or makes the "device" unavailable.
///
/// # Example
///
/// ```
/// use ascii_wave::source::MockSource;
///
/// let mut mock = MockSource::new(48000, 1);
///
/// // 100ms of silence followed by 100ms of a 440Hz sine wave
/// mock.generate_silence(100);
/// mock.generate_sine(440.0, 0.5, 100);
///
/// assert_eq!(mock.samples().len(), 9600);
/// let controller = mock.controller();
/// assert_eq!(controller.opens(), 0);
/// ```
pub struct MockSource {
    sample_rate: u32,
    queue_capacity: usize,
    samples: Vec<f32>,
    shared: Arc<MockShared>,
}

impl MockSource {
    /// Creates a new mock source with the given format.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            samples: Vec::new(),
            shared: Arc::new(MockShared {
                channels: channels.max(1),
                writer: Mutex::new(None),
                health: Mutex::new(None),
                available: AtomicBool::new(true),
                opens: AtomicUsize::new(0),
            }),
        }
    }

    /// Sets the capacity of the queue created on each open.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the channel count.
    pub fn channels(&self) -> u16 {
        self.shared.channels
    }

    /// Returns a handle for driving the source while it runs.
    pub fn controller(&self) -> MockController {
        MockController {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Generates silence for the given duration in milliseconds.
    pub fn generate_silence(&mut self, duration_ms: u64) {
        let num_samples = self.samples_for_duration(duration_ms);
        self.samples.resize(self.samples.len() + num_samples, 0.0);
    }

    /// Generates a sine wave at the given frequency and amplitude.
    pub fn generate_sine(&mut self, frequency: f64, amplitude: f32, duration_ms: u64) {
        let channels = usize::from(self.shared.channels);
        let num_frames = self.samples_for_duration(duration_ms) / channels;
        let sample_rate = f64::from(self.sample_rate);

        for i in 0..num_frames {
            let t = i as f64 / sample_rate;
            let value = (2.0 * std::f64::consts::PI * frequency * t).sin() as f32 * amplitude;

            // Same sample on every channel
            for _ in 0..channels {
                self.samples.push(value);
            }
        }
    }

    /// Generates white noise for the given duration.
    pub fn generate_noise(&mut self, duration_ms: u64, amplitude: f32) {
        let num_samples = self.samples_for_duration(duration_ms);

        // Simple LCG for deterministic "random" noise
        let mut seed: u32 = 12345;
        for _ in 0..num_samples {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let random = f32::from((seed >> 16) as u16) / 32768.0 - 1.0;
            self.samples.push(random * amplitude);
        }
    }

    /// Adds raw interleaved samples directly.
    pub fn add_samples(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Returns the samples waiting to be delivered on open.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Returns the duration of the pending samples.
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / usize::from(self.shared.channels);
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }

    fn samples_for_duration(&self, duration_ms: u64) -> usize {
        let frames = (u64::from(self.sample_rate) * duration_ms / 1000) as usize;
        frames * usize::from(self.shared.channels)
    }
}

impl CaptureSource for MockSource {
    fn name(&self) -> String {
        "mock".to_string()
    }

    fn start_capture(
        &mut self,
        health: &Arc<CaptureHealth>,
    ) -> Result<(CaptureStream, SampleQueue), AsciiWaveError> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        if !self.shared.available.load(Ordering::SeqCst) {
            return Err(AsciiWaveError::device_unavailable("mock", "device unplugged"));
        }

        let (mut writer, queue) = sample_queue(self.queue_capacity);
        let pending = std::mem::take(&mut self.samples);
        let dropped = deliver(&mut writer, &pending, self.shared.channels);
        if dropped > 0 {
            health.record_overflow(dropped);
        }

        *self.shared.writer.lock() = Some(writer);
        *self.shared.health.lock() = Some(Arc::clone(health));

        Ok((
            CaptureStream::new(MockStream {
                shared: Arc::clone(&self.shared),
            }),
            queue,
        ))
    }
}

/// Drives a running [`MockSource`] from test code.
#[derive(Clone)]
pub struct MockController {
    shared: Arc<MockShared>,
}

impl MockController {
    /// Delivers interleaved samples as one device callback would.
    ///
    /// Returns the number of mono samples accepted. Nothing is accepted while
    /// no stream is open.
    pub fn push(&self, samples: &[f32]) -> usize {
        let mut guard = self.shared.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return 0;
        };

        let frames = samples.len() / usize::from(self.shared.channels);
        let dropped = deliver(writer, samples, self.shared.channels);
        if dropped > 0 {
            if let Some(health) = self.shared.health.lock().as_ref() {
                health.record_overflow(dropped);
            }
        }
        frames - dropped as usize
    }

    /// Simulates the device failing mid-stream.
    ///
    /// The stream stops delivering and its error callback fires with `reason`.
    pub fn interrupt(&self, reason: &str) {
        self.shared.writer.lock().take();
        if let Some(health) = self.shared.health.lock().as_ref() {
            health.interrupt(reason);
        }
    }

    /// Controls whether the next open succeeds.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Number of times the source has been opened.
    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// Returns true while a stream is open and accepting samples.
    pub fn is_streaming(&self) -> bool {
        self.shared.writer.lock().is_some()
    }
}

/// Live stream guard; dropping it unregisters the "callback".
struct MockStream {
    shared: Arc<MockShared>,
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.shared.writer.lock().take();
    }
}

fn deliver(writer: &mut SampleWriter, samples: &[f32], channels: u16) -> u64 {
    let mut dropped = 0u64;
    downmix(samples, usize::from(channels), |s: f32| s, |sample| {
        if !writer.write(sample) {
            dropped += 1;
        }
    });
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_silence() {
        let mut mock = MockSource::new(16000, 1);
        mock.generate_silence(100);

        assert_eq!(mock.samples().len(), 1600); // 16000 * 0.1 = 1600
        assert!(mock.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_mock_source_sine() {
        let mut mock = MockSource::new(16000, 1);
        mock.generate_sine(440.0, 0.8, 100);

        let samples = mock.samples();
        assert_eq!(samples.len(), 1600);
        assert!(samples.iter().any(|&s| s > 0.5));
        assert!(samples.iter().any(|&s| s < -0.5));
        assert!(samples.iter().all(|&s| s.abs() <= 0.8 + f32::EPSILON));
    }

    #[test]
    fn test_mock_source_stereo() {
        let mut mock = MockSource::new(48000, 2);
        mock.generate_silence(100);

        // 48000 * 0.1 * 2 channels = 9600
        assert_eq!(mock.samples().len(), 9600);
        assert_eq!(mock.duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_noise_stays_within_amplitude() {
        let mut mock = MockSource::new(8000, 1);
        mock.generate_noise(50, 0.25);
        assert_eq!(mock.samples().len(), 400);
        assert!(mock.samples().iter().all(|&s| s.abs() <= 0.25));
        assert!(mock.samples().iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_open_delivers_pending_samples_downmixed() {
        let mut mock = MockSource::new(48000, 2);
        mock.add_samples(&[0.2, 0.4, -1.0, 1.0, 0.5, 0.5]);
        let health = Arc::new(CaptureHealth::new());

        let (_stream, queue) = mock.start_capture(&health).unwrap();
        let mut buffer = crate::pipeline::SampleBuffer::new(queue, 16);
        assert_eq!(buffer.sync(), 3);
        let window = buffer.read_window(3);
        assert!((window[0] - 0.3).abs() < 1e-6);
        assert!(window[1].abs() < 1e-6);
        assert!((window[2] - 0.5).abs() < 1e-6);
        assert!(mock.samples().is_empty());
    }

    #[test]
    fn test_controller_push_and_interrupt() {
        let mut mock = MockSource::new(48000, 1);
        let controller = mock.controller();
        assert_eq!(controller.push(&[1.0]), 0);

        let health = Arc::new(CaptureHealth::new());
        let (stream, _queue) = mock.start_capture(&health).unwrap();
        assert_eq!(controller.opens(), 1);
        assert!(controller.is_streaming());
        assert_eq!(controller.push(&[0.1, 0.2, 0.3]), 3);

        controller.interrupt("unplugged");
        assert!(!controller.is_streaming());
        assert_eq!(controller.push(&[0.1]), 0);
        assert_eq!(health.take_interruption(), Some("unplugged".to_string()));
        drop(stream);
    }

    #[test]
    fn test_dropping_stream_stops_delivery() {
        let mut mock = MockSource::new(48000, 1);
        let controller = mock.controller();
        let health = Arc::new(CaptureHealth::new());

        let (stream, _queue) = mock.start_capture(&health).unwrap();
        drop(stream);
        assert!(!controller.is_streaming());
        assert_eq!(controller.push(&[0.5]), 0);
    }

    #[test]
    fn test_unavailable_source_fails_to_open() {
        let mut mock = MockSource::new(48000, 1);
        let controller = mock.controller();
        controller.set_available(false);

        let health = Arc::new(CaptureHealth::new());
        assert!(matches!(
            mock.start_capture(&health),
            Err(AsciiWaveError::DeviceUnavailable { .. })
        ));
        assert_eq!(controller.opens(), 1);
    }

    #[test]
    fn test_full_queue_counts_overflow() {
        let mut mock = MockSource::new(48000, 1).with_queue_capacity(4);
        let controller = mock.controller();
        let health = Arc::new(CaptureHealth::new());

        let (_stream, _queue) = mock.start_capture(&health).unwrap();
        assert_eq!(controller.push(&[0.0; 6]), 4);
        assert_eq!(health.take_overflow(), 2);
    }
}
