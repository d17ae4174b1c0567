//! Sample ring buffer between the capture callback and the render tick.
//!
//! Two layers:
//!
//! ```text
//! device callback → SampleWriter ══ SPSC queue ══> SampleBuffer (history ring)
//! ```
//!
//! The queue is the lock-free `ringbuf` SPSC pair, so the callback never
//! waits on the renderer. The history ring lives entirely on the render side
//! and overwrites its oldest sample when full, so a slow reader loses old
//! audio rather than stalling the writer.

use ringbuf::traits::{Consumer, Observer, Producer, RingBuffer, Split};
use ringbuf::HeapRb;

/// Consumer half of the capture queue, as returned by a capture source.
pub type SampleQueue = ringbuf::HeapCons<f32>;

/// Samples moved out of the queue per `pop_slice` call.
const DRAIN_BLOCK: usize = 1024;

/// Producer half used inside the device callback.
///
/// `write` is wait-free: when the queue is full the sample is discarded and
/// `false` is returned.
pub struct SampleWriter {
    producer: ringbuf::HeapProd<f32>,
}

impl SampleWriter {
    /// Wraps a raw producer.
    pub fn new(producer: ringbuf::HeapProd<f32>) -> Self {
        Self { producer }
    }

    /// Pushes one sample. Returns `false` if the queue was full.
    #[inline]
    pub fn write(&mut self, sample: f32) -> bool {
        self.producer.try_push(sample).is_ok()
    }

    /// Pushes as many samples as fit. Returns how many were accepted.
    #[inline]
    pub fn write_slice(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }
}

/// Creates a capture queue sized to `capacity` samples (rounded up to a power of two).
pub fn sample_queue(capacity: usize) -> (SampleWriter, SampleQueue) {
    let ring = HeapRb::<f32>::new(capacity.max(1).next_power_of_two());
    let (producer, consumer) = ring.split();
    (SampleWriter::new(producer), consumer)
}

/// Render-side history of the most recent samples.
pub struct SampleBuffer {
    queue: SampleQueue,
    history: HeapRb<f32>,
    scratch: Vec<f32>,
    written: u64,
}

impl SampleBuffer {
    /// Creates a buffer retaining `capacity` samples (rounded up to a power
    /// of two), fed from `queue`.
    pub fn new(queue: SampleQueue, capacity: usize) -> Self {
        Self {
            queue,
            history: HeapRb::new(capacity.max(1).next_power_of_two()),
            scratch: vec![0.0; DRAIN_BLOCK],
            written: 0,
        }
    }

    /// Replaces the capture queue, keeping the history.
    ///
    /// Used after a reconnect: the old queue's producer died with the old
    /// stream, the new stream writes into a fresh one.
    pub fn attach(&mut self, queue: SampleQueue) {
        self.sync();
        self.queue = queue;
    }

    /// Moves everything waiting in the queue into the history.
    ///
    /// Returns the number of samples moved.
    pub fn sync(&mut self) -> usize {
        let mut moved = 0;
        loop {
            let n = self.queue.pop_slice(&mut self.scratch);
            if n == 0 {
                break;
            }
            self.history.push_slice_overwrite(&self.scratch[..n]);
            moved += n;
        }
        self.written += moved as u64;
        moved
    }

    /// Fills `out` with the most recent `out.len()` samples, oldest first.
    ///
    /// If fewer samples have ever been written, the front is zero-padded. If
    /// nothing new arrived since the last call, the same window comes back.
    pub fn read_window_into(&mut self, out: &mut [f32]) {
        self.sync();

        let available = self.history.occupied_len();
        let take = out.len().min(available);
        let pad = out.len() - take;

        out[..pad].fill(0.0);
        for (dst, &src) in out[pad..]
            .iter_mut()
            .zip(self.history.iter().skip(available - take))
        {
            *dst = src;
        }
    }

    /// Returns the most recent `len` samples, zero-padded at the front.
    pub fn read_window(&mut self, len: usize) -> Vec<f32> {
        let mut out = vec![0.0; len];
        self.read_window_into(&mut out);
        out
    }

    /// Samples currently retained.
    pub fn len(&self) -> usize {
        self.history.occupied_len()
    }

    /// Returns `true` if nothing has been retained yet.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// History capacity in samples.
    pub fn capacity(&self) -> usize {
        self.history.capacity().get()
    }

    /// Total samples ever moved into the history.
    pub fn written(&self) -> u64 {
        self.written
    }
}

/// Creates a writer / buffer pair with matching queue and history capacity.
pub fn create_sample_buffer(capacity: usize) -> (SampleWriter, SampleBuffer) {
    let (writer, queue) = sample_queue(capacity);
    (writer, SampleBuffer::new(queue, capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        let (_writer, buffer) = create_sample_buffer(1000);
        assert_eq!(buffer.capacity(), 1024);
    }

    #[test]
    fn test_read_window_zero_pads_at_startup() {
        let (mut writer, mut buffer) = create_sample_buffer(16);
        writer.write_slice(&[0.1, 0.2, 0.3]);

        let window = buffer.read_window(5);
        assert_eq!(window, vec![0.0, 0.0, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_read_window_empty_is_silent() {
        let (_writer, mut buffer) = create_sample_buffer(16);
        assert_eq!(buffer.read_window(4), vec![0.0; 4]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_read_window_returns_most_recent() {
        let (mut writer, mut buffer) = create_sample_buffer(16);
        let samples: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        writer.write_slice(&samples);

        assert_eq!(buffer.read_window(3), vec![0.7, 0.8, 0.9]);
        assert_eq!(buffer.written(), 10);
    }

    #[test]
    fn test_history_overwrites_oldest() {
        let (mut writer, mut buffer) = create_sample_buffer(4);
        writer.write_slice(&[1.0, 2.0, 3.0, 4.0]);
        buffer.sync();
        writer.write_slice(&[5.0, 6.0]);

        assert_eq!(buffer.read_window(4), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buffer.len(), 4);
        // Asking for more than the capacity pads with zeros
        assert_eq!(buffer.read_window(6), vec![0.0, 0.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_stalled_writer_repeats_last_window() {
        let (mut writer, mut buffer) = create_sample_buffer(8);
        writer.write_slice(&[0.5, -0.5, 0.25]);

        let first = buffer.read_window(3);
        let second = buffer.read_window(3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_queue_rejects_without_blocking() {
        let (mut writer, _buffer) = create_sample_buffer(4);
        assert_eq!(writer.write_slice(&[0.0; 4]), 4);
        assert!(!writer.write(1.0));
    }

    #[test]
    fn test_attach_keeps_history() {
        let (mut writer, mut buffer) = create_sample_buffer(8);
        writer.write_slice(&[0.1, 0.2]);
        drop(writer);

        let (mut fresh, queue) = sample_queue(8);
        buffer.attach(queue);
        fresh.write_slice(&[0.3]);

        assert_eq!(buffer.read_window(3), vec![0.1, 0.2, 0.3]);
    }

    /// Encodes a sequence number as an exactly representable sample.
    fn encode(i: u32) -> f32 {
        (i % 4096) as f32 / 4096.0
    }

    fn decode(sample: f32) -> u32 {
        (sample * 4096.0) as u32
    }

    #[test]
    fn test_no_torn_samples_under_concurrent_access() {
        const TOTAL: u32 = 200_000;
        const WINDOW: usize = 256;

        let (mut writer, mut buffer) = create_sample_buffer(1024);
        let done = Arc::new(AtomicBool::new(false));
        let done_writer = Arc::clone(&done);

        let producer = std::thread::spawn(move || {
            for i in 1..=TOTAL {
                while !writer.write(encode(i)) {
                    std::thread::yield_now();
                }
            }
            done_writer.store(true, Ordering::SeqCst);
        });

        let mut window = vec![0.0f32; WINDOW];
        let mut checked_windows = 0;
        loop {
            let finished = done.load(Ordering::SeqCst);
            buffer.read_window_into(&mut window);

            if buffer.written() >= WINDOW as u64 {
                for pair in window.windows(2) {
                    // Every sample decodes exactly, and the window is a
                    // contiguous run of the writer's sequence.
                    assert_eq!(encode(decode(pair[0])), pair[0], "torn sample");
                    assert_eq!(
                        (decode(pair[0]) + 1) % 4096,
                        decode(pair[1]),
                        "window is not contiguous"
                    );
                }
                checked_windows += 1;
            }

            if finished {
                break;
            }
        }

        producer.join().unwrap();
        buffer.sync();
        assert_eq!(buffer.written(), u64::from(TOTAL));
        assert!(checked_windows > 0);
    }
}
