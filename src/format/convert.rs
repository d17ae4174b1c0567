//! Sample format and channel conversion.
//!
//! Everything here runs inside the device callback, so nothing allocates.

/// Converts an i16 sample to f32 in `[-1.0, 1.0]`.
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Converts an unsigned 16-bit sample (midpoint 32768) to f32 in `[-1.0, 1.0]`.
#[inline]
pub fn u16_to_f32(sample: u16) -> f32 {
    (f32::from(sample) - 32768.0) / 32768.0
}

/// Clamps a float sample into the normalized range. NaN becomes silence.
#[inline]
pub fn clamp_sample(sample: f32) -> f32 {
    if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    }
}

/// Averages one interleaved frame down to a single mono sample.
#[inline]
pub fn mix_frame<T: Copy>(frame: &[T], to_f32: impl Fn(T) -> f32) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f32 = frame.iter().map(|&s| to_f32(s)).sum();
    clamp_sample(sum / frame.len() as f32)
}

/// Down-mixes interleaved samples to mono, handing each result to `emit`.
///
/// A trailing partial frame is ignored.
#[inline]
pub fn downmix<T: Copy>(
    data: &[T],
    channels: usize,
    to_f32: impl Fn(T) -> f32 + Copy,
    mut emit: impl FnMut(f32),
) {
    let channels = channels.max(1);
    for frame in data.chunks_exact(channels) {
        emit(mix_frame(frame, to_f32));
    }
}
