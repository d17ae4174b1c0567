//! Audio format conversion utilities.
//!
//! Device callbacks hand us interleaved samples in whatever format the
//! hardware prefers. This module turns them into normalized mono `f32`:
//! - Sample format conversion (i16 / u16 → f32)
//! - Channel down-mix (arithmetic mean across channels)

mod convert;

pub use convert::{clamp_sample, downmix, i16_to_f32, mix_frame, u16_to_f32};
