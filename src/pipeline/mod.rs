//! Audio-to-glyph rendering pipeline.
//!
//! ```text
//! CPAL Thread → SampleWriter ══> SampleBuffer ─┐
//!                                              │ tick
//!         WaveformExtractor → GlyphMapper → FrameCompositor → Frame
//! ```
//!
//! - **Ring buffer**: lock-free SPSC queue out of the callback plus a
//!   render-side history that overwrites its oldest samples
//! - **Extractor**: peak amplitude per column with exponential smoothing
//! - **Mapper**: quantizes into a density palette laid out around a midline
//! - **Compositor**: stamps theme and sequence number into an immutable frame

mod compositor;
mod extractor;
mod glyph;
mod render;
mod ring_buffer;

pub use compositor::FrameCompositor;
pub use extractor::{sub_window, Envelope, WaveformExtractor};
pub use glyph::{GlyphMapper, GlyphPalette, DEFAULT_PALETTE};
pub use render::{RenderPipeline, TickInput};
pub use ring_buffer::{create_sample_buffer, sample_queue, SampleBuffer, SampleQueue, SampleWriter};
