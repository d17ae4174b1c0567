//! # ascii-wave
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Real-time audio visualisation as a grid of ASCII glyphs.
//!
//! `ascii-wave` captures audio via CPAL, keeps the most recent samples in a
//! ring buffer, and on a fixed tick turns them into a waveform drawn with a
//! density palette (`" .:-=+*#%@"` by default). Each tick produces an
//! immutable [`Frame`] handed to one or more display sinks.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ascii_wave::{AsciiWave, AudioSource, ChannelSink, Frame, Theme};
//! use tokio::sync::mpsc;
//!
//! // A few frames of slack; a slow display drops frames instead of lagging
//! let (tx, mut rx) = mpsc::channel::<Frame>(4);
//!
//! let session = AsciiWave::builder()
//!     .source(AudioSource::default_device())
//!     .columns(100)
//!     .rows(20)
//!     .frame_rate(30.0)
//!     .theme(Theme::Dark)
//!     .add_sink(ChannelSink::new(tx))
//!     .on_event(|e| tracing::warn!(?e, "pipeline event"))
//!     .start()
//!     .await?;
//!
//! while let Some(frame) = rx.recv().await {
//!     println!("{}", frame.to_text());
//! }
//!
//! session.stop().await?;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **CPAL Thread**: audio callback that down-mixes to mono and pushes into a
//!   lock-free SPSC queue; it never blocks and never allocates
//! - **Render Thread**: timer-driven scheduler that drains the queue into a
//!   history ring, then runs Extract → Map → Compose once per tick
//! - **Sinks**: receive each frame without blocking the tick
//!
//! A host that already has its own frame loop can skip the scheduler and call
//! [`RenderPipeline::tick`] directly.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod config;
mod error;
mod event;
pub mod format;
mod frame;
pub mod pipeline;
mod scheduler;
mod session;
mod sink;
pub mod source;

pub use builder::{AsciiWave, AsciiWaveBuilder, AudioSource};
pub use config::{ring_capacity_for, Normalization, PipelineConfig, WaveShape, MAX_FRAME_RATE};
pub use error::{AsciiWaveError, SinkError};
pub use event::{event_callback, EventCallback, PipelineEvent};
pub use frame::{Frame, GlyphCell, GlyphGrid, Theme};
pub use pipeline::{
    create_sample_buffer, Envelope, FrameCompositor, GlyphMapper, GlyphPalette, RenderPipeline,
    SampleBuffer, SampleWriter, TickInput, WaveformExtractor, DEFAULT_PALETTE,
};
pub use scheduler::SchedulerState;
pub use session::{Session, SessionStats};
pub use sink::{CallbackSink, ChannelSink, FrameSink, WatchSink};
