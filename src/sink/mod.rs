//! Display sinks: where rendered frames go.
//!
//! A [`FrameSink`] receives every frame the scheduler composes. The crate
//! provides three built-in sinks:
//!
//! - [`ChannelSink`]: Sends frames to a bounded tokio mpsc channel
//! - [`WatchSink`]: Publishes only the latest frame through a tokio watch channel
//! - [`CallbackSink`]: Hands frames to a closure
//!
//! Implement [`FrameSink`] directly for a terminal, a GUI surface or a
//! network endpoint.

mod callback;
mod channel;
mod watch;

pub use callback::CallbackSink;
pub use channel::ChannelSink;
pub use watch::WatchSink;

use crate::{Frame, SinkError};
use async_trait::async_trait;

/// A destination for rendered frames.
///
/// # Implementation Notes
///
/// - Methods take `&self` - use interior mutability (`Mutex`, `RwLock`) if needed
/// - `write` runs on the render thread between ticks; it must not wait on the
///   display. A sink that cannot keep up should drop the frame and return
///   [`SinkError::Full`]
/// - `on_start` is called before the first frame; `on_stop` after the last
/// - Returning [`SinkError::ChannelClosed`] stops the pipeline
///
/// # Example
///
/// ```
/// use ascii_wave::{Frame, FrameSink, SinkError};
/// use async_trait::async_trait;
///
/// struct PrintSink;
///
/// #[async_trait]
/// impl FrameSink for PrintSink {
///     fn name(&self) -> &str {
///         "print"
///     }
///
///     async fn write(&self, frame: &Frame) -> Result<(), SinkError> {
///         println!("{}", frame.to_text());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str;

    /// Called once before the first frame.
    ///
    /// Errors here are fatal and will prevent the pipeline from starting.
    ///
    /// Default implementation does nothing.
    async fn on_start(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Delivers one frame.
    ///
    /// Errors other than `ChannelClosed` are reported as
    /// [`PipelineEvent::SinkError`] and rendering continues.
    ///
    /// [`PipelineEvent::SinkError`]: crate::PipelineEvent::SinkError
    async fn write(&self, frame: &Frame) -> Result<(), SinkError>;

    /// Called once after the last frame, including after a terminal error.
    ///
    /// Default implementation does nothing.
    async fn on_stop(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GlyphCell, GlyphGrid, Theme};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct CountingSink {
        name: String,
        count: AtomicUsize,
    }

    impl CountingSink {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                count: AtomicUsize::new(0),
            }
        }

        fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FrameSink for CountingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&self, _frame: &Frame) -> Result<(), SinkError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub(super) fn blank_frame(sequence: u64) -> Frame {
        let grid = GlyphGrid::filled(
            2,
            4,
            GlyphCell {
                glyph: ' ',
                level: 0,
            },
        );
        Frame::new(grid, Theme::Dark, sequence, Duration::ZERO, 0.0)
    }

    #[tokio::test]
    async fn test_sink_lifecycle() {
        let sink = CountingSink::new("test");

        sink.on_start().await.unwrap();

        let frame = blank_frame(0);
        sink.write(&frame).await.unwrap();
        sink.write(&frame).await.unwrap();

        assert_eq!(sink.count(), 2);

        sink.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_sink_name() {
        let sink = CountingSink::new("my-sink");
        assert_eq!(sink.name(), "my-sink");
    }

    #[test]
    fn test_sink_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Arc<dyn FrameSink>>();
    }
}
