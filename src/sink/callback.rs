//! Closure sink.

use crate::sink::FrameSink;
use crate::{Frame, SinkError};
use async_trait::async_trait;

type FrameFn = Box<dyn Fn(&Frame) -> Result<(), SinkError> + Send + Sync>;

/// A sink that calls a closure for every frame.
///
/// The closure runs on the render thread and must return quickly.
///
/// # Example
///
/// ```
/// use ascii_wave::CallbackSink;
///
/// let sink = CallbackSink::new("stdout", |frame| {
///     println!("{}", frame.to_text());
///     Ok(())
/// });
/// ```
pub struct CallbackSink {
    name: String,
    callback: FrameFn,
}

impl CallbackSink {
    /// Creates a sink named `name` around `callback`.
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Frame) -> Result<(), SinkError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl FrameSink for CallbackSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, frame: &Frame) -> Result<(), SinkError> {
        (self.callback)(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::tests::blank_frame;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_callback_sink_receives_frames() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = CallbackSink::new("collect", move |frame| {
            seen_clone.lock().push(frame.sequence());
            Ok(())
        });

        sink.write(&blank_frame(3)).await.unwrap();
        sink.write(&blank_frame(4)).await.unwrap();
        assert_eq!(*seen.lock(), vec![3, 4]);
        assert_eq!(sink.name(), "collect");
    }

    #[tokio::test]
    async fn test_callback_sink_propagates_error() {
        let sink = CallbackSink::new("failing", |_| Err(SinkError::custom("display lost")));
        let result = sink.write(&blank_frame(0)).await;
        assert!(matches!(result, Err(SinkError::Custom(msg)) if msg == "display lost"));
    }
}
