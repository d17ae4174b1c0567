//! Latest-frame sink backed by a tokio watch channel.

use crate::sink::FrameSink;
use crate::{Frame, SinkError};
use async_trait::async_trait;
use tokio::sync::watch;

/// A sink that keeps only the most recent frame.
///
/// Suits a UI that redraws at its own pace: it reads whatever frame is
/// current and never sees a backlog. When every receiver is dropped the
/// pipeline stops.
pub struct WatchSink {
    name: String,
    sender: watch::Sender<Option<Frame>>,
}

impl WatchSink {
    /// Creates the sink and the receiver a display reads from.
    pub fn new() -> (Self, watch::Receiver<Option<Frame>>) {
        let (sender, receiver) = watch::channel(None);
        (
            Self {
                name: "watch".to_string(),
                sender,
            },
            receiver,
        )
    }
}

#[async_trait]
impl FrameSink for WatchSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, frame: &Frame) -> Result<(), SinkError> {
        self.sender
            .send(Some(frame.clone()))
            .map_err(|_| SinkError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::tests::blank_frame;

    #[tokio::test]
    async fn test_watch_sink_keeps_latest() {
        let (sink, receiver) = WatchSink::new();
        assert!(receiver.borrow().is_none());

        for sequence in 0..3 {
            sink.write(&blank_frame(sequence)).await.unwrap();
        }

        let latest = receiver.borrow().clone().unwrap();
        assert_eq!(latest.sequence(), 2);
    }

    #[tokio::test]
    async fn test_watch_sink_closed() {
        let (sink, receiver) = WatchSink::new();
        drop(receiver);
        let result = sink.write(&blank_frame(0)).await;
        assert!(matches!(result, Err(SinkError::ChannelClosed)));
    }
}
