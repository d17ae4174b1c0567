//! Tokio mpsc channel sink implementation.

use crate::sink::FrameSink;
use crate::{Frame, SinkError};
use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};

/// A sink that sends frames to a bounded tokio mpsc channel.
///
/// Sending never waits: when the channel is full the frame is dropped and
/// reported as [`SinkError::Full`]. Dropping the receiver stops the pipeline.
///
/// # Example
///
/// ```
/// use ascii_wave::{ChannelSink, Frame};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel::<Frame>(4);
/// let sink = ChannelSink::new(tx);
///
/// // Use sink with the AsciiWave builder...
/// // Then draw frames:
/// // while let Some(frame) = rx.recv().await { ... }
/// ```
pub struct ChannelSink {
    name: String,
    sender: mpsc::Sender<Frame>,
}

impl ChannelSink {
    /// Creates a new channel sink with the given sender.
    ///
    /// A small capacity (a handful of frames) keeps the display close to live.
    pub fn new(sender: mpsc::Sender<Frame>) -> Self {
        Self {
            name: "channel".to_string(),
            sender,
        }
    }

    /// Creates a new channel sink with a custom name.
    pub fn with_name(name: impl Into<String>, sender: mpsc::Sender<Frame>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, frame: &Frame) -> Result<(), SinkError> {
        self.sender.try_send(frame.clone()).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Closed(_) => SinkError::ChannelClosed,
        })
    }
}
