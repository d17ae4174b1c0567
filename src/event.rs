//! Runtime events for monitoring pipeline health.
//!
//! Events are non-fatal notifications. The pipeline keeps rendering after
//! any event except [`PipelineEvent::Stopped`], which is the last one a
//! session emits.

use std::sync::Arc;

use crate::SchedulerState;

/// Runtime events emitted while the pipeline runs.
///
/// # Example
///
/// ```
/// use ascii_wave::PipelineEvent;
///
/// fn handle_event(event: PipelineEvent) {
///     match event {
///         PipelineEvent::StreamInterrupted { reason } => {
///             eprintln!("input lost ({reason}), showing silence");
///         }
///         PipelineEvent::FramesDropped { count } => {
///             eprintln!("skipped {count} ticks");
///         }
///         PipelineEvent::Stopped { error: Some(error) } => {
///             eprintln!("pipeline stopped: {error}");
///         }
///         _ => {}
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The scheduler moved between lifecycle states.
    StateChanged {
        /// Previous state.
        from: SchedulerState,
        /// New state.
        to: SchedulerState,
    },

    /// The capture stream reported a failure.
    ///
    /// Frames keep flowing with a silent window until the reconnect attempt.
    StreamInterrupted {
        /// Description of why the stream was interrupted.
        reason: String,
    },

    /// The single reconnect attempt succeeded and live input resumed.
    Reconnected {
        /// How long the attempt took.
        attempt_ms: u64,
    },

    /// The single reconnect attempt failed. The pipeline stops next.
    ReconnectFailed {
        /// Why the device could not be reopened.
        reason: String,
    },

    /// Tick work overran the interval and ticks were skipped.
    FramesDropped {
        /// Number of skipped ticks.
        count: u64,
    },

    /// The capture queue was full and samples were discarded.
    ///
    /// Visualization tolerates sample loss; this is informational.
    BufferOverflow {
        /// Samples discarded since the previous report.
        dropped_samples: u64,
    },

    /// A display sink rejected a frame.
    SinkError {
        /// Name of the sink that errored.
        sink_name: String,
        /// Description of the error.
        error: String,
    },

    /// The scheduler reached `Stopped`; carries the terminal error, if any.
    Stopped {
        /// Terminal error message.
        error: Option<String>,
    },
}

/// Callback type for receiving runtime events.
///
/// Register one via [`AsciiWaveBuilder::on_event()`]. The callback runs on the
/// render thread and should return quickly.
///
/// [`AsciiWaveBuilder::on_event()`]: crate::AsciiWaveBuilder::on_event
pub type EventCallback = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use ascii_wave::{event_callback, PipelineEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// callback(PipelineEvent::FramesDropped { count: 1 });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(PipelineEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_event_debug() {
        let event = PipelineEvent::BufferOverflow {
            dropped_samples: 100,
        };
        let debug = format!("{event:?}");
        assert!(debug.contains("BufferOverflow"));
        assert!(debug.contains("100"));
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(PipelineEvent::FramesDropped { count: 0 });
        assert!(called.load(Ordering::SeqCst));
    }
}
