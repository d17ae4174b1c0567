//! Error types for ascii-wave.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`AsciiWaveError`]): prevent the pipeline from starting,
//!   or end it with a terminal report
//! - **Recoverable events**: runtime issues surfaced via [`EventCallback`](crate::EventCallback)

/// Fatal errors raised by the rendering pipeline.
///
/// Construction and startup failures are returned from
/// [`AsciiWaveBuilder::start()`]. A running pipeline that cannot continue
/// reports its terminal error from [`Session::stop()`]. Transient issues
/// (dropped frames, a full display queue, a single stream interruption) are
/// delivered through the event callback instead.
///
/// [`AsciiWaveBuilder::start()`]: crate::AsciiWaveBuilder::start
/// [`Session::stop()`]: crate::Session::stop
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AsciiWaveError {
    /// The audio input device could not be opened.
    ///
    /// Covers a missing default device, an unknown device name, a failed
    /// open, and an open that did not finish within the configured timeout.
    #[error("device unavailable: {name} - {reason}")]
    DeviceUnavailable {
        /// Name of the device, or `"default"`.
        name: String,
        /// Reason the device is unavailable.
        reason: String,
    },

    /// The capture stream was lost and the single reconnect attempt failed.
    #[error("audio stream interrupted: {reason}")]
    StreamInterrupted {
        /// Description of the interruption.
        reason: String,
    },

    /// A configuration value was rejected at construction.
    #[error("invalid configuration for `{field}`: {reason}")]
    ConfigurationInvalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The device only offers a sample format we cannot convert.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// No display sinks were configured before starting.
    #[error("no sinks configured - add at least one frame sink")]
    NoSinksConfigured,

    /// A sink failed during initialization.
    #[error("sink '{sink_name}' failed to start: {reason}")]
    SinkStartFailed {
        /// Name of the sink that failed.
        sink_name: String,
        /// Why the sink failed to start.
        reason: String,
    },

    /// The display surface stopped accepting frames.
    #[error("display sink '{sink_name}' closed")]
    DisplayClosed {
        /// Name of the sink that closed.
        sink_name: String,
    },

    /// A scheduler state change that the lifecycle does not allow.
    #[error("invalid scheduler transition: {from} -> {to}")]
    InvalidTransition {
        /// State the scheduler was in.
        from: crate::SchedulerState,
        /// State that was requested.
        to: crate::SchedulerState,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    BackendError(String),
}

impl AsciiWaveError {
    /// Creates a configuration error for the given field.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::ConfigurationInvalid {
            field,
            reason: reason.into(),
        }
    }

    /// Creates a device error for the given device name.
    pub fn device_unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur within a [`FrameSink`](crate::FrameSink) implementation.
///
/// Sink errors other than [`SinkError::ChannelClosed`] are recoverable: the
/// scheduler emits a [`PipelineEvent::SinkError`] and keeps ticking.
///
/// [`PipelineEvent::SinkError`]: crate::PipelineEvent::SinkError
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The receiving side is gone. Terminal for the pipeline.
    #[error("channel closed")]
    ChannelClosed,

    /// The display is behind; this frame was not delivered.
    #[error("display queue full")]
    Full,

    /// Custom error for user-implemented sinks.
    #[error("{0}")]
    Custom(String),
}

impl SinkError {
    /// Creates a custom sink error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_unavailable_display() {
        let err = AsciiWaveError::device_unavailable("USB Mic", "not found");
        assert_eq!(err.to_string(), "device unavailable: USB Mic - not found");
    }

    #[test]
    fn test_configuration_invalid_display() {
        let err = AsciiWaveError::invalid("columns", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid configuration for `columns`: must be greater than zero"
        );
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = AsciiWaveError::InvalidTransition {
            from: crate::SchedulerState::Stopped,
            to: crate::SchedulerState::Running,
        };
        assert_eq!(
            err.to_string(),
            "invalid scheduler transition: stopped -> running"
        );
    }

    #[test]
    fn test_sink_error_custom() {
        let err = SinkError::custom("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }
}
