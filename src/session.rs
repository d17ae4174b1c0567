//! Render session management.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::scheduler::{SchedulerCommand, SchedulerState};
use crate::AsciiWaveError;

/// Statistics about a render session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames composed and handed to the sinks.
    pub frames_rendered: u64,
    /// Ticks skipped because the previous tick overran the interval.
    pub frames_dropped: u64,
    /// Samples that reached the ring buffer.
    pub samples_captured: u64,
    /// Samples discarded because the capture queue was full.
    pub samples_overflowed: u64,
    /// Successful reconnects after a stream interruption.
    pub reconnects: u64,
}

/// State shared between the [`Session`] and the render thread.
pub(crate) struct SessionState {
    state: Mutex<SchedulerState>,
    error: Mutex<Option<AsciiWaveError>>,
    frames_rendered: AtomicU64,
    frames_dropped: AtomicU64,
    samples_captured: AtomicU64,
    samples_overflowed: AtomicU64,
    reconnects: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SchedulerState::Idle),
            error: Mutex::new(None),
            frames_rendered: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            samples_captured: AtomicU64::new(0),
            samples_overflowed: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: SchedulerState) {
        *self.state.lock() = state;
    }

    /// Validates and applies a move, returning the previous state.
    pub fn transition(&self, to: SchedulerState) -> Result<SchedulerState, AsciiWaveError> {
        self.transition_with(to, || Ok(()))
    }

    /// Like [`transition`](Self::transition), but runs `then` while the state
    /// is still locked. The move only takes effect if `then` succeeds.
    pub fn transition_with(
        &self,
        to: SchedulerState,
        then: impl FnOnce() -> Result<(), AsciiWaveError>,
    ) -> Result<SchedulerState, AsciiWaveError> {
        let mut state = self.state.lock();
        let from = *state;
        let next = from.transition(to)?;
        then()?;
        *state = next;
        Ok(from)
    }

    pub fn error(&self) -> Option<AsciiWaveError> {
        self.error.lock().clone()
    }

    pub fn set_error(&self, error: AsciiWaveError) {
        *self.error.lock() = Some(error);
    }

    /// Returns the new total.
    pub fn record_frame(&self) -> u64 {
        self.frames_rendered.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_dropped(&self, count: u64) {
        self.frames_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_overflow(&self, samples: u64) {
        self.samples_overflowed.fetch_add(samples, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_samples_captured(&self, samples: u64) {
        self.samples_captured.store(samples, Ordering::Relaxed);
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            samples_captured: self.samples_captured.load(Ordering::Relaxed),
            samples_overflowed: self.samples_overflowed.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// Handle to a running render pipeline.
///
/// The `Session` is returned by [`AsciiWaveBuilder::start()`]. Frames flow to
/// the sinks from a background render thread until `stop()` is called, a
/// terminal error occurs, or the `Session` is dropped.
///
/// `pause`, `resume` and `request_stop` never wait on the render thread, so
/// they can be called from any thread through a shared reference. `pause` and
/// `resume` take effect in [`state()`](Session::state) immediately; the render
/// thread applies them in the order they were made.
///
/// # Lifecycle
///
/// 1. Created by [`AsciiWaveBuilder::start()`] in `Running`
/// 2. [`pause()`](Session::pause) / [`resume()`](Session::resume) as needed
/// 3. Call [`stop()`](Session::stop) for graceful shutdown
/// 4. Dropping the `Session` also stops rendering (but prefer explicit `stop()`)
///
/// # Example
///
/// ```ignore
/// let session = AsciiWave::builder()
///     .add_sink(ChannelSink::new(tx))
///     .start()
///     .await?;
///
/// tokio::time::sleep(Duration::from_secs(10)).await;
/// session.pause()?;
/// session.resume()?;
///
/// // Graceful shutdown
/// session.stop().await?;
/// ```
///
/// [`AsciiWaveBuilder::start()`]: crate::AsciiWaveBuilder::start
pub struct Session {
    state: Arc<SessionState>,
    cmd_tx: mpsc::UnboundedSender<SchedulerCommand>,
    render_thread: Option<JoinHandle<Result<(), AsciiWaveError>>>,
}

impl Session {
    pub(crate) fn new(
        state: Arc<SessionState>,
        cmd_tx: mpsc::UnboundedSender<SchedulerCommand>,
        render_thread: JoinHandle<Result<(), AsciiWaveError>>,
    ) -> Self {
        Self {
            state,
            cmd_tx,
            render_thread: Some(render_thread),
        }
    }

    /// Current scheduler state.
    pub fn state(&self) -> SchedulerState {
        self.state.state()
    }

    /// Returns `true` until the scheduler reaches `Stopped`.
    pub fn is_running(&self) -> bool {
        !self.state().is_terminal()
    }

    /// Returns current session statistics.
    pub fn stats(&self) -> SessionStats {
        self.state.stats()
    }

    /// The terminal error, once the scheduler has stopped because of one.
    pub fn error(&self) -> Option<AsciiWaveError> {
        self.state.error()
    }

    /// Suspends ticking. Capture keeps running.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the session is not running.
    pub fn pause(&self) -> Result<(), AsciiWaveError> {
        self.command(SchedulerState::Paused, SchedulerCommand::Pause)
    }

    /// Resumes ticking after [`pause()`](Self::pause).
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the session is not paused.
    pub fn resume(&self) -> Result<(), AsciiWaveError> {
        self.command(SchedulerState::Running, SchedulerCommand::Resume)
    }

    /// Asks the render thread to stop without waiting for it.
    pub fn request_stop(&self) {
        let _ = self.cmd_tx.send(SchedulerCommand::Stop);
    }

    /// Stops rendering and waits for the render thread to exit.
    ///
    /// The device is released and every sink's `on_stop` has run by the time
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns the terminal error if the pipeline had already stopped because
    /// of one (`StreamInterrupted`, `DisplayClosed`).
    pub async fn stop(mut self) -> Result<(), AsciiWaveError> {
        self.request_stop();

        let Some(handle) = self.render_thread.take() else {
            return Ok(());
        };

        match tokio::task::spawn_blocking(move || handle.join()).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AsciiWaveError::BackendError(
                "render thread panicked".to_string(),
            )),
            Err(e) => Err(AsciiWaveError::BackendError(format!(
                "failed to join render thread: {e}"
            ))),
        }
    }

    fn command(
        &self,
        target: SchedulerState,
        command: SchedulerCommand,
    ) -> Result<(), AsciiWaveError> {
        // Sending under the state lock keeps command order equal to state order.
        self.state.transition_with(target, || {
            self.cmd_tx
                .send(command)
                .map_err(|_| AsciiWaveError::InvalidTransition {
                    from: SchedulerState::Stopped,
                    to: target,
                })
        })?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.render_thread.is_some() && self.is_running() {
            // Session dropped without explicit stop() - the render thread cleans up
            self.request_stop();
        }
    }
}
