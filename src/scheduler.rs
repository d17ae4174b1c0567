//! Render scheduler: lifecycle state machine and the timer-driven tick loop.
//!
//! The scheduler owns everything on the render side: the capture stream, the
//! [`RenderPipeline`] and the sinks. It runs on a dedicated thread with a
//! current-thread tokio runtime, because device streams cannot move between
//! threads. Commands from the [`Session`](crate::Session) arrive over an
//! unbounded channel, so they can be sent from any thread.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::pipeline::{RenderPipeline, SampleBuffer, TickInput};
use crate::session::SessionState;
use crate::sink::FrameSink;
use crate::source::{CaptureHealth, CaptureSource, CaptureStream};
use crate::{AsciiWaveError, EventCallback, Frame, PipelineConfig, PipelineEvent, SinkError};

/// Log tick statistics every this many frames.
const STATS_LOG_INTERVAL: u64 = 300;

/// Lifecycle of a render session.
///
/// ```text
/// Idle → Running ⇄ Paused
///   └──────┴─────────┴──→ Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    /// Constructed, device not yet streaming.
    Idle,
    /// Ticking at the configured frame rate.
    Running,
    /// Ticking suspended; capture keeps filling the ring buffer.
    Paused,
    /// Terminal. Device and buffer released.
    Stopped,
}

impl SchedulerState {
    /// Validates a move to `to`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for moves the lifecycle does not allow.
    pub fn transition(self, to: SchedulerState) -> Result<SchedulerState, AsciiWaveError> {
        use SchedulerState::{Idle, Paused, Running, Stopped};

        match (self, to) {
            (Idle, Running) | (Running, Paused) | (Paused, Running) => Ok(to),
            (Idle | Running | Paused, Stopped) => Ok(to),
            _ => Err(AsciiWaveError::InvalidTransition { from: self, to }),
        }
    }

    /// Returns `true` once no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        self == SchedulerState::Stopped
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Command sent to the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SchedulerCommand {
    Pause,
    Resume,
    Stop,
}

/// Everything the render thread needs to start.
pub(crate) struct SchedulerParts {
    pub config: PipelineConfig,
    pub source: Box<dyn CaptureSource>,
    pub sinks: Vec<Arc<dyn FrameSink>>,
    pub shared: Arc<SessionState>,
    pub event_callback: Option<EventCallback>,
}

struct Interruption {
    since: Instant,
    reason: String,
}

/// Drives the render pipeline on a fixed interval and publishes frames.
pub(crate) struct Scheduler {
    pipeline: RenderPipeline,
    source: Box<dyn CaptureSource>,
    capture: Option<CaptureStream>,
    health: Arc<CaptureHealth>,
    sinks: Vec<Arc<dyn FrameSink>>,
    shared: Arc<SessionState>,
    event_callback: Option<EventCallback>,
    tick_interval: Duration,
    reconnect_delay: Duration,
    epoch: Instant,
    interruption: Option<Interruption>,
    paused: bool,
}

impl Scheduler {
    /// Opens the capture source, builds the pipeline and enters `Running`.
    pub fn open(parts: SchedulerParts) -> Result<Self, AsciiWaveError> {
        let SchedulerParts {
            config,
            mut source,
            sinks,
            shared,
            event_callback,
        } = parts;

        config.validate()?;

        let health = Arc::new(CaptureHealth::new());
        let (capture, queue) = source.start_capture(&health)?;
        let buffer = SampleBuffer::new(queue, config.ring_capacity);
        let pipeline = RenderPipeline::new(&config, buffer)?;

        tracing::info!(
            "Render pipeline ready: {} ({}x{} @ {} fps)",
            source.name(),
            config.columns,
            config.rows,
            config.frame_rate
        );

        let scheduler = Self {
            pipeline,
            source,
            capture: Some(capture),
            health,
            sinks,
            shared,
            event_callback,
            tick_interval: config.tick_interval(),
            reconnect_delay: config.reconnect_delay,
            epoch: Instant::now(),
            interruption: None,
            paused: false,
        };
        // The device is streaming; callers see Running as soon as open returns.
        scheduler.set_state(SchedulerState::Running);
        Ok(scheduler)
    }

    /// Runs until stopped by command or by a terminal error.
    ///
    /// The device is released before this returns, on every path.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SchedulerCommand>,
    ) -> Result<(), AsciiWaveError> {
        let mut ticker = tokio::time::interval(self.tick_interval);
        // Overrun ticks are dropped, never queued.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let result = loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(SchedulerCommand::Pause) => self.pause(),
                    Some(SchedulerCommand::Resume) => {
                        if self.resume() {
                            ticker.reset();
                        }
                    }
                    Some(SchedulerCommand::Stop) | None => break Ok(()),
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.on_tick().await {
                        break Err(e);
                    }
                }
            }
        };

        self.shutdown(result.as_ref().err()).await;
        result
    }

    // The session has already validated and published pause/resume; these
    // only apply them to the tick loop.
    fn pause(&mut self) {
        if self.paused {
            tracing::debug!("Pause ignored, already paused");
            return;
        }
        self.paused = true;
        self.announce(SchedulerState::Running, SchedulerState::Paused);
    }

    /// Returns `true` if ticking should restart.
    fn resume(&mut self) -> bool {
        if !self.paused {
            tracing::debug!("Resume ignored, not paused");
            return false;
        }
        // Drop whatever accumulated while paused so the first frame is current.
        self.pipeline.buffer_mut().sync();
        self.paused = false;
        self.announce(SchedulerState::Paused, SchedulerState::Running);
        true
    }

    async fn on_tick(&mut self) -> Result<(), AsciiWaveError> {
        let started = Instant::now();

        self.check_overflow();
        self.check_interruption();
        self.try_reconnect()?;

        if self.paused {
            // Keep the history current without rendering.
            self.pipeline.buffer_mut().sync();
            self.record_samples();
            return Ok(());
        }

        let input = if self.interruption.is_some() {
            TickInput::Silent
        } else {
            TickInput::Live
        };
        let frame = self.pipeline.tick(input, self.epoch.elapsed());
        self.record_samples();
        self.publish(&frame).await?;

        let rendered = self.shared.record_frame();
        if rendered % STATS_LOG_INTERVAL == 0 {
            tracing::debug!(
                "Rendered {} frames, {} samples captured, sequence {}",
                rendered,
                self.pipeline.buffer().written(),
                frame.sequence()
            );
        }

        self.account_overrun(started.elapsed());
        Ok(())
    }

    /// Hands the frame to every sink concurrently.
    async fn publish(&self, frame: &Frame) -> Result<(), AsciiWaveError> {
        let writes: Vec<_> = self
            .sinks
            .iter()
            .map(|sink| async move { (sink, sink.write(frame).await) })
            .collect();

        for (sink, result) in futures::future::join_all(writes).await {
            match result {
                Ok(()) => {}
                Err(SinkError::ChannelClosed) => {
                    tracing::info!("Display sink {} closed", sink.name());
                    return Err(AsciiWaveError::DisplayClosed {
                        sink_name: sink.name().to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(sink = sink.name(), error = %e, "Frame not delivered");
                    self.emit_event(PipelineEvent::SinkError {
                        sink_name: sink.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_overflow(&self) {
        let dropped = self.health.take_overflow();
        if dropped > 0 {
            self.shared.record_overflow(dropped);
            tracing::warn!(dropped_samples = dropped, "Capture queue overflow");
            self.emit_event(PipelineEvent::BufferOverflow {
                dropped_samples: dropped,
            });
        }
    }

    fn check_interruption(&mut self) {
        let Some(reason) = self.health.take_interruption() else {
            return;
        };
        if self.interruption.is_some() {
            return;
        }

        tracing::warn!(reason = %reason, "Capture stream interrupted, rendering silence");
        // Unregister the failed stream's callback right away.
        self.capture = None;
        self.emit_event(PipelineEvent::StreamInterrupted {
            reason: reason.clone(),
        });
        self.interruption = Some(Interruption {
            since: Instant::now(),
            reason,
        });
    }

    /// Makes the single reconnect attempt once the delay has passed.
    fn try_reconnect(&mut self) -> Result<(), AsciiWaveError> {
        let due = self
            .interruption
            .as_ref()
            .is_some_and(|i| i.since.elapsed() >= self.reconnect_delay);
        if !due {
            return Ok(());
        }
        let Some(interruption) = self.interruption.take() else {
            return Ok(());
        };

        self.capture = None;
        // Errors raised by the stream that was just dropped belong to this interruption.
        let _ = self.health.take_interruption();

        let attempt = Instant::now();
        match self.source.start_capture(&self.health) {
            Ok((capture, queue)) => {
                self.pipeline.buffer_mut().attach(queue);
                self.capture = Some(capture);
                self.shared.record_reconnect();

                let attempt_ms = attempt.elapsed().as_millis() as u64;
                tracing::info!("Reconnected to {} in {}ms", self.source.name(), attempt_ms);
                self.emit_event(PipelineEvent::Reconnected { attempt_ms });
                Ok(())
            }
            Err(e) => {
                tracing::error!("Reconnect to {} failed: {}", self.source.name(), e);
                self.emit_event(PipelineEvent::ReconnectFailed {
                    reason: e.to_string(),
                });
                Err(AsciiWaveError::StreamInterrupted {
                    reason: format!("{}; reconnect failed: {e}", interruption.reason),
                })
            }
        }
    }

    fn account_overrun(&self, elapsed: Duration) {
        if elapsed <= self.tick_interval {
            return;
        }
        let missed = (elapsed.as_nanos() / self.tick_interval.as_nanos().max(1)) as u64;
        if missed > 0 {
            self.shared.record_dropped(missed);
            tracing::warn!(count = missed, "Tick overran interval, skipping frames");
            self.emit_event(PipelineEvent::FramesDropped { count: missed });
        }
    }

    fn record_samples(&self) {
        self.shared.set_samples_captured(self.pipeline.buffer().written());
    }

    async fn shutdown(&mut self, error: Option<&AsciiWaveError>) {
        // Callback goes first; the buffer it writes into is dropped with self.
        self.capture = None;

        for sink in &self.sinks {
            if let Err(e) = sink.on_stop().await {
                self.emit_event(PipelineEvent::SinkError {
                    sink_name: sink.name().to_string(),
                    error: format!("Error during shutdown: {e}"),
                });
            }
        }

        if let Some(e) = error {
            tracing::error!("Render pipeline stopped: {}", e);
            self.shared.set_error(e.clone());
        }
        self.set_state(SchedulerState::Stopped);
        self.emit_event(PipelineEvent::Stopped {
            error: error.map(ToString::to_string),
        });
    }

    fn set_state(&self, to: SchedulerState) {
        match self.shared.transition(to) {
            Ok(from) => self.announce(from, to),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    fn announce(&self, from: SchedulerState, to: SchedulerState) {
        tracing::info!("Scheduler {} -> {}", from, to);
        self.emit_event(PipelineEvent::StateChanged { from, to });
    }

    /// Sends an event to the callback if configured.
    fn emit_event(&self, event: PipelineEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }
}

/// Starts the render thread.
///
/// The device is opened on the new thread. The outcome of that is sent on
/// `ready`; if nobody is listening any more the device is released again
/// without rendering.
pub(crate) fn spawn_render_thread(
    parts: SchedulerParts,
    commands: mpsc::UnboundedReceiver<SchedulerCommand>,
    ready: oneshot::Sender<Result<(), AsciiWaveError>>,
) -> Result<std::thread::JoinHandle<Result<(), AsciiWaveError>>, AsciiWaveError> {
    std::thread::Builder::new()
        .name("ascii-wave-render".to_string())
        .spawn(move || {
            let shared = Arc::clone(&parts.shared);
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let error = AsciiWaveError::BackendError(format!(
                        "failed to build render runtime: {e}"
                    ));
                    let _ = ready.send(Err(error.clone()));
                    return Err(error);
                }
            };

            let scheduler = match Scheduler::open(parts) {
                Ok(scheduler) => scheduler,
                Err(e) => {
                    shared.set_state(SchedulerState::Stopped);
                    let _ = ready.send(Err(e.clone()));
                    return Err(e);
                }
            };

            if ready.send(Ok(())).is_err() {
                tracing::warn!("Start abandoned by caller, releasing device");
                drop(scheduler);
                shared.set_state(SchedulerState::Stopped);
                return Ok(());
            }

            runtime.block_on(scheduler.run(commands))
        })
        .map_err(|e| AsciiWaveError::BackendError(format!("failed to spawn render thread: {e}")))
}
