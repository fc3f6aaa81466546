use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use visor_core::model::{NoticeLevel, SessionState};

use super::camera::FrameSource;
use super::controller::{FrameReport, LiveCaptureController};
use crate::error::{CameraError, LiveCaptureError};

/// Session state shared between the live loop and whoever renders it.
pub type SharedSession = Arc<Mutex<SessionState>>;

/// Why the live loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The enable flag was cleared or the handle dropped.
    Disabled,
    /// The source ran out of frames.
    SourceClosed,
    /// Frame acquisition failed.
    CameraFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    FrameProcessed(FrameReport),
    Stopped(StopReason),
}

/// Control side of a running live loop.
///
/// Dropping the handle stops the loop after its current iteration.
#[derive(Debug)]
pub struct LiveCaptureHandle {
    enabled: watch::Sender<bool>,
    events: mpsc::UnboundedReceiver<LiveEvent>,
    task: JoinHandle<StopReason>,
}

impl LiveCaptureHandle {
    /// Ask the loop to stop; it exits within one iteration.
    pub fn stop(&self) {
        // The loop may already be gone.
        let _ = self.enabled.send(false);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Next event from the loop, `None` once it has exited and the queue is drained.
    pub async fn next_event(&mut self) -> Option<LiveEvent> {
        self.events.recv().await
    }

    /// Wait for the loop to exit.
    ///
    /// # Errors
    ///
    /// Returns `LiveCaptureError::Task` if the loop panicked or was aborted.
    pub async fn join(self) -> Result<StopReason, LiveCaptureError> {
        let Self { enabled, task, .. } = self;
        let reason = task
            .await
            .map_err(|e| LiveCaptureError::Task(e.to_string()))?;
        drop(enabled);
        Ok(reason)
    }
}

impl LiveCaptureController {
    /// Run the capture loop on a background task until the handle stops it or
    /// the source fails.
    ///
    /// The loop owns `source` and drops it on every exit path.
    pub fn spawn<S>(self: &Arc<Self>, source: S, session: SharedSession) -> LiveCaptureHandle
    where
        S: FrameSource + 'static,
    {
        let (enabled_tx, enabled_rx) = watch::channel(true);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let controller = Arc::clone(self);
        let task = tokio::spawn(run_loop(controller, source, session, enabled_rx, events_tx));

        LiveCaptureHandle {
            enabled: enabled_tx,
            events: events_rx,
            task,
        }
    }
}

async fn run_loop<S>(
    controller: Arc<LiveCaptureController>,
    mut source: S,
    session: SharedSession,
    mut enabled: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<LiveEvent>,
) -> StopReason
where
    S: FrameSource,
{
    tracing::info!(interval_ms = controller.interval().as_millis(), "live capture started");

    let reason = loop {
        if !*enabled.borrow_and_update() {
            break StopReason::Disabled;
        }

        let frame = match source.next_frame().await {
            Ok(frame) => frame,
            Err(CameraError::Closed) => break StopReason::SourceClosed,
            Err(err) => {
                tracing::warn!(error = %err, "camera failed");
                let mut state = session.lock().await;
                let at = controller.clock().now();
                state.push_notice(NoticeLevel::Error, format!("Camera stopped: {err}"), at);
                break StopReason::CameraFailed(err.to_string());
            }
        };

        {
            let mut state = session.lock().await;
            match controller.process_frame(&mut state, &frame).await {
                Ok(report) => {
                    // Nobody listening is fine; the session still records everything.
                    let _ = events.send(LiveEvent::FrameProcessed(report));
                }
                Err(err) => {
                    tracing::warn!(session = %state.id(), error = %err, "live detection failed");
                    let at = controller.clock().now();
                    state.push_notice(NoticeLevel::Error, err.to_string(), at);
                }
            }
        }

        tokio::select! {
            () = tokio::time::sleep(controller.interval()) => {}
            changed = enabled.changed() => {
                if changed.is_err() {
                    break StopReason::Disabled;
                }
            }
        }
    };

    drop(source);
    tracing::info!(reason = ?reason, "live capture stopped");
    let _ = events.send(LiveEvent::Stopped(reason.clone()));
    reason
}
