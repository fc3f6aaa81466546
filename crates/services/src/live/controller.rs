use std::sync::Arc;
use std::time::Duration;

use storage::repository::CaptureStore;
use visor_core::model::{
    Capture, DEFAULT_CAPTURE_INTERVAL_MS, DetectionSet, Frame, NoticeLevel, SessionState,
};

use crate::Clock;
use crate::detection::DetectionAdapter;
use crate::error::DetectionError;
use crate::notification::{NotificationSink, announce};

/// What one live frame produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub detections: DetectionSet,
    /// Primary class among those that were not in the previous frame.
    pub new_class: Option<String>,
    /// Screenshot persisted for `new_class`, if saving worked.
    pub capture: Option<Capture>,
}

/// Turns camera frames into captures and audio cues.
#[derive(Clone)]
pub struct LiveCaptureController {
    clock: Clock,
    adapter: Arc<DetectionAdapter>,
    sink: Arc<dyn NotificationSink>,
    captures: Arc<dyn CaptureStore>,
    interval: Duration,
}

impl LiveCaptureController {
    #[must_use]
    pub fn new(
        clock: Clock,
        adapter: Arc<DetectionAdapter>,
        sink: Arc<dyn NotificationSink>,
        captures: Arc<dyn CaptureStore>,
    ) -> Self {
        Self {
            clock,
            adapter,
            sink,
            captures,
            interval: Duration::from_millis(DEFAULT_CAPTURE_INTERVAL_MS),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Fixed delay between loop iterations.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Detect one frame and, when a class appears that was absent from the
    /// previous frame, persist the annotated frame and announce the class.
    ///
    /// A failed save becomes a warning notice; the frame still counts and the
    /// class is still announced.
    ///
    /// # Errors
    ///
    /// Returns `DetectionError` if inference fails. The session is untouched
    /// in that case.
    pub async fn process_frame(
        &self,
        state: &mut SessionState,
        frame: &Frame,
    ) -> Result<FrameReport, DetectionError> {
        let (detections, annotated) = self.adapter.detect_annotated(frame).await?;
        let at = self.clock.now();

        let Some(pending) = state.live_mut().observe(&detections, at) else {
            return Ok(FrameReport {
                detections,
                new_class: None,
                capture: None,
            });
        };
        let class_name = pending.class_name().to_string();

        let capture = match self
            .captures
            .save_capture(&annotated, &class_name, at)
            .await
        {
            Ok(artifact) => {
                let capture = state.live_mut().record_capture(pending, artifact).clone();
                tracing::info!(
                    session = %state.id(),
                    class_name = %class_name,
                    artifact = %capture.artifact,
                    "capture saved"
                );
                Some(capture)
            }
            Err(err) => {
                tracing::warn!(session = %state.id(), class_name = %class_name, error = %err, "capture not saved");
                state.push_notice(
                    NoticeLevel::Warning,
                    format!("Screenshot of {class_name} could not be saved: {err}"),
                    at,
                );
                None
            }
        };

        announce(self.sink.as_ref(), state, &class_name, at).await;

        Ok(FrameReport {
            detections,
            new_class: Some(class_name),
            capture,
        })
    }

    /// Forget live captures and detection history.
    pub fn clear(&self, state: &mut SessionState) {
        state.live_mut().clear();
        tracing::debug!(session = %state.id(), "live history cleared");
    }
}
