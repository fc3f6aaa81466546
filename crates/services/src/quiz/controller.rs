use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;
use visor_core::model::{
    AdvanceOutcome, AnswerResult, ClassSet, DEFAULT_MAX_UPLOADS, DetectionSet, Frame,
    NoticeLevel, QuizError, QuizProgress, SessionState, UploadOutcome,
};

use crate::Clock;
use crate::detection::DetectionAdapter;
use crate::error::QuizServiceError;
use crate::notification::{NotificationSink, announce};

/// Result of running detection on the current quiz item.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectOutcome {
    /// Label the answer is checked against.
    pub label: String,
    pub detections: DetectionSet,
    /// Classes announced by this call.
    pub new_classes: ClassSet,
    /// The item was already answered, so nothing was re-run.
    pub skipped: bool,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives the upload quiz for one session at a time.
///
/// Every operation takes the session state explicitly; the controller itself
/// holds only shared, read-only collaborators.
#[derive(Clone)]
pub struct QuizController {
    clock: Clock,
    adapter: Arc<DetectionAdapter>,
    sink: Arc<dyn NotificationSink>,
    max_uploads: usize,
    shuffle_uploads: bool,
}

impl QuizController {
    #[must_use]
    pub fn new(clock: Clock, adapter: Arc<DetectionAdapter>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            clock,
            adapter,
            sink,
            max_uploads: DEFAULT_MAX_UPLOADS,
            shuffle_uploads: false,
        }
    }

    #[must_use]
    pub fn with_max_uploads(mut self, max_uploads: usize) -> Self {
        self.max_uploads = max_uploads;
        self
    }

    #[must_use]
    pub fn with_shuffle_uploads(mut self, shuffle_uploads: bool) -> Self {
        self.shuffle_uploads = shuffle_uploads;
        self
    }

    #[must_use]
    pub fn max_uploads(&self) -> usize {
        self.max_uploads
    }

    /// Start a quiz from an upload batch.
    ///
    /// Ignored while a quiz is loaded; an empty batch resets the quiz. Images
    /// beyond the upload cap are dropped, after shuffling when enabled.
    pub fn upload(&self, state: &mut SessionState, mut images: Vec<Frame>) -> UploadOutcome {
        if self.shuffle_uploads && state.quiz().is_empty() {
            let mut rng = rng();
            images.as_mut_slice().shuffle(&mut rng);
        }
        let outcome = state.quiz_mut().load(images, self.max_uploads);

        match outcome {
            UploadOutcome::Accepted { count, dropped } => {
                tracing::info!(session = %state.id(), count, dropped, "quiz loaded");
                if dropped > 0 {
                    state.push_notice(
                        NoticeLevel::Info,
                        format!(
                            "Only the first {} images were kept; {dropped} ignored.",
                            self.max_uploads
                        ),
                        self.clock.now(),
                    );
                }
            }
            UploadOutcome::Ignored => {
                tracing::debug!(session = %state.id(), "upload ignored while quiz is running");
            }
            UploadOutcome::Cleared => {
                tracing::debug!(session = %state.id(), "empty upload cleared the quiz");
            }
        }
        outcome
    }

    /// Run detection on the current item and announce classes that were not
    /// in its previous detection.
    ///
    /// Once the item is answered this is a no-op reporting the recorded label.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` if no images are loaded and
    /// `QuizServiceError::Detection` if inference fails. A failed inference
    /// leaves the session unchanged apart from an error notice.
    pub async fn detect(&self, state: &mut SessionState) -> Result<DetectOutcome, QuizServiceError> {
        let quiz = state.quiz();
        let Some(item) = quiz.current_item() else {
            return Err(QuizError::Empty.into());
        };
        if !quiz.can_detect() {
            return Ok(DetectOutcome {
                label: item.detected_label().unwrap_or_default().to_string(),
                detections: DetectionSet::empty(),
                new_classes: ClassSet::new(),
                skipped: true,
            });
        }

        let detected = self.adapter.detect_annotated(item.image()).await;
        let (detections, annotated) = match detected {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(session = %state.id(), error = %err, "quiz detection failed");
                state.push_notice(NoticeLevel::Error, err.to_string(), self.clock.now());
                return Err(err.into());
            }
        };

        let fresh = state
            .quiz_mut()
            .record_detection(&detections, Some(annotated))?
            .unwrap_or_default();

        let at = self.clock.now();
        for class_name in fresh.class_names() {
            announce(self.sink.as_ref(), state, &class_name, at).await;
        }

        tracing::info!(
            session = %state.id(),
            index = state.quiz().current_index(),
            label = detections.label(),
            "quiz item detected"
        );
        Ok(DetectOutcome {
            label: detections.label().to_string(),
            new_classes: fresh.class_names(),
            detections,
            skipped: false,
        })
    }

    /// Check `answer` against the current item's detected label.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` if no images are loaded or the current
    /// item has not been detected.
    pub fn submit(
        &self,
        state: &mut SessionState,
        answer: &str,
    ) -> Result<AnswerResult, QuizServiceError> {
        let result = state.quiz_mut().submit(answer)?;
        if !result.repeated {
            tracing::info!(
                session = %state.id(),
                correct = result.correct,
                score = result.score,
                "answer submitted"
            );
        }
        Ok(result)
    }

    /// Detect if the current item still allows it, then submit.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError` from either step.
    pub async fn check_answer(
        &self,
        state: &mut SessionState,
        answer: &str,
    ) -> Result<AnswerResult, QuizServiceError> {
        if state.quiz().can_detect() {
            self.detect(state).await?;
        }
        self.submit(state, answer)
    }

    /// Move past the answered item.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` if no images are loaded or the current
    /// item is unanswered.
    pub fn advance(&self, state: &mut SessionState) -> Result<AdvanceOutcome, QuizServiceError> {
        let outcome = state.quiz_mut().advance()?;
        if let AdvanceOutcome::Completed(summary) = &outcome {
            tracing::info!(session = %state.id(), score = %summary, "quiz complete");
        }
        Ok(outcome)
    }

    /// Drop the loaded quiz so a new batch can be uploaded.
    pub fn restart(&self, state: &mut SessionState) {
        state.quiz_mut().restart();
        tracing::debug!(session = %state.id(), "quiz restarted");
    }

    #[must_use]
    pub fn progress(&self, state: &SessionState) -> QuizProgress {
        state.quiz().progress()
    }

    /// Valid answers, alphabetically.
    #[must_use]
    pub fn dictionary(&self) -> Vec<&str> {
        self.adapter.vocabulary().names().collect()
    }
}
