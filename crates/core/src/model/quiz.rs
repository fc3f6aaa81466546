use image::RgbImage;
use thiserror::Error;

use crate::model::detection::{ClassSet, DetectionSet};
use crate::model::frame::Frame;
use crate::model::session::QuizSummary;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no images loaded")]
    Empty,

    #[error("current image has not been detected yet")]
    NotDetected,

    #[error("current image has not been answered yet")]
    NotSubmitted,
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where the current quiz item sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// No images loaded.
    Idle,
    AwaitingDetection,
    DetectedAwaitingSubmit,
    Submitted,
    /// Last item submitted and advanced past.
    Complete,
}

/// One uploaded image and what happened to it.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizItem {
    index: usize,
    image: Frame,
    submitted: bool,
    detected_label: Option<String>,
    user_answer: Option<String>,
    correct: Option<bool>,
}

impl QuizItem {
    fn new(index: usize, image: Frame) -> Self {
        Self {
            index,
            image,
            submitted: false,
            detected_label: None,
            user_answer: None,
            correct: None,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn image(&self) -> &Frame {
        &self.image
    }

    #[must_use]
    pub fn submitted(&self) -> bool {
        self.submitted
    }

    #[must_use]
    pub fn detected_label(&self) -> Option<&str> {
        self.detected_label.as_deref()
    }

    #[must_use]
    pub fn user_answer(&self) -> Option<&str> {
        self.user_answer.as_deref()
    }

    #[must_use]
    pub fn correct(&self) -> Option<bool> {
        self.correct
    }
}

/// What happened to an upload batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Batch became the quiz; `dropped` images beyond the limit were discarded.
    Accepted { count: usize, dropped: usize },
    /// A quiz is already running; restart first.
    Ignored,
    /// Empty batch; the quiz was reset.
    Cleared,
}

/// Outcome of answering the current item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub correct: bool,
    pub expected: String,
    pub answer: String,
    pub score: u32,
    /// True when the item had already been answered and nothing changed.
    pub repeated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Next { index: usize },
    Completed(QuizSummary),
}

/// Aggregated view of quiz progress, useful for rendering "Image i of N".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    /// 1-based position of the current item, 0 when idle.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub score: u32,
    pub is_complete: bool,
}

/// Trimmed, case-insensitive exact match.
#[must_use]
pub fn answers_match(answer: &str, label: &str) -> bool {
    answer.trim().to_lowercase() == label.trim().to_lowercase()
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Single-image quiz over an uploaded batch.
///
/// Steps through the items sequentially: detect, submit an answer, advance.
/// Each item contributes at most one point, exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    items: Vec<QuizItem>,
    current: usize,
    score: u32,
    phase: QuizPhase,
    last_detected_classes: ClassSet,
    last_detected_image: Option<RgbImage>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            current: 0,
            score: 0,
            phase: QuizPhase::Idle,
            last_detected_classes: ClassSet::new(),
            last_detected_image: None,
        }
    }

    /// Load an upload batch, keeping at most `max_items` images.
    ///
    /// Only accepted while the quiz is empty. An empty batch resets the quiz.
    pub fn load(&mut self, mut images: Vec<Frame>, max_items: usize) -> UploadOutcome {
        if images.is_empty() {
            self.restart();
            return UploadOutcome::Cleared;
        }
        if !self.items.is_empty() {
            return UploadOutcome::Ignored;
        }

        let dropped = images.len().saturating_sub(max_items);
        images.truncate(max_items);
        if images.is_empty() {
            return UploadOutcome::Cleared;
        }

        self.restart();
        self.items = images
            .into_iter()
            .enumerate()
            .map(|(index, image)| QuizItem::new(index, image))
            .collect();
        self.phase = QuizPhase::AwaitingDetection;

        UploadOutcome::Accepted {
            count: self.items.len(),
            dropped,
        }
    }

    /// Drop every item and zero the score.
    pub fn restart(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn items(&self) -> &[QuizItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&QuizItem> {
        self.items.get(self.current)
    }

    fn current_item_mut(&mut self) -> Option<&mut QuizItem> {
        self.items.get_mut(self.current)
    }

    /// Classes detected on the current item (replaced on every detection).
    #[must_use]
    pub fn last_detected_classes(&self) -> &ClassSet {
        &self.last_detected_classes
    }

    /// Annotated result of the latest detection on the current item.
    #[must_use]
    pub fn last_detected_image(&self) -> Option<&RgbImage> {
        self.last_detected_image.as_ref()
    }

    /// Detection is allowed until the current item is answered.
    #[must_use]
    pub fn can_detect(&self) -> bool {
        matches!(
            self.phase,
            QuizPhase::AwaitingDetection | QuizPhase::DetectedAwaitingSubmit
        )
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current_item().is_some_and(|item| item.submitted)
            && self.current + 1 == self.items.len()
    }

    /// Record a detection for the current item.
    ///
    /// Returns the classes that were not in the previous detection, or `None`
    /// when the item was already answered and nothing changed.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Empty` if no images are loaded.
    pub fn record_detection(
        &mut self,
        detections: &DetectionSet,
        annotated: Option<RgbImage>,
    ) -> Result<Option<DetectionSet>, QuizError> {
        if self.items.is_empty() {
            return Err(QuizError::Empty);
        }
        if !self.can_detect() {
            return Ok(None);
        }

        let fresh = detections.new_since(&self.last_detected_classes);
        self.last_detected_classes = detections.class_names();
        self.last_detected_image = annotated;

        let label = detections.label().to_string();
        let item = self.current_item_mut().ok_or(QuizError::Empty)?;
        item.detected_label = Some(label);
        self.phase = QuizPhase::DetectedAwaitingSubmit;

        Ok(Some(fresh))
    }

    /// Compare `answer` to the detected label and score the item.
    ///
    /// Answering an item twice returns the first result unchanged.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Empty` if no images are loaded.
    /// Returns `QuizError::NotDetected` if the current item has no detection yet.
    pub fn submit(&mut self, answer: &str) -> Result<AnswerResult, QuizError> {
        match self.phase {
            QuizPhase::Idle => Err(QuizError::Empty),
            QuizPhase::AwaitingDetection => Err(QuizError::NotDetected),
            QuizPhase::Submitted | QuizPhase::Complete => self.recorded_answer(),
            QuizPhase::DetectedAwaitingSubmit => {
                let item = self.current_item_mut().ok_or(QuizError::Empty)?;
                let expected = item
                    .detected_label
                    .clone()
                    .ok_or(QuizError::NotDetected)?;
                let correct = answers_match(answer, &expected);

                item.submitted = true;
                item.user_answer = Some(answer.to_string());
                item.correct = Some(correct);
                if correct {
                    self.score = self.score.saturating_add(1);
                }
                self.phase = QuizPhase::Submitted;

                Ok(AnswerResult {
                    correct,
                    expected,
                    answer: answer.to_string(),
                    score: self.score,
                    repeated: false,
                })
            }
        }
    }

    fn recorded_answer(&self) -> Result<AnswerResult, QuizError> {
        let item = self.current_item().ok_or(QuizError::Empty)?;
        Ok(AnswerResult {
            correct: item.correct.unwrap_or(false),
            expected: item.detected_label.clone().unwrap_or_default(),
            answer: item.user_answer.clone().unwrap_or_default(),
            score: self.score,
            repeated: true,
        })
    }

    /// Move to the next item, or finish the quiz after the last one.
    ///
    /// Advancing forgets the previous item's detections so a repeated class on
    /// the next image counts as new.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Empty` if no images are loaded.
    /// Returns `QuizError::NotSubmitted` if the current item is unanswered.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, QuizError> {
        match self.phase {
            QuizPhase::Idle => Err(QuizError::Empty),
            QuizPhase::AwaitingDetection | QuizPhase::DetectedAwaitingSubmit => {
                Err(QuizError::NotSubmitted)
            }
            QuizPhase::Complete => Ok(AdvanceOutcome::Completed(self.summary())),
            QuizPhase::Submitted => {
                self.last_detected_classes.clear();
                self.last_detected_image = None;

                if self.current + 1 < self.items.len() {
                    self.current += 1;
                    self.phase = QuizPhase::AwaitingDetection;
                    Ok(AdvanceOutcome::Next {
                        index: self.current,
                    })
                } else {
                    self.phase = QuizPhase::Complete;
                    Ok(AdvanceOutcome::Completed(self.summary()))
                }
            }
        }
    }

    /// Score against the number of loaded items.
    #[must_use]
    pub fn summary(&self) -> QuizSummary {
        QuizSummary::new(self.score, self.items.len())
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let answered = self.items.iter().filter(|item| item.submitted).count();
        QuizProgress {
            position: if self.items.is_empty() {
                0
            } else {
                self.current + 1
            },
            total: self.items.len(),
            answered,
            remaining: self.items.len().saturating_sub(answered),
            score: self.score,
            is_complete: self.is_complete(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::detection::{DEFAULT_CONFIDENCE_THRESHOLD, Detection, UNKNOWN_LABEL};
    use crate::model::vocabulary::Vocabulary;
    use image::RgbImage;
    use std::path::Path;

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::rgb(RgbImage::new(4, 4)).with_source(format!("img{i}.png")))
            .collect()
    }

    fn detected(pairs: &[(&str, f32)]) -> DetectionSet {
        DetectionSet::filtered(
            pairs.iter().map(|(name, conf)| Detection::new(*name, *conf)),
            &Vocabulary::builtin(Path::new("assets")),
            DEFAULT_CONFIDENCE_THRESHOLD,
        )
    }

    fn loaded(n: usize) -> QuizSession {
        let mut quiz = QuizSession::new();
        quiz.load(frames(n), 25);
        quiz
    }

    #[test]
    fn two_image_scenario_scores_one_of_two() {
        let mut quiz = loaded(2);

        quiz.record_detection(&detected(&[("Bus Lane", 0.9)]), None)
            .unwrap();
        let first = quiz.submit("bus lane").unwrap();
        assert!(first.correct);
        assert_eq!(quiz.score(), 1);
        assert_eq!(quiz.advance().unwrap(), AdvanceOutcome::Next { index: 1 });

        quiz.record_detection(&detected(&[]), None).unwrap();
        assert_eq!(quiz.current_item().unwrap().detected_label(), Some(UNKNOWN_LABEL));
        let second = quiz.submit("bus lane").unwrap();
        assert!(!second.correct);
        assert_eq!(second.expected, UNKNOWN_LABEL);
        assert_eq!(quiz.score(), 1);
        assert!(quiz.is_complete());

        let AdvanceOutcome::Completed(summary) = quiz.advance().unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(summary.to_string(), "1 / 2");
        assert_eq!(quiz.phase(), QuizPhase::Complete);
        assert!(quiz.is_complete());
    }

    #[test]
    fn second_submit_is_a_no_op() {
        let mut quiz = loaded(1);
        quiz.record_detection(&detected(&[("Cats Eye", 0.8)]), None)
            .unwrap();
        let first = quiz.submit("Cats Eye").unwrap();
        let again = quiz.submit("something else").unwrap();

        assert!(first.correct);
        assert!(again.correct);
        assert!(again.repeated);
        assert_eq!(again.answer, "Cats Eye");
        assert_eq!(quiz.score(), 1);
        assert_eq!(quiz.current_item().unwrap().correct(), Some(true));
    }

    #[test]
    fn wrong_then_right_answer_does_not_score() {
        let mut quiz = loaded(1);
        quiz.record_detection(&detected(&[("Cats Eye", 0.8)]), None)
            .unwrap();
        assert!(!quiz.submit("Bus Lane").unwrap().correct);
        assert!(!quiz.submit("Cats Eye").unwrap().correct);
        assert_eq!(quiz.score(), 0);
    }

    #[test]
    fn answers_are_trimmed_and_case_insensitive() {
        assert!(answers_match("  PARKING bay ", "Parking Bay"));
        assert!(!answers_match("Parking", "Parking Bay"));
    }

    #[test]
    fn n_cycles_complete_the_quiz() {
        let n = 5;
        let mut quiz = loaded(n);
        for i in 0..n {
            assert!(!quiz.is_complete());
            let set = if i % 2 == 0 {
                detected(&[("Speed Limit", 0.7)])
            } else {
                detected(&[])
            };
            quiz.record_detection(&set, None).unwrap();
            quiz.submit("Speed Limit").unwrap();
            quiz.advance().unwrap();
        }
        assert!(quiz.is_complete());
        assert_eq!(quiz.score(), 3);
        assert!(quiz.score() as usize <= n);
    }

    #[test]
    fn advancing_forgets_previous_classes() {
        let mut quiz = loaded(2);
        let first = quiz
            .record_detection(&detected(&[("Bus Lane", 0.9)]), None)
            .unwrap()
            .unwrap();
        assert!(first.contains("Bus Lane"));

        let redetect = quiz
            .record_detection(&detected(&[("Bus Lane", 0.9)]), None)
            .unwrap()
            .unwrap();
        assert!(redetect.is_empty());

        quiz.submit("Bus Lane").unwrap();
        quiz.advance().unwrap();
        assert!(quiz.last_detected_classes().is_empty());

        let second = quiz
            .record_detection(&detected(&[("Bus Lane", 0.9)]), None)
            .unwrap()
            .unwrap();
        assert!(second.contains("Bus Lane"));
    }

    #[test]
    fn detection_replaces_rather_than_unions() {
        let mut quiz = loaded(1);
        quiz.record_detection(&detected(&[("Bus Lane", 0.9), ("Cats Eye", 0.9)]), None)
            .unwrap();
        quiz.record_detection(&detected(&[("Cats Eye", 0.9)]), None)
            .unwrap();
        let names: Vec<_> = quiz.last_detected_classes().iter().cloned().collect();
        assert_eq!(names, vec!["Cats Eye".to_string()]);
    }

    #[test]
    fn detection_after_submit_is_ignored() {
        let mut quiz = loaded(1);
        quiz.record_detection(&detected(&[("Bus Lane", 0.9)]), None)
            .unwrap();
        quiz.submit("Bus Lane").unwrap();
        let ignored = quiz
            .record_detection(&detected(&[("Cats Eye", 0.9)]), None)
            .unwrap();
        assert!(ignored.is_none());
        assert_eq!(quiz.current_item().unwrap().detected_label(), Some("Bus Lane"));
    }

    #[test]
    fn transitions_are_guarded() {
        let mut quiz = QuizSession::new();
        assert_eq!(quiz.submit("x").unwrap_err(), QuizError::Empty);
        assert_eq!(quiz.advance().unwrap_err(), QuizError::Empty);

        quiz.load(frames(2), 25);
        assert_eq!(quiz.submit("x").unwrap_err(), QuizError::NotDetected);
        assert_eq!(quiz.advance().unwrap_err(), QuizError::NotSubmitted);
        quiz.record_detection(&detected(&[]), None).unwrap();
        assert_eq!(quiz.advance().unwrap_err(), QuizError::NotSubmitted);
    }

    #[test]
    fn upload_is_capped_and_only_accepted_when_empty() {
        let mut quiz = QuizSession::new();
        assert_eq!(
            quiz.load(frames(30), 25),
            UploadOutcome::Accepted {
                count: 25,
                dropped: 5
            }
        );
        assert_eq!(quiz.load(frames(3), 25), UploadOutcome::Ignored);
        assert_eq!(quiz.len(), 25);

        assert_eq!(quiz.load(Vec::new(), 25), UploadOutcome::Cleared);
        assert!(quiz.is_empty());
        assert_eq!(quiz.phase(), QuizPhase::Idle);
    }

    #[test]
    fn restart_resets_everything() {
        let mut quiz = loaded(1);
        quiz.record_detection(&detected(&[("Bus Lane", 0.9)]), None)
            .unwrap();
        quiz.submit("Bus Lane").unwrap();
        quiz.advance().unwrap();

        quiz.restart();
        assert_eq!(quiz, QuizSession::new());
        assert_eq!(quiz.progress().position, 0);
    }

    #[test]
    fn progress_tracks_answers() {
        let mut quiz = loaded(3);
        quiz.record_detection(&detected(&[]), None).unwrap();
        quiz.submit("Unknown").unwrap();
        let progress = quiz.progress();
        assert_eq!(progress.position, 1);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.remaining, 2);
        assert_eq!(progress.score, 1);
        assert!(!progress.is_complete);
    }
}
