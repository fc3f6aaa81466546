use std::fmt;

use chrono::{DateTime, Utc};

use crate::model::ids::SessionId;
use crate::model::live::LiveSession;
use crate::model::quiz::QuizSession;

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Final quiz score, rendered as `"{score} / {total}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSummary {
    score: u32,
    total: usize,
}

impl QuizSummary {
    #[must_use]
    pub fn new(score: u32, total: usize) -> Self {
        Self { score, total }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn incorrect(&self) -> usize {
        self.total.saturating_sub(self.score as usize)
    }
}

impl fmt::Display for QuizSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.score, self.total)
    }
}

//
// ─── NOTICES ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message meant for the user, e.g. an audio cue that failed to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// Everything one user session owns: quiz progress, live capture history and
/// pending notices.
///
/// Controllers take this by `&mut` for each operation; nothing is shared
/// between sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    id: SessionId,
    started_at: DateTime<Utc>,
    quiz: QuizSession,
    live: LiveSession,
    notices: Vec<Notice>,
}

impl SessionState {
    /// Create a new session. `started_at` should come from the services clock.
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self::with_id(SessionId::generate(), started_at)
    }

    #[must_use]
    pub fn with_id(id: SessionId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            started_at,
            quiz: QuizSession::new(),
            live: LiveSession::new(),
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn quiz(&self) -> &QuizSession {
        &self.quiz
    }

    pub fn quiz_mut(&mut self) -> &mut QuizSession {
        &mut self.quiz
    }

    #[must_use]
    pub fn live(&self) -> &LiveSession {
        &self.live
    }

    pub fn live_mut(&mut self) -> &mut LiveSession {
        &mut self.live
    }

    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>, at: DateTime<Utc>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
            at,
        });
    }

    /// Hand pending notices to the renderer, leaving none behind.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Reset quiz, live history and notices while keeping the session identity.
    pub fn reset(&mut self, at: DateTime<Utc>) {
        self.quiz.restart();
        self.live.clear();
        self.notices.clear();
        self.started_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArtifactRef, Detection, DetectionSet, Frame, Vocabulary};
    use crate::time::fixed_now;
    use image::RgbImage;
    use std::path::Path;

    #[test]
    fn summary_renders_score_over_total() {
        let summary = QuizSummary::new(1, 2);
        assert_eq!(summary.to_string(), "1 / 2");
        assert_eq!(summary.incorrect(), 1);
    }

    #[test]
    fn notices_are_drained() {
        let mut state = SessionState::new(fixed_now());
        state.push_notice(NoticeLevel::Warning, "audio missing", fixed_now());
        assert_eq!(state.notices().len(), 1);
        let taken = state.take_notices();
        assert_eq!(taken[0].message, "audio missing");
        assert!(state.notices().is_empty());
    }

    #[test]
    fn reset_keeps_identity_and_clears_both_flows() {
        let mut state = SessionState::new(fixed_now());
        let id = state.id();
        state
            .quiz_mut()
            .load(vec![Frame::rgb(RgbImage::new(2, 2))], 25);
        let set = DetectionSet::filtered(
            [Detection::new("Bus Lane", 0.9)],
            &Vocabulary::builtin(Path::new("assets")),
            0.3,
        );
        let pending = state.live_mut().observe(&set, fixed_now()).unwrap();
        state
            .live_mut()
            .record_capture(pending, ArtifactRef::new("Bus_Lane.png"));

        state.reset(fixed_now());
        assert_eq!(state.id(), id);
        assert!(state.quiz().is_empty());
        assert!(state.live().captures().is_empty());
    }
}
