use chrono::{DateTime, Utc};

use crate::model::detection::{ClassSet, Detection, DetectionSet};
use crate::model::ids::ArtifactRef;

/// A persisted screenshot of a newly detected class.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub artifact: ArtifactRef,
    pub class_name: String,
    pub captured_at: DateTime<Utc>,
}

/// A newly appeared class waiting for its screenshot to be persisted.
///
/// Only [`LiveSession::observe`] hands these out, so every capture in the
/// session traces back to a frame where its class was new.
#[derive(Debug)]
#[must_use]
pub struct PendingCapture {
    detection: Detection,
    detected_at: DateTime<Utc>,
}

impl PendingCapture {
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.detection.class_name
    }

    #[must_use]
    pub fn detection(&self) -> &Detection {
        &self.detection
    }

    #[must_use]
    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }
}

/// State of the continuous camera flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSession {
    last_detected_classes: ClassSet,
    last_detected_label: Option<String>,
    last_detection_time: Option<DateTime<Utc>>,
    captures: Vec<Capture>,
    frames_processed: u64,
}

impl LiveSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_detected_classes(&self) -> &ClassSet {
        &self.last_detected_classes
    }

    #[must_use]
    pub fn last_detected_label(&self) -> Option<&str> {
        self.last_detected_label.as_deref()
    }

    #[must_use]
    pub fn last_detection_time(&self) -> Option<DateTime<Utc>> {
        self.last_detection_time
    }

    #[must_use]
    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    #[must_use]
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Fold one frame's detections into the session.
    ///
    /// The reference set is always overwritten with `detections`, so a class
    /// that disappears for one frame counts as new when it comes back. When at
    /// least one class is new, its primary member is returned for capture.
    pub fn observe(
        &mut self,
        detections: &DetectionSet,
        at: DateTime<Utc>,
    ) -> Option<PendingCapture> {
        let fresh = detections.new_since(&self.last_detected_classes);
        self.last_detected_classes = detections.class_names();
        self.frames_processed = self.frames_processed.saturating_add(1);

        let chosen = fresh.primary()?.clone();
        self.last_detected_label = Some(chosen.class_name.clone());
        self.last_detection_time = Some(at);
        Some(PendingCapture {
            detection: chosen,
            detected_at: at,
        })
    }

    /// Attach the persisted artifact for a pending capture.
    pub fn record_capture(&mut self, pending: PendingCapture, artifact: ArtifactRef) -> &Capture {
        self.captures.push(Capture {
            artifact,
            class_name: pending.detection.class_name,
            captured_at: pending.detected_at,
        });
        let last = self.captures.len() - 1;
        &self.captures[last]
    }

    /// Forget captures and detection history.
    pub fn clear(&mut self) {
        self.last_detected_classes.clear();
        self.last_detected_label = None;
        self.last_detection_time = None;
        self.captures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::detection::DEFAULT_CONFIDENCE_THRESHOLD;
    use crate::model::vocabulary::Vocabulary;
    use crate::time::fixed_now;
    use chrono::Duration;
    use std::path::Path;

    fn detected(names: &[&str]) -> DetectionSet {
        DetectionSet::filtered(
            names.iter().map(|n| Detection::new(*n, 0.9)),
            &Vocabulary::builtin(Path::new("assets")),
            DEFAULT_CONFIDENCE_THRESHOLD,
        )
    }

    fn step(live: &mut LiveSession, names: &[&str], t: i64) -> Option<String> {
        let at = fixed_now() + Duration::seconds(t);
        let pending = live.observe(&detected(names), at)?;
        let name = pending.class_name().to_string();
        live.record_capture(pending, ArtifactRef::new(format!("{name}_{t}.png")));
        Some(name)
    }

    #[test]
    fn disappearance_then_reappearance_is_captured_again() {
        let mut live = LiveSession::new();
        assert_eq!(step(&mut live, &["Cats Eye"], 0).as_deref(), Some("Cats Eye"));
        assert_eq!(step(&mut live, &["Cats Eye"], 1), None);
        assert_eq!(step(&mut live, &[], 2), None);
        assert_eq!(step(&mut live, &["Cats Eye"], 3).as_deref(), Some("Cats Eye"));

        assert_eq!(live.captures().len(), 2);
        assert_eq!(live.frames_processed(), 4);
        assert_eq!(
            live.last_detection_time(),
            Some(fixed_now() + Duration::seconds(3))
        );
    }

    #[test]
    fn only_new_members_are_candidates() {
        let mut live = LiveSession::new();
        step(&mut live, &["Bus Lane"], 0);
        let pending = live
            .observe(&detected(&["Bus Lane", "Speed Limit"]), fixed_now())
            .unwrap();
        assert_eq!(pending.class_name(), "Speed Limit");
        assert_eq!(live.last_detected_label(), Some("Speed Limit"));
    }

    #[test]
    fn clear_wipes_history() {
        let mut live = LiveSession::new();
        step(&mut live, &["Bus Lane"], 0);
        live.clear();
        assert!(live.captures().is_empty());
        assert!(live.last_detected_classes().is_empty());
        assert_eq!(live.last_detected_label(), None);
        assert_eq!(step(&mut live, &["Bus Lane"], 1).as_deref(), Some("Bus Lane"));
    }
}
