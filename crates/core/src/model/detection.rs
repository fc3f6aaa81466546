use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::vocabulary::Vocabulary;

/// Label shown when an image yields no known class.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Detections at or below this confidence are discarded.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Set of distinct class names, used as the "previously seen" reference.
pub type ClassSet = BTreeSet<String>;

/// Pixel-space box reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One class/confidence pair produced by an inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f32,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    #[must_use]
    pub fn new(class_name: impl Into<String>, confidence: f32) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox: None,
        }
    }

    #[must_use]
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// Distinct known classes found in one image or frame.
///
/// Holds the highest-confidence detection for each class that passed the
/// confidence threshold and belongs to the vocabulary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
    best: BTreeMap<String, Detection>,
}

impl DetectionSet {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keep detections strictly above `threshold` whose class is in `vocabulary`.
    pub fn filtered<I>(detections: I, vocabulary: &Vocabulary, threshold: f32) -> Self
    where
        I: IntoIterator<Item = Detection>,
    {
        let mut best: BTreeMap<String, Detection> = BTreeMap::new();
        for detection in detections {
            let confident = detection.confidence > threshold;
            if !confident || !vocabulary.contains(&detection.class_name) {
                continue;
            }
            match best.get(&detection.class_name) {
                Some(kept) if kept.confidence >= detection.confidence => {}
                _ => {
                    best.insert(detection.class_name.clone(), detection);
                }
            }
        }
        Self { best }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.best.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.best.contains_key(class_name)
    }

    #[must_use]
    pub fn confidence(&self, class_name: &str) -> Option<f32> {
        self.best.get(class_name).map(|d| d.confidence)
    }

    /// Retained detections in class-name order.
    pub fn detections(&self) -> impl Iterator<Item = &Detection> {
        self.best.values()
    }

    #[must_use]
    pub fn class_names(&self) -> ClassSet {
        self.best.keys().cloned().collect()
    }

    /// Classes present here but absent from `previous`.
    #[must_use]
    pub fn new_since(&self, previous: &ClassSet) -> DetectionSet {
        let best = self
            .best
            .iter()
            .filter(|(name, _)| !previous.contains(*name))
            .map(|(name, detection)| (name.clone(), detection.clone()))
            .collect();
        Self { best }
    }

    /// The class used when a single label is needed: highest confidence,
    /// ties broken by ascending class name.
    #[must_use]
    pub fn primary(&self) -> Option<&Detection> {
        self.best.values().fold(None, |chosen, candidate| match chosen {
            Some(current) if current.confidence >= candidate.confidence => Some(current),
            _ => Some(candidate),
        })
    }

    /// Primary class name, or [`UNKNOWN_LABEL`] for an empty set.
    #[must_use]
    pub fn label(&self) -> &str {
        self.primary()
            .map_or(UNKNOWN_LABEL, |d| d.class_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn vocab() -> Vocabulary {
        Vocabulary::builtin(Path::new("assets"))
    }

    fn classes(names: &[&str]) -> ClassSet {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn threshold_is_strict() {
        let set = DetectionSet::filtered(
            [Detection::new("Bus Lane", 0.3), Detection::new("Cats Eye", 0.31)],
            &vocab(),
            DEFAULT_CONFIDENCE_THRESHOLD,
        );
        assert!(!set.contains("Bus Lane"));
        assert!(set.contains("Cats Eye"));
    }

    #[test]
    fn unknown_classes_are_dropped_regardless_of_confidence() {
        let set = DetectionSet::filtered(
            [Detection::new("Stop Sign", 0.99), Detection::new("Single Solid Lane", 1.0)],
            &vocab(),
            DEFAULT_CONFIDENCE_THRESHOLD,
        );
        assert!(set.is_empty());
        assert_eq!(set.label(), UNKNOWN_LABEL);
    }

    #[test]
    fn nan_confidence_is_dropped() {
        let set = DetectionSet::filtered(
            [Detection::new("Bus Lane", f32::NAN)],
            &vocab(),
            DEFAULT_CONFIDENCE_THRESHOLD,
        );
        assert!(set.is_empty());
    }

    #[test]
    fn deduplicates_by_class_keeping_best() {
        let set = DetectionSet::filtered(
            [
                Detection::new("Bus Lane", 0.5),
                Detection::new("Bus Lane", 0.8),
                Detection::new("Bus Lane", 0.6),
            ],
            &vocab(),
            DEFAULT_CONFIDENCE_THRESHOLD,
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.confidence("Bus Lane"), Some(0.8));
    }

    #[test]
    fn delta_contains_only_unseen_classes() {
        let set = DetectionSet::filtered(
            [Detection::new("Bus Lane", 0.9), Detection::new("Cats Eye", 0.7)],
            &vocab(),
            DEFAULT_CONFIDENCE_THRESHOLD,
        );
        let fresh = set.new_since(&classes(&["Bus Lane"]));
        assert_eq!(fresh.class_names(), classes(&["Cats Eye"]));
    }

    #[test]
    fn primary_prefers_confidence_then_name() {
        let set = DetectionSet::filtered(
            [
                Detection::new("Speed Limit", 0.6),
                Detection::new("Parking Bay", 0.9),
                Detection::new("Bus Lane", 0.6),
            ],
            &vocab(),
            DEFAULT_CONFIDENCE_THRESHOLD,
        );
        assert_eq!(set.label(), "Parking Bay");

        let tied = DetectionSet::filtered(
            [Detection::new("Speed Limit", 0.6), Detection::new("Bus Lane", 0.6)],
            &vocab(),
            DEFAULT_CONFIDENCE_THRESHOLD,
        );
        assert_eq!(tied.label(), "Bus Lane");
    }
}
