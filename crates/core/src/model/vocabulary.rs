use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VocabularyError {
    #[error("vocabulary must contain at least one class")]
    Empty,

    #[error("class name cannot be empty")]
    EmptyClassName,

    #[error("duplicate class name: {0}")]
    Duplicate(String),

    #[error("audio path for {0} cannot be empty")]
    EmptyAudioPath(String),

    #[error("definition given for unknown class: {0}")]
    UnknownDefinition(String),
}

//
// ─── BUILT-IN CLASSES ──────────────────────────────────────────────────────────
//

/// Road-marking classes the bundled model is trained on.
pub const DEFAULT_CLASSES: [&str; 19] = [
    "Bicycle Lane",
    "Broken and Solid Yellow Lines",
    "Bus Lane",
    "Cats Eye",
    "Continuity Lane",
    "Double Solid Yellow or White Line",
    "Holding Lane",
    "Loading and Unloading Zone",
    "Motorcycle Lane",
    "No Loading and Unloading Curb",
    "No Parking Curb",
    "Parking Bay",
    "Pavement Arrow",
    "Pedestrian Lane",
    "Railroad Crossing",
    "Rumble Strips",
    "Single Solid Line",
    "Speed Limit",
    "Transition Line",
];

/// Bundled explanations shown next to live captures.
pub const DEFAULT_DEFINITIONS: [(&str, &str); 3] = [
    (
        "Bicycle Lane",
        "A designated lane on the road for bicycle riders only.",
    ),
    (
        "Broken and Solid Yellow Lines",
        "Indicates passing rules depending on your side.",
    ),
    ("Bus Lane", "Lane reserved for buses."),
];

/// Shown for classes without a definition.
pub const DEFINITION_UNAVAILABLE: &str = "Definition not available.";

/// File name of the bundled audio cue for a class (`Bus Lane` -> `Bus_Lane.mp3`).
#[must_use]
pub fn audio_file_name(class_name: &str) -> String {
    format!("{}.mp3", class_name.trim().replace(' ', "_"))
}

//
// ─── VOCABULARY ────────────────────────────────────────────────────────────────
//

/// Known road-marking classes with the audio cue and optional definition
/// attached to each.
///
/// This is the only list of valid class names: detections are filtered against it,
/// the quiz dictionary is rendered from it and notifications resolve cues through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    cues: BTreeMap<String, PathBuf>,
    definitions: BTreeMap<String, String>,
}

impl Vocabulary {
    /// Build a vocabulary from `(class name, audio path)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError` for empty input, blank names or paths, and names
    /// that collide case-insensitively.
    pub fn new<I, N, P>(entries: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<PathBuf>,
    {
        let mut cues = BTreeMap::new();
        for (name, path) in entries {
            let name = name.into().trim().to_string();
            if name.is_empty() {
                return Err(VocabularyError::EmptyClassName);
            }
            let path = path.into();
            if path.as_os_str().is_empty() {
                return Err(VocabularyError::EmptyAudioPath(name));
            }
            let lowered = name.to_lowercase();
            if cues.keys().any(|known: &String| known.to_lowercase() == lowered) {
                return Err(VocabularyError::Duplicate(name));
            }
            cues.insert(name, path);
        }

        if cues.is_empty() {
            return Err(VocabularyError::Empty);
        }
        Ok(Self {
            cues,
            definitions: BTreeMap::new(),
        })
    }

    /// The bundled vocabulary with cues resolved under `assets_dir`.
    #[must_use]
    pub fn builtin(assets_dir: &Path) -> Self {
        let cues = DEFAULT_CLASSES
            .iter()
            .map(|name| ((*name).to_string(), assets_dir.join(audio_file_name(name))))
            .collect();
        let definitions = DEFAULT_DEFINITIONS
            .iter()
            .map(|(name, text)| ((*name).to_string(), (*text).to_string()))
            .collect();
        Self { cues, definitions }
    }

    /// Attach definitions to known classes, replacing earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError::UnknownDefinition` if a name is not a class.
    /// Blank texts are skipped.
    pub fn with_definitions<I, N, T>(mut self, definitions: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        for (name, text) in definitions {
            let name = name.into().trim().to_string();
            if !self.cues.contains_key(&name) {
                return Err(VocabularyError::UnknownDefinition(name));
            }
            let text = text.into().trim().to_string();
            if !text.is_empty() {
                self.definitions.insert(name, text);
            }
        }
        Ok(self)
    }

    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.cues.contains_key(class_name)
    }

    /// Audio cue registered for a class, if any.
    #[must_use]
    pub fn audio_path(&self, class_name: &str) -> Option<&Path> {
        self.cues.get(class_name).map(PathBuf::as_path)
    }

    /// Definition for a class, or [`DEFINITION_UNAVAILABLE`].
    #[must_use]
    pub fn definition(&self, class_name: &str) -> &str {
        self.definitions
            .get(class_name)
            .map_or(DEFINITION_UNAVAILABLE, String::as_str)
    }

    /// Class names in dictionary (alphabetical) order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cues.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_class_with_a_cue() {
        let vocab = Vocabulary::builtin(Path::new("assets"));
        assert_eq!(vocab.len(), DEFAULT_CLASSES.len());
        assert_eq!(
            vocab.audio_path("Bus Lane"),
            Some(Path::new("assets/Bus_Lane.mp3"))
        );
        assert!(vocab.contains("Single Solid Line"));
        assert!(!vocab.contains("Single Solid Lane"));
    }

    #[test]
    fn names_are_sorted() {
        let vocab = Vocabulary::builtin(Path::new("assets"));
        let names: Vec<_> = vocab.names().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn rejects_case_insensitive_duplicates() {
        let err = Vocabulary::new([("Bus Lane", "a.mp3"), ("bus lane", "b.mp3")]).unwrap_err();
        assert_eq!(err, VocabularyError::Duplicate("bus lane".into()));
    }

    #[test]
    fn rejects_empty_and_blank_entries() {
        let none: [(&str, &str); 0] = [];
        assert_eq!(Vocabulary::new(none).unwrap_err(), VocabularyError::Empty);
        assert_eq!(
            Vocabulary::new([("  ", "a.mp3")]).unwrap_err(),
            VocabularyError::EmptyClassName
        );
        assert_eq!(
            Vocabulary::new([("Cats Eye", "")]).unwrap_err(),
            VocabularyError::EmptyAudioPath("Cats Eye".into())
        );
    }

    #[test]
    fn definitions_fall_back_when_missing() {
        let vocab = Vocabulary::builtin(Path::new("assets"));
        assert_eq!(vocab.definition("Bus Lane"), "Lane reserved for buses.");
        assert_eq!(vocab.definition("Cats Eye"), DEFINITION_UNAVAILABLE);
        assert_eq!(vocab.definition("Zebra Crossing"), DEFINITION_UNAVAILABLE);
    }

    #[test]
    fn definitions_must_name_a_class() {
        let vocab = Vocabulary::new([("Cats Eye", "cats.mp3")])
            .unwrap()
            .with_definitions([("Cats Eye", " Reflective road stud. ")])
            .unwrap();
        assert_eq!(vocab.definition("Cats Eye"), "Reflective road stud.");

        let err = vocab.with_definitions([("Bus Lane", "x")]).unwrap_err();
        assert_eq!(err, VocabularyError::UnknownDefinition("Bus Lane".into()));
    }

    #[test]
    fn trims_class_names() {
        let vocab = Vocabulary::new([("  Cats Eye ", "cats.mp3")]).unwrap();
        assert!(vocab.contains("Cats Eye"));
    }
}
