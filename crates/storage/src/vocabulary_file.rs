//! Optional JSON override for the class vocabulary.
//!
//! The file maps class names either to an audio cue path or to an object
//! carrying the cue and a definition:
//!
//! ```json
//! {
//!   "Bus Lane": "sounds/Bus_Lane.mp3",
//!   "Cats Eye": { "audio": "/opt/visor/Cats_Eye.mp3", "definition": "Reflective road stud." }
//! }
//! ```
//!
//! Relative cue paths are resolved against the directory holding the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use visor_core::model::{Vocabulary, VocabularyError};

use crate::repository::StorageError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VocabularyFileError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Invalid(#[from] VocabularyError),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    Cue(PathBuf),
    Detailed {
        audio: PathBuf,
        #[serde(default)]
        definition: Option<String>,
    },
}

impl Entry {
    fn into_parts(self) -> (PathBuf, Option<String>) {
        match self {
            Entry::Cue(audio) => (audio, None),
            Entry::Detailed { audio, definition } => (audio, definition),
        }
    }
}

/// Parse a vocabulary document, resolving relative paths under `base_dir`.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON and
/// `VocabularyError` for an invalid class list.
pub fn parse_vocabulary(json: &str, base_dir: &Path) -> Result<Vocabulary, VocabularyFileError> {
    let entries: BTreeMap<String, Entry> =
        serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;

    let mut cues = Vec::with_capacity(entries.len());
    let mut definitions = Vec::new();
    for (name, entry) in entries {
        let (path, definition) = entry.into_parts();
        let path = if path.is_relative() {
            base_dir.join(path)
        } else {
            path
        };
        if let Some(text) = definition {
            definitions.push((name.clone(), text));
        }
        cues.push((name, path));
    }
    Ok(Vocabulary::new(cues)?.with_definitions(definitions)?)
}

/// Load a vocabulary file from disk.
///
/// # Errors
///
/// Returns `VocabularyFileError` if the file cannot be read or parsed.
pub async fn load_vocabulary(path: &Path) -> Result<Vocabulary, VocabularyFileError> {
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.display().to_string())
        } else {
            StorageError::Io(format!("{}: {e}", path.display()))
        }
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let vocabulary = parse_vocabulary(&json, base_dir)?;
    tracing::info!(path = %path.display(), classes = vocabulary.len(), "vocabulary loaded");
    Ok(vocabulary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use visor_core::model::DEFINITION_UNAVAILABLE;

    #[test]
    fn resolves_relative_paths_against_base() {
        let vocab = parse_vocabulary(
            r#"{ "Bus Lane": "sounds/bus.mp3", "Cats Eye": "/abs/cats.mp3" }"#,
            Path::new("/etc/visor"),
        )
        .unwrap();
        assert_eq!(
            vocab.audio_path("Bus Lane"),
            Some(Path::new("/etc/visor/sounds/bus.mp3"))
        );
        assert_eq!(vocab.audio_path("Cats Eye"), Some(Path::new("/abs/cats.mp3")));
    }

    #[test]
    fn detailed_entries_carry_definitions() {
        let vocab = parse_vocabulary(
            r#"{
                "Bus Lane": "bus.mp3",
                "Cats Eye": { "audio": "cats.mp3", "definition": "Reflective road stud." },
                "Speed Limit": { "audio": "speed.mp3" }
            }"#,
            Path::new("/etc/visor"),
        )
        .unwrap();
        assert_eq!(vocab.definition("Cats Eye"), "Reflective road stud.");
        assert_eq!(vocab.definition("Bus Lane"), DEFINITION_UNAVAILABLE);
        assert_eq!(
            vocab.audio_path("Speed Limit"),
            Some(Path::new("/etc/visor/speed.mp3"))
        );
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let err = parse_vocabulary("[1, 2]", Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            VocabularyFileError::Storage(StorageError::Serialization(_))
        ));

        let err = parse_vocabulary("{}", Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            VocabularyFileError::Invalid(VocabularyError::Empty)
        ));
    }
}
