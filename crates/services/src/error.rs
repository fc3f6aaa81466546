//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use storage::repository::StorageError;
use storage::vocabulary_file::VocabularyFileError;
use visor_core::model::QuizError;

/// Errors emitted by detectors and the `DetectionAdapter`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DetectionError {
    #[error("detection model not found at {}", path.display())]
    ModelUnavailable { path: PathBuf },
    #[error("detection model at {} is invalid: {reason}", path.display())]
    InvalidModel { path: PathBuf, reason: String },
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Errors emitted while playing an audio cue.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotificationError {
    #[error("audio cue for {class_name} could not be read: {source}")]
    Unreadable {
        class_name: String,
        #[source]
        source: StorageError,
    },
    #[error("audio cue for {class_name} could not be played: {reason}")]
    Playback { class_name: String, reason: String },
}

/// Errors emitted by frame sources.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CameraError {
    #[error("camera closed")]
    Closed,
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("frame acquisition failed: {0}")]
    Acquisition(String),
}

/// Errors emitted by `QuizController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
}

/// Errors emitted by the live capture loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LiveCaptureError {
    #[error("live capture task failed: {0}")]
    Task(String),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Vocabulary(#[from] VocabularyFileError),
}
