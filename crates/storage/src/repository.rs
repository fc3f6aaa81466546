use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::RgbImage;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use visor_core::model::ArtifactRef;

use crate::disk::{FsAudioLibrary, FsCaptureStore, capture_file_name};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("image encoding error: {0}")]
    Encode(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("connection error: {0}")]
    Connection(String),
}

/// Persistence for live-capture screenshots.
#[async_trait]
pub trait CaptureStore: Send + Sync {
    /// Persist a screenshot of `class_name` taken at `captured_at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the image cannot be encoded or written.
    async fn save_capture(
        &self,
        image: &RgbImage,
        class_name: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<ArtifactRef, StorageError>;

    /// List stored captures, oldest name first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn list_captures(&self) -> Result<Vec<ArtifactRef>, StorageError>;
}

/// Read access to audio cue artifacts.
#[async_trait]
pub trait AudioLibrary: Send + Sync {
    /// Load the raw bytes of an audio cue.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn load_cue(&self, path: &Path) -> Result<Vec<u8>, StorageError>;
}

/// Simple in-memory implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    captures: Arc<Mutex<BTreeMap<ArtifactRef, (String, RgbImage)>>>,
    cues: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an audio cue under `path`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_cue(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<(), StorageError> {
        let mut guard = self
            .cues
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(path.into(), bytes);
        Ok(())
    }

    /// Class name and image stored for a capture.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the reference is unknown.
    pub fn get_capture(&self, artifact: &ArtifactRef) -> Result<(String, RgbImage), StorageError> {
        let guard = self
            .captures
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(artifact)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(artifact.to_string()))
    }
}

#[async_trait]
impl CaptureStore for InMemoryRepository {
    async fn save_capture(
        &self,
        image: &RgbImage,
        class_name: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<ArtifactRef, StorageError> {
        let artifact = ArtifactRef::new(capture_file_name(class_name, captured_at));
        let mut guard = self
            .captures
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(artifact.clone(), (class_name.to_string(), image.clone()));
        Ok(artifact)
    }

    async fn list_captures(&self) -> Result<Vec<ArtifactRef>, StorageError> {
        let guard = self
            .captures
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.keys().cloned().collect())
    }
}

#[async_trait]
impl AudioLibrary for InMemoryRepository {
    async fn load_cue(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        let guard = self
            .cues
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.display().to_string()))
    }
}

/// Aggregates capture and audio backends behind trait objects for easy swapping.
#[derive(Clone)]
pub struct Storage {
    pub captures: Arc<dyn CaptureStore>,
    pub audio: Arc<dyn AudioLibrary>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_repository(repo: InMemoryRepository) -> Self {
        let captures: Arc<dyn CaptureStore> = Arc::new(repo.clone());
        let audio: Arc<dyn AudioLibrary> = Arc::new(repo);
        Self { captures, audio }
    }

    /// Screenshots under `capture_dir`, audio cues read from disk.
    #[must_use]
    pub fn filesystem(capture_dir: impl Into<PathBuf>) -> Self {
        let captures: Arc<dyn CaptureStore> = Arc::new(FsCaptureStore::new(capture_dir));
        let audio: Arc<dyn AudioLibrary> = Arc::new(FsAudioLibrary);
        Self { captures, audio }
    }
}
