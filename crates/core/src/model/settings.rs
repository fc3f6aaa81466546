use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::model::detection::DEFAULT_CONFIDENCE_THRESHOLD;

const DEFAULT_MODEL_PATH: &str = "assets/visorai.json";
const DEFAULT_ASSETS_DIR: &str = "assets";
const DEFAULT_CAPTURE_DIR: &str = "screenshots";
/// Images accepted per upload batch unless configured otherwise.
pub const DEFAULT_MAX_UPLOADS: usize = 25;
/// Delay between live-capture iterations unless configured otherwise.
pub const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 100;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("{0} path cannot be empty")]
    EmptyPath(&'static str),

    #[error("confidence threshold must be in [0, 1): {0}")]
    InvalidThreshold(f32),

    #[error("max uploads must be > 0")]
    InvalidMaxUploads,

    #[error("capture interval must be > 0 ms")]
    InvalidCaptureInterval,
}

/// Validated trainer configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainerSettings {
    model_path: PathBuf,
    assets_dir: PathBuf,
    capture_dir: PathBuf,
    vocabulary_path: Option<PathBuf>,
    confidence_threshold: f32,
    max_uploads: usize,
    capture_interval: Duration,
    shuffle_uploads: bool,
}

/// Unvalidated settings as read from env vars and flags; `None` means default.
#[derive(Clone, Debug, Default)]
pub struct TrainerSettingsDraft {
    pub model_path: Option<PathBuf>,
    pub assets_dir: Option<PathBuf>,
    pub capture_dir: Option<PathBuf>,
    pub vocabulary_path: Option<PathBuf>,
    pub confidence_threshold: Option<f32>,
    pub max_uploads: Option<usize>,
    pub capture_interval_ms: Option<u64>,
    pub shuffle_uploads: Option<bool>,
}

impl TrainerSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and fill defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` for empty paths or out-of-range numbers.
    pub fn validate(self) -> Result<TrainerSettings, SettingsError> {
        let model_path = required_path(self.model_path, DEFAULT_MODEL_PATH, "model")?;
        let assets_dir = required_path(self.assets_dir, DEFAULT_ASSETS_DIR, "assets")?;
        let capture_dir = required_path(self.capture_dir, DEFAULT_CAPTURE_DIR, "capture")?;
        let vocabulary_path = self
            .vocabulary_path
            .filter(|path| !path.as_os_str().is_empty());

        let confidence_threshold = self
            .confidence_threshold
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
        if !(0.0..1.0).contains(&confidence_threshold) {
            return Err(SettingsError::InvalidThreshold(confidence_threshold));
        }

        let max_uploads = self.max_uploads.unwrap_or(DEFAULT_MAX_UPLOADS);
        if max_uploads == 0 {
            return Err(SettingsError::InvalidMaxUploads);
        }

        let interval_ms = self
            .capture_interval_ms
            .unwrap_or(DEFAULT_CAPTURE_INTERVAL_MS);
        if interval_ms == 0 {
            return Err(SettingsError::InvalidCaptureInterval);
        }

        Ok(TrainerSettings {
            model_path,
            assets_dir,
            capture_dir,
            vocabulary_path,
            confidence_threshold,
            max_uploads,
            capture_interval: Duration::from_millis(interval_ms),
            shuffle_uploads: self.shuffle_uploads.unwrap_or(false),
        })
    }
}

impl TrainerSettings {
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    #[must_use]
    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    #[must_use]
    pub fn capture_dir(&self) -> &Path {
        &self.capture_dir
    }

    #[must_use]
    pub fn vocabulary_path(&self) -> Option<&Path> {
        self.vocabulary_path.as_deref()
    }

    #[must_use]
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    #[must_use]
    pub fn max_uploads(&self) -> usize {
        self.max_uploads
    }

    #[must_use]
    pub fn capture_interval(&self) -> Duration {
        self.capture_interval
    }

    #[must_use]
    pub fn shuffle_uploads(&self) -> bool {
        self.shuffle_uploads
    }
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            capture_dir: PathBuf::from(DEFAULT_CAPTURE_DIR),
            vocabulary_path: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_uploads: DEFAULT_MAX_UPLOADS,
            capture_interval: Duration::from_millis(DEFAULT_CAPTURE_INTERVAL_MS),
            shuffle_uploads: false,
        }
    }
}

fn required_path(
    value: Option<PathBuf>,
    default: &str,
    name: &'static str,
) -> Result<PathBuf, SettingsError> {
    match value {
        Some(path) if path.as_os_str().is_empty() => Err(SettingsError::EmptyPath(name)),
        Some(path) => Ok(path),
        None => Ok(PathBuf::from(default)),
    }
}
