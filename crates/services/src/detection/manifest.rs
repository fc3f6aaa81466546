use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::{Detector, RawDetection};
use crate::error::DetectionError;

/// Recorded model output: the class table plus detections per frame source.
///
/// ```json
/// {
///   "classes": ["Bicycle Lane", "Bus Lane"],
///   "detections": {
///     "road_01.png": [{ "class_id": 1, "confidence": 0.91 }]
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionManifest {
    pub classes: Vec<String>,
    #[serde(default)]
    pub detections: HashMap<String, Vec<RawDetection>>,
}

/// Replays recorded detections keyed by frame source.
///
/// Frames without a source, or with one the manifest does not list, yield no
/// detections.
#[derive(Debug, Clone)]
pub struct ManifestDetector {
    manifest: DetectionManifest,
}

impl ManifestDetector {
    #[must_use]
    pub fn new(manifest: DetectionManifest) -> Self {
        Self { manifest }
    }

    /// Load a manifest from disk.
    ///
    /// # Errors
    ///
    /// Returns `DetectionError::ModelUnavailable` if the file does not exist and
    /// `DetectionError::InvalidModel` if it cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, DetectionError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DetectionError::ModelUnavailable {
                    path: path.to_path_buf(),
                }
            } else {
                invalid(path, e.to_string())
            }
        })?;
        let manifest: DetectionManifest =
            serde_json::from_str(&json).map_err(|e| invalid(path, e.to_string()))?;
        if manifest.classes.is_empty() {
            return Err(invalid(path, "class table is empty".to_string()));
        }

        tracing::info!(
            path = %path.display(),
            classes = manifest.classes.len(),
            sources = manifest.detections.len(),
            "detection model loaded"
        );
        Ok(Self::new(manifest))
    }

    #[must_use]
    pub fn manifest(&self) -> &DetectionManifest {
        &self.manifest
    }
}

fn invalid(path: &Path, reason: String) -> DetectionError {
    DetectionError::InvalidModel {
        path: PathBuf::from(path),
        reason,
    }
}

impl Detector for ManifestDetector {
    fn class_names(&self) -> &[String] {
        &self.manifest.classes
    }

    fn infer(
        &self,
        _image: &RgbImage,
        source: Option<&str>,
    ) -> Result<Vec<RawDetection>, DetectionError> {
        Ok(source
            .and_then(|key| self.manifest.detections.get(key))
            .cloned()
            .unwrap_or_default())
    }
}
