use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbImage};
use visor_core::model::ArtifactRef;
use visor_core::time::capture_stamp;

use crate::repository::{AudioLibrary, CaptureStore, StorageError};

const CAPTURE_EXTENSION: &str = "png";

/// `{label}_{timestamp}.png`, with the label reduced to file-name-safe characters.
#[must_use]
pub fn capture_file_name(class_name: &str, captured_at: DateTime<Utc>) -> String {
    let label: String = class_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "{label}_{}.{CAPTURE_EXTENSION}",
        capture_stamp(captured_at)
    )
}

fn io_error(path: &Path, err: &std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(path.display().to_string())
    } else {
        StorageError::Io(format!("{}: {err}", path.display()))
    }
}

/// Writes screenshots as PNG files into one directory, created on first use.
#[derive(Debug, Clone)]
pub struct FsCaptureStore {
    dir: PathBuf,
}

impl FsCaptureStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CaptureStore for FsCaptureStore {
    async fn save_capture(
        &self,
        image: &RgbImage,
        class_name: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<ArtifactRef, StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, &e))?;

        let mut encoded = Cursor::new(Vec::new());
        image
            .write_to(&mut encoded, ImageFormat::Png)
            .map_err(|e| StorageError::Encode(e.to_string()))?;

        let path = self.dir.join(capture_file_name(class_name, captured_at));
        tokio::fs::write(&path, encoded.into_inner())
            .await
            .map_err(|e| io_error(&path, &e))?;

        tracing::debug!(path = %path.display(), class_name, "capture written");
        Ok(ArtifactRef::new(path.display().to_string()))
    }

    async fn list_captures(&self) -> Result<Vec<ArtifactRef>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.dir, &e)),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.dir, &e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(CAPTURE_EXTENSION) {
                found.push(path);
            }
        }
        found.sort();
        Ok(found
            .into_iter()
            .map(|path| ArtifactRef::new(path.display().to_string()))
            .collect())
    }
}

/// Reads audio cues straight from their vocabulary paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAudioLibrary;

#[async_trait]
impl AudioLibrary for FsAudioLibrary {
    async fn load_cue(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(path).await.map_err(|e| io_error(path, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visor_core::time::fixed_now;

    #[test]
    fn file_name_encodes_label_and_timestamp() {
        assert_eq!(
            capture_file_name("Broken and Solid Yellow Lines", fixed_now()),
            "Broken_and_Solid_Yellow_Lines_20231114_221320_000.png"
        );
        assert_eq!(
            capture_file_name("../etc/passwd", fixed_now()),
            "___etc_passwd_20231114_221320_000.png"
        );
    }
}
