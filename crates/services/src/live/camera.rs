use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use visor_core::model::Frame;

use crate::error::CameraError;

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A camera or anything that hands out frames in order.
///
/// The source is owned by the live loop and released by dropping it.
#[async_trait]
pub trait FrameSource: Send {
    /// Acquire the next frame.
    ///
    /// # Errors
    ///
    /// Returns `CameraError::Closed` when the source is exhausted and other
    /// variants when acquisition fails.
    async fn next_frame(&mut self) -> Result<Frame, CameraError>;
}

/// Plays back the images in a directory, sorted by file name.
#[derive(Debug)]
pub struct DirectoryCamera {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
}

impl DirectoryCamera {
    /// Open a directory of png/jpg/jpeg frames.
    ///
    /// # Errors
    ///
    /// Returns `CameraError::Unavailable` if the directory cannot be read or
    /// holds no frames.
    pub async fn open(dir: &Path) -> Result<Self, CameraError> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| CameraError::Unavailable(format!("{}: {e}", dir.display())))?;

        let mut pending = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CameraError::Unavailable(format!("{}: {e}", dir.display())))?
        {
            let path = entry.path();
            if is_frame_file(&path) {
                pending.push(path);
            }
        }
        if pending.is_empty() {
            return Err(CameraError::Unavailable(format!(
                "{}: no png/jpg frames",
                dir.display()
            )));
        }
        pending.sort();

        tracing::info!(dir = %dir.display(), frames = pending.len(), "camera opened");
        Ok(Self {
            dir: dir.to_path_buf(),
            pending: pending.into(),
        })
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[async_trait]
impl FrameSource for DirectoryCamera {
    async fn next_frame(&mut self) -> Result<Frame, CameraError> {
        let Some(path) = self.pending.pop_front() else {
            return Err(CameraError::Closed);
        };
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CameraError::Acquisition(format!("{}: {e}", path.display())))?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| CameraError::Acquisition(format!("{}: {e}", path.display())))?;

        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Frame::from_dynamic(decoded).with_source(source))
    }
}

impl Drop for DirectoryCamera {
    fn drop(&mut self) {
        tracing::debug!(dir = %self.dir.display(), unread = self.pending.len(), "camera released");
    }
}
