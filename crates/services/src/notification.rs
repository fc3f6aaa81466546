//! Audio cues for newly detected classes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storage::repository::AudioLibrary;
use visor_core::model::{NoticeLevel, SessionState, Vocabulary};

use crate::error::NotificationError;

/// What a notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueOutcome {
    /// Cue handed to the player.
    Played { class_name: String, bytes: usize },
    /// The class has no cue; nothing to do.
    NoCue,
}

/// Announces a newly detected class to the user.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `NotificationError` if the cue exists but cannot be delivered.
    async fn notify(&self, class_name: &str) -> Result<CueOutcome, NotificationError>;
}

/// Plays decoded audio bytes. Must return without waiting for playback to end.
pub trait CuePlayer: Send + Sync {
    /// # Errors
    ///
    /// Returns `NotificationError::Playback` if playback cannot start.
    fn play(&self, class_name: &str, audio: Vec<u8>) -> Result<(), NotificationError>;
}

/// Player for headless runs and builds without the `audio` feature: records
/// the cue in the log and moves on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCuePlayer;

impl CuePlayer for LogCuePlayer {
    fn play(&self, class_name: &str, audio: Vec<u8>) -> Result<(), NotificationError> {
        tracing::info!(class_name, bytes = audio.len(), "audio cue");
        Ok(())
    }
}

/// Looks up the class cue in the vocabulary, loads it and hands it to a player.
#[derive(Clone)]
pub struct AudioCueSink {
    vocabulary: Arc<Vocabulary>,
    audio: Arc<dyn AudioLibrary>,
    player: Arc<dyn CuePlayer>,
}

impl AudioCueSink {
    #[must_use]
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        audio: Arc<dyn AudioLibrary>,
        player: Arc<dyn CuePlayer>,
    ) -> Self {
        Self {
            vocabulary,
            audio,
            player,
        }
    }
}

#[async_trait]
impl NotificationSink for AudioCueSink {
    async fn notify(&self, class_name: &str) -> Result<CueOutcome, NotificationError> {
        let Some(path) = self.vocabulary.audio_path(class_name) else {
            return Ok(CueOutcome::NoCue);
        };
        let audio = self
            .audio
            .load_cue(path)
            .await
            .map_err(|source| NotificationError::Unreadable {
                class_name: class_name.to_string(),
                source,
            })?;
        let bytes = audio.len();
        self.player.play(class_name, audio)?;
        Ok(CueOutcome::Played {
            class_name: class_name.to_string(),
            bytes,
        })
    }
}

/// Notify `class_name`, turning a failure into a warning on the session.
pub(crate) async fn announce(
    sink: &dyn NotificationSink,
    state: &mut SessionState,
    class_name: &str,
    at: DateTime<Utc>,
) {
    if let Err(err) = sink.notify(class_name).await {
        tracing::warn!(session = %state.id(), class_name, error = %err, "audio cue failed");
        state.push_notice(NoticeLevel::Warning, err.to_string(), at);
    }
}
