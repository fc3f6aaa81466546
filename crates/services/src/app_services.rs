use std::sync::Arc;

use storage::repository::Storage;
use storage::vocabulary_file::load_vocabulary;
use visor_core::model::{SessionState, TrainerSettings, Vocabulary};

use crate::Clock;
use crate::detection::{DetectionAdapter, Detector, ManifestDetector};
use crate::error::AppServicesError;
use crate::live::LiveCaptureController;
use crate::notification::{AudioCueSink, CuePlayer, NotificationSink};
use crate::quiz::QuizController;

/// Assembles the quiz and live controllers around one detector and vocabulary.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    vocabulary: Arc<Vocabulary>,
    quiz: Arc<QuizController>,
    live: Arc<LiveCaptureController>,
}

impl AppServices {
    /// Build services from validated settings: vocabulary, detection model and
    /// on-disk capture storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Detection` if the model artifact is missing or
    /// invalid, and `AppServicesError::Vocabulary` if a configured vocabulary
    /// file cannot be loaded.
    pub async fn from_settings(
        settings: &TrainerSettings,
        clock: Clock,
        player: Arc<dyn CuePlayer>,
    ) -> Result<Self, AppServicesError> {
        let vocabulary = match settings.vocabulary_path() {
            Some(path) => load_vocabulary(path).await?,
            None => Vocabulary::builtin(settings.assets_dir()),
        };
        let detector = ManifestDetector::load(settings.model_path()).await?;
        let storage = Storage::filesystem(settings.capture_dir());

        Ok(Self::assemble(
            settings,
            clock,
            Arc::new(vocabulary),
            Arc::new(detector),
            &storage,
            player,
        ))
    }

    /// Wire services around an already constructed detector and storage.
    #[must_use]
    pub fn assemble(
        settings: &TrainerSettings,
        clock: Clock,
        vocabulary: Arc<Vocabulary>,
        detector: Arc<dyn Detector>,
        storage: &Storage,
        player: Arc<dyn CuePlayer>,
    ) -> Self {
        let adapter = Arc::new(DetectionAdapter::new(
            detector,
            Arc::clone(&vocabulary),
            settings.confidence_threshold(),
        ));
        let sink: Arc<dyn NotificationSink> = Arc::new(AudioCueSink::new(
            Arc::clone(&vocabulary),
            Arc::clone(&storage.audio),
            player,
        ));

        let quiz = Arc::new(
            QuizController::new(clock, Arc::clone(&adapter), Arc::clone(&sink))
                .with_max_uploads(settings.max_uploads())
                .with_shuffle_uploads(settings.shuffle_uploads()),
        );
        let live = Arc::new(
            LiveCaptureController::new(clock, adapter, sink, Arc::clone(&storage.captures))
                .with_interval(settings.capture_interval()),
        );

        Self {
            clock,
            vocabulary,
            quiz,
            live,
        }
    }

    /// Fresh, independent session state.
    #[must_use]
    pub fn new_session(&self) -> SessionState {
        SessionState::new(self.clock.now())
    }

    #[must_use]
    pub fn vocabulary(&self) -> Arc<Vocabulary> {
        Arc::clone(&self.vocabulary)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizController> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn live(&self) -> Arc<LiveCaptureController> {
        Arc::clone(&self.live)
    }
}
