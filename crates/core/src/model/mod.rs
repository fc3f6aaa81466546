mod detection;
mod frame;
mod ids;
mod live;
mod quiz;
mod session;
mod settings;
mod vocabulary;

pub use detection::{
    BoundingBox, ClassSet, DEFAULT_CONFIDENCE_THRESHOLD, Detection, DetectionSet, UNKNOWN_LABEL,
};
pub use frame::{ChannelOrder, Frame};
pub use ids::{ArtifactRef, ParseIdError, SessionId};
pub use live::{Capture, LiveSession, PendingCapture};
pub use quiz::{
    AdvanceOutcome, AnswerResult, QuizError, QuizItem, QuizPhase, QuizProgress, QuizSession,
    UploadOutcome, answers_match,
};
pub use session::{Notice, NoticeLevel, QuizSummary, SessionState};
pub use settings::{
    DEFAULT_CAPTURE_INTERVAL_MS, DEFAULT_MAX_UPLOADS, SettingsError, TrainerSettings,
    TrainerSettingsDraft,
};
pub use vocabulary::{
    DEFAULT_CLASSES, DEFAULT_DEFINITIONS, DEFINITION_UNAVAILABLE, Vocabulary, VocabularyError,
    audio_file_name,
};
