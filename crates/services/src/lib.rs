#![forbid(unsafe_code)]

pub mod app_services;
pub mod detection;
pub mod error;
pub mod live;
pub mod notification;
#[cfg(feature = "audio")]
pub mod playback;
pub mod quiz;

pub use visor_core::Clock;

pub use app_services::AppServices;
pub use detection::{DetectionAdapter, Detector, ManifestDetector, RawDetection};
pub use error::{
    AppServicesError, CameraError, DetectionError, LiveCaptureError, NotificationError,
    QuizServiceError,
};
pub use live::{
    DirectoryCamera, FrameReport, FrameSource, LiveCaptureController, LiveCaptureHandle,
    LiveEvent, SharedSession, StopReason,
};
pub use notification::{AudioCueSink, CueOutcome, CuePlayer, LogCuePlayer, NotificationSink};
#[cfg(feature = "audio")]
pub use playback::SpeakerCuePlayer;
pub use quiz::{DetectOutcome, QuizController};
