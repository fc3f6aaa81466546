use thiserror::Error;

use crate::model::{QuizError, SettingsError, VocabularyError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
}
