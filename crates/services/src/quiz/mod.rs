mod controller;

pub use controller::{DetectOutcome, QuizController};
