//! Continuous camera flow: per-frame capture logic and the background loop
//! that drives it.

mod camera;
mod controller;
mod runner;

pub use camera::{DirectoryCamera, FrameSource};
pub use controller::{FrameReport, LiveCaptureController};
pub use runner::{LiveCaptureHandle, LiveEvent, SharedSession, StopReason};
