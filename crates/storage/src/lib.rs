#![forbid(unsafe_code)]

pub mod disk;
pub mod repository;
pub mod vocabulary_file;

pub use repository::{AudioLibrary, CaptureStore, InMemoryRepository, Storage, StorageError};
