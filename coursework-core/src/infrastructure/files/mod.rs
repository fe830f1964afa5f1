//! Submission file storage

pub mod local;

pub use local::{FileStore, FileStoreError, LocalFileStore};
