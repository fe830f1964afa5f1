//! Local directory file store
//!
//! Stored files are named with 32 random hex characters plus the uploaded file's
//! extension. The name is the reference handed back to callers.

use async_trait::async_trait;
use bytes::Bytes;
use rand::RngCore;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FileStoreError {
    #[error("Invalid file reference: {reference}")]
    InvalidReference { reference: String },

    #[error("File store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores uploaded bytes and hands back an opaque reference
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn store(&self, original_name: &str, bytes: Bytes) -> Result<String, FileStoreError>;

    /// `Ok(None)` when nothing is stored under `reference`
    async fn load(&self, reference: &str) -> Result<Option<Bytes>, FileStoreError>;
}

pub struct LocalFileStore {
    directory: PathBuf,
}

impl LocalFileStore {
    /// Create the store, creating `directory` if needed
    pub async fn new(directory: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn generated_name(original_name: &str) -> String {
        let mut id = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut id);

        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        format!("{}{}", hex::encode(id), extension)
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, FileStoreError> {
        let valid = !reference.is_empty()
            && !reference.contains(['/', '\\'])
            && reference != "."
            && reference != "..";
        if !valid {
            return Err(FileStoreError::InvalidReference {
                reference: reference.to_string(),
            });
        }
        Ok(self.directory.join(reference))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, original_name: &str, bytes: Bytes) -> Result<String, FileStoreError> {
        let name = Self::generated_name(original_name);
        let path = self.resolve(&name)?;
        tokio::fs::write(&path, &bytes).await?;
        debug!(file = %name, size = bytes.len(), "Stored submission file");
        Ok(name)
    }

    async fn load(&self, reference: &str) -> Result<Option<Bytes>, FileStoreError> {
        let path = self.resolve(reference)?;
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(Some(Bytes::from(contents))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
