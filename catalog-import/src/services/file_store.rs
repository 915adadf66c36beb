//! Uploaded file access
//!
//! Uploads are staged by the web tier; the importer only reads them back by
//! reference (a path relative to the upload directory).

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("Upload not found: {0}")]
    NotFound(String),

    #[error("Invalid upload reference: {0}")]
    InvalidReference(String),

    #[error("Upload unreadable: {0}")]
    Io(String),
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn get_file_contents(&self, reference: &str) -> Result<Vec<u8>, FileStoreError>;
}

#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reference → path under the root; `..`, absolute and empty paths are refused
    fn resolve(&self, reference: &str) -> Result<PathBuf, FileStoreError> {
        let relative = Path::new(reference);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if reference.trim().is_empty() || !plain {
            return Err(FileStoreError::InvalidReference(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn get_file_contents(&self, reference: &str) -> Result<Vec<u8>, FileStoreError> {
        let path = self.resolve(reference)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::debug!(reference, size = bytes.len(), "Upload read");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileStoreError::NotFound(reference.to_string()))
            }
            Err(e) => Err(FileStoreError::Io(format!("{}: {e}", path.display()))),
        }
    }
}
