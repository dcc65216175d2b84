//! Storage for the raw bytes of uploaded artifacts.
//!
//! Records live in the [`FileStore`](crate::file::FileStore); their content
//! lives here, keyed by the same id.

mod fs_storage;

pub use fs_storage::FsArtifactStorage;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while storing or loading artifact bytes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No content stored for this id.
    #[error("Artifact content not found: {0}")]
    NotFound(String),

    /// Id cannot be mapped to a storage location.
    #[error("Invalid artifact id: {0}")]
    InvalidId(String),

    /// Failed to create the storage directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte storage for uploaded artifacts.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Store the content for an id, replacing anything already there.
    async fn save(&self, id: &str, content: Bytes) -> Result<(), StorageError>;

    /// Load the content for an id.
    async fn load(&self, id: &str) -> Result<Bytes, StorageError>;

    /// Remove the content for an id. Removing missing content is not an error.
    async fn remove(&self, id: &str) -> Result<(), StorageError>;
}
