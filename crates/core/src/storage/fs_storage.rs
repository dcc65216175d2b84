//! File system artifact storage.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::{ArtifactStorage, StorageError};

/// Stores each artifact as a single file named after its id.
pub struct FsArtifactStorage {
    root: PathBuf,
}

impl FsArtifactStorage {
    /// Create the storage, creating `root` if it does not exist.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| StorageError::DirectoryCreationFailed {
                path: root.clone(),
                source,
            })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StorageError> {
        // Ids are generated uuids; anything that could escape the root is refused.
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{}.bin", id)))
    }
}

#[async_trait]
impl ArtifactStorage for FsArtifactStorage {
    async fn save(&self, id: &str, content: Bytes) -> Result<(), StorageError> {
        let path = self.path_for(id)?;
        debug!("Storing {} bytes at {:?}", content.len(), path);
        fs::write(&path, &content).await?;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Bytes, StorageError> {
        let path = self.path_for(id)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn remove(&self, id: &str) -> Result<(), StorageError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
