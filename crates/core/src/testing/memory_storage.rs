//! In-memory artifact storage for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::storage::{ArtifactStorage, StorageError};

/// Artifact storage kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStorage {
    items: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryArtifactStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.items.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStorage for MemoryArtifactStorage {
    async fn save(&self, id: &str, content: Bytes) -> Result<(), StorageError> {
        self.items.write().await.insert(id.to_string(), content);
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Bytes, StorageError> {
        self.items
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn remove(&self, id: &str) -> Result<(), StorageError> {
        self.items.write().await.remove(id);
        Ok(())
    }
}
