//! Upload validation and handoff to the orchestrator.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::file::{FileError, FileRecord, FileStore};
use crate::metrics::UPLOADS_TOTAL;
use crate::orchestrator::{ConversionOrchestrator, PipelineOutcome};
use crate::storage::{ArtifactStorage, StorageError};

use super::classify::classify;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// An upload as received from a client.
#[derive(Debug, Clone)]
pub struct UploadedArtifact {
    pub filename: String,
    pub mime_type: String,
    pub content: Bytes,
}

impl UploadedArtifact {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, content: Bytes) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            content,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Errors raised while accepting an upload.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("File {filename} is {size} bytes, exceeding the {limit} byte limit")]
    SizeExceeded {
        filename: String,
        size: u64,
        limit: u64,
    },

    #[error("Upload is missing a filename")]
    MissingFilename,

    #[error("File {0} is empty")]
    Empty(String),

    #[error(transparent)]
    Store(#[from] FileError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Whether the upload itself was rejected, as opposed to a backend failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            IngestError::SizeExceeded { .. } | IngestError::MissingFilename | IngestError::Empty(_)
        )
    }
}

/// An accepted upload.
#[derive(Debug)]
pub struct Ingested {
    /// The record as created, in `Uploading`.
    pub record: FileRecord,
    /// Handle to the background pipeline, if one could be started.
    pub pipeline: Option<JoinHandle<PipelineOutcome>>,
}

/// Entry point for new uploads.
#[derive(Clone)]
pub struct IngestionGate {
    store: Arc<dyn FileStore>,
    storage: Arc<dyn ArtifactStorage>,
    orchestrator: ConversionOrchestrator,
    max_file_size_bytes: u64,
}

impl IngestionGate {
    pub fn new(
        store: Arc<dyn FileStore>,
        storage: Arc<dyn ArtifactStorage>,
        orchestrator: ConversionOrchestrator,
        max_file_size_bytes: u64,
    ) -> Self {
        Self {
            store,
            storage,
            orchestrator,
            max_file_size_bytes,
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    /// Check an upload without touching any state.
    pub fn validate(&self, artifact: &UploadedArtifact) -> Result<(), IngestError> {
        if artifact.filename.trim().is_empty() {
            return Err(IngestError::MissingFilename);
        }
        let size = artifact.size_bytes();
        if size > self.max_file_size_bytes {
            return Err(IngestError::SizeExceeded {
                filename: artifact.filename.clone(),
                size,
                limit: self.max_file_size_bytes,
            });
        }
        if size == 0 {
            return Err(IngestError::Empty(artifact.filename.clone()));
        }
        Ok(())
    }

    /// Accept one upload: store it, create its record and start its pipeline.
    ///
    /// Returns as soon as the pipeline is scheduled.
    pub async fn accept(&self, artifact: UploadedArtifact) -> Result<Ingested, IngestError> {
        if let Err(e) = self.validate(&artifact) {
            UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
            warn!("Rejected upload '{}': {}", artifact.filename, e);
            return Err(e);
        }
        self.admit(artifact).await
    }

    /// Accept several uploads. Nothing is stored unless every upload is valid.
    pub async fn accept_batch(
        &self,
        artifacts: Vec<UploadedArtifact>,
    ) -> Result<Vec<Ingested>, IngestError> {
        for artifact in &artifacts {
            if let Err(e) = self.validate(artifact) {
                UPLOADS_TOTAL
                    .with_label_values(&["rejected"])
                    .inc_by(artifacts.len() as u64);
                warn!(
                    "Rejected batch of {} uploads at '{}': {}",
                    artifacts.len(),
                    artifact.filename,
                    e
                );
                return Err(e);
            }
        }

        let mut accepted = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            accepted.push(self.admit(artifact).await?);
        }
        Ok(accepted)
    }

    async fn admit(&self, artifact: UploadedArtifact) -> Result<Ingested, IngestError> {
        let mime_type = if artifact.mime_type.trim().is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            artifact.mime_type.clone()
        };
        let file_type = classify(&artifact.filename, &mime_type);
        let record = FileRecord::new(
            artifact.filename.clone(),
            artifact.size_bytes(),
            mime_type,
            file_type,
        );

        let artifact_id = record.id.clone();
        self.storage.save(&artifact_id, artifact.content).await?;
        let record = match self.store.insert(record) {
            Ok(record) => record,
            Err(e) => {
                UPLOADS_TOTAL.with_label_values(&["error"]).inc();
                if let Err(cleanup) = self.storage.remove(&artifact_id).await {
                    warn!("Failed to remove orphaned content {}: {}", artifact_id, cleanup);
                }
                return Err(e.into());
            }
        };
        UPLOADS_TOTAL.with_label_values(&["accepted"]).inc();
        info!(
            "Accepted upload {} ('{}', {} bytes, {})",
            record.id,
            record.original_name,
            record.size_bytes,
            record.detected_type.as_str()
        );

        let pipeline = match self.orchestrator.submit(&record.id) {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Could not start pipeline for {}: {}", record.id, e);
                let message = e.to_string();
                if let Err(e) = self
                    .store
                    .update(&record.id, &mut |r: &mut FileRecord| r.fail(message.clone(), None))
                {
                    error!("Failed to mark file {} as failed: {}", record.id, e);
                }
                None
            }
        };

        Ok(Ingested { record, pipeline })
    }
}
