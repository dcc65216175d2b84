//! Types for the conversion orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::file::{FileError, FileStatus};
use crate::storage::StorageError;
use crate::translation::TranslationError;

/// Errors that can occur during orchestration.
///
/// The `Display` text of pipeline failures is what ends up in a record's
/// `error_message`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// File record not found.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A pipeline for this file is already running.
    #[error("conversion already running for file {0}")]
    AlreadyRunning(String),

    /// Invalid file state for operation.
    #[error("invalid file state for {file_id}: expected {expected}, got {actual}")]
    InvalidState {
        file_id: String,
        expected: String,
        actual: FileStatus,
    },

    /// The translation service reported a failed job.
    #[error("translation failed")]
    TranslationFailed,

    /// The manifest stayed pending for every allowed poll.
    #[error("translation timeout")]
    TranslationTimeout { attempts: u32 },

    /// Status store error.
    #[error(transparent)]
    Store(#[from] FileError),

    /// Artifact storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Translation service error.
    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl OrchestratorError {
    /// Derivative status recorded in partial metadata when a pipeline fails
    /// after the object was uploaded.
    pub fn derivative_status(&self) -> &'static str {
        match self {
            OrchestratorError::TranslationFailed => "failed",
            OrchestratorError::TranslationTimeout { .. } => "timeout",
            _ => "error",
        }
    }
}

/// How a single pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Record reached `Ready`.
    Ready,
    /// Record reached `Error` with this message.
    Failed(String),
    /// Record was deleted, or moved out of its starting status before the
    /// run began; nothing was written.
    Abandoned,
}

impl PipelineOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineOutcome::Ready => "ready",
            PipelineOutcome::Failed(_) => "failed",
            PipelineOutcome::Abandoned => "abandoned",
        }
    }
}

/// Working state of one translation run. Lives only as long as the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    /// Record this run writes to. The job never owns the record.
    pub file_id: String,
    pub bucket_key: String,
    pub object_key: String,
    /// Set once the object has been uploaded.
    pub urn: Option<String>,
    /// Manifest polls made so far.
    pub attempt_count: u32,
    /// Poll ceiling for this run.
    pub deadline_attempts: u32,
}

impl ConversionJob {
    pub fn new(
        file_id: impl Into<String>,
        bucket_key: impl Into<String>,
        object_key: impl Into<String>,
        deadline_attempts: u32,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            bucket_key: bucket_key.into(),
            object_key: object_key.into(),
            urn: None,
            attempt_count: 0,
            deadline_attempts,
        }
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempt_count >= self.deadline_attempts
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Number of pipelines currently running.
    pub active_runs: usize,
}
