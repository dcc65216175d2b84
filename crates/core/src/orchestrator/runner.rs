//! Conversion orchestrator implementation.
//!
//! Each file's pipeline runs as its own task. The only suspension points are
//! remote calls and [`Sleeper`] waits, so two steps of one pipeline never run
//! at the same time while pipelines of different files interleave freely.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::file::{FileError, FileMetadata, FileRecord, FileStatus, FileStore};
use crate::metrics::{
    MANIFEST_POLLS, PIPELINE_DURATION, PIPELINE_RUNS, RETRY_ATTEMPTS, TRANSLATION_TIMEOUTS,
};
use crate::storage::ArtifactStorage;
use crate::translation::{derive_urn, ManifestStatus, TranslationClient};

use super::clock::Sleeper;
use super::config::OrchestratorConfig;
use super::types::{ConversionJob, OrchestratorError, OrchestratorStatus, PipelineOutcome};

/// Removes a file id from the active set when its run ends, however it ends.
struct ActiveRun {
    active: Arc<Mutex<HashSet<String>>>,
    file_id: String,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.file_id);
        }
    }
}

/// Result of the manifest poll loop.
enum PollResult {
    Success { derivative_status: String },
    /// Record disappeared between polls.
    Vanished,
}

/// The conversion orchestrator - drives file records from upload to a viewable state.
///
/// Cheap to clone; clones share the same dependencies and active-run set.
#[derive(Clone)]
pub struct ConversionOrchestrator {
    config: OrchestratorConfig,
    bucket_prefix: String,
    store: Arc<dyn FileStore>,
    storage: Arc<dyn ArtifactStorage>,
    translation: Arc<dyn TranslationClient>,
    sleeper: Arc<dyn Sleeper>,
    active: Arc<Mutex<HashSet<String>>>,
}

impl ConversionOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        bucket_prefix: impl Into<String>,
        store: Arc<dyn FileStore>,
        storage: Arc<dyn ArtifactStorage>,
        translation: Arc<dyn TranslationClient>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            bucket_prefix: bucket_prefix.into(),
            store,
            storage,
            translation,
            sleeper,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Get current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            active_runs: self.active.lock().map(|a| a.len()).unwrap_or(0),
        }
    }

    /// Whether a pipeline is currently running for this file.
    pub fn is_running(&self, file_id: &str) -> bool {
        self.active
            .lock()
            .map(|a| a.contains(file_id))
            .unwrap_or(false)
    }

    /// Start the first pipeline for a freshly uploaded file in the background.
    ///
    /// The returned handle resolves when the pipeline ends; dropping it does
    /// not stop the pipeline.
    pub fn submit(&self, file_id: &str) -> Result<JoinHandle<PipelineOutcome>, OrchestratorError> {
        self.spawn(file_id, FileStatus::Uploading)
    }

    /// Run the first pipeline for a file to completion on the current task.
    pub async fn run(&self, file_id: &str) -> Result<PipelineOutcome, OrchestratorError> {
        let _guard = self.claim(file_id, FileStatus::Uploading)?;
        Ok(self.execute(file_id, FileStatus::Uploading).await)
    }

    /// Re-run the full pipeline for a file that ended in `Error`.
    ///
    /// Every retry starts from scratch with a new bucket and object; nothing
    /// from the failed run is reused.
    pub fn retry(&self, file_id: &str) -> Result<JoinHandle<PipelineOutcome>, OrchestratorError> {
        let handle = self.spawn(file_id, FileStatus::Error)?;
        info!("Retrying conversion for file {}", file_id);
        RETRY_ATTEMPTS.inc();
        Ok(handle)
    }

    /// Spawn a pipeline that may only start from `from`.
    ///
    /// The pipeline runs in its own inner task so that a panic inside it
    /// still ends with the record in `Error`.
    fn spawn(
        &self,
        file_id: &str,
        from: FileStatus,
    ) -> Result<JoinHandle<PipelineOutcome>, OrchestratorError> {
        let guard = self.claim(file_id, from)?;
        let this = self.clone();
        let file_id = file_id.to_string();

        Ok(tokio::spawn(async move {
            let _guard = guard;
            let pipeline = {
                let this = this.clone();
                let file_id = file_id.clone();
                tokio::spawn(async move { this.execute(&file_id, from).await })
            };
            match pipeline.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Pipeline for file {} aborted: {}", file_id, e);
                    this.finish_failed(&file_id, "pipeline aborted".to_string(), None)
                }
            }
        }))
    }

    /// Check the record sits in `from` and reserve its id.
    fn claim(&self, file_id: &str, from: FileStatus) -> Result<ActiveRun, OrchestratorError> {
        let record = self
            .store
            .get(file_id)?
            .ok_or_else(|| OrchestratorError::FileNotFound(file_id.to_string()))?;

        if record.status != from {
            return Err(OrchestratorError::InvalidState {
                file_id: file_id.to_string(),
                expected: from.to_string(),
                actual: record.status,
            });
        }

        let mut active = self
            .active
            .lock()
            .map_err(|_| FileError::Store("active run set poisoned".to_string()))?;
        if !active.insert(file_id.to_string()) {
            return Err(OrchestratorError::AlreadyRunning(file_id.to_string()));
        }

        Ok(ActiveRun {
            active: Arc::clone(&self.active),
            file_id: file_id.to_string(),
        })
    }

    /// Drive one record through the pipeline and record metrics.
    async fn execute(&self, file_id: &str, from: FileStatus) -> PipelineOutcome {
        let started = Instant::now();

        let record = match self.begin_processing(file_id, from) {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("File {} deleted before processing started", file_id);
                return PipelineOutcome::Abandoned;
            }
            Err(FileError::InvalidTransition { from: actual, .. }) => {
                info!(
                    "File {} moved to {} before processing started, skipping",
                    file_id, actual
                );
                return PipelineOutcome::Abandoned;
            }
            Err(e) => {
                error!("Failed to start processing file {}: {}", file_id, e);
                return PipelineOutcome::Failed(e.to_string());
            }
        };

        let file_type = record.detected_type.as_str();
        info!(
            "Processing file {} ('{}', {})",
            record.id, record.original_name, file_type
        );

        let outcome = if record.detected_type.needs_translation() {
            self.run_translation(&record).await
        } else {
            self.run_standard(&record).await
        };

        PIPELINE_RUNS
            .with_label_values(&[file_type, outcome.as_str()])
            .inc();
        PIPELINE_DURATION
            .with_label_values(&[file_type])
            .observe(started.elapsed().as_secs_f64());

        match &outcome {
            PipelineOutcome::Ready => info!("File {} is ready", file_id),
            PipelineOutcome::Failed(msg) => warn!("File {} failed: {}", file_id, msg),
            PipelineOutcome::Abandoned => info!("File {} was deleted mid-pipeline", file_id),
        }
        outcome
    }

    /// Apply a mutation; a record deleted in the meantime turns it into a no-op.
    fn write(
        &self,
        file_id: &str,
        mutator: &mut dyn FnMut(&mut FileRecord) -> Result<(), FileError>,
    ) -> Result<Option<FileRecord>, FileError> {
        match self.store.update(file_id, mutator) {
            Ok(record) => Ok(Some(record)),
            Err(FileError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Enter `Processing`, but only from the status the run was claimed in.
    fn begin_processing(
        &self,
        file_id: &str,
        from: FileStatus,
    ) -> Result<Option<FileRecord>, FileError> {
        self.write(file_id, &mut |r: &mut FileRecord| {
            if r.status != from {
                return Err(FileError::InvalidTransition {
                    file_id: r.id.clone(),
                    from: r.status,
                    to: FileStatus::Processing,
                });
            }
            r.begin_processing()
        })
    }

    fn finish_ready(&self, file_id: &str, metadata: FileMetadata) -> PipelineOutcome {
        match self.write(file_id, &mut |r: &mut FileRecord| r.complete(metadata.clone())) {
            Ok(Some(_)) => PipelineOutcome::Ready,
            Ok(None) => PipelineOutcome::Abandoned,
            Err(e) => {
                error!("Failed to mark file {} ready: {}", file_id, e);
                self.finish_failed(file_id, e.to_string(), None)
            }
        }
    }

    fn finish_failed(
        &self,
        file_id: &str,
        message: String,
        partial: Option<FileMetadata>,
    ) -> PipelineOutcome {
        let result = self.write(file_id, &mut |r: &mut FileRecord| {
            r.fail(message.clone(), partial.clone())
        });
        match result {
            Ok(Some(_)) => PipelineOutcome::Failed(message),
            Ok(None) => PipelineOutcome::Abandoned,
            Err(e) => {
                error!("Failed to mark file {} as failed: {}", file_id, e);
                PipelineOutcome::Failed(message)
            }
        }
    }

    /// Files that need no translation: wait, then attach standard metadata.
    async fn run_standard(&self, record: &FileRecord) -> PipelineOutcome {
        self.sleeper
            .sleep(self.config.standard_processing_delay())
            .await;
        self.finish_ready(&record.id, FileMetadata::standard())
    }

    /// CAD files: remote bucket, upload, translation, manifest polling.
    async fn run_translation(&self, record: &FileRecord) -> PipelineOutcome {
        let mut job = ConversionJob::new(
            &record.id,
            self.new_bucket_key(),
            object_key_for(&record.original_name),
            self.config.max_poll_attempts,
        );

        match self.translate(&mut job).await {
            Ok(PollResult::Success { derivative_status }) => {
                let urn = job.urn.clone().unwrap_or_default();
                match FileMetadata::aps(urn, &job.bucket_key, &job.object_key, derivative_status) {
                    Ok(metadata) => self.finish_ready(&record.id, metadata),
                    Err(e) => self.finish_failed(&record.id, e.to_string(), None),
                }
            }
            Ok(PollResult::Vanished) => PipelineOutcome::Abandoned,
            Err(e) => {
                let partial = job.urn.as_ref().and_then(|urn| {
                    FileMetadata::aps(
                        urn,
                        &job.bucket_key,
                        &job.object_key,
                        e.derivative_status(),
                    )
                    .ok()
                });
                self.finish_failed(&record.id, e.to_string(), partial)
            }
        }
    }

    async fn translate(&self, job: &mut ConversionJob) -> Result<PollResult, OrchestratorError> {
        let content = self.storage.load(&job.file_id).await?;

        self.translation.authenticate().await?;

        let bucket = self.translation.create_bucket(&job.bucket_key).await?;
        job.bucket_key = bucket.bucket_key;
        debug!("File {} using bucket '{}'", job.file_id, job.bucket_key);

        let object_id = self
            .translation
            .upload_object(&job.bucket_key, &job.object_key, content)
            .await?;
        let urn = derive_urn(&object_id);
        job.urn = Some(urn.clone());

        let submitted = self.translation.submit_translation(&urn).await?;
        debug!(
            "Translation submitted for file {} (urn={}, result={})",
            job.file_id, submitted.urn, submitted.result
        );

        self.poll_manifest(job, &urn).await
    }

    /// Poll until the manifest settles or the attempt ceiling is reached.
    ///
    /// Each poll is preceded by one poll interval, so the loop spends at most
    /// `deadline_attempts * poll_interval` waiting.
    async fn poll_manifest(
        &self,
        job: &mut ConversionJob,
        urn: &str,
    ) -> Result<PollResult, OrchestratorError> {
        while !job.attempts_exhausted() {
            self.sleeper.sleep(self.config.poll_interval()).await;

            if self.store.get(&job.file_id)?.is_none() {
                return Ok(PollResult::Vanished);
            }

            job.attempt_count += 1;
            let manifest = self.translation.get_manifest(urn).await?;
            debug!(
                "Manifest poll {}/{} for file {}: {} ({:?})",
                job.attempt_count,
                job.deadline_attempts,
                job.file_id,
                manifest.detail,
                manifest.progress
            );

            match manifest.status {
                ManifestStatus::Success => {
                    MANIFEST_POLLS.with_label_values(&["success"]).inc();
                    return Ok(PollResult::Success {
                        derivative_status: manifest.detail,
                    });
                }
                ManifestStatus::Failed => {
                    MANIFEST_POLLS.with_label_values(&["failed"]).inc();
                    return Err(OrchestratorError::TranslationFailed);
                }
                ManifestStatus::Pending => {
                    MANIFEST_POLLS.with_label_values(&["pending"]).inc();
                }
            }
        }

        TRANSLATION_TIMEOUTS.inc();
        Err(OrchestratorError::TranslationTimeout {
            attempts: job.attempt_count,
        })
    }

    /// Fresh bucket key per run: lowercase prefix plus a random suffix.
    fn new_bucket_key(&self) -> String {
        let prefix: String = self
            .bucket_prefix
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
            .collect();
        let prefix = if prefix.is_empty() { "vellum".to_string() } else { prefix };
        format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
    }
}

/// Object key derived from the original filename, restricted to safe characters.
fn object_key_for(original_name: &str) -> String {
    let key: String = original_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if key.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "artifact".to_string()
    } else {
        key
    }
}
