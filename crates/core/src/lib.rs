pub mod config;
pub mod file;
pub mod ingest;
pub mod metrics;
pub mod orchestrator;
pub mod storage;
pub mod testing;
pub mod translation;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig, TranslationConfig, UploadConfig,
};
pub use file::{
    FileError, FileMetadata, FileRecord, FileStatus, FileStore, FileType, InMemoryFileStore,
};
pub use ingest::{classify, IngestError, Ingested, IngestionGate, UploadedArtifact};
pub use orchestrator::{
    ConversionOrchestrator, OrchestratorConfig, OrchestratorError, OrchestratorStatus,
    PipelineOutcome, Sleeper, TokioSleeper,
};
pub use storage::{ArtifactStorage, FsArtifactStorage, StorageError};
pub use translation::{
    derive_urn, ApsClient, Manifest, ManifestStatus, TranslationClient, TranslationError,
};
