//! Ingestion of uploaded artifacts.
//!
//! The gate validates an upload, classifies it, persists its bytes and
//! record, and hands the record to the orchestrator without waiting for the
//! pipeline to finish.

mod classify;
mod gate;

pub use classify::classify;
pub use gate::{IngestError, Ingested, IngestionGate, UploadedArtifact};
