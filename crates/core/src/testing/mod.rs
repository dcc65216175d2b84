//! Testing utilities and mock implementations.
//!
//! This module provides doubles for every external collaborator of the
//! conversion pipeline, so full runs need no network and no real timers.
//!
//! # Example
//!
//! ```rust,ignore
//! use vellum_core::testing::{InstantSleeper, MemoryArtifactStorage, MockTranslationClient};
//!
//! let client = MockTranslationClient::new();
//! client.set_default_manifest(Manifest::pending()).await;
//!
//! // Wire into a ConversionOrchestrator...
//! ```

mod instant_sleeper;
mod memory_storage;
mod mock_translation_client;

pub use instant_sleeper::InstantSleeper;
pub use memory_storage::MemoryArtifactStorage;
pub use mock_translation_client::{MockTranslationClient, RecordedUpload};

/// Test fixtures and helper functions.
pub mod fixtures {
    use bytes::Bytes;

    use crate::ingest::UploadedArtifact;

    const MIB: usize = 1024 * 1024;

    /// An artifact of `size` zero bytes.
    pub fn artifact(filename: &str, mime_type: &str, size: usize) -> UploadedArtifact {
        UploadedArtifact::new(filename, mime_type, Bytes::from(vec![0u8; size]))
    }

    /// A DWG drawing of the given size in MiB.
    pub fn dwg(filename: &str, size_mib: usize) -> UploadedArtifact {
        artifact(filename, "application/acad", size_mib * MIB)
    }

    /// A PDF document of the given size in MiB.
    pub fn pdf(filename: &str, size_mib: usize) -> UploadedArtifact {
        artifact(filename, "application/pdf", size_mib * MIB)
    }
}
