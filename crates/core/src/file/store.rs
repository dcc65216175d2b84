//! Status store trait and errors.

use thiserror::Error;

use super::types::{FileRecord, FileStatus};

/// Error type for file record operations.
#[derive(Debug, Error)]
pub enum FileError {
    /// No record with this id.
    #[error("File not found: {0}")]
    NotFound(String),

    /// A record with this id already exists.
    #[error("File already exists: {0}")]
    AlreadyExists(String),

    /// The requested status change is not an edge of the status graph.
    #[error("Cannot move file {file_id} from {from} to {to}")]
    InvalidTransition {
        file_id: String,
        from: FileStatus,
        to: FileStatus,
    },

    /// Metadata failed validation.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Backend failure.
    #[error("Store error: {0}")]
    Store(String),
}

/// Mutation applied to a single record under the store's per-key lock.
///
/// Returning an error aborts the update and leaves the stored record untouched.
pub type FileMutator<'a> = &'a mut dyn FnMut(&mut FileRecord) -> Result<(), FileError>;

/// Trait for file record storage backends.
///
/// Implementations serialize writers per id and must not let writers on
/// different ids block each other.
pub trait FileStore: Send + Sync {
    /// Insert a new record.
    fn insert(&self, record: FileRecord) -> Result<FileRecord, FileError>;

    /// Get a record by id.
    fn get(&self, id: &str) -> Result<Option<FileRecord>, FileError>;

    /// All records, newest upload first.
    fn list(&self) -> Result<Vec<FileRecord>, FileError>;

    /// Number of records, optionally restricted to one status.
    fn count(&self, status: Option<FileStatus>) -> Result<usize, FileError>;

    /// Atomically apply `mutator` to the record with this id.
    ///
    /// Fails with [`FileError::NotFound`] if the id is absent; never inserts.
    fn update(&self, id: &str, mutator: FileMutator<'_>) -> Result<FileRecord, FileError>;

    /// Remove a record. Returns whether it existed.
    fn delete(&self, id: &str) -> Result<bool, FileError>;
}
