//! File records and the status store that tracks them.

mod memory_store;
mod store;
mod types;

pub use memory_store::InMemoryFileStore;
pub use store::{FileError, FileStore};
pub use types::{FileMetadata, FileRecord, FileStatus, FileType};
