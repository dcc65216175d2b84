//! In-memory status store.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use super::store::{FileError, FileMutator, FileStore};
use super::types::{FileRecord, FileStatus};

/// In-memory file store.
///
/// The map lock is only taken exclusively for insert and delete. Updates
/// hold it shared plus the record's own mutex, so updates to different ids
/// run in parallel while a delete waits for in-flight updates to finish.
#[derive(Default)]
pub struct InMemoryFileStore {
    records: RwLock<HashMap<String, Mutex<FileRecord>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> FileError {
    FileError::Store("lock poisoned".to_string())
}

impl FileStore for InMemoryFileStore {
    fn insert(&self, record: FileRecord) -> Result<FileRecord, FileError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&record.id) {
            return Err(FileError::AlreadyExists(record.id));
        }
        records.insert(record.id.clone(), Mutex::new(record.clone()));
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<Option<FileRecord>, FileError> {
        let records = self.records.read().map_err(poisoned)?;
        match records.get(id) {
            Some(entry) => Ok(Some(entry.lock().map_err(poisoned)?.clone())),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<FileRecord>, FileError> {
        let records = self.records.read().map_err(poisoned)?;
        let mut out = records
            .values()
            .map(|entry| entry.lock().map(|r| r.clone()).map_err(poisoned))
            .collect::<Result<Vec<_>, _>>()?;
        out.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(out)
    }

    fn count(&self, status: Option<FileStatus>) -> Result<usize, FileError> {
        let records = self.records.read().map_err(poisoned)?;
        let Some(status) = status else {
            return Ok(records.len());
        };
        let mut n = 0;
        for entry in records.values() {
            if entry.lock().map_err(poisoned)?.status == status {
                n += 1;
            }
        }
        Ok(n)
    }

    fn update(&self, id: &str, mutator: FileMutator<'_>) -> Result<FileRecord, FileError> {
        let records = self.records.read().map_err(poisoned)?;
        let entry = records
            .get(id)
            .ok_or_else(|| FileError::NotFound(id.to_string()))?;
        let mut current = entry.lock().map_err(poisoned)?;

        // Mutate a copy so a failing mutator leaves no partial write behind.
        let mut next = current.clone();
        mutator(&mut next)?;
        *current = next.clone();
        Ok(next)
    }

    fn delete(&self, id: &str) -> Result<bool, FileError> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{FileMetadata, FileType};
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn record(name: &str) -> FileRecord {
        FileRecord::new(name, 10, "application/pdf", FileType::Pdf)
    }

    #[test]
    fn test_insert_and_get() {
        let store = InMemoryFileStore::new();
        let r = store.insert(record("a.pdf")).unwrap();
        let fetched = store.get(&r.id).unwrap().unwrap();
        assert_eq!(fetched, r);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let store = InMemoryFileStore::new();
        let r = store.insert(record("a.pdf")).unwrap();
        let err = store.insert(r).unwrap_err();
        assert!(matches!(err, FileError::AlreadyExists(_)));
    }

    #[test]
    fn test_list_newest_first() {
        let store = InMemoryFileStore::new();
        let now = Utc::now();
        for (name, age) in [("old.pdf", 10), ("new.pdf", 0), ("mid.pdf", 5)] {
            let mut r = record(name);
            r.uploaded_at = now - Duration::seconds(age);
            store.insert(r).unwrap();
        }

        let names: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.original_name)
            .collect();
        assert_eq!(names, vec!["new.pdf", "mid.pdf", "old.pdf"]);
    }

    #[test]
    fn test_update_applies_mutation() {
        let store = InMemoryFileStore::new();
        let r = store.insert(record("a.pdf")).unwrap();

        let updated = store
            .update(&r.id, &mut |rec: &mut FileRecord| rec.begin_processing())
            .unwrap();
        assert_eq!(updated.status, FileStatus::Processing);
        assert_eq!(
            store.get(&r.id).unwrap().unwrap().status,
            FileStatus::Processing
        );
    }

    #[test]
    fn test_failed_mutation_leaves_record_untouched() {
        let store = InMemoryFileStore::new();
        let r = store.insert(record("a.pdf")).unwrap();

        let err = store
            .update(&r.id, &mut |rec: &mut FileRecord| {
                rec.original_name = "changed.pdf".to_string();
                rec.complete(FileMetadata::standard())
            })
            .unwrap_err();
        assert!(matches!(err, FileError::InvalidTransition { .. }));

        let stored = store.get(&r.id).unwrap().unwrap();
        assert_eq!(stored.original_name, "a.pdf");
        assert_eq!(stored.status, FileStatus::Uploading);
    }

    #[test]
    fn test_update_missing_does_not_insert() {
        let store = InMemoryFileStore::new();
        let err = store
            .update("ghost", &mut |rec: &mut FileRecord| rec.begin_processing())
            .unwrap_err();
        assert!(matches!(err, FileError::NotFound(_)));
        assert_eq!(store.count(None).unwrap(), 0);
    }

    #[test]
    fn test_delete() {
        let store = InMemoryFileStore::new();
        let r = store.insert(record("a.pdf")).unwrap();
        assert!(store.delete(&r.id).unwrap());
        assert!(!store.delete(&r.id).unwrap());
        assert!(store.get(&r.id).unwrap().is_none());
    }

    #[test]
    fn test_count_by_status() {
        let store = InMemoryFileStore::new();
        let a = store.insert(record("a.pdf")).unwrap();
        store.insert(record("b.pdf")).unwrap();
        store
            .update(&a.id, &mut |rec: &mut FileRecord| rec.begin_processing())
            .unwrap();

        assert_eq!(store.count(None).unwrap(), 2);
        assert_eq!(store.count(Some(FileStatus::Processing)).unwrap(), 1);
        assert_eq!(store.count(Some(FileStatus::Uploading)).unwrap(), 1);
        assert_eq!(store.count(Some(FileStatus::Ready)).unwrap(), 0);
    }

    #[test]
    fn test_concurrent_updates_are_serialized_per_key() {
        let store = Arc::new(InMemoryFileStore::new());
        let r = store.insert(record("a.pdf")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = r.id.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store
                            .update(&id, &mut |rec: &mut FileRecord| {
                                rec.size_bytes += 1;
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get(&r.id).unwrap().unwrap().size_bytes, 10 + 800);
    }
}
