//! Core file record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::FileError;

/// Coarse classification of an uploaded artifact, fixed at ingestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Autocad,
    Pdf,
    Image,
    Document,
    Other,
}

impl FileType {
    /// Whether files of this type go through the remote translation pipeline.
    pub fn needs_translation(&self) -> bool {
        matches!(self, FileType::Autocad)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Autocad => "autocad",
            FileType::Pdf => "pdf",
            FileType::Image => "image",
            FileType::Document => "document",
            FileType::Other => "other",
        }
    }
}

/// Processing status of a file record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Uploading,
    Processing,
    Ready,
    Error,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Uploading => "uploading",
            FileStatus::Processing => "processing",
            FileStatus::Ready => "ready",
            FileStatus::Error => "error",
        }
    }

    /// Parse a lowercase status name as used on the wire.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "uploading" => Some(FileStatus::Uploading),
            "processing" => Some(FileStatus::Processing),
            "ready" => Some(FileStatus::Ready),
            "error" => Some(FileStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Ready | FileStatus::Error)
    }

    /// Legal edges of the status graph. `Error -> Processing` is the retry edge.
    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        matches!(
            (self, next),
            (FileStatus::Uploading, FileStatus::Processing)
                | (FileStatus::Uploading, FileStatus::Error)
                | (FileStatus::Processing, FileStatus::Ready)
                | (FileStatus::Processing, FileStatus::Error)
                | (FileStatus::Error, FileStatus::Processing)
        )
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Viewer metadata attached once a file has been processed.
///
/// One shape per viewer; the variant must agree with the record's
/// [`FileType`] (translated types get `Aps`, everything else `Standard`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "viewerType", rename_all = "snake_case")]
pub enum FileMetadata {
    /// Model viewable through the translation service's viewer.
    #[serde(rename_all = "camelCase")]
    Aps {
        urn: String,
        bucket_key: String,
        object_key: String,
        derivative_status: String,
    },

    /// Natively viewable file, no remote processing involved.
    Standard { processed: bool },
}

impl FileMetadata {
    /// Build translated-model metadata, rejecting empty identifiers.
    pub fn aps(
        urn: impl Into<String>,
        bucket_key: impl Into<String>,
        object_key: impl Into<String>,
        derivative_status: impl Into<String>,
    ) -> Result<Self, FileError> {
        let urn = urn.into();
        let bucket_key = bucket_key.into();
        let object_key = object_key.into();
        let derivative_status = derivative_status.into();

        for (field, value) in [
            ("urn", &urn),
            ("bucketKey", &bucket_key),
            ("objectKey", &object_key),
            ("derivativeStatus", &derivative_status),
        ] {
            if value.trim().is_empty() {
                return Err(FileError::InvalidMetadata(format!("{} is empty", field)));
            }
        }

        Ok(FileMetadata::Aps {
            urn,
            bucket_key,
            object_key,
            derivative_status,
        })
    }

    pub fn standard() -> Self {
        FileMetadata::Standard { processed: true }
    }

    /// Whether this metadata shape belongs to the given file type.
    pub fn matches_type(&self, file_type: FileType) -> bool {
        match self {
            FileMetadata::Aps { .. } => file_type.needs_translation(),
            FileMetadata::Standard { .. } => !file_type.needs_translation(),
        }
    }
}

/// A tracked upload and its conversion state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub original_name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub detected_type: FileType,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FileMetadata>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Create a fresh record in `Uploading` with a new id.
    pub fn new(
        original_name: impl Into<String>,
        size_bytes: u64,
        mime_type: impl Into<String>,
        detected_type: FileType,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            original_name: original_name.into(),
            size_bytes,
            mime_type: mime_type.into(),
            detected_type,
            status: FileStatus::Uploading,
            error_message: None,
            metadata: None,
            uploaded_at: Utc::now(),
            processed_at: None,
        }
    }

    fn check_transition(&self, next: FileStatus) -> Result<(), FileError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(FileError::InvalidTransition {
                file_id: self.id.clone(),
                from: self.status,
                to: next,
            })
        }
    }

    /// Enter `Processing`, either from `Uploading` or (retry) from `Error`.
    ///
    /// Clears the previous error and metadata. `processed_at` is kept.
    pub fn begin_processing(&mut self) -> Result<(), FileError> {
        self.check_transition(FileStatus::Processing)?;
        self.status = FileStatus::Processing;
        self.error_message = None;
        self.metadata = None;
        Ok(())
    }

    /// Enter `Ready` with fully-populated metadata for this file's type.
    pub fn complete(&mut self, metadata: FileMetadata) -> Result<(), FileError> {
        self.check_transition(FileStatus::Ready)?;
        if !metadata.matches_type(self.detected_type) {
            return Err(FileError::InvalidMetadata(format!(
                "metadata does not match file type {}",
                self.detected_type.as_str()
            )));
        }
        self.status = FileStatus::Ready;
        self.metadata = Some(metadata);
        self.mark_processed();
        Ok(())
    }

    /// Enter `Error` with a message and whatever metadata was gathered so far.
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        partial: Option<FileMetadata>,
    ) -> Result<(), FileError> {
        self.check_transition(FileStatus::Error)?;
        self.status = FileStatus::Error;
        self.error_message = Some(message.into());
        self.metadata = partial;
        self.mark_processed();
        Ok(())
    }

    fn mark_processed(&mut self) {
        if self.processed_at.is_none() {
            self.processed_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(file_type: FileType) -> FileRecord {
        FileRecord::new("plan.dwg", 1024, "application/acad", file_type)
    }

    #[test]
    fn test_new_record_is_uploading() {
        let r = record(FileType::Autocad);
        assert_eq!(r.status, FileStatus::Uploading);
        assert!(r.error_message.is_none());
        assert!(r.metadata.is_none());
        assert!(r.processed_at.is_none());
        assert!(!r.id.is_empty());
    }

    #[test]
    fn test_happy_path_sets_processed_at() {
        let mut r = record(FileType::Pdf);
        r.begin_processing().unwrap();
        assert!(r.processed_at.is_none());
        r.complete(FileMetadata::standard()).unwrap();
        assert_eq!(r.status, FileStatus::Ready);
        assert!(r.processed_at.is_some());
    }

    #[test]
    fn test_ready_is_final() {
        let mut r = record(FileType::Pdf);
        r.begin_processing().unwrap();
        r.complete(FileMetadata::standard()).unwrap();

        assert!(matches!(
            r.begin_processing(),
            Err(FileError::InvalidTransition { .. })
        ));
        assert!(r.fail("late", None).is_err());
    }

    #[test]
    fn test_cannot_complete_from_uploading() {
        let mut r = record(FileType::Pdf);
        assert!(r.complete(FileMetadata::standard()).is_err());
        assert_eq!(r.status, FileStatus::Uploading);
    }

    #[test]
    fn test_retry_clears_error_keeps_processed_at() {
        let mut r = record(FileType::Autocad);
        r.begin_processing().unwrap();
        r.fail("translation failed", None).unwrap();
        let first_processed = r.processed_at;
        assert_eq!(r.error_message.as_deref(), Some("translation failed"));

        r.begin_processing().unwrap();
        assert_eq!(r.status, FileStatus::Processing);
        assert!(r.error_message.is_none());
        assert_eq!(r.processed_at, first_processed);

        r.fail("translation timeout", None).unwrap();
        assert_eq!(r.processed_at, first_processed);
    }

    #[test]
    fn test_metadata_must_match_type() {
        let mut r = record(FileType::Autocad);
        r.begin_processing().unwrap();
        let err = r.complete(FileMetadata::standard()).unwrap_err();
        assert!(matches!(err, FileError::InvalidMetadata(_)));
        assert_eq!(r.status, FileStatus::Processing);
    }

    #[test]
    fn test_aps_metadata_rejects_empty_urn() {
        let err = FileMetadata::aps("", "bucket", "plan.dwg", "success").unwrap_err();
        assert!(err.to_string().contains("urn"));
    }

    #[test]
    fn test_metadata_json_shape() {
        let meta = FileMetadata::aps("dXJu", "vellum-abc", "plan.dwg", "success").unwrap();
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["viewerType"], "aps");
        assert_eq!(json["urn"], "dXJu");
        assert_eq!(json["bucketKey"], "vellum-abc");
        assert_eq!(json["objectKey"], "plan.dwg");
        assert_eq!(json["derivativeStatus"], "success");

        let json = serde_json::to_value(FileMetadata::standard()).unwrap();
        assert_eq!(json, serde_json::json!({"viewerType": "standard", "processed": true}));
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let r = record(FileType::Autocad);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["originalName"], "plan.dwg");
        assert_eq!(json["detectedType"], "autocad");
        assert_eq!(json["status"], "uploading");
        assert!(json.get("errorMessage").is_none());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(FileStatus::parse("PROCESSING"), Some(FileStatus::Processing));
        assert_eq!(FileStatus::parse("error"), Some(FileStatus::Error));
        assert_eq!(FileStatus::parse("done"), None);
    }
}
