//! Translation service data types.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A bearer token and the moment it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is still usable at `now`, keeping `margin` in reserve.
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

/// A remote storage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketHandle {
    pub bucket_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

/// Acknowledgement of a submitted translation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationJobHandle {
    pub urn: String,
    /// Service-reported submission result (e.g. "success", "created").
    pub result: String,
}

/// Outcome class of a manifest, as seen by the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Pending,
    Success,
    Failed,
}

impl ManifestStatus {
    /// Map a raw manifest status string onto the three poll outcomes.
    ///
    /// `success` and `failed`/`timeout` are final; anything else
    /// (`pending`, `inprogress`, unknown) keeps the job pending.
    pub fn classify(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "success" => ManifestStatus::Success,
            "failed" | "timeout" => ManifestStatus::Failed,
            _ => ManifestStatus::Pending,
        }
    }
}

/// Status document of a translation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub status: ManifestStatus,
    /// Raw status string as reported by the service.
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

impl Manifest {
    pub fn from_raw(status: &str, progress: Option<String>) -> Self {
        Self {
            status: ManifestStatus::classify(status),
            detail: status.to_string(),
            progress,
        }
    }

    pub fn pending() -> Self {
        Self::from_raw("pending", Some("0% complete".to_string()))
    }

    pub fn success() -> Self {
        Self::from_raw("success", Some("complete".to_string()))
    }

    pub fn failed() -> Self {
        Self::from_raw("failed", None)
    }
}

/// URN for an uploaded object: its id, base64url-encoded without padding.
pub fn derive_urn(object_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(object_id.as_bytes())
}
