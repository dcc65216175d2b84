//! Mock translation client for testing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::translation::{
    AccessToken, BucketHandle, Manifest, TranslationClient, TranslationError,
    TranslationJobHandle,
};

/// A recorded object upload for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub bucket_key: String,
    pub object_key: String,
    pub size_bytes: usize,
    pub object_id: String,
}

#[derive(Debug, Default)]
struct MockState {
    /// Buckets that exist remotely, by key.
    buckets: HashMap<String, BucketHandle>,
    /// Every create_bucket call, in order.
    bucket_calls: Vec<String>,
    uploads: Vec<RecordedUpload>,
    submissions: Vec<String>,
    /// Manifests returned in order before falling back to `default_manifest`.
    manifests: VecDeque<Manifest>,
    default_manifest: Option<Manifest>,
    auth_calls: u32,
    manifest_calls: u32,
    reject_credentials: bool,
    next_upload_error: Option<TranslationError>,
    next_manifest_error: Option<TranslationError>,
}

/// Mock implementation of the TranslationClient trait.
///
/// Provides controllable behavior for testing:
/// - Scripted manifest responses
/// - Recorded buckets, uploads and submissions for assertions
/// - Simulated failures
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTranslationClient::new();
/// client.push_manifest(Manifest::pending()).await;
/// client.push_manifest(Manifest::success()).await;
///
/// // ... run a pipeline ...
///
/// assert_eq!(client.manifest_calls().await, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTranslationClient {
    state: Arc<RwLock<MockState>>,
}

impl MockTranslationClient {
    /// Create a new mock client. Manifests report success unless scripted otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a manifest to be returned by the next unanswered poll.
    pub async fn push_manifest(&self, manifest: Manifest) {
        self.state.write().await.manifests.push_back(manifest);
    }

    /// Manifest returned once the scripted queue is empty.
    pub async fn set_default_manifest(&self, manifest: Manifest) {
        self.state.write().await.default_manifest = Some(manifest);
    }

    /// Make every authentication attempt fail.
    pub async fn reject_credentials(&self) {
        self.state.write().await.reject_credentials = true;
    }

    /// Configure the next upload to fail with the given error.
    pub async fn fail_uploads_with(&self, error: TranslationError) {
        self.state.write().await.next_upload_error = Some(error);
    }

    /// Configure the next manifest poll to fail with the given error.
    pub async fn set_next_manifest_error(&self, error: TranslationError) {
        self.state.write().await.next_manifest_error = Some(error);
    }

    /// Keys passed to create_bucket, in call order.
    pub async fn created_buckets(&self) -> Vec<String> {
        self.state.read().await.bucket_calls.clone()
    }

    /// Distinct buckets that exist on the mock service.
    pub async fn bucket_count(&self) -> usize {
        self.state.read().await.buckets.len()
    }

    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.read().await.uploads.clone()
    }

    /// URNs submitted for translation, in call order.
    pub async fn submissions(&self) -> Vec<String> {
        self.state.read().await.submissions.clone()
    }

    pub async fn manifest_calls(&self) -> u32 {
        self.state.read().await.manifest_calls
    }

    /// Number of calls of any kind made against the mock.
    pub async fn total_calls(&self) -> usize {
        let state = self.state.read().await;
        state.auth_calls as usize
            + state.bucket_calls.len()
            + state.uploads.len()
            + state.submissions.len()
            + state.manifest_calls as usize
    }
}

#[async_trait]
impl TranslationClient for MockTranslationClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn authenticate(&self) -> Result<AccessToken, TranslationError> {
        let mut state = self.state.write().await;
        state.auth_calls += 1;
        if state.reject_credentials {
            return Err(TranslationError::Auth(
                "credentials rejected (HTTP 401)".to_string(),
            ));
        }
        Ok(AccessToken {
            value: "mock-token".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    async fn create_bucket(&self, bucket_key: &str) -> Result<BucketHandle, TranslationError> {
        let mut state = self.state.write().await;
        state.bucket_calls.push(bucket_key.to_string());
        let bucket = state
            .buckets
            .entry(bucket_key.to_string())
            .or_insert_with(|| BucketHandle {
                bucket_key: bucket_key.to_string(),
                owner: Some("mock-client".to_string()),
                policy: Some("transient".to_string()),
            });
        Ok(bucket.clone())
    }

    async fn upload_object(
        &self,
        bucket_key: &str,
        object_key: &str,
        content: Bytes,
    ) -> Result<String, TranslationError> {
        let mut state = self.state.write().await;
        if let Some(err) = state.next_upload_error.take() {
            return Err(err);
        }
        if !state.buckets.contains_key(bucket_key) {
            return Err(TranslationError::Api {
                status: 404,
                message: format!("bucket {} does not exist", bucket_key),
            });
        }

        let object_id = format!("urn:adsk.objects:os.object:{}/{}", bucket_key, object_key);
        state.uploads.push(RecordedUpload {
            bucket_key: bucket_key.to_string(),
            object_key: object_key.to_string(),
            size_bytes: content.len(),
            object_id: object_id.clone(),
        });
        Ok(object_id)
    }

    async fn submit_translation(&self, urn: &str) -> Result<TranslationJobHandle, TranslationError> {
        self.state.write().await.submissions.push(urn.to_string());
        Ok(TranslationJobHandle {
            urn: urn.to_string(),
            result: "created".to_string(),
        })
    }

    async fn get_manifest(&self, _urn: &str) -> Result<Manifest, TranslationError> {
        let mut state = self.state.write().await;
        state.manifest_calls += 1;
        if let Some(err) = state.next_manifest_error.take() {
            return Err(err);
        }
        let manifest = match state.manifests.pop_front() {
            Some(m) => m,
            None => state.default_manifest.clone().unwrap_or_else(Manifest::success),
        };
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::ManifestStatus;

    #[tokio::test]
    async fn test_bucket_creation_is_idempotent() {
        let client = MockTranslationClient::new();
        let a = client.create_bucket("vellum-1").await.unwrap();
        let b = client.create_bucket("vellum-1").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(client.bucket_count().await, 1);
        assert_eq!(client.created_buckets().await.len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_manifests_then_default() {
        let client = MockTranslationClient::new();
        client.push_manifest(Manifest::pending()).await;
        client.set_default_manifest(Manifest::failed()).await;

        assert_eq!(
            client.get_manifest("u").await.unwrap().status,
            ManifestStatus::Pending
        );
        assert_eq!(
            client.get_manifest("u").await.unwrap().status,
            ManifestStatus::Failed
        );
        assert_eq!(client.manifest_calls().await, 2);
    }

    #[tokio::test]
    async fn test_upload_requires_bucket() {
        let client = MockTranslationClient::new();
        let err = client
            .upload_object("nope", "a.dwg", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::Api { status: 404, .. }));
    }
}
