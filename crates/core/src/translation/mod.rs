//! Remote translation service integration.
//!
//! The orchestrator only sees the [`TranslationClient`] trait; [`ApsClient`]
//! is the HTTP implementation against the Autodesk Platform Services APIs
//! (OAuth, OSS buckets/objects, Model Derivative jobs and manifests).

mod aps;
mod types;

pub use aps::ApsClient;
pub use types::*;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur when talking to the translation service.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Credentials were rejected or the token is no longer accepted.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (connect, timeout, broken body).
    #[error("Request failed: {0}")]
    Request(String),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Client not configured (missing credentials, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for TranslationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TranslationError::Parse(e.to_string())
        } else {
            TranslationError::Request(e.to_string())
        }
    }
}

/// Contract the conversion orchestrator needs from the translation service.
#[async_trait]
pub trait TranslationClient: Send + Sync {
    /// Returns the name of this client implementation.
    fn name(&self) -> &str;

    /// Get an access token, reusing a cached one until shortly before expiry.
    async fn authenticate(&self) -> Result<AccessToken, TranslationError>;

    /// Create a bucket. If it already exists, return the existing bucket.
    async fn create_bucket(&self, bucket_key: &str) -> Result<BucketHandle, TranslationError>;

    /// Upload bytes into a bucket and return the remote object id.
    async fn upload_object(
        &self,
        bucket_key: &str,
        object_key: &str,
        content: Bytes,
    ) -> Result<String, TranslationError>;

    /// Start translating the object referenced by `urn`.
    async fn submit_translation(&self, urn: &str) -> Result<TranslationJobHandle, TranslationError>;

    /// Fetch the current manifest for `urn`.
    async fn get_manifest(&self, urn: &str) -> Result<Manifest, TranslationError>;
}
