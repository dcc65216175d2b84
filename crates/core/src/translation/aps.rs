//! Autodesk Platform Services (APS) translation client.
//!
//! Flow used by the orchestrator:
//! 1. Two-legged OAuth token (client credentials), cached until near expiry
//! 2. OSS bucket creation (409 means it already exists)
//! 3. Object upload through a signed S3 URL
//! 4. Model Derivative job submission and manifest polling

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::TranslationConfig;
use crate::metrics::observe_external_call;

use super::{
    AccessToken, BucketHandle, Manifest, TranslationClient, TranslationError,
    TranslationJobHandle,
};

/// Scopes needed for bucket management, uploads and translation.
const TOKEN_SCOPE: &str = "data:read data:write data:create bucket:create bucket:read";

/// Tokens are refreshed this long before their advertised expiry.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Buckets are only needed until the derivative is generated.
const BUCKET_POLICY: &str = "transient";

const SERVICE: &str = "aps";

/// APS client implementation.
pub struct ApsClient {
    client: Client,
    config: TranslationConfig,
    /// Cached token. Held across refresh so concurrent callers share one fetch.
    token: Mutex<Option<AccessToken>>,
}

impl ApsClient {
    /// Create a new APS client.
    pub fn new(config: TranslationConfig) -> Result<Self, TranslationError> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(TranslationError::NotConfigured(
                "APS client id and secret are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn object_path(&self, bucket_key: &str, object_key: &str) -> String {
        format!(
            "{}/oss/v2/buckets/{}/objects/{}/signeds3upload",
            self.base_url(),
            urlencoding::encode(bucket_key),
            urlencoding::encode(object_key)
        )
    }

    /// Drop the cached token so the next call fetches a fresh one.
    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn bearer(&self) -> Result<String, TranslationError> {
        Ok(self.authenticate().await?.value)
    }

    /// Turn a non-success response into the matching error.
    async fn check(&self, response: Response, operation: &str) -> Result<Response, TranslationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!("APS rejected {} with {}, dropping cached token", operation, status);
            self.invalidate_token().await;
            return Err(TranslationError::Auth(format!(
                "{} rejected with HTTP {}",
                operation,
                status.as_u16()
            )));
        }

        Err(TranslationError::Api {
            status: status.as_u16(),
            message: body,
        })
    }

    async fn parse<T: for<'de> Deserialize<'de>>(
        response: Response,
        what: &str,
    ) -> Result<T, TranslationError> {
        response.json::<T>().await.map_err(|e| {
            TranslationError::Parse(format!("Failed to parse {} response: {}", what, e))
        })
    }

    async fn fetch_token(&self) -> Result<AccessToken, TranslationError> {
        let url = format!("{}/authentication/v2/token", self.base_url());
        debug!("Requesting APS token");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", TOKEN_SCOPE)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::BAD_REQUEST
        {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Auth(format!(
                "credentials rejected (HTTP {}): {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        let token: TokenResponse = Self::parse(response, "token").await?;
        let expires_at = chrono::Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                TranslationError::Parse(format!(
                    "token expires_in out of range: {}",
                    token.expires_in
                ))
            })?;

        Ok(AccessToken {
            value: token.access_token,
            expires_at,
        })
    }

    async fn bucket_details(&self, bucket_key: &str) -> Result<BucketHandle, TranslationError> {
        let url = format!(
            "{}/oss/v2/buckets/{}/details",
            self.base_url(),
            urlencoding::encode(bucket_key)
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        let response = self.check(response, "bucket details").await?;
        let bucket: BucketResponse = Self::parse(response, "bucket details").await?;
        Ok(bucket.into())
    }

    async fn do_create_bucket(&self, bucket_key: &str) -> Result<BucketHandle, TranslationError> {
        let url = format!("{}/oss/v2/buckets", self.base_url());
        debug!("Creating APS bucket '{}'", bucket_key);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.bearer().await?)
            .json(&CreateBucketRequest {
                bucket_key,
                policy_key: BUCKET_POLICY,
            })
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            debug!("Bucket '{}' already exists, reusing it", bucket_key);
            return self.bucket_details(bucket_key).await;
        }

        let response = self.check(response, "create bucket").await?;
        let bucket: BucketResponse = Self::parse(response, "create bucket").await?;
        Ok(bucket.into())
    }

    async fn do_upload_object(
        &self,
        bucket_key: &str,
        object_key: &str,
        content: Bytes,
    ) -> Result<String, TranslationError> {
        let url = self.object_path(bucket_key, object_key);
        let token = self.bearer().await?;
        debug!(
            "Uploading {} bytes to APS object '{}/{}'",
            content.len(),
            bucket_key,
            object_key
        );

        let response = self.client.get(&url).bearer_auth(&token).send().await?;
        let response = self.check(response, "signed upload url").await?;
        let signed: SignedUploadResponse = Self::parse(response, "signed upload url").await?;

        let target = signed.urls.first().ok_or_else(|| {
            TranslationError::Parse("signed upload response contained no urls".to_string())
        })?;

        // The signed URL carries its own authorization.
        let response = self.client.put(target).body(content).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Api {
                status,
                message: body,
            });
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&CompleteUploadRequest {
                upload_key: &signed.upload_key,
            })
            .send()
            .await?;
        let response = self.check(response, "complete upload").await?;
        let object: ObjectResponse = Self::parse(response, "complete upload").await?;

        Ok(object.object_id)
    }

    async fn do_submit_translation(
        &self,
        urn: &str,
    ) -> Result<TranslationJobHandle, TranslationError> {
        let url = format!("{}/modelderivative/v2/designdata/job", self.base_url());
        debug!("Submitting translation job for {}", urn);

        let body = serde_json::json!({
            "input": { "urn": urn },
            "output": {
                "formats": [
                    { "type": self.config.output_format, "views": ["2d", "3d"] }
                ]
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.bearer().await?)
            .header("x-ads-force", "true")
            .json(&body)
            .send()
            .await?;
        let response = self.check(response, "submit translation").await?;
        let job: JobResponse = Self::parse(response, "translation job").await?;

        Ok(TranslationJobHandle {
            urn: job.urn.unwrap_or_else(|| urn.to_string()),
            result: job.result,
        })
    }

    async fn do_get_manifest(&self, urn: &str) -> Result<Manifest, TranslationError> {
        let url = format!(
            "{}/modelderivative/v2/designdata/{}/manifest",
            self.base_url(),
            urn
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        let response = self.check(response, "manifest").await?;
        let manifest: ManifestResponse = Self::parse(response, "manifest").await?;

        debug!(
            "Manifest for {}: status={}, progress={:?}",
            urn, manifest.status, manifest.progress
        );
        Ok(Manifest::from_raw(&manifest.status, manifest.progress))
    }
}

/// Run one remote operation and record its duration and outcome.
async fn timed<T, F>(operation: &str, fut: F) -> Result<T, TranslationError>
where
    F: Future<Output = Result<T, TranslationError>>,
{
    let start = Instant::now();
    let result = fut.await;
    observe_external_call(
        SERVICE,
        operation,
        result.is_ok(),
        start.elapsed().as_secs_f64(),
    );
    result
}

#[async_trait]
impl TranslationClient for ApsClient {
    fn name(&self) -> &str {
        "aps"
    }

    async fn authenticate(&self) -> Result<AccessToken, TranslationError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(
                Utc::now(),
                chrono::Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS),
            ) {
                return Ok(token.clone());
            }
        }

        let token = timed("authenticate", self.fetch_token()).await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn create_bucket(&self, bucket_key: &str) -> Result<BucketHandle, TranslationError> {
        timed("create_bucket", self.do_create_bucket(bucket_key)).await
    }

    async fn upload_object(
        &self,
        bucket_key: &str,
        object_key: &str,
        content: Bytes,
    ) -> Result<String, TranslationError> {
        timed(
            "upload_object",
            self.do_upload_object(bucket_key, object_key, content),
        )
        .await
    }

    async fn submit_translation(&self, urn: &str) -> Result<TranslationJobHandle, TranslationError> {
        timed("submit_translation", self.do_submit_translation(urn)).await
    }

    async fn get_manifest(&self, urn: &str) -> Result<Manifest, TranslationError> {
        timed("get_manifest", self.do_get_manifest(urn)).await
    }
}

// ============================================================================
// APS API Response Types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBucketRequest<'a> {
    bucket_key: &'a str,
    policy_key: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketResponse {
    bucket_key: String,
    #[serde(default)]
    bucket_owner: Option<String>,
    #[serde(default)]
    policy_key: Option<String>,
}

impl From<BucketResponse> for BucketHandle {
    fn from(b: BucketResponse) -> Self {
        BucketHandle {
            bucket_key: b.bucket_key,
            owner: b.bucket_owner,
            policy: b.policy_key,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedUploadResponse {
    upload_key: String,
    urls: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteUploadRequest<'a> {
    upload_key: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResponse {
    object_id: String,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    result: String,
    #[serde(default)]
    urn: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ManifestResponse {
    status: String,
    #[serde(default)]
    progress: Option<String>,
}
