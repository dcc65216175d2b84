//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, so uploads run through the full
//! conversion pipeline against in-memory doubles.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use vellum_core::{
    testing::{InstantSleeper, MemoryArtifactStorage, MockTranslationClient},
    ArtifactStorage, Config, ConversionOrchestrator, FileStore, InMemoryFileStore,
    OrchestratorConfig, ServerConfig, Sleeper, TranslationClient, TranslationConfig,
    UploadConfig,
};
use vellum_server::state::AppState;

/// Re-export fixtures for test convenience
pub use vellum_core::testing::fixtures;

/// Multipart boundary used by [`TestFixture::upload`].
const BOUNDARY: &str = "vellum-test-boundary";

/// Test fixture for API testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Translation service (MockTranslationClient)
/// - Artifact bytes (MemoryArtifactStorage)
/// - Timers (InstantSleeper)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_upload() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.upload(&[("spec.pdf", "application/pdf", b"%PDF")]).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// File record store shared with the router
    pub store: Arc<InMemoryFileStore>,
    /// Stored artifact bytes
    pub storage: Arc<MemoryArtifactStorage>,
    /// Mock translation client - script manifests, inspect calls
    pub client: Arc<MockTranslationClient>,
    /// Records pipeline waits
    pub sleeper: Arc<InstantSleeper>,
    /// Orchestrator shared with the router
    pub orchestrator: ConversionOrchestrator,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response with the raw body and headers
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestFixture {
    /// Create a new test fixture with default configuration.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let store = Arc::new(InMemoryFileStore::new());
        let storage = Arc::new(MemoryArtifactStorage::new());
        let client = Arc::new(MockTranslationClient::new());
        let sleeper = Arc::new(InstantSleeper::new());

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            upload: UploadConfig {
                max_file_size_bytes: test_config.max_file_size_bytes,
                ..Default::default()
            },
            translation: TranslationConfig::new("test-client", "test-secret"),
            orchestrator: OrchestratorConfig::default(),
        };

        let orchestrator = ConversionOrchestrator::new(
            config.orchestrator.clone(),
            config.translation.bucket_prefix.clone(),
            Arc::clone(&store) as Arc<dyn FileStore>,
            Arc::clone(&storage) as Arc<dyn ArtifactStorage>,
            Arc::clone(&client) as Arc<dyn TranslationClient>,
            Arc::clone(&sleeper) as Arc<dyn Sleeper>,
        );

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn FileStore>,
            Arc::clone(&storage) as Arc<dyn ArtifactStorage>,
            orchestrator.clone(),
        ));

        let router = vellum_server::api::create_router(state);

        Self {
            router,
            store,
            storage,
            client,
            sleeper,
            orchestrator,
        }
    }

    /// Let every running pipeline finish.
    pub async fn settle(&self) {
        for _ in 0..10_000 {
            if self.orchestrator.status().active_runs == 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("pipelines did not settle");
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a PATCH request with JSON body.
    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Upload files as `(filename, mime type, content)` in the `files` field.
    pub async fn upload(&self, files: &[(&str, &str, &[u8])]) -> TestResponse {
        self.multipart("files", files).await
    }

    /// Send a multipart upload using an arbitrary field name.
    pub async fn multipart(&self, field: &str, files: &[(&str, &str, &[u8])]) -> TestResponse {
        let mut body = Vec::new();
        for (filename, mime_type, content) in files {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    field, filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/files/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        let raw = self.send(request).await;
        TestResponse {
            status: raw.status,
            body: to_json(&raw.body),
        }
    }

    /// Send a GET request and keep the raw body and headers.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        let raw = self.send(request).await;

        TestResponse {
            status: raw.status,
            body: to_json(&raw.body),
        }
    }

    async fn send(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        RawResponse {
            status,
            headers,
            body,
        }
    }
}

fn to_json(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Per-file upload ceiling
    pub max_file_size_bytes: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 50 * 1024 * 1024,
        }
    }
}

impl TestConfig {
    /// Create config with a small upload ceiling.
    pub fn with_max_file_size(max_file_size_bytes: u64) -> Self {
        Self {
            max_file_size_bytes,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
