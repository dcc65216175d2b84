use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;

/// Largest artifact accepted by the upload endpoint (50 MiB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    pub translation: TranslationConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Upload configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Per-file size ceiling in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Directory where uploaded bytes are kept for download.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            storage_dir: default_storage_dir(),
        }
    }
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE_BYTES
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("uploads")
}

/// Remote translation service configuration.
///
/// Credentials have no defaults: a missing `client_id`/`client_secret`
/// fails at load or validation time, never at first use.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
    pub client_id: String,
    pub client_secret: String,
    /// API host (default: https://developer.api.autodesk.com).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Prefix for generated bucket keys.
    #[serde(default = "default_bucket_prefix")]
    pub bucket_prefix: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Derivative format requested from the translation job.
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

impl TranslationConfig {
    /// Config with the given credentials and defaults for everything else.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: default_base_url(),
            bucket_prefix: default_bucket_prefix(),
            timeout_secs: default_timeout(),
            output_format: default_output_format(),
        }
    }
}

fn default_base_url() -> String {
    "https://developer.api.autodesk.com".to_string()
}

fn default_bucket_prefix() -> String {
    "vellum".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_output_format() -> String {
    "svf2".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub translation: SanitizedTranslationConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized translation config (secret hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTranslationConfig {
    pub client_id: String,
    pub client_secret_configured: bool,
    pub base_url: String,
    pub bucket_prefix: String,
    pub timeout_secs: u32,
    pub output_format: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let t = &config.translation;
        Self {
            server: config.server.clone(),
            upload: config.upload.clone(),
            translation: SanitizedTranslationConfig {
                client_id: t.client_id.clone(),
                client_secret_configured: !t.client_secret.is_empty(),
                base_url: t.base_url.clone(),
                bucket_prefix: t.bucket_prefix.clone(),
                timeout_secs: t.timeout_secs,
                output_format: t.output_format.clone(),
            },
            orchestrator: config.orchestrator.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
[translation]
client_id = "id"
client_secret = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.upload.max_file_size_bytes, 52_428_800);
        assert_eq!(config.upload.storage_dir.to_str().unwrap(), "uploads");
        assert_eq!(config.translation.base_url, "https://developer.api.autodesk.com");
        assert_eq!(config.translation.timeout_secs, 30);
        assert_eq!(config.translation.output_format, "svf2");
        assert_eq!(config.orchestrator.max_poll_attempts, 30);
    }

    #[test]
    fn test_deserialize_missing_credentials_fails() {
        let toml = r#"
[translation]
client_id = "id"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_custom_upload() {
        let toml = r#"
[upload]
max_file_size_bytes = 1024
storage_dir = "/data/files"

[translation]
client_id = "id"
client_secret = "secret"
bucket_prefix = "plans"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.upload.max_file_size_bytes, 1024);
        assert_eq!(config.upload.storage_dir.to_str().unwrap(), "/data/files");
        assert_eq!(config.translation.bucket_prefix, "plans");
    }

    #[test]
    fn test_sanitized_config_hides_secret() {
        let config = Config {
            server: ServerConfig::default(),
            upload: UploadConfig::default(),
            translation: TranslationConfig::new("my-client", "super-secret"),
            orchestrator: OrchestratorConfig::default(),
        };

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.translation.client_id, "my-client");
        assert!(sanitized.translation.client_secret_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("super-secret"));
    }
}
