use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Translation credentials are present (startup must fail without them)
/// - Server port is not 0
/// - Upload ceiling and poll attempts are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.translation.client_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "translation.client_id is required".to_string(),
        ));
    }

    if config.translation.client_secret.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "translation.client_secret is required".to_string(),
        ));
    }

    if config.upload.max_file_size_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "upload.max_file_size_bytes cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.max_poll_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.max_poll_attempts cannot be 0".to_string(),
        ));
    }

    Ok(())
}
