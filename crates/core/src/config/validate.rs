use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Extraction and processor timeouts are non-zero
/// - Configured endpoints are http(s) URLs
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.extraction.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "extraction.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.processors.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "processors.timeout_secs cannot be 0".to_string(),
        ));
    }

    for (key, endpoint) in [
        ("extraction.analyzer_endpoint", &config.extraction.analyzer_endpoint),
        ("processors.ai_endpoint", &config.processors.ai_endpoint),
        ("processors.invoice_endpoint", &config.processors.invoice_endpoint),
    ] {
        if let Some(url) = endpoint {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "{key} must be an http(s) URL, got '{url}'"
                )));
            }
        }
    }

    Ok(())
}
