//! Configuration validation.

use mgr_domain::error::{Error, Result};
use mgr_domain::value_objects::Namespace;

use super::types::AppConfig;

/// Reject configurations that cannot work before anything is wired.
///
/// # Errors
///
/// Returns a configuration error naming the first invalid value.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    Namespace::new(config.namespace.clone())
        .map_err(|_| Error::config(format!("invalid namespace '{}'", config.namespace)))?;

    if config.embeddings.dimensions == 0 {
        return Err(Error::config("embeddings.dimensions must be positive"));
    }

    let weights = &config.search;
    if weights.bm25_weight < 0.0 || weights.knn_weight < 0.0 {
        return Err(Error::config("search weights must be non-negative"));
    }
    if weights.bm25_weight + weights.knn_weight <= 0.0 {
        return Err(Error::config("at least one search weight must be positive"));
    }

    if config.security.scan_enabled && config.security.analyzers.is_empty() {
        return Err(Error::config(
            "security.analyzers must name at least one analyzer when scanning is enabled",
        ));
    }

    if config.security.scan_timeout_secs == 0 {
        return Err(Error::config("security.scan_timeout_secs must be positive"));
    }

    if config.tokens.enabled && config.tokens.buffer_minutes < 60 {
        return Err(Error::config(
            "tokens.buffer_minutes must be at least 60 (one hour before expiry)",
        ));
    }

    for credential in &config.tokens.credentials {
        if credential.name.trim().is_empty() {
            return Err(Error::config("token credential names must not be empty"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        validate_config(&AppConfig::default()).expect("defaults validate");
    }

    #[test]
    fn zero_dimensions_rejected() {
        let mut config = AppConfig::default();
        config.embeddings.dimensions = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn short_token_buffer_rejected() {
        let mut config = AppConfig::default();
        config.tokens.enabled = true;
        config.tokens.buffer_minutes = 30;
        assert!(validate_config(&config).is_err());
    }
}
