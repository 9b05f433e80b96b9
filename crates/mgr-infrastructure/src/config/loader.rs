//!
//! Configuration loader — YAML-based.
//!
//! Loads `AppConfig` from YAML configuration files. Application settings
//! live under the `settings:` key in `config/{env}.yaml`, with
//! `config/{env}.local.yaml` as the highest-priority file override.
//! Environment is resolved from `MGR_ENV` (default: `development`).
//! Recognized environment variables override file values last.

use std::env;
use std::path::{Path, PathBuf};

use mgr_domain::error::{Error, Result};

use super::types::{AppConfig, StorageBackendKind};
use super::validation::validate_config;

/// Configuration loader service.
#[derive(Clone, Default)]
pub struct ConfigLoader {
    /// Optional explicit config file path (overrides environment resolution)
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set an explicit configuration file path (overrides env-based
    /// resolution).
    #[must_use]
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration.
    ///
    /// Resolution order:
    /// 1. Explicit path (via `with_config_path`)
    /// 2. `config/{env}.local.yaml`
    /// 3. `config/{env}.yaml`
    /// 4. Built-in defaults when no file exists
    ///
    /// Recognized environment variables are applied on top, then the result
    /// is validated.
    ///
    /// # Errors
    ///
    /// Returns an error when parsing fails or validation detects invalid
    /// values.
    pub fn load(&self) -> Result<AppConfig> {
        let mut config = match self.find_yaml_config_path() {
            Some(path) => {
                mgr_domain::info!("config", "configuration loaded", &path.display());
                Self::parse_file(&path)?
            }
            None => {
                mgr_domain::info!("config", "no config file found, using defaults");
                AppConfig::default()
            }
        };

        Self::apply_env_overrides(&mut config)?;
        validate_config(&config)?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config_with_source("failed to read config file", e))?;
        let yaml: serde_yaml::Value = serde_yaml::from_str(&content)
            .map_err(|e| Error::config_with_source("failed to parse config YAML", e))?;

        let settings = yaml.get("settings").ok_or_else(|| {
            Error::config("no 'settings' key found in YAML configuration file")
        })?;
        serde_yaml::from_value(settings.clone())
            .map_err(|e| Error::config_with_source("failed to deserialize settings", e))
    }

    fn find_yaml_config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return path.exists().then(|| path.clone());
        }

        let env_name = env::var("MGR_ENV").unwrap_or_else(|_| "development".to_owned());
        let candidates = [
            format!("config/{env_name}.local.yaml"),
            format!("config/{env_name}.yaml"),
        ];

        let mut dir = env::current_dir().ok()?;
        loop {
            for candidate in &candidates {
                let path = dir.join(candidate);
                if path.exists() {
                    return Some(path);
                }
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
        if let Ok(backend) = env::var("STORAGE_BACKEND") {
            config.storage.backend = match backend.as_str() {
                "file" => StorageBackendKind::File,
                "distributed-index" => StorageBackendKind::DistributedIndex,
                other => {
                    return Err(Error::config(format!(
                        "STORAGE_BACKEND must be 'file' or 'distributed-index', got '{other}'"
                    )));
                }
            };
        }
        if let Ok(url) = env::var("INDEX_URL") {
            config.storage.index_url = url;
        }
        if let Ok(username) = env::var("INDEX_USERNAME") {
            config.storage.index_username = Some(username);
        }
        if let Ok(password) = env::var("INDEX_PASSWORD") {
            config.storage.index_password = Some(password);
        }

        if let Ok(provider) = env::var("EMBEDDINGS_PROVIDER") {
            config.embeddings.provider = provider;
        }
        if let Ok(model) = env::var("EMBEDDINGS_MODEL_NAME") {
            config.embeddings.model = Some(model);
        }
        if let Ok(dimensions) = env::var("EMBEDDINGS_MODEL_DIMENSIONS") {
            config.embeddings.dimensions = dimensions.parse().map_err(|_| {
                Error::config("EMBEDDINGS_MODEL_DIMENSIONS must be a positive integer")
            })?;
        }

        if let Ok(enabled) = env::var("SECURITY_SCAN_ENABLED") {
            config.security.scan_enabled = parse_bool("SECURITY_SCAN_ENABLED", &enabled)?;
        }
        if let Ok(enabled) = env::var("SECURITY_SCAN_ON_REGISTRATION") {
            config.security.scan_on_registration =
                parse_bool("SECURITY_SCAN_ON_REGISTRATION", &enabled)?;
        }
        if let Ok(enabled) = env::var("SECURITY_SCAN_BLOCK_UNSAFE_SERVERS") {
            config.security.block_unsafe_servers =
                parse_bool("SECURITY_SCAN_BLOCK_UNSAFE_SERVERS", &enabled)?;
        }
        if let Ok(analyzers) = env::var("SECURITY_ANALYZERS") {
            config.security.analyzers = analyzers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Ok(timeout) = env::var("SECURITY_SCAN_TIMEOUT") {
            config.security.scan_timeout_secs = timeout
                .parse()
                .map_err(|_| Error::config("SECURITY_SCAN_TIMEOUT must be seconds"))?;
        }
        Ok(())
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!("{name} must be a boolean, got '{raw}'"))),
    }
}
