//! Configuration: typed settings, YAML loader, env overrides, validation.

mod loader;
mod types;
mod validation;

pub use loader::ConfigLoader;
pub use types::{
    AppConfig, AuditConfig, AuthConfig, CredentialConfig, EmbeddingsConfig, FederationSettings,
    HttpConfig, ProxyConfig, SecurityConfig, StorageBackendKind, StorageConfig, TokensConfig,
};
pub use validation::validate_config;
