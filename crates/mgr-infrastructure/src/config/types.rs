//! Typed application settings.
//!
//! Everything carries serde defaults so a minimal YAML file works; the
//! loader then applies environment overrides and validation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use mgr_domain::constants::scan::DEFAULT_SCAN_TIMEOUT_SECS;
use mgr_domain::constants::search::LOCAL_EMBEDDING_DIMENSIONS;
use mgr_domain::value_objects::HybridSearchSettings;

/// Which storage backend to wire at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackendKind {
    /// JSON files on disk; single-node development
    #[default]
    File,
    /// OpenSearch-compatible distributed index
    DistributedIndex,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind address
    #[serde(default = "HttpConfig::default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "HttpConfig::default_port")]
    pub port: u16,
    /// Display name of this registry in federation topology
    #[serde(default = "HttpConfig::default_name")]
    pub registry_name: String,
}

impl HttpConfig {
    fn default_host() -> String {
        "0.0.0.0".to_owned()
    }

    fn default_port() -> u16 {
        7860
    }

    fn default_name() -> String {
        "mcp-gateway-registry".to_owned()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            registry_name: Self::default_name(),
        }
    }
}

/// Storage backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selection (`STORAGE_BACKEND` override)
    #[serde(default)]
    pub backend: StorageBackendKind,
    /// Root directory for the file backend
    #[serde(default = "StorageConfig::default_root")]
    pub root_dir: PathBuf,
    /// Index endpoint URL
    #[serde(default = "StorageConfig::default_index_url")]
    pub index_url: String,
    /// Index basic-auth username
    #[serde(default)]
    pub index_username: Option<String>,
    /// Index basic-auth password
    #[serde(default)]
    pub index_password: Option<String>,
    /// Index request timeout
    #[serde(default = "StorageConfig::default_timeout")]
    pub index_timeout_secs: u64,
    /// Drop and recreate indices at startup
    #[serde(default)]
    pub recreate_indices: bool,
}

impl StorageConfig {
    fn default_root() -> PathBuf {
        PathBuf::from("./data")
    }

    fn default_index_url() -> String {
        "http://localhost:9200".to_owned()
    }

    fn default_timeout() -> u64 {
        10
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            root_dir: Self::default_root(),
            index_url: Self::default_index_url(),
            index_username: None,
            index_password: None,
            index_timeout_secs: Self::default_timeout(),
            recreate_indices: false,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Provider name resolved from the registry
    /// (`EMBEDDINGS_PROVIDER` override)
    #[serde(default = "EmbeddingsConfig::default_provider")]
    pub provider: String,
    /// Model identifier (`EMBEDDINGS_MODEL_NAME` override)
    #[serde(default)]
    pub model: Option<String>,
    /// Vector dimension (`EMBEDDINGS_MODEL_DIMENSIONS` override)
    #[serde(default = "EmbeddingsConfig::default_dimensions")]
    pub dimensions: usize,
    /// API endpoint for hosted providers
    #[serde(default)]
    pub base_url: Option<String>,
    /// API key for hosted providers
    #[serde(default)]
    pub api_key: Option<String>,
}

impl EmbeddingsConfig {
    fn default_provider() -> String {
        "null".to_owned()
    }

    fn default_dimensions() -> usize {
        LOCAL_EMBEDDING_DIMENSIONS
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: Self::default_provider(),
            model: None,
            dimensions: Self::default_dimensions(),
            base_url: None,
            api_key: None,
        }
    }
}

/// Ingress and federation auth settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// JWKS endpoint of the identity provider
    #[serde(default)]
    pub jwks_url: Option<String>,
    /// HS256 shared secret; development fallback when no JWKS is configured
    #[serde(default)]
    pub shared_secret: Option<String>,
    /// Expected `iss` claim
    #[serde(default)]
    pub issuer: Option<String>,
    /// Expected `aud` claim
    #[serde(default)]
    pub audience: Option<String>,
    /// Pre-shared token accepted on the federation export endpoints
    #[serde(default)]
    pub federation_token: Option<String>,
    /// Expected client id for OAuth2-authenticated peers
    #[serde(default)]
    pub expected_client_id: Option<String>,
    /// Expected issuer for OAuth2-authenticated peers
    #[serde(default)]
    pub expected_issuer: Option<String>,
}

/// Security-scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Master switch (`SECURITY_SCAN_ENABLED` override)
    #[serde(default = "SecurityConfig::default_true")]
    pub scan_enabled: bool,
    /// Gate registration behind a scan
    /// (`SECURITY_SCAN_ON_REGISTRATION` override)
    #[serde(default = "SecurityConfig::default_true")]
    pub scan_on_registration: bool,
    /// Block enabling servers with an `unsafe` verdict
    /// (`SECURITY_SCAN_BLOCK_UNSAFE_SERVERS` override)
    #[serde(default = "SecurityConfig::default_true")]
    pub block_unsafe_servers: bool,
    /// Analyzer names to run (`SECURITY_ANALYZERS` override, comma-separated)
    #[serde(default = "SecurityConfig::default_analyzers")]
    pub analyzers: Vec<String>,
    /// Per-scan wall-clock cap (`SECURITY_SCAN_TIMEOUT` override)
    #[serde(default = "SecurityConfig::default_timeout")]
    pub scan_timeout_secs: u64,
    /// Optional operator rules file for the rules analyzer
    #[serde(default)]
    pub rules_path: Option<String>,
    /// Cadence of the registry-wide sweep; unset disables it
    #[serde(default)]
    pub sweep_interval_minutes: Option<u64>,
}

impl SecurityConfig {
    fn default_true() -> bool {
        true
    }

    fn default_analyzers() -> Vec<String> {
        vec!["rules".to_owned()]
    }

    fn default_timeout() -> u64 {
        DEFAULT_SCAN_TIMEOUT_SECS
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            scan_enabled: true,
            scan_on_registration: true,
            block_unsafe_servers: true,
            analyzers: Self::default_analyzers(),
            scan_timeout_secs: Self::default_timeout(),
            rules_path: None,
            sweep_interval_minutes: None,
        }
    }
}

/// Federation worker settings (peer definitions live in storage).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FederationSettings {
    /// Sync every enabled peer during startup
    #[serde(default)]
    pub sync_on_startup: bool,
}

/// One OAuth credential the token refresher keeps fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Credential name; egress credentials match servers by `auth_type`
    pub name: String,
    /// Token endpoint
    pub token_url: String,
    /// Client id
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
    /// Optional scope parameter
    #[serde(default)]
    pub scope: Option<String>,
}

/// Token refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensConfig {
    /// Whether the refresher runs
    #[serde(default)]
    pub enabled: bool,
    /// Minutes between wake-ups
    #[serde(default = "TokensConfig::default_interval")]
    pub refresh_interval_minutes: u64,
    /// Refresh ahead of expiry by at least this many minutes
    #[serde(default = "TokensConfig::default_buffer")]
    pub buffer_minutes: i64,
    /// Directory for client config artifacts
    #[serde(default = "TokensConfig::default_dir")]
    pub dir: PathBuf,
    /// Gateway base URL written into artifacts
    #[serde(default = "TokensConfig::default_gateway")]
    pub gateway_base_url: String,
    /// Credentials to keep fresh
    #[serde(default)]
    pub credentials: Vec<CredentialConfig>,
}

impl TokensConfig {
    fn default_interval() -> u64 {
        15
    }

    fn default_buffer() -> i64 {
        60
    }

    fn default_dir() -> PathBuf {
        PathBuf::from("./tokens")
    }

    fn default_gateway() -> String {
        "http://localhost:7860".to_owned()
    }
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            refresh_interval_minutes: Self::default_interval(),
            buffer_minutes: Self::default_buffer(),
            dir: Self::default_dir(),
            gateway_base_url: Self::default_gateway(),
            credentials: Vec::new(),
        }
    }
}

/// Audit sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory for JSONL audit files
    #[serde(default = "AuditConfig::default_dir")]
    pub dir: PathBuf,
}

impl AuditConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from("./audit")
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
        }
    }
}

/// Gateway proxy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Per-request timeout
    #[serde(default = "ProxyConfig::default_timeout")]
    pub timeout_secs: u64,
    /// Connection pool bound per backend host
    #[serde(default = "ProxyConfig::default_pool")]
    pub max_idle_per_host: usize,
    /// In-flight proxied requests allowed before shedding with 503
    #[serde(default = "ProxyConfig::default_concurrency")]
    pub max_concurrent_requests: usize,
}

impl ProxyConfig {
    fn default_timeout() -> u64 {
        30
    }

    fn default_pool() -> usize {
        32
    }

    fn default_concurrency() -> usize {
        256
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
            max_idle_per_host: Self::default_pool(),
            max_concurrent_requests: Self::default_concurrency(),
        }
    }
}

/// Root application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener
    #[serde(default)]
    pub http: HttpConfig,
    /// Default namespace for all registry operations
    #[serde(default = "AppConfig::default_namespace")]
    pub namespace: String,
    /// Storage backend
    #[serde(default)]
    pub storage: StorageConfig,
    /// Embedding provider
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    /// Hybrid score fusion weights
    #[serde(default)]
    pub search: HybridSearchSettings,
    /// Ingress/federation auth
    #[serde(default)]
    pub auth: AuthConfig,
    /// Security scanning
    #[serde(default)]
    pub security: SecurityConfig,
    /// Federation workers
    #[serde(default)]
    pub federation: FederationSettings,
    /// Token refresher
    #[serde(default)]
    pub tokens: TokensConfig,
    /// Audit sink
    #[serde(default)]
    pub audit: AuditConfig,
    /// Gateway proxy
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// Scope file bulk-loaded into the scope repository at startup
    #[serde(default)]
    pub scopes_file: Option<PathBuf>,
}

impl AppConfig {
    fn default_namespace() -> String {
        "default".to_owned()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            namespace: Self::default_namespace(),
            storage: StorageConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            search: HybridSearchSettings::default(),
            auth: AuthConfig::default(),
            security: SecurityConfig::default(),
            federation: FederationSettings::default(),
            tokens: TokensConfig::default(),
            audit: AuditConfig::default(),
            proxy: ProxyConfig::default(),
            scopes_file: None,
        }
    }
}
