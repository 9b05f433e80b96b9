//! DI Container Bootstrap
//!
//! The composition root: selects the storage backend, resolves providers
//! from the linkme registries, wires every use-case service once, and hands
//! the server layer an immutable [`AppContext`]. Nothing mutates the
//! container after `init_app` returns.

use std::sync::Arc;

use mgr_application::use_cases::{
    AccessServiceImpl, AuditServiceImpl, CredentialSpec, FederationServiceImpl,
    RegistryServiceImpl, RegistrySettings, ScanServiceImpl, ScanSettings, SearchServiceImpl,
    TokenServiceImpl, TokenSettings,
};
use mgr_domain::entities::ScopeFile;
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::{
    EmbeddingProvider, ExternalCatalogAdapter, SecurityAnalyzer, TokenClient,
};
use mgr_domain::ports::repositories::{
    AgentRepository, FederationRepository, ScopeRepository, SearchIndexRepository,
    SecurityScanRepository, ServerRepository, SkillRepository,
};
use mgr_domain::ports::services::{
    AccessServiceInterface, AuditServiceInterface, FederationServiceInterface,
    RegistryServiceInterface, ScanServiceInterface, SearchServiceInterface, TokenServiceInterface,
};
use mgr_domain::registry::analyzer::{AnalyzerConfig, resolve_analyzer};
use mgr_domain::registry::embedding::{EmbeddingProviderConfig, resolve_embedding_provider};
use mgr_domain::value_objects::Namespace;
use mgr_providers::audit::JsonlAuditSink;
use mgr_providers::federation::{AnthropicCatalogAdapter, AsorCatalogAdapter, HttpPeerCatalogClient};
use mgr_providers::storage::file::{
    FileAgentRepository, FileFederationRepository, FileScanRepository, FileScopeRepository,
    FileSearchIndex, FileServerRepository, FileSkillRepository,
};
use mgr_providers::storage::opensearch::{
    OpenSearchClient, OpenSearchSettings, OsAgentRepository, OsFederationRepository,
    OsScanRepository, OsScopeRepository, OsSearchIndex, OsServerRepository, OsSkillRepository,
};
use mgr_providers::tokens::{FileClientConfigWriter, HttpTokenClient};

use crate::config::{AppConfig, StorageBackendKind};

/// Application context: configuration plus every wired service.
pub struct AppContext {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Default namespace all handlers operate in
    pub namespace: Namespace,

    // ========================================================================
    // Repositories (exposed for workers and tests)
    // ========================================================================
    servers: Arc<dyn ServerRepository>,
    agents: Arc<dyn AgentRepository>,
    scopes: Arc<dyn ScopeRepository>,
    federation_repo: Arc<dyn FederationRepository>,

    // ========================================================================
    // Use-case services
    // ========================================================================
    registry_service: Arc<dyn RegistryServiceInterface>,
    search_service: Arc<dyn SearchServiceInterface>,
    access_service: Arc<dyn AccessServiceInterface>,
    federation_service: Arc<dyn FederationServiceInterface>,
    scan_service: Arc<dyn ScanServiceInterface>,
    token_service: Arc<dyn TokenServiceInterface>,
    audit_service: Arc<dyn AuditServiceInterface>,
}

impl AppContext {
    mgr_domain::arc_getters! {
        servers: dyn ServerRepository,
        agents: dyn AgentRepository,
        scopes: dyn ScopeRepository,
        federation_repo: dyn FederationRepository,
        registry_service: dyn RegistryServiceInterface,
        search_service: dyn SearchServiceInterface,
        access_service: dyn AccessServiceInterface,
        federation_service: dyn FederationServiceInterface,
        scan_service: dyn ScanServiceInterface,
        token_service: dyn TokenServiceInterface,
        audit_service: dyn AuditServiceInterface,
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("namespace", &self.namespace)
            .field("storage", &self.config.storage.backend)
            .finish_non_exhaustive()
    }
}

struct Repositories {
    servers: Arc<dyn ServerRepository>,
    agents: Arc<dyn AgentRepository>,
    skills: Arc<dyn SkillRepository>,
    scopes: Arc<dyn ScopeRepository>,
    scans: Arc<dyn SecurityScanRepository>,
    federation: Arc<dyn FederationRepository>,
    search_index: Arc<dyn SearchIndexRepository>,
}

fn build_repositories(config: &AppConfig) -> Result<Repositories> {
    match config.storage.backend {
        StorageBackendKind::File => {
            let root = config.storage.root_dir.clone();
            Ok(Repositories {
                servers: Arc::new(FileServerRepository::new(root.clone())),
                agents: Arc::new(FileAgentRepository::new(root.clone())),
                skills: Arc::new(FileSkillRepository::new(root.clone())),
                scopes: Arc::new(FileScopeRepository::new(root.clone())),
                scans: Arc::new(FileScanRepository::new(root.clone())),
                federation: Arc::new(FileFederationRepository::new(root.clone())),
                search_index: Arc::new(FileSearchIndex::new(root)),
            })
        }
        StorageBackendKind::DistributedIndex => {
            let client = Arc::new(OpenSearchClient::new(&OpenSearchSettings {
                url: config.storage.index_url.clone(),
                username: config.storage.index_username.clone(),
                password: config.storage.index_password.clone(),
                timeout_secs: config.storage.index_timeout_secs,
            })?);
            Ok(Repositories {
                servers: Arc::new(OsServerRepository::new(Arc::clone(&client))),
                agents: Arc::new(OsAgentRepository::new(Arc::clone(&client))),
                skills: Arc::new(OsSkillRepository::new(Arc::clone(&client))),
                scopes: Arc::new(OsScopeRepository::new(Arc::clone(&client))),
                scans: Arc::new(OsScanRepository::new(Arc::clone(&client))),
                federation: Arc::new(OsFederationRepository::new(Arc::clone(&client))),
                search_index: Arc::new(OsSearchIndex::new(client)),
            })
        }
    }
}

fn build_analyzers(config: &AppConfig) -> Result<Vec<Arc<dyn SecurityAnalyzer>>> {
    if !config.security.scan_enabled {
        return Ok(Vec::new());
    }
    config
        .security
        .analyzers
        .iter()
        .map(|name| {
            let mut analyzer_config = AnalyzerConfig::new(name.clone());
            analyzer_config.rules_path = config.security.rules_path.clone();
            resolve_analyzer(&analyzer_config)
        })
        .collect()
}

/// Initialize the application context.
///
/// # Errors
///
/// Returns an error when provider resolution fails, the namespace is
/// invalid, index initialization fails, or the scope file cannot be loaded.
pub async fn init_app(config: AppConfig) -> Result<AppContext> {
    mgr_domain::info!("bootstrap", "initializing application context");
    let config = Arc::new(config);
    let namespace = Namespace::new(config.namespace.clone())?;

    // ========================================================================
    // Storage backend
    // ========================================================================
    let repos = build_repositories(&config)?;

    // ========================================================================
    // Embedding provider + search
    // ========================================================================
    let mut embedding_config = EmbeddingProviderConfig::new(config.embeddings.provider.clone())
        .with_dimensions(config.embeddings.dimensions);
    embedding_config.model = config.embeddings.model.clone();
    embedding_config.base_url = config.embeddings.base_url.clone();
    embedding_config.api_key = config.embeddings.api_key.clone();
    let embedder: Arc<dyn EmbeddingProvider> = resolve_embedding_provider(&embedding_config)
        .map_err(|e| Error::config(format!("embeddings: {e}")))?;

    repos
        .search_index
        .ensure_indices(
            &namespace,
            embedder.dimensions(),
            config.storage.recreate_indices,
        )
        .await?;

    let search_service: Arc<dyn SearchServiceInterface> = Arc::new(SearchServiceImpl::new(
        Arc::clone(&repos.search_index),
        Arc::clone(&embedder),
        config.search,
    ));

    // ========================================================================
    // Scan orchestration
    // ========================================================================
    let analyzers = build_analyzers(&config)?;
    let scan_service: Arc<dyn ScanServiceInterface> = Arc::new(ScanServiceImpl::new(
        Arc::clone(&repos.servers),
        Arc::clone(&repos.scans),
        analyzers,
        ScanSettings {
            timeout_secs: config.security.scan_timeout_secs,
            block_unsafe: config.security.block_unsafe_servers,
        },
    ));

    // ========================================================================
    // Registry
    // ========================================================================
    let registry_service: Arc<dyn RegistryServiceInterface> = Arc::new(RegistryServiceImpl::new(
        Arc::clone(&repos.servers),
        Arc::clone(&repos.agents),
        Arc::clone(&repos.skills),
        Arc::clone(&repos.scans),
        Arc::clone(&search_service),
        Arc::clone(&scan_service),
        RegistrySettings {
            scan_on_registration: config.security.scan_enabled
                && config.security.scan_on_registration,
            block_unsafe: config.security.block_unsafe_servers,
        },
    ));

    // ========================================================================
    // Access control
    // ========================================================================
    let access_service: Arc<dyn AccessServiceInterface> =
        Arc::new(AccessServiceImpl::new(Arc::clone(&repos.scopes)));

    if let Some(scopes_file) = &config.scopes_file {
        let content = std::fs::read_to_string(scopes_file).map_err(|e| {
            Error::config_with_source(
                format!("cannot read scopes file {}", scopes_file.display()),
                e,
            )
        })?;
        let file: ScopeFile = serde_yaml::from_str(&content).map_err(|e| {
            Error::config_with_source(
                format!("malformed scopes file {}", scopes_file.display()),
                e,
            )
        })?;
        let loaded = repos.scopes.load_file(&namespace, file).await?;
        mgr_domain::info!("bootstrap", "scope file loaded", &loaded);
    }

    // ========================================================================
    // Federation
    // ========================================================================
    let token_client: Arc<dyn TokenClient> = Arc::new(HttpTokenClient::new()?);
    let peer_client = Arc::new(HttpPeerCatalogClient::new(Arc::clone(&token_client))?);
    let adapters: Vec<Arc<dyn ExternalCatalogAdapter>> = vec![
        Arc::new(AnthropicCatalogAdapter::new()?),
        Arc::new(AsorCatalogAdapter::new()?),
    ];
    let federation_service: Arc<dyn FederationServiceInterface> =
        Arc::new(FederationServiceImpl::new(
            Arc::clone(&repos.federation),
            Arc::clone(&repos.servers),
            Arc::clone(&repos.agents),
            peer_client,
            adapters,
            Arc::clone(&search_service),
            config.http.registry_name.clone(),
        ));

    // ========================================================================
    // Tokens
    // ========================================================================
    let config_writer = Arc::new(FileClientConfigWriter::new(config.tokens.dir.clone()));
    let token_service: Arc<dyn TokenServiceInterface> = Arc::new(TokenServiceImpl::new(
        token_client,
        config_writer,
        Arc::clone(&registry_service),
        TokenSettings {
            credentials: config
                .tokens
                .credentials
                .iter()
                .map(|c| CredentialSpec {
                    name: c.name.clone(),
                    token_url: c.token_url.clone(),
                    client_id: c.client_id.clone(),
                    client_secret: c.client_secret.clone(),
                    scope: c.scope.clone(),
                })
                .collect(),
            buffer_minutes: config.tokens.buffer_minutes,
            gateway_base_url: config.tokens.gateway_base_url.clone(),
            namespace: namespace.clone(),
        },
    ));

    // ========================================================================
    // Audit
    // ========================================================================
    let audit_sink = Arc::new(JsonlAuditSink::new(config.audit.dir.clone()));
    let audit_service: Arc<dyn AuditServiceInterface> =
        Arc::new(AuditServiceImpl::new(audit_sink));

    mgr_domain::info!("bootstrap", "application context ready");
    Ok(AppContext {
        config,
        namespace,
        servers: repos.servers,
        agents: repos.agents,
        scopes: repos.scopes,
        federation_repo: repos.federation,
        registry_service,
        search_service,
        access_service,
        federation_service,
        scan_service,
        token_service,
        audit_service,
    })
}
