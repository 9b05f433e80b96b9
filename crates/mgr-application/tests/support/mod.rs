//! Shared fixtures: file-backend repositories in a temp dir, null embedder,
//! and fully wired services.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use mgr_application::use_cases::{
    AccessServiceImpl, FederationServiceImpl, RegistryServiceImpl, RegistrySettings,
    ScanServiceImpl, ScanSettings, SearchServiceImpl,
};
use mgr_domain::entities::{
    AgentsExport, McpServer, PeerRegistry, ServerVersion, ServersExport, ToolDef, VersionStatus,
};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::{
    EmbeddingProvider, ExternalCatalogAdapter, PeerCatalogClient, SecurityAnalyzer,
};
use mgr_domain::ports::repositories::{
    AgentRepository, ScopeRepository, SearchIndexRepository, SecurityScanRepository,
    ServerRepository, SkillRepository,
};
use mgr_domain::ports::services::{
    AccessServiceInterface, FederationServiceInterface, RegistryServiceInterface,
    ScanServiceInterface, SearchServiceInterface,
};
use mgr_domain::value_objects::{AuthContext, HybridSearchSettings, Namespace, ServerPath};
use mgr_providers::embedding::NullEmbeddingProvider;
use mgr_providers::security::RulesAnalyzer;
use mgr_providers::storage::file::{
    FileAgentRepository, FileScanRepository, FileScopeRepository, FileSearchIndex,
    FileServerRepository, FileSkillRepository,
};

/// Everything a test needs, rooted in one temp dir.
pub struct Harness {
    pub namespace: Namespace,
    pub servers: Arc<dyn ServerRepository>,
    pub agents: Arc<dyn AgentRepository>,
    pub skills: Arc<dyn SkillRepository>,
    pub scans: Arc<dyn SecurityScanRepository>,
    pub scopes: Arc<dyn ScopeRepository>,
    pub search_index: Arc<dyn SearchIndexRepository>,
    pub search: Arc<dyn SearchServiceInterface>,
    pub scan: Arc<dyn ScanServiceInterface>,
    pub registry: Arc<dyn RegistryServiceInterface>,
    pub access: Arc<dyn AccessServiceInterface>,
    pub _temp: TempDir,
}

impl Harness {
    pub async fn new(scan_on_registration: bool) -> Self {
        Self::with_embedder(
            scan_on_registration,
            Arc::new(NullEmbeddingProvider::default()),
        )
        .await
    }

    pub async fn with_embedder(
        scan_on_registration: bool,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path().to_path_buf();
        let namespace = Namespace::default();

        let servers: Arc<dyn ServerRepository> = Arc::new(FileServerRepository::new(root.clone()));
        let agents: Arc<dyn AgentRepository> = Arc::new(FileAgentRepository::new(root.clone()));
        let skills: Arc<dyn SkillRepository> = Arc::new(FileSkillRepository::new(root.clone()));
        let scans: Arc<dyn SecurityScanRepository> =
            Arc::new(FileScanRepository::new(root.clone()));
        let scopes: Arc<dyn ScopeRepository> = Arc::new(FileScopeRepository::new(root.clone()));
        let search_index: Arc<dyn SearchIndexRepository> = Arc::new(FileSearchIndex::new(root));

        let dimensions = embedder.dimensions();
        search_index
            .ensure_indices(&namespace, dimensions, false)
            .await
            .expect("init indices");

        let search: Arc<dyn SearchServiceInterface> = Arc::new(SearchServiceImpl::new(
            Arc::clone(&search_index),
            embedder,
            HybridSearchSettings::default(),
        ));

        let analyzers: Vec<Arc<dyn SecurityAnalyzer>> =
            vec![Arc::new(RulesAnalyzer::new().expect("rules compile"))];
        let scan: Arc<dyn ScanServiceInterface> = Arc::new(ScanServiceImpl::new(
            Arc::clone(&servers),
            Arc::clone(&scans),
            analyzers,
            ScanSettings::default(),
        ));

        let registry: Arc<dyn RegistryServiceInterface> = Arc::new(RegistryServiceImpl::new(
            Arc::clone(&servers),
            Arc::clone(&agents),
            Arc::clone(&skills),
            Arc::clone(&scans),
            Arc::clone(&search),
            Arc::clone(&scan),
            RegistrySettings {
                scan_on_registration,
                block_unsafe: true,
            },
        ));

        let access: Arc<dyn AccessServiceInterface> =
            Arc::new(AccessServiceImpl::new(Arc::clone(&scopes)));

        Self {
            namespace,
            servers,
            agents,
            skills,
            scans,
            scopes,
            search_index,
            search,
            scan,
            registry,
            access,
            _temp: temp,
        }
    }

    pub fn federation(
        &self,
        peer_client: Arc<dyn PeerCatalogClient>,
        adapters: Vec<Arc<dyn ExternalCatalogAdapter>>,
    ) -> FederationServiceImpl {
        let federation_repo = Arc::new(
            mgr_providers::storage::file::FileFederationRepository::new(self._temp.path()),
        );
        FederationServiceImpl::new(
            federation_repo,
            Arc::clone(&self.servers),
            Arc::clone(&self.agents),
            peer_client,
            adapters,
            Arc::clone(&self.search),
            "test-registry".to_owned(),
        )
    }
}

pub fn sample_server(path: &str, name: &str) -> McpServer {
    let mut server = McpServer::new(
        ServerPath::new(path).expect("valid path"),
        name,
        "http://upstream:8000",
    );
    server.description = format!("{name} backend service");
    server.tool_list = vec![ToolDef {
        name: "search_docs".to_owned(),
        description: "Search documentation pages".to_owned(),
        input_schema: serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}}),
    }];
    server
}

pub fn server_with_versions(path: &str) -> McpServer {
    let mut server = sample_server(path, "Versioned");
    server.versions = vec![
        ServerVersion {
            version: "v1".to_owned(),
            proxy_pass_url: "http://upstream-v1:8000".to_owned(),
            status: VersionStatus::Deprecated,
            is_default: false,
            released: chrono::Utc::now(),
            sunset_date: None,
        },
        ServerVersion {
            version: "v2".to_owned(),
            proxy_pass_url: "http://upstream-v2:8000".to_owned(),
            status: VersionStatus::Stable,
            is_default: true,
            released: chrono::Utc::now(),
            sunset_date: None,
        },
    ];
    server
}

pub fn admin_ctx() -> AuthContext {
    AuthContext {
        subject: "admin".to_owned(),
        client_id: None,
        groups: vec!["registry-admins".to_owned()],
        scope_names: vec!["mcp-registry-admin".to_owned()],
        auth_method: "jwt".to_owned(),
    }
}

pub fn user_ctx(scopes: &[&str]) -> AuthContext {
    AuthContext {
        subject: "user".to_owned(),
        client_id: None,
        groups: vec!["users".to_owned()],
        scope_names: scopes.iter().map(|s| (*s).to_owned()).collect(),
        auth_method: "jwt".to_owned(),
    }
}

/// Embedding provider that always fails, counting the attempts.
pub struct FailingEmbedder {
    pub calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::embedding("provider misconfigured"))
    }

    fn dimensions(&self) -> usize {
        384
    }

    fn provider_name(&self) -> &str {
        "failing"
    }
}

/// Scripted peer client: returns the configured exports, or fails.
pub struct ScriptedPeerClient {
    pub servers: std::sync::Mutex<Result<ServersExport>>,
    pub agents: std::sync::Mutex<Result<AgentsExport>>,
}

impl ScriptedPeerClient {
    pub fn exporting(servers: Vec<mgr_domain::entities::ServerExportItem>) -> Self {
        let total = servers.len();
        Self {
            servers: std::sync::Mutex::new(Ok(ServersExport {
                total_count: total,
                items: servers,
                generation: 1,
            })),
            agents: std::sync::Mutex::new(Ok(AgentsExport {
                total_count: 0,
                items: Vec::new(),
                generation: 1,
            })),
        }
    }

    pub fn failing(peer_id: &str) -> Self {
        Self {
            servers: std::sync::Mutex::new(Err(Error::peer_unreachable(peer_id, "down"))),
            agents: std::sync::Mutex::new(Err(Error::peer_unreachable(peer_id, "down"))),
        }
    }

    pub fn set_servers(&self, items: Vec<mgr_domain::entities::ServerExportItem>) {
        let total = items.len();
        *self.servers.lock().expect("lock") = Ok(ServersExport {
            total_count: total,
            items,
            generation: 1,
        });
    }
}

fn clone_export(result: &Result<ServersExport>) -> Result<ServersExport> {
    match result {
        Ok(export) => Ok(ServersExport {
            total_count: export.total_count,
            items: export.items.clone(),
            generation: export.generation,
        }),
        Err(e) => Err(Error::peer_unreachable("peer", e.to_string())),
    }
}

#[async_trait]
impl PeerCatalogClient for ScriptedPeerClient {
    async fn fetch_servers(&self, _peer: &PeerRegistry) -> Result<ServersExport> {
        clone_export(&self.servers.lock().expect("lock"))
    }

    async fn fetch_agents(&self, _peer: &PeerRegistry) -> Result<AgentsExport> {
        match &*self.agents.lock().expect("lock") {
            Ok(export) => Ok(AgentsExport {
                total_count: export.total_count,
                items: export.items.clone(),
                generation: export.generation,
            }),
            Err(e) => Err(Error::peer_unreachable("peer", e.to_string())),
        }
    }

    async fn health_check(&self, _peer: &PeerRegistry) -> Result<()> {
        Ok(())
    }
}
