//! Application service port interfaces.
//!
//! The contracts the application layer implements and the server layer
//! consumes. Handlers depend on these traits, never on concrete services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{
    Agent, AgentsExport, AuditEvent, AuditPage, AuditQuery, FederationConfig, FederationOrigin,
    FederationTopology, McpServer, PeerRegistry, PeerSyncStatus, ScanStatus, SecurityScanResult,
    ServerVersion, ServersExport, Skill, SyncReport, ToolDef, Transport, Visibility,
};
use crate::error::Result;
use crate::value_objects::{
    AccessDecision, AuthContext, EntityType, GroupedSearchResults, Namespace, PeerId,
    RequestedAccess, SearchRequest, ServerPath,
};

// ============================================================================
// Registry Service
// ============================================================================

/// What `register` returns: the stored entity plus the scan that gated it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationOutcome<T> {
    /// The entity as stored
    pub entity: T,
    /// Status of the registration scan, when scanning is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_status: Option<ScanStatus>,
}

/// Partial update of a server; `None` fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerUpdate {
    /// New display name
    pub server_name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New upstream URL
    pub proxy_pass_url: Option<String>,
    /// New transport set
    pub supported_transports: Option<Vec<Transport>>,
    /// New auth scheme
    pub auth_type: Option<Option<String>>,
    /// New tags
    pub tags: Option<Vec<String>>,
    /// New tool list
    pub tool_list: Option<Vec<ToolDef>>,
    /// New visibility
    pub visibility: Option<Visibility>,
    /// New version list
    pub versions: Option<Vec<ServerVersion>>,
    /// New virtual backend composition
    pub backend_paths: Option<Vec<ServerPath>>,
    /// Optimistic concurrency token: must match the stored `updated_at`
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Partial update of an agent; `None` fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentUpdate {
    /// New display name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New endpoint URL
    pub proxy_pass_url: Option<String>,
    /// New protocol version
    pub protocol_version: Option<String>,
    /// New capabilities
    pub capabilities: Option<Vec<String>>,
    /// New skills
    pub skills: Option<Vec<crate::entities::AgentSkill>>,
    /// New trust level
    pub trust_level: Option<crate::entities::TrustLevel>,
    /// New visibility
    pub visibility: Option<Visibility>,
    /// New tags
    pub tags: Option<Vec<String>>,
    /// Optimistic concurrency token
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Registry lifecycle operations for servers, agents, skills and virtual
/// servers.
#[async_trait]
pub trait RegistryServiceInterface: Send + Sync {
    /// Register a server; enqueues a gating scan when scanning is enabled.
    async fn register_server(
        &self,
        ns: &Namespace,
        server: McpServer,
    ) -> Result<RegistrationOutcome<McpServer>>;

    /// Fetch one server.
    async fn get_server(&self, ns: &Namespace, path: &ServerPath) -> Result<McpServer>;

    /// List servers; disabled entities included only on request.
    async fn list_servers(&self, ns: &Namespace, include_disabled: bool)
        -> Result<Vec<McpServer>>;

    /// Merge a partial update into a server.
    async fn update_server(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        update: ServerUpdate,
    ) -> Result<McpServer>;

    /// Enable or disable a server. Enabling over an `unsafe` scan verdict
    /// requires an admin caller and the explicit override flag.
    async fn toggle_server(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        enabled: bool,
        override_unsafe: bool,
        ctx: &AuthContext,
    ) -> Result<McpServer>;

    /// Atomically make one version the default.
    async fn set_default_version(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        version: &str,
    ) -> Result<McpServer>;

    /// Delete a server. The caller must echo the stored `server_name`.
    /// Cascades to the embedding document and scan history, never to
    /// federation state.
    async fn delete_server(&self, ns: &Namespace, path: &ServerPath, echo_name: &str)
        -> Result<()>;

    /// Resolve the backend serving `tool` on a virtual server.
    async fn resolve_virtual_backend(
        &self,
        ns: &Namespace,
        virtual_server: &McpServer,
        tool: &str,
    ) -> Result<McpServer>;

    /// Register an agent; same gating contract as servers.
    async fn register_agent(
        &self,
        ns: &Namespace,
        agent: Agent,
    ) -> Result<RegistrationOutcome<Agent>>;

    /// Fetch one agent.
    async fn get_agent(&self, ns: &Namespace, path: &ServerPath) -> Result<Agent>;

    /// List agents.
    async fn list_agents(&self, ns: &Namespace, include_disabled: bool) -> Result<Vec<Agent>>;

    /// Merge a partial update into an agent.
    async fn update_agent(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        update: AgentUpdate,
    ) -> Result<Agent>;

    /// Enable or disable an agent.
    async fn toggle_agent(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        enabled: bool,
        ctx: &AuthContext,
    ) -> Result<Agent>;

    /// Delete an agent; the caller must echo the stored `name`.
    async fn delete_agent(&self, ns: &Namespace, path: &ServerPath, echo_name: &str)
        -> Result<()>;

    /// Register a skill.
    async fn register_skill(&self, ns: &Namespace, skill: Skill) -> Result<Skill>;

    /// Fetch one skill.
    async fn get_skill(&self, ns: &Namespace, path: &ServerPath) -> Result<Skill>;

    /// List skills.
    async fn list_skills(&self, ns: &Namespace) -> Result<Vec<Skill>>;

    /// Replace a skill document.
    async fn update_skill(&self, ns: &Namespace, skill: Skill) -> Result<Skill>;

    /// Delete a skill.
    async fn delete_skill(&self, ns: &Namespace, path: &ServerPath) -> Result<()>;

    /// Record a rating in `[1, 5]` against a skill.
    async fn rate_skill(&self, ns: &Namespace, path: &ServerPath, rating: u8) -> Result<Skill>;
}

// ============================================================================
// Search Service
// ============================================================================

/// Hybrid relevance search over the registry.
#[async_trait]
pub trait SearchServiceInterface: Send + Sync {
    /// Rank servers/agents/tools against a free-form query.
    async fn search(&self, ns: &Namespace, request: &SearchRequest)
        -> Result<GroupedSearchResults>;

    /// Re-index the embedding document for a server.
    async fn index_server(&self, ns: &Namespace, server: &McpServer) -> Result<()>;

    /// Re-index the embedding document for an agent.
    async fn index_agent(&self, ns: &Namespace, agent: &Agent) -> Result<()>;

    /// Remove an entity from the search index.
    async fn remove(&self, ns: &Namespace, entity_type: EntityType, path: &ServerPath)
        -> Result<()>;
}

// ============================================================================
// Access Service
// ============================================================================

/// Scope expansion and FGAC evaluation.
#[async_trait]
pub trait AccessServiceInterface: Send + Sync {
    /// Expand identity-provider groups into scope names via group mappings.
    async fn resolve_scopes(&self, ns: &Namespace, groups: &[String]) -> Result<Vec<String>>;

    /// Evaluate FGAC for a request; never errors on deny.
    async fn evaluate(
        &self,
        ns: &Namespace,
        ctx: &AuthContext,
        access: &RequestedAccess,
    ) -> Result<AccessDecision>;

    /// Evaluate and convert a deny into `Forbidden`.
    async fn require(
        &self,
        ns: &Namespace,
        ctx: &AuthContext,
        access: &RequestedAccess,
    ) -> Result<AccessDecision> {
        let decision = self.evaluate(ns, ctx, access).await?;
        if decision.allowed {
            Ok(decision)
        } else {
            Err(crate::error::Error::forbidden(
                decision
                    .required_permission
                    .clone()
                    .unwrap_or_else(|| "unknown".to_owned()),
            ))
        }
    }
}

// ============================================================================
// Federation Service
// ============================================================================

/// Result of syncing one peer during a sync-all run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSyncOutcome {
    /// The peer that was synced
    pub peer_id: PeerId,
    /// Report on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
    /// Error kind string on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Peer topology, pull-sync and export.
#[async_trait]
pub trait FederationServiceInterface: Send + Sync {
    /// Register or replace a peer; status is initialized on first insert.
    async fn put_peer(&self, ns: &Namespace, peer: PeerRegistry) -> Result<PeerRegistry>;

    /// Fetch one peer.
    async fn get_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<PeerRegistry>;

    /// All configured peers.
    async fn list_peers(&self, ns: &Namespace) -> Result<Vec<PeerRegistry>>;

    /// Remove a peer and its sync status. Federated copies remain until
    /// reclaimed or deleted by an admin.
    async fn delete_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<()>;

    /// Enable or disable sync for a peer.
    async fn set_peer_enabled(
        &self,
        ns: &Namespace,
        peer_id: &PeerId,
        enabled: bool,
    ) -> Result<PeerRegistry>;

    /// Sync status of one peer.
    async fn peer_status(&self, ns: &Namespace, peer_id: &PeerId) -> Result<PeerSyncStatus>;

    /// Pull-sync one peer now.
    async fn sync_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<SyncReport>;

    /// Pull-sync every enabled peer; failures are reported per peer.
    async fn sync_all(&self, ns: &Namespace) -> Result<Vec<PeerSyncOutcome>>;

    /// Sync one external catalog source now.
    async fn sync_external(&self, ns: &Namespace, origin: FederationOrigin) -> Result<SyncReport>;

    /// The singleton federation config.
    async fn get_config(&self, ns: &Namespace) -> Result<FederationConfig>;

    /// Replace the singleton federation config.
    async fn put_config(&self, ns: &Namespace, config: FederationConfig)
        -> Result<FederationConfig>;

    /// Unified topology snapshot.
    async fn topology(&self, ns: &Namespace) -> Result<FederationTopology>;

    /// Export public servers for a calling peer.
    async fn export_servers(&self, ns: &Namespace) -> Result<ServersExport>;

    /// Export public agents for a calling peer.
    async fn export_agents(&self, ns: &Namespace) -> Result<AgentsExport>;
}

// ============================================================================
// Scan Service
// ============================================================================

/// Security-scan orchestration.
#[async_trait]
pub trait ScanServiceInterface: Send + Sync {
    /// Run every configured analyzer against one server and append the
    /// result. Exceeding the deadline records a `failed` scan.
    async fn scan_server(&self, ns: &Namespace, path: &ServerPath) -> Result<SecurityScanResult>;

    /// Registry-wide sweep; scans every server, collecting results.
    async fn scan_all(&self, ns: &Namespace) -> Result<Vec<SecurityScanResult>>;

    /// Most recent scan of a server.
    async fn latest(&self, ns: &Namespace, path: &ServerPath)
        -> Result<Option<SecurityScanResult>>;

    /// Whether enabling this server is blocked by its latest verdict.
    async fn is_enable_blocked(&self, ns: &Namespace, path: &ServerPath) -> Result<bool>;
}

// ============================================================================
// Token Service
// ============================================================================

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRefreshReport {
    /// Credentials refreshed this cycle
    pub refreshed: usize,
    /// Credentials still fresh and skipped
    pub skipped: usize,
    /// Credentials whose refresh failed
    pub failed: usize,
    /// Whether client config artifacts were rewritten
    pub artifacts_written: bool,
}

/// Ingress/egress credential freshness and client config materialization.
#[async_trait]
pub trait TokenServiceInterface: Send + Sync {
    /// Run one refresh cycle: refresh credentials past their deadline and
    /// rewrite client config artifacts.
    async fn refresh_cycle(&self) -> Result<TokenRefreshReport>;
}

// ============================================================================
// Audit Service
// ============================================================================

/// Audit emission and retrieval.
#[async_trait]
pub trait AuditServiceInterface: Send + Sync {
    /// Append one event; failures are logged, never surfaced to the caller.
    async fn emit(&self, event: AuditEvent);

    /// Query events with filters and pagination.
    async fn query(&self, query: &AuditQuery) -> Result<AuditPage>;

    /// Export every event matching the query, unpaginated.
    async fn export(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>>;
}
