//! External provider ports.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{
    Agent, AgentsExport, AuditEvent, AuditPage, AuditQuery, ExternalSourceConfig,
    FederationOrigin, McpServer, PeerRegistry, ServersExport, ToolFinding,
};
use crate::error::Result;

// ============================================================================
// Embedding
// ============================================================================

/// Dense embedding generation.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider fails or returns no vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_owned()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| crate::error::Error::embedding("No embedding returned"))
    }

    /// Embed a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Output vector dimension.
    fn dimensions(&self) -> usize;

    /// Stable provider name.
    fn provider_name(&self) -> &str;

    /// Cheap liveness probe.
    async fn health_check(&self) -> Result<()> {
        self.embed("health check").await?;
        Ok(())
    }
}

// ============================================================================
// Security analysis
// ============================================================================

/// Pluggable tool-safety analyzer.
///
/// Each configured analyzer examines every tool a server advertises and
/// emits one finding per tool; the scan orchestrator folds findings from
/// all analyzers into a verdict.
#[async_trait]
pub trait SecurityAnalyzer: Send + Sync {
    /// Stable analyzer name.
    fn analyzer_name(&self) -> &str;

    /// Analyze every tool of a server.
    async fn analyze(&self, server: &McpServer) -> Result<Vec<ToolFinding>>;
}

// ============================================================================
// Federation clients
// ============================================================================

/// Client for a peer registry's export endpoints.
#[async_trait]
pub trait PeerCatalogClient: Send + Sync {
    /// Fetch the peer's server export, applying the peer's configured auth.
    async fn fetch_servers(&self, peer: &PeerRegistry) -> Result<ServersExport>;

    /// Fetch the peer's agent export.
    async fn fetch_agents(&self, peer: &PeerRegistry) -> Result<AgentsExport>;

    /// Probe the peer's health endpoint.
    async fn health_check(&self, peer: &PeerRegistry) -> Result<()>;
}

/// Canonical items translated out of an external catalog.
#[derive(Debug, Clone, Default)]
pub struct ExternalCatalog {
    /// Servers in canonical shape
    pub servers: Vec<McpServer>,
    /// Agents in canonical shape
    pub agents: Vec<Agent>,
}

/// Adapter for one fixed external catalog source.
///
/// The adapter owns the source-specific wire schema and translates it into
/// canonical servers/agents; the federation engine applies the usual
/// generation tagging on top.
#[async_trait]
pub trait ExternalCatalogAdapter: Send + Sync {
    /// Which origin this adapter feeds.
    fn origin(&self) -> FederationOrigin;

    /// Stable source id, also used as the pseudo origin-peer id.
    fn source_id(&self) -> &'static str;

    /// Fetch and translate the catalog.
    async fn fetch(&self, config: &ExternalSourceConfig) -> Result<ExternalCatalog>;
}

// ============================================================================
// Tokens
// ============================================================================

/// A token obtained from an OAuth token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    /// The bearer token
    pub access_token: String,
    /// Token type, normally `Bearer`
    pub token_type: String,
    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

/// OAuth2 client-credentials flow against a token endpoint.
#[async_trait]
pub trait TokenClient: Send + Sync {
    /// Exchange client credentials for a token.
    async fn client_credentials(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        scope: Option<&str>,
    ) -> Result<IssuedToken>;
}

/// One service entry written into client config artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientServiceEntry {
    /// Service name as it appears in the client config
    pub name: String,
    /// Gateway URL the client should call
    pub url: String,
    /// Egress token for the service, when it needs auth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Transport label for clients that care
    #[serde(default)]
    pub transport: String,
    /// Extra provider-specific headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Materializes MCP client configuration artifacts.
#[async_trait]
pub trait ClientConfigWriter: Send + Sync {
    /// Atomically write all client config artifacts for the given services.
    async fn write_configs(&self, services: &[ClientServiceEntry]) -> Result<()>;
}

// ============================================================================
// Audit
// ============================================================================

/// Append-only audit event store.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one event.
    async fn emit(&self, event: AuditEvent) -> Result<()>;

    /// Query stored events with filters and pagination.
    async fn query(&self, query: &AuditQuery) -> Result<AuditPage>;
}
