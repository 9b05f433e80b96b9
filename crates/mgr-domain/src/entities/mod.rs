//! Persisted entities of the registry.

pub mod agent;
pub mod audit;
pub mod embedding;
pub mod federation;
pub mod peer;
pub mod scan;
pub mod scope;
pub mod server;
pub mod skill;

pub use agent::{Agent, AgentSkill, TrustLevel};
pub use audit::{
    AuditAction, AuditAuthorization, AuditEvent, AuditIdentity, AuditPage, AuditQuery,
    AuditRequest, AuditResponse, AuditStream, McpRequestInfo, McpResponseInfo, McpServerRef,
    SortOrder,
};
pub use embedding::{EmbeddingDocument, ItemSummary};
pub use federation::{
    ExternalSourceConfig, FederationConfig, FederationEdge, FederationNode, FederationOrigin,
    FederationTopology,
};
pub use peer::{
    AgentExportItem, AgentsExport, PeerAuth, PeerAuthType, PeerRegistry, PeerSyncStatus,
    ServerExportItem, ServersExport, SyncMode, SyncReport,
};
pub use scan::{FindingSeverity, ScanStatus, SecurityScanResult, ToolFinding, Vulnerability};
pub use scope::{GroupMapping, ScopeDocument, ScopeFile, ServerAccessRule, ServerScope, UiScope};
pub use server::{McpServer, ServerVersion, ToolDef, Transport, VersionStatus, Visibility};
pub use skill::{AllowedTool, Skill};
