//! Audit events: the structured records behind the `registry_api` and
//! `mcp_access` streams.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named audit stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum AuditStream {
    /// Administrative registry API actions
    #[display("registry_api")]
    RegistryApi,
    /// Client ↔ gateway MCP traffic
    #[display("mcp_access")]
    McpAccess,
}

/// Who performed the action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditIdentity {
    /// Authenticated username / subject
    pub username: String,
    /// How the caller authenticated
    pub auth_method: String,
    /// Identity provider groups
    #[serde(default)]
    pub groups: Vec<String>,
    /// Resolved scope names
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Whether an admin scope was held
    pub is_admin: bool,
}

/// The HTTP request the event describes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditRequest {
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// Client address
    #[serde(default)]
    pub client_ip: String,
    /// User agent header
    #[serde(default)]
    pub user_agent: String,
}

/// The HTTP response the event describes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Handler wall-clock duration
    pub duration_ms: u64,
}

/// Domain-level description of the action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditAction {
    /// Operation label (`register_server`, `toggle`, `peer_sync`, ...)
    pub operation: String,
    /// Resource kind (`server`, `agent`, `peer`, ...)
    pub resource_type: String,
    /// Resource identifier
    pub resource_id: String,
}

/// Authorization outcome for the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditAuthorization {
    /// `allow` or `deny`
    pub decision: String,
    /// Missing permission on denial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permission: Option<String>,
    /// Scope names considered
    #[serde(default)]
    pub evaluated_scopes: Vec<String>,
}

/// Target server of a proxied MCP request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpServerRef {
    /// Display name
    pub name: String,
    /// Routing path
    pub path: String,
}

/// The MCP request, for `mcp_access` events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpRequestInfo {
    /// JSON-RPC method
    pub method: String,
    /// Tool name for `tools/call`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Resource URI for resource methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
    /// Transport used downstream
    #[serde(default)]
    pub transport: String,
    /// JSON-RPC id, stringified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc_id: Option<String>,
}

/// The MCP response, for `mcp_access` events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpResponseInfo {
    /// Upstream status (`ok`, `error`, `timeout`)
    pub status: String,
    /// Upstream wall-clock duration
    pub duration_ms: u64,
    /// JSON-RPC error code, when the upstream errored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
}

/// One append-only audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Request id; matches the opaque id returned in error responses
    pub request_id: String,
    /// Stream the event belongs to
    pub log_type: AuditStream,
    /// Event schema version
    pub version: String,
    /// Correlates events across services
    pub correlation_id: String,
    /// Who
    pub identity: AuditIdentity,
    /// What was asked
    pub request: AuditRequest,
    /// What came back
    pub response: AuditResponse,
    /// Domain action
    pub action: AuditAction,
    /// Authorization outcome
    pub authorization: AuditAuthorization,
    /// Target MCP server, for `mcp_access` only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_server: Option<McpServerRef>,
    /// MCP request detail, for `mcp_access` only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_request: Option<McpRequestInfo>,
    /// MCP response detail, for `mcp_access` only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_response: Option<McpResponseInfo>,
}

impl AuditEvent {
    /// Start an event on a stream with fresh ids and the current time.
    #[must_use]
    pub fn begin(stream: AuditStream) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: Uuid::new_v4().to_string(),
            log_type: stream,
            version: "1".to_owned(),
            correlation_id: Uuid::new_v4().to_string(),
            identity: AuditIdentity::default(),
            request: AuditRequest::default(),
            response: AuditResponse::default(),
            action: AuditAction::default(),
            authorization: AuditAuthorization::default(),
            mcp_server: None,
            mcp_request: None,
            mcp_response: None,
        }
    }
}

/// Sort direction for audit queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first
    #[default]
    #[display("desc")]
    Desc,
    /// Oldest first
    #[display("asc")]
    Asc,
}

/// Filterable audit query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Restrict to one stream
    #[serde(default)]
    pub stream: Option<AuditStream>,
    /// Window start (inclusive)
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Window end (exclusive)
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    /// Exact username match
    #[serde(default)]
    pub username: Option<String>,
    /// Exact operation match
    #[serde(default)]
    pub operation: Option<String>,
    /// Exact resource-type match
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Minimum status code (inclusive)
    #[serde(default)]
    pub status_min: Option<u16>,
    /// Maximum status code (inclusive)
    #[serde(default)]
    pub status_max: Option<u16>,
    /// Sort direction by timestamp
    #[serde(default)]
    pub sort: SortOrder,
    /// Zero-based page
    #[serde(default)]
    pub page: usize,
    /// Page size
    #[serde(default = "AuditQuery::default_page_size")]
    pub page_size: usize,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            stream: None,
            from: None,
            to: None,
            username: None,
            operation: None,
            resource_type: None,
            status_min: None,
            status_max: None,
            sort: SortOrder::default(),
            page: 0,
            page_size: Self::default_page_size(),
        }
    }
}

impl AuditQuery {
    fn default_page_size() -> usize {
        50
    }

    /// Whether an event passes every filter of this query.
    #[must_use]
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if self.stream.is_some_and(|s| s != event.log_type) {
            return false;
        }
        if self.from.is_some_and(|t| event.timestamp < t) {
            return false;
        }
        if self.to.is_some_and(|t| event.timestamp >= t) {
            return false;
        }
        if self
            .username
            .as_ref()
            .is_some_and(|u| *u != event.identity.username)
        {
            return false;
        }
        if self
            .operation
            .as_ref()
            .is_some_and(|o| *o != event.action.operation)
        {
            return false;
        }
        if self
            .resource_type
            .as_ref()
            .is_some_and(|r| *r != event.action.resource_type)
        {
            return false;
        }
        if self
            .status_min
            .is_some_and(|s| event.response.status_code < s)
        {
            return false;
        }
        if self
            .status_max
            .is_some_and(|s| event.response.status_code > s)
        {
            return false;
        }
        true
    }
}

/// One page of audit events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPage {
    /// Events on this page
    pub events: Vec<AuditEvent>,
    /// Total events matching the query
    pub total: usize,
    /// Zero-based page index
    pub page: usize,
    /// Page size used
    pub page_size: usize,
}
