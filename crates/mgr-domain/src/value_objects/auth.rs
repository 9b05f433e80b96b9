//! Per-request authorization context.
//!
//! The middleware builds one [`AuthContext`] per request from the verified
//! ingress token; handlers and the access service consume it. This replaces
//! per-endpoint auth decoration with a single construction point.

use serde::{Deserialize, Serialize};

use crate::constants::auth::ADMIN_SCOPES;
use crate::value_objects::ids::ServerPath;

/// Identity and resolved scopes for one admitted request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Token subject
    pub subject: String,
    /// OAuth client id, when present in the token
    pub client_id: Option<String>,
    /// Groups claim from the identity provider
    pub groups: Vec<String>,
    /// Scope names resolved from group mappings
    pub scope_names: Vec<String>,
    /// How the caller authenticated (`jwt`, `federation-token`, ...)
    pub auth_method: String,
}

impl AuthContext {
    /// Whether any resolved scope grants unconditional access.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.scope_names
            .iter()
            .any(|s| ADMIN_SCOPES.contains(&s.as_str()))
    }
}

/// What a request is asking to do, in FGAC terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedAccess {
    /// Target server path
    pub server_path: ServerPath,
    /// MCP protocol method (`initialize`, `tools/list`, `tools/call`, ...)
    pub method: String,
    /// Tool name, only for `tools/call`
    pub tool: Option<String>,
}

/// Outcome of FGAC evaluation, recorded in audit events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether the request was allowed
    pub allowed: bool,
    /// The permission that was missing, on denial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_permission: Option<String>,
    /// Scope names that were evaluated
    pub evaluated_scopes: Vec<String>,
}

impl AccessDecision {
    /// An allow decision over the given scopes.
    #[must_use]
    pub fn allow(evaluated_scopes: Vec<String>) -> Self {
        Self {
            allowed: true,
            required_permission: None,
            evaluated_scopes,
        }
    }

    /// A deny decision naming the missing permission.
    #[must_use]
    pub fn deny(required_permission: impl Into<String>, evaluated_scopes: Vec<String>) -> Self {
        Self {
            allowed: false,
            required_permission: Some(required_permission.into()),
            evaluated_scopes,
        }
    }
}
