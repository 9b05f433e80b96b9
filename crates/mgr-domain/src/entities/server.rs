//! MCP server entity.
//!
//! A server is the unit of registration, federation and proxying. Virtual
//! servers are ordinary servers whose `backend_paths` is non-empty; their
//! tool list is assembled from the referenced backends.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::constants::scan::SECURITY_PENDING_TAG;
use crate::error::{Error, Result};
use crate::value_objects::ids::{PeerId, ServerPath};

use super::federation::FederationOrigin;

/// Transports a server can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// stdio pipe transport
    #[display("stdio")]
    Stdio,
    /// Server-sent events
    #[display("sse")]
    Sse,
    /// Streamable HTTP
    #[display("streamable-http")]
    StreamableHttp,
    /// WebSocket
    #[display("websocket")]
    Websocket,
}

/// Who may see an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to everyone; the only federable visibility
    #[default]
    #[display("public")]
    Public,
    /// Visible to the owner only
    #[display("private")]
    Private,
    /// Visible to members of the owning group
    #[display("group")]
    Group,
}

/// Release status of one server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    /// Production-ready
    #[display("stable")]
    Stable,
    /// Pre-release
    #[display("beta")]
    Beta,
    /// Scheduled for removal
    #[display("deprecated")]
    Deprecated,
}

/// One routable version of a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerVersion {
    /// Version label matched against `X-MCP-Server-Version`
    pub version: String,
    /// Upstream URL for this version
    pub proxy_pass_url: String,
    /// Release status
    pub status: VersionStatus,
    /// Whether requests without a version header route here
    #[serde(default)]
    pub is_default: bool,
    /// Release timestamp
    pub released: DateTime<Utc>,
    /// Planned sunset, for deprecated versions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset_date: Option<DateTime<Utc>>,
}

/// A tool exposed by a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name, unique within its server
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON schema of the tool input
    #[serde(default)]
    pub input_schema: serde_json::Value,
}

/// Registered MCP server document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServer {
    /// Unique routing path within the namespace
    pub path: ServerPath,
    /// Display name
    pub server_name: String,
    /// Description shown in catalogs and indexed for search
    #[serde(default)]
    pub description: String,
    /// Upstream URL proxied to when no version matches
    pub proxy_pass_url: String,
    /// Transports the upstream supports
    #[serde(default)]
    pub supported_transports: Vec<Transport>,
    /// Auth scheme expected by the upstream (`none`, `oauth2`, ...)
    #[serde(default)]
    pub auth_type: Option<String>,
    /// Free-form tags; also drive tag-filtered federation
    #[serde(default)]
    pub tags: Vec<String>,
    /// Tools the upstream advertises
    #[serde(default)]
    pub tool_list: Vec<ToolDef>,
    /// Whether the gateway will route to this server
    #[serde(default)]
    pub is_enabled: bool,
    /// Catalog visibility
    #[serde(default)]
    pub visibility: Visibility,
    /// Routable versions; at most one may be default
    #[serde(default)]
    pub versions: Vec<ServerVersion>,
    /// Backends composed by a virtual server; empty for real servers
    #[serde(default)]
    pub backend_paths: Vec<ServerPath>,
    /// Peer this copy was federated from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_peer: Option<PeerId>,
    /// Source type for federated copies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_type: Option<FederationOrigin>,
    /// Sync generation that last refreshed this copy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    /// Creation timestamp, server-assigned
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp; optimistic concurrency token
    pub updated_at: DateTime<Utc>,
}

impl McpServer {
    /// Minimal constructor; timestamps are set to now.
    pub fn new(path: ServerPath, server_name: impl Into<String>, proxy_pass_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            path,
            server_name: server_name.into(),
            description: String::new(),
            proxy_pass_url: proxy_pass_url.into(),
            supported_transports: Vec::new(),
            auth_type: None,
            tags: Vec::new(),
            tool_list: Vec::new(),
            is_enabled: false,
            visibility: Visibility::default(),
            versions: Vec::new(),
            backend_paths: Vec::new(),
            origin_peer: None,
            origin_type: None,
            generation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this server composes other backends.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        !self.backend_paths.is_empty()
    }

    /// Whether this copy came from federation.
    #[must_use]
    pub fn is_federated(&self) -> bool {
        self.origin_peer.is_some() || self.origin_type.is_some()
    }

    /// Number of advertised tools.
    #[must_use]
    pub fn num_tools(&self) -> usize {
        self.tool_list.len()
    }

    /// The version routed to when no header pins one.
    #[must_use]
    pub fn default_version(&self) -> Option<&ServerVersion> {
        self.versions.iter().find(|v| v.is_default)
    }

    /// The version matching a pinned label.
    #[must_use]
    pub fn find_version(&self, label: &str) -> Option<&ServerVersion> {
        self.versions.iter().find(|v| v.version == label)
    }

    /// URL a request should proxy to, honoring an optional pinned version.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the pinned version does not exist.
    pub fn resolve_proxy_url(&self, pinned_version: Option<&str>) -> Result<&str> {
        match pinned_version {
            Some(label) => self
                .find_version(label)
                .map(|v| v.proxy_pass_url.as_str())
                .ok_or_else(|| {
                    Error::not_found(format!("version '{label}' of server {}", self.path))
                }),
            None => Ok(self
                .default_version()
                .map_or(self.proxy_pass_url.as_str(), |v| v.proxy_pass_url.as_str())),
        }
    }

    /// Mark exactly one version as default.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the label is not among the versions.
    pub fn set_default_version(&mut self, label: &str) -> Result<()> {
        if !self.versions.iter().any(|v| v.version == label) {
            return Err(Error::not_found(format!(
                "version '{label}' of server {}",
                self.path
            )));
        }
        for v in &mut self.versions {
            v.is_default = v.version == label;
        }
        Ok(())
    }

    /// Whether the security-pending gate tag is present.
    #[must_use]
    pub fn is_security_pending(&self) -> bool {
        self.tags.iter().any(|t| t == SECURITY_PENDING_TAG)
    }

    /// Apply the security-pending gate tag (idempotent).
    pub fn add_security_pending_tag(&mut self) {
        if !self.is_security_pending() {
            self.tags.push(SECURITY_PENDING_TAG.to_owned());
        }
    }

    /// Clear the security-pending gate tag.
    pub fn remove_security_pending_tag(&mut self) {
        self.tags.retain(|t| t != SECURITY_PENDING_TAG);
    }

    /// Validate cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when more than one version is default or the
    /// proxy URL is not an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let defaults = self.versions.iter().filter(|v| v.is_default).count();
        if defaults > 1 {
            return Err(Error::bad_request_field(
                "at most one version may be default",
                "versions",
            ));
        }
        validate_proxy_url(&self.proxy_pass_url)?;
        for v in &self.versions {
            validate_proxy_url(&v.proxy_pass_url)?;
        }
        if self.server_name.trim().is_empty() {
            return Err(Error::bad_request_field(
                "server_name must not be empty",
                "server_name",
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_proxy_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::bad_request_field(
            "proxy_pass_url must be an absolute http(s) URL",
            "proxy_pass_url",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_with_versions() -> McpServer {
        let mut s = McpServer::new(
            ServerPath::new("/fininfo").expect("valid"),
            "Financial Info",
            "http://fininfo:8000",
        );
        s.versions = vec![
            ServerVersion {
                version: "v1".to_owned(),
                proxy_pass_url: "http://fininfo-v1:8000".to_owned(),
                status: VersionStatus::Deprecated,
                is_default: false,
                released: Utc::now(),
                sunset_date: None,
            },
            ServerVersion {
                version: "v2".to_owned(),
                proxy_pass_url: "http://fininfo-v2:8000".to_owned(),
                status: VersionStatus::Stable,
                is_default: true,
                released: Utc::now(),
                sunset_date: None,
            },
        ];
        s
    }

    #[test]
    fn resolves_default_version_without_header() {
        let s = server_with_versions();
        assert_eq!(
            s.resolve_proxy_url(None).expect("ok"),
            "http://fininfo-v2:8000"
        );
    }

    #[test]
    fn resolves_pinned_version() {
        let s = server_with_versions();
        assert_eq!(
            s.resolve_proxy_url(Some("v1")).expect("ok"),
            "http://fininfo-v1:8000"
        );
    }

    #[test]
    fn unknown_pinned_version_is_not_found() {
        let s = server_with_versions();
        assert!(matches!(
            s.resolve_proxy_url(Some("v9")),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn set_default_version_is_exclusive() {
        let mut s = server_with_versions();
        s.set_default_version("v1").expect("ok");
        let defaults: Vec<_> = s.versions.iter().filter(|v| v.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].version, "v1");
    }

    #[test]
    fn two_defaults_fail_validation() {
        let mut s = server_with_versions();
        s.versions[0].is_default = true;
        assert!(s.validate().is_err());
    }

    #[test]
    fn security_pending_tag_round_trip() {
        let mut s = server_with_versions();
        assert!(!s.is_security_pending());
        s.add_security_pending_tag();
        s.add_security_pending_tag();
        assert_eq!(s.tags.iter().filter(|t| *t == "security-pending").count(), 1);
        s.remove_security_pending_tag();
        assert!(!s.is_security_pending());
    }
}
