//! A2A agent entity.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value_objects::ids::{PeerId, ServerPath};

use super::federation::FederationOrigin;
use super::server::{Visibility, validate_proxy_url};

/// How much the registry trusts an agent's self-description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// Unvetted
    #[default]
    #[display("low")]
    Low,
    /// Passed basic review
    #[display("medium")]
    Medium,
    /// Operated by a known party
    #[display("high")]
    High,
    /// Cryptographically attested
    #[display("verified")]
    Verified,
}

/// One skill advertised on an agent card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    /// Skill id, unique within its agent
    pub id: String,
    /// Display name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Registered A2A agent document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique routing path within the namespace
    pub path: ServerPath,
    /// Display name
    pub name: String,
    /// Description shown in catalogs and indexed for search
    #[serde(default)]
    pub description: String,
    /// Upstream agent card / endpoint URL
    pub proxy_pass_url: String,
    /// A2A protocol version the agent speaks
    #[serde(default)]
    pub protocol_version: String,
    /// Coarse capability labels
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Skills advertised on the agent card
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
    /// Trust classification
    #[serde(default)]
    pub trust_level: TrustLevel,
    /// Catalog visibility
    #[serde(default)]
    pub visibility: Visibility,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the gateway will route to this agent
    #[serde(default)]
    pub is_enabled: bool,
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

impl Agent {
    /// Minimal constructor; timestamps are set to now.
    pub fn new(path: ServerPath, name: impl Into<String>, proxy_pass_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            path,
            name: name.into(),
            description: String::new(),
            proxy_pass_url: proxy_pass_url.into(),
            protocol_version: String::new(),
            capabilities: Vec::new(),
            skills: Vec::new(),
            trust_level: TrustLevel::default(),
            visibility: Visibility::default(),
            tags: Vec::new(),
            is_enabled: false,
            origin_peer: None,
            origin_type: None,
            generation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this copy came from federation.
    #[must_use]
    pub fn is_federated(&self) -> bool {
        self.origin_peer.is_some() || self.origin_type.is_some()
    }

    /// Validate cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` on an empty name or a malformed endpoint URL.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::bad_request_field("name must not be empty", "name"));
        }
        validate_proxy_url(&self.proxy_pass_url)
    }
}
