//! Validated identifier newtypes.
//!
//! A [`ServerPath`] is the uniqueness key for servers, agents, skills and
//! virtual servers; a [`PeerId`] identifies a federation peer. Both validate
//! on construction and deserialize through the same validation, so an invalid
//! id never enters the system as a typed value.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static PEER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new("^[a-zA-Z0-9_-]+$").expect("peer id pattern is valid")
});

/// Routing path of a server, agent or skill.
///
/// Starts with `/`, lowercase alphanumerics with hyphens and underscores;
/// `/`-separated segments. Federated copies carry their origin peer as the
/// first segment (`/peer-a/cloudflare-docs`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerPath(String);

impl ServerPath {
    /// Parse and validate a path.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when the path does not match the required shape.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        Self::validate(&raw)?;
        Ok(Self(raw))
    }

    fn validate(raw: &str) -> Result<()> {
        if !raw.starts_with('/') {
            return Err(Error::bad_request_field("path must start with '/'", "path"));
        }
        if raw.len() < 2 || raw.ends_with('/') || raw.contains("//") {
            return Err(Error::bad_request_field(
                "path must have non-empty segments",
                "path",
            ));
        }
        let ok = raw[1..]
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '/'));
        if !ok {
            return Err(Error::bad_request_field(
                "path may contain only lowercase alphanumerics, '-', '_' and '/'",
                "path",
            ));
        }
        Ok(())
    }

    /// The path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix this path with a peer segment, idempotently.
    ///
    /// A path already carrying this peer's prefix is returned unchanged, so
    /// repeated syncs never double-prefix.
    #[must_use]
    pub fn with_peer_prefix(&self, peer: &PeerId) -> Self {
        let segment = peer.as_str().to_lowercase();
        let prefix = format!("/{segment}/");
        if self.0.starts_with(&prefix) {
            return self.clone();
        }
        Self(format!("/{segment}{}", self.0))
    }

    /// Whether this path carries the given peer's prefix.
    #[must_use]
    pub fn has_peer_prefix(&self, peer: &PeerId) -> bool {
        let segment = peer.as_str().to_lowercase();
        self.0.starts_with(&format!("/{segment}/"))
    }
}

impl fmt::Display for ServerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ServerPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ServerPath> for String {
    fn from(value: ServerPath) -> Self {
        value.0
    }
}

impl AsRef<str> for ServerPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a federation peer: `^[a-zA-Z0-9_-]+$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerId(String);

impl PeerId {
    /// Parse and validate a peer id.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when the id contains characters outside
    /// `[a-zA-Z0-9_-]` or is empty.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if !PEER_ID_PATTERN.is_match(&raw) {
            return Err(Error::bad_request_field(
                "peer_id must match ^[a-zA-Z0-9_-]+$",
                "peer_id",
            ));
        }
        Ok(Self(raw))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PeerId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PeerId> for String {
    fn from(value: PeerId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_without_leading_slash() {
        assert!(ServerPath::new("fininfo").is_err());
    }

    #[test]
    fn rejects_uppercase_path() {
        assert!(ServerPath::new("/FinInfo").is_err());
    }

    #[test]
    fn accepts_segmented_path() {
        let p = ServerPath::new("/peer-a/cloudflare-docs").expect("valid");
        assert_eq!(p.as_str(), "/peer-a/cloudflare-docs");
    }

    #[test]
    fn peer_prefixing_is_idempotent() {
        let peer = PeerId::new("peer-a").expect("valid");
        let p = ServerPath::new("/fininfo").expect("valid");
        let once = p.with_peer_prefix(&peer);
        let twice = once.with_peer_prefix(&peer);
        assert_eq!(once.as_str(), "/peer-a/fininfo");
        assert_eq!(once, twice);
    }

    #[test]
    fn peer_id_pattern() {
        assert!(PeerId::new("Peer_1-x").is_ok());
        assert!(PeerId::new("peer a").is_err());
        assert!(PeerId::new("").is_err());
    }
}
