//! HTTP handlers.
//!
//! Entity paths contain `/` (federated copies are peer-prefixed), so CRUD
//! routes capture a wildcard and action verbs (`toggle`,
//! `versions/default`, skill subpaths) are dispatched off the captured
//! tail rather than declared as separate routes.

pub mod agents;
pub mod audit;
pub mod federation;
pub mod health;
pub mod peers;
pub mod search;
pub mod servers;
pub mod skills;

use axum::Extension;

use mgr_domain::error::{Error, Result};
use mgr_domain::value_objects::{AuthContext, ServerPath};

/// Split a captured wildcard into the entity path and an optional action
/// suffix (`fininfo/toggle` → `/fininfo` + `toggle`).
pub(crate) fn split_action<'a>(raw: &str, actions: &[&'a str]) -> Result<(ServerPath, Option<&'a str>)> {
    let raw = raw.trim_matches('/');
    for action in actions {
        if let Some(prefix) = raw.strip_suffix(&format!("/{action}")) {
            return Ok((ServerPath::new(format!("/{prefix}"))?, Some(action)));
        }
    }
    Ok((ServerPath::new(format!("/{raw}"))?, None))
}

/// Entity path from a wildcard with no action suffix allowed.
pub(crate) fn entity_path(raw: &str) -> Result<ServerPath> {
    ServerPath::new(format!("/{}", raw.trim_matches('/')))
}

/// Require an admin scope on the caller.
pub(crate) fn require_admin(auth: &Extension<AuthContext>) -> Result<()> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(Error::forbidden("mcp-registry-admin"))
    }
}
