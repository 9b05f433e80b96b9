//! Access Service Use Case
//!
//! # Overview
//! Layers two and three of the authorization kernel: group → scope expansion
//! through `group_mapping` documents, then FGAC evaluation of
//! `(server, method, tool)` against the resolved `server_scope` rules.
//! Ingress JWT verification (layer one) happens in the server middleware
//! before this service runs.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use mgr_domain::error::Result;
use mgr_domain::ports::repositories::ScopeRepository;
use mgr_domain::ports::services::AccessServiceInterface;
use mgr_domain::value_objects::{AccessDecision, AuthContext, Namespace, RequestedAccess};

use crate::support::retry::with_backoff;

/// Implementation of the `AccessServiceInterface`.
pub struct AccessServiceImpl {
    scopes: Arc<dyn ScopeRepository>,
}

impl AccessServiceImpl {
    /// Create the service with injected dependencies.
    pub fn new(scopes: Arc<dyn ScopeRepository>) -> Self {
        Self { scopes }
    }

    fn required_permission(access: &RequestedAccess) -> String {
        match &access.tool {
            Some(tool) => format!("{}:{}:{tool}", access.server_path, access.method),
            None => format!("{}:{}", access.server_path, access.method),
        }
    }
}

#[async_trait]
impl AccessServiceInterface for AccessServiceImpl {
    async fn resolve_scopes(&self, ns: &Namespace, groups: &[String]) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for group in groups {
            let mapping = with_backoff("access.resolve_scopes", || {
                self.scopes.get_group_mapping(ns, group)
            })
            .await?;
            if let Some(mapping) = mapping {
                names.extend(mapping.group_mappings);
            }
        }
        Ok(names.into_iter().collect())
    }

    async fn evaluate(
        &self,
        ns: &Namespace,
        ctx: &AuthContext,
        access: &RequestedAccess,
    ) -> Result<AccessDecision> {
        let evaluated = ctx.scope_names.clone();

        // Admin scopes short-circuit rule evaluation entirely.
        if ctx.is_admin() {
            return Ok(AccessDecision::allow(evaluated));
        }

        for scope_name in &ctx.scope_names {
            let scope = with_backoff("access.evaluate", || {
                self.scopes.get_server_scope(ns, scope_name)
            })
            .await?;
            let Some(scope) = scope else { continue };

            let allowed = scope.server_access.iter().any(|rule| {
                rule.permits(
                    access.server_path.as_str(),
                    &access.method,
                    access.tool.as_deref(),
                )
            });
            if allowed {
                return Ok(AccessDecision::allow(evaluated));
            }
        }

        Ok(AccessDecision::deny(
            Self::required_permission(access),
            evaluated,
        ))
    }
}
