//! Request middleware: auth-context construction, federation-caller
//! validation, and audit emission.
//!
//! The auth middleware builds one [`AuthContext`] per request from the
//! verified `X-Authorization` token and attaches it to the request
//! extensions; handlers consume the struct instead of re-verifying.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use mgr_domain::constants::auth::{EGRESS_AUTH_HEADER, INGRESS_AUTH_HEADER};
use mgr_domain::entities::{
    AuditAction, AuditAuthorization, AuditEvent, AuditStream, McpRequestInfo, McpResponseInfo,
    McpServerRef,
};
use mgr_domain::error::Error;
use mgr_domain::value_objects::AuthContext;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::to_owned)
}

/// Verify the ingress token, resolve scopes, and attach an [`AuthContext`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer(request.headers(), INGRESS_AUTH_HEADER)
        .ok_or_else(|| Error::unauthenticated("missing X-Authorization bearer token"))?;

    let claims = state.verifier.verify(&token).await?;
    let scope_names = state
        .ctx
        .access_service()
        .resolve_scopes(&state.ctx.namespace, &claims.groups)
        .await?;

    let auth = AuthContext {
        subject: claims.username.unwrap_or(claims.subject),
        client_id: claims.client_id,
        groups: claims.groups,
        scope_names,
        auth_method: "jwt".to_owned(),
    };
    request.extensions_mut().insert(auth.clone());

    // Copy the context onto the response so the audit layer sees it.
    let mut response = next.run(request).await;
    response.extensions_mut().insert(auth);
    Ok(response)
}

/// Validate a federation peer calling the export endpoints: either the
/// static federation token or an OAuth2 client-credentials JWT constrained
/// by `expected_client_id` / `expected_issuer`.
pub async fn require_federation_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_config = &state.ctx.config.auth;
    let token = bearer(request.headers(), EGRESS_AUTH_HEADER)
        .or_else(|| bearer(request.headers(), INGRESS_AUTH_HEADER))
        .ok_or_else(|| Error::unauthenticated("federation caller sent no bearer token"))?;

    if let Some(static_token) = &auth_config.federation_token {
        if token == *static_token {
            let auth = AuthContext {
                subject: "federation-peer".to_owned(),
                client_id: None,
                groups: Vec::new(),
                scope_names: Vec::new(),
                auth_method: "federation-token".to_owned(),
            };
            request.extensions_mut().insert(auth.clone());
            let mut response = next.run(request).await;
            response.extensions_mut().insert(auth);
            return Ok(response);
        }
    }

    let claims = state.verifier.verify(&token).await?;
    if let Some(expected) = &auth_config.expected_client_id {
        if claims.client_id.as_deref() != Some(expected.as_str()) {
            return Err(Error::unauthenticated("federation client_id mismatch").into());
        }
    }
    if let Some(expected) = &auth_config.expected_issuer {
        if claims.issuer.as_deref() != Some(expected.as_str()) {
            return Err(Error::unauthenticated("federation issuer mismatch").into());
        }
    }

    let auth = AuthContext {
        subject: claims.subject,
        client_id: claims.client_id,
        groups: claims.groups,
        scope_names: Vec::new(),
        auth_method: "federation-oauth2".to_owned(),
    };
    request.extensions_mut().insert(auth.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(auth);
    Ok(response)
}

fn derive_action(method: &str, path: &str) -> AuditAction {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let (resource_type, resource_id) = match segments.as_slice() {
        ["api", resource, rest @ ..] => (
            resource.trim_end_matches('s').to_owned(),
            rest.join("/"),
        ),
        [server_path @ .., "mcp"] => ("mcp".to_owned(), server_path.join("/")),
        _ => (String::new(), String::new()),
    };
    AuditAction {
        operation: format!("{} {}", method.to_lowercase(), path),
        resource_type,
        resource_id,
    }
}

/// Emit one audit event per request, after the handler completes.
pub async fn audit_layer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_owned();
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let client_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let response = next.run(request).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let is_mcp = response.extensions().get::<McpServerRef>().is_some();
    let mut event = AuditEvent::begin(if is_mcp {
        AuditStream::McpAccess
    } else {
        AuditStream::RegistryApi
    });

    if let Some(auth) = response.extensions().get::<AuthContext>() {
        event.identity.username = auth.subject.clone();
        event.identity.auth_method = auth.auth_method.clone();
        event.identity.groups = auth.groups.clone();
        event.identity.scopes = auth.scope_names.clone();
        event.identity.is_admin = auth.is_admin();
    }

    event.request.method = method.clone();
    event.request.path = path.clone();
    event.request.client_ip = client_ip;
    event.request.user_agent = user_agent;
    event.response.status_code = response.status().as_u16();
    event.response.duration_ms = duration_ms;
    event.action = derive_action(&method, &path);

    event.authorization = response
        .extensions()
        .get::<AuditAuthorization>()
        .cloned()
        .unwrap_or_else(|| AuditAuthorization {
            decision: if response.status().as_u16() == 403 {
                "deny".to_owned()
            } else {
                "allow".to_owned()
            },
            required_permission: None,
            evaluated_scopes: Vec::new(),
        });

    event.mcp_server = response.extensions().get::<McpServerRef>().cloned();
    event.mcp_request = response.extensions().get::<McpRequestInfo>().cloned();
    event.mcp_response = response.extensions().get::<McpResponseInfo>().cloned();

    state.ctx.audit_service().emit(event).await;
    response
}
