//! Server CRUD and lifecycle handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;

use mgr_domain::entities::{McpServer, ServerVersion, ToolDef, Transport, Visibility};
use mgr_domain::error::Error;
use mgr_domain::ports::services::ServerUpdate;
use mgr_domain::value_objects::{AuthContext, ServerPath};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use super::{require_admin, split_action};

/// Registration payload; server-assigned fields are absent by design.
#[derive(Debug, Deserialize)]
pub struct RegisterServerRequest {
    path: String,
    server_name: String,
    #[serde(default)]
    description: String,
    proxy_pass_url: String,
    #[serde(default)]
    supported_transports: Vec<Transport>,
    #[serde(default)]
    auth_type: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    tool_list: Vec<ToolDef>,
    #[serde(default)]
    visibility: Option<Visibility>,
    #[serde(default)]
    versions: Vec<ServerVersion>,
    #[serde(default)]
    backend_paths: Vec<String>,
}

impl RegisterServerRequest {
    fn into_entity(self) -> Result<McpServer, Error> {
        let path = ServerPath::new(self.path)?;
        let mut server = McpServer::new(path, self.server_name, self.proxy_pass_url);
        server.description = self.description;
        server.supported_transports = self.supported_transports;
        server.auth_type = self.auth_type;
        server.tags = self.tags;
        server.tool_list = self.tool_list;
        server.visibility = self.visibility.unwrap_or_default();
        server.versions = self.versions;
        server.backend_paths = self
            .backend_paths
            .into_iter()
            .map(ServerPath::new)
            .collect::<Result<_, _>>()?;
        Ok(server)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    include_disabled: bool,
}

/// `GET /api/servers`
pub async fn list(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let include_disabled = query.include_disabled && auth.is_admin();
    let servers = state
        .ctx
        .registry_service()
        .list_servers(&state.ctx.namespace, include_disabled)
        .await?;
    Ok(Json(servers))
}

/// `POST /api/servers`
pub async fn register(
    State(state): State<AppState>,
    _auth: Extension<AuthContext>,
    Json(request): Json<RegisterServerRequest>,
) -> ApiResult<impl IntoResponse> {
    let server = request.into_entity()?;
    let outcome = state
        .ctx
        .registry_service()
        .register_server(&state.ctx.namespace, server)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /api/servers/{*path}`
pub async fn get(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let path = super::entity_path(&raw)?;
    let server = state
        .ctx
        .registry_service()
        .get_server(&state.ctx.namespace, &path)
        .await?;
    Ok(Json(server))
}

/// `PUT /api/servers/{*path}`
pub async fn update(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    _auth: Extension<AuthContext>,
    Json(update): Json<ServerUpdate>,
) -> ApiResult<impl IntoResponse> {
    let path = super::entity_path(&raw)?;
    let server = state
        .ctx
        .registry_service()
        .update_server(&state.ctx.namespace, &path, update)
        .await?;
    Ok(Json(server))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Echo of the stored `server_name`; deletion is rejected otherwise.
    confirm_name: String,
}

/// `DELETE /api/servers/{*path}?confirm_name=...`
pub async fn delete(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    auth: Extension<AuthContext>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let path = super::entity_path(&raw)?;
    state
        .ctx
        .registry_service()
        .delete_server(&state.ctx.namespace, &path, &query.confirm_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    enabled: bool,
    /// Admin override for servers gated by an `unsafe` verdict.
    #[serde(default)]
    override_unsafe: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetDefaultVersionRequest {
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ServerActionRequest {
    /// `POST .../toggle`
    Toggle(ToggleRequest),
    /// `POST .../versions/default`
    SetDefaultVersion(SetDefaultVersionRequest),
}

/// `POST /api/servers/{*path}` — dispatches `toggle` and
/// `versions/default` action suffixes.
pub async fn action(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    auth: Extension<AuthContext>,
    Json(body): Json<ServerActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let (path, action) = split_action(&raw, &["toggle", "versions/default"])?;
    match (action, body) {
        (Some("toggle"), ServerActionRequest::Toggle(toggle)) => {
            let server = state
                .ctx
                .registry_service()
                .toggle_server(
                    &state.ctx.namespace,
                    &path,
                    toggle.enabled,
                    toggle.override_unsafe,
                    &auth.0,
                )
                .await?;
            Ok(Json(server))
        }
        (Some("versions/default"), ServerActionRequest::SetDefaultVersion(request)) => {
            let server = state
                .ctx
                .registry_service()
                .set_default_version(&state.ctx.namespace, &path, &request.version)
                .await?;
            Ok(Json(server))
        }
        (Some(other), _) => Err(ApiError(Error::bad_request(format!(
            "mismatched body for action '{other}'"
        )))),
        (None, _) => Err(ApiError(Error::not_found(format!(
            "no action on {path}"
        )))),
    }
}
