//! Agent CRUD and lifecycle handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;

use mgr_domain::entities::{Agent, AgentSkill, TrustLevel, Visibility};
use mgr_domain::error::Error;
use mgr_domain::ports::services::AgentUpdate;
use mgr_domain::value_objects::{AuthContext, ServerPath};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use super::{require_admin, split_action};

/// Registration payload for an A2A agent.
#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    path: String,
    name: String,
    #[serde(default)]
    description: String,
    proxy_pass_url: String,
    #[serde(default)]
    protocol_version: String,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    skills: Vec<AgentSkill>,
    #[serde(default)]
    trust_level: Option<TrustLevel>,
    #[serde(default)]
    visibility: Option<Visibility>,
    #[serde(default)]
    tags: Vec<String>,
}

impl RegisterAgentRequest {
    fn into_entity(self) -> Result<Agent, Error> {
        let path = ServerPath::new(self.path)?;
        let mut agent = Agent::new(path, self.name, self.proxy_pass_url);
        agent.description = self.description;
        agent.protocol_version = self.protocol_version;
        agent.capabilities = self.capabilities;
        agent.skills = self.skills;
        agent.trust_level = self.trust_level.unwrap_or_default();
        agent.visibility = self.visibility.unwrap_or_default();
        agent.tags = self.tags;
        Ok(agent)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    include_disabled: bool,
}

/// `GET /api/agents`
pub async fn list(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let include_disabled = query.include_disabled && auth.is_admin();
    let agents = state
        .ctx
        .registry_service()
        .list_agents(&state.ctx.namespace, include_disabled)
        .await?;
    Ok(Json(agents))
}

/// `POST /api/agents`
pub async fn register(
    State(state): State<AppState>,
    _auth: Extension<AuthContext>,
    Json(request): Json<RegisterAgentRequest>,
) -> ApiResult<impl IntoResponse> {
    let agent = request.into_entity()?;
    let outcome = state
        .ctx
        .registry_service()
        .register_agent(&state.ctx.namespace, agent)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /api/agents/{*path}`
pub async fn get(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let path = super::entity_path(&raw)?;
    let agent = state
        .ctx
        .registry_service()
        .get_agent(&state.ctx.namespace, &path)
        .await?;
    Ok(Json(agent))
}

/// `PUT /api/agents/{*path}`
pub async fn update(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    _auth: Extension<AuthContext>,
    Json(update): Json<AgentUpdate>,
) -> ApiResult<impl IntoResponse> {
    let path = super::entity_path(&raw)?;
    let agent = state
        .ctx
        .registry_service()
        .update_agent(&state.ctx.namespace, &path, update)
        .await?;
    Ok(Json(agent))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    confirm_name: String,
}

/// `DELETE /api/agents/{*path}?confirm_name=...`
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
        .delete_agent(&state.ctx.namespace, &path, &query.confirm_name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    enabled: bool,
}

/// `POST /api/agents/{*path}` — dispatches the `toggle` action suffix.
pub async fn action(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    auth: Extension<AuthContext>,
    Json(body): Json<ToggleRequest>,
) -> ApiResult<impl IntoResponse> {
    let (path, action) = split_action(&raw, &["toggle"])?;
    match action {
        Some("toggle") => {
            let agent = state
                .ctx
                .registry_service()
                .toggle_agent(&state.ctx.namespace, &path, body.enabled, &auth.0)
                .await?;
            Ok(Json(agent))
        }
        _ => Err(ApiError(Error::not_found(format!("no action on {path}")))),
    }
}
