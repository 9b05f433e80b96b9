//! Skill CRUD handlers plus the `content`, `tools`, `rate` and `health`
//! subpaths.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use mgr_domain::entities::{AllowedTool, Skill, Visibility};
use mgr_domain::error::Error;
use mgr_domain::value_objects::{AuthContext, ServerPath};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use super::{require_admin, split_action};

/// Registration payload for a skill.
#[derive(Debug, Deserialize)]
pub struct RegisterSkillRequest {
    path: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    skill_md_url: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    visibility: Option<Visibility>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    target_agents: Vec<String>,
    #[serde(default)]
    allowed_tools: Vec<AllowedTool>,
    #[serde(default)]
    requirements: serde_json::Value,
}

impl RegisterSkillRequest {
    fn into_entity(self) -> Result<Skill, Error> {
        let path = ServerPath::new(self.path)?;
        let mut skill = Skill::new(path, self.name);
        skill.description = self.description;
        skill.skill_md_url = self.skill_md_url;
        skill.version = self.version;
        skill.author = self.author;
        skill.visibility = self.visibility.unwrap_or_default();
        skill.tags = self.tags;
        skill.target_agents = self.target_agents;
        skill.allowed_tools = self.allowed_tools;
        skill.requirements = self.requirements;
        Ok(skill)
    }
}

/// `GET /api/skills`
pub async fn list(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let skills = state
        .ctx
        .registry_service()
        .list_skills(&state.ctx.namespace)
        .await?;
    Ok(Json(skills))
}

/// `POST /api/skills`
pub async fn register(
    State(state): State<AppState>,
    _auth: Extension<AuthContext>,
    Json(request): Json<RegisterSkillRequest>,
) -> ApiResult<impl IntoResponse> {
    let skill = request.into_entity()?;
    let stored = state
        .ctx
        .registry_service()
        .register_skill(&state.ctx.namespace, skill)
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

const SKILL_ACTIONS: &[&str] = &["content", "tools", "rate", "health"];

/// `GET /api/skills/{*path}` — plain get plus the read-only subpaths.
pub async fn get(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<axum::response::Response> {
    let (path, action) = split_action(&raw, SKILL_ACTIONS)?;
    let skill = state
        .ctx
        .registry_service()
        .get_skill(&state.ctx.namespace, &path)
        .await?;

    let response = match action {
        None => Json(skill).into_response(),
        Some("content") => Json(json!({
            "path": skill.path,
            "skill_md_url": skill.skill_md_url,
            "version": skill.version,
        }))
        .into_response(),
        Some("tools") => Json(skill.allowed_tools).into_response(),
        Some("health") => {
            // A skill is healthy when every allowed tool's backing server
            // exists and is enabled.
            let mut healthy = true;
            let mut missing = Vec::new();
            for tool in &skill.allowed_tools {
                match state
                    .ctx
                    .registry_service()
                    .get_server(&state.ctx.namespace, &tool.server_path)
                    .await
                {
                    Ok(server) if server.is_enabled => {}
                    _ => {
                        healthy = false;
                        missing.push(tool.server_path.to_string());
                    }
                }
            }
            Json(json!({"healthy": healthy, "unavailable_servers": missing})).into_response()
        }
        Some("rate") => {
            return Err(ApiError(Error::bad_request("rate requires POST")));
        }
        Some(_) => return Err(ApiError(Error::not_found(format!("no action on {path}")))),
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    rating: u8,
}

/// `POST /api/skills/{*path}` — dispatches the `rate` action suffix.
pub async fn action(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    _auth: Extension<AuthContext>,
    Json(body): Json<RateRequest>,
) -> ApiResult<impl IntoResponse> {
    let (path, action) = split_action(&raw, SKILL_ACTIONS)?;
    match action {
        Some("rate") => {
            let skill = state
                .ctx
                .registry_service()
                .rate_skill(&state.ctx.namespace, &path, body.rating)
                .await?;
            Ok(Json(skill))
        }
        _ => Err(ApiError(Error::not_found(format!("no action on {path}")))),
    }
}

/// `PUT /api/skills/{*path}`
pub async fn update(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    _auth: Extension<AuthContext>,
    Json(request): Json<RegisterSkillRequest>,
) -> ApiResult<impl IntoResponse> {
    let path = super::entity_path(&raw)?;
    let mut skill = request.into_entity()?;
    if skill.path != path {
        return Err(ApiError(Error::bad_request_field(
            "body path does not match URL",
            "path",
        )));
    }
    skill = state
        .ctx
        .registry_service()
        .update_skill(&state.ctx.namespace, skill)
        .await?;
    Ok(Json(skill))
}

/// `DELETE /api/skills/{*path}`
pub async fn delete(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    auth: Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let path = super::entity_path(&raw)?;
    state
        .ctx
        .registry_service()
        .delete_skill(&state.ctx.namespace, &path)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
