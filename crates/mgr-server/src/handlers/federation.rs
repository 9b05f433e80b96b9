//! Federation handlers: unified topology, external source ops, and the
//! export endpoints peers pull from.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};

use mgr_domain::entities::{FederationConfig, FederationOrigin};
use mgr_domain::error::Error;
use mgr_domain::value_objects::AuthContext;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use super::require_admin;

fn origin_of(source: &str) -> Result<FederationOrigin, ApiError> {
    match source {
        "anthropic" => Ok(FederationOrigin::Anthropic),
        "asor" => Ok(FederationOrigin::Asor),
        other => Err(ApiError(Error::bad_request(format!(
            "unknown federation source '{other}'"
        )))),
    }
}

/// `GET /api/v1/federation/unified-topology`
pub async fn topology(
    State(state): State<AppState>,
    _auth: Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    let topology = state
        .ctx
        .federation_service()
        .topology(&state.ctx.namespace)
        .await?;
    Ok(Json(topology))
}

/// `POST /api/v1/federation/{source}/sync`
pub async fn sync_external(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Path(source): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let origin = origin_of(&source)?;
    let report = state
        .ctx
        .federation_service()
        .sync_external(&state.ctx.namespace, origin)
        .await?;
    Ok(Json(report))
}

/// `GET /api/v1/federation/{source}/config`
pub async fn get_config(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Path(source): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let origin = origin_of(&source)?;
    let config = state
        .ctx
        .federation_service()
        .get_config(&state.ctx.namespace)
        .await?;
    let section = match origin {
        FederationOrigin::Anthropic => serde_json::to_value(&config.anthropic)?,
        FederationOrigin::Asor => serde_json::to_value(&config.asor)?,
        _ => unreachable!("origin_of only yields external sources"),
    };
    Ok(Json(section))
}

/// `PUT /api/v1/federation/{source}/config`
pub async fn put_config(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Path(source): Path<String>,
    Json(section): Json<mgr_domain::entities::ExternalSourceConfig>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let origin = origin_of(&source)?;
    let mut config: FederationConfig = state
        .ctx
        .federation_service()
        .get_config(&state.ctx.namespace)
        .await?;
    match origin {
        FederationOrigin::Anthropic => config.anthropic = section,
        FederationOrigin::Asor => config.asor = section,
        _ => unreachable!("origin_of only yields external sources"),
    }
    let stored = state
        .ctx
        .federation_service()
        .put_config(&state.ctx.namespace, config)
        .await?;
    Ok(Json(stored))
}

/// `GET /api/federation/servers` — peer export, federation-authenticated.
pub async fn export_servers(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let export = state
        .ctx
        .federation_service()
        .export_servers(&state.ctx.namespace)
        .await?;
    Ok(Json(export))
}

/// `GET /api/federation/agents` — peer export, federation-authenticated.
pub async fn export_agents(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let export = state
        .ctx
        .federation_service()
        .export_agents(&state.ctx.namespace)
        .await?;
    Ok(Json(export))
}
