//! Peer registry handlers: CRUD, on-demand sync, status, enable/disable.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use std::collections::BTreeMap;

use mgr_domain::entities::{PeerAuth, PeerAuthType, PeerRegistry, SyncMode};
use mgr_domain::value_objects::{AuthContext, PeerId};

use crate::error::ApiResult;
use crate::state::AppState;

use super::require_admin;

/// Peer definition payload.
#[derive(Debug, Deserialize)]
pub struct PutPeerRequest {
    peer_id: String,
    name: String,
    endpoint: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    sync_mode: SyncMode,
    #[serde(default)]
    whitelist_servers: Vec<String>,
    #[serde(default)]
    whitelist_agents: Vec<String>,
    #[serde(default)]
    tag_filters: Vec<String>,
    sync_interval_minutes: u32,
    #[serde(default)]
    auth_type: PeerAuthType,
    #[serde(default)]
    credentials: BTreeMap<String, String>,
}

impl PutPeerRequest {
    fn into_entity(self) -> mgr_domain::error::Result<PeerRegistry> {
        Ok(PeerRegistry {
            peer_id: PeerId::new(self.peer_id)?,
            name: self.name,
            endpoint: self.endpoint,
            enabled: self.enabled,
            sync_mode: self.sync_mode,
            whitelist_servers: self.whitelist_servers,
            whitelist_agents: self.whitelist_agents,
            tag_filters: self.tag_filters,
            sync_interval_minutes: self.sync_interval_minutes,
            auth: PeerAuth {
                auth_type: self.auth_type,
                credentials: self.credentials,
            },
        })
    }
}

/// `GET /api/peers`
pub async fn list(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let peers = state
        .ctx
        .federation_service()
        .list_peers(&state.ctx.namespace)
        .await?;
    Ok(Json(peers))
}

/// `POST /api/peers`
pub async fn put(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Json(request): Json<PutPeerRequest>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let peer = request.into_entity()?;
    let stored = state
        .ctx
        .federation_service()
        .put_peer(&state.ctx.namespace, peer)
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /api/peers/{peer_id}`
pub async fn get(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Path(peer_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let peer_id = PeerId::new(peer_id)?;
    let peer = state
        .ctx
        .federation_service()
        .get_peer(&state.ctx.namespace, &peer_id)
        .await?;
    Ok(Json(peer))
}

/// `DELETE /api/peers/{peer_id}`
pub async fn delete(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Path(peer_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let peer_id = PeerId::new(peer_id)?;
    state
        .ctx
        .federation_service()
        .delete_peer(&state.ctx.namespace, &peer_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/peers/{peer_id}/sync`
pub async fn sync(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Path(peer_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let peer_id = PeerId::new(peer_id)?;
    let report = state
        .ctx
        .federation_service()
        .sync_peer(&state.ctx.namespace, &peer_id)
        .await?;
    Ok(Json(report))
}

/// `POST /api/peers/sync`
pub async fn sync_all(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let outcomes = state
        .ctx
        .federation_service()
        .sync_all(&state.ctx.namespace)
        .await?;
    Ok(Json(outcomes))
}

/// `GET /api/peers/{peer_id}/status`
pub async fn status(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Path(peer_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let peer_id = PeerId::new(peer_id)?;
    let status = state
        .ctx
        .federation_service()
        .peer_status(&state.ctx.namespace, &peer_id)
        .await?;
    Ok(Json(status))
}

/// `POST /api/peers/{peer_id}/enable`
pub async fn enable(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Path(peer_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    set_enabled(state, auth, peer_id, true).await
}

/// `POST /api/peers/{peer_id}/disable`
pub async fn disable(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Path(peer_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    set_enabled(state, auth, peer_id, false).await
}

async fn set_enabled(
    state: AppState,
    auth: Extension<AuthContext>,
    peer_id: String,
    enabled: bool,
) -> ApiResult<Json<PeerRegistry>> {
    require_admin(&auth)?;
    let peer_id = PeerId::new(peer_id)?;
    let peer = state
        .ctx
        .federation_service()
        .set_peer_enabled(&state.ctx.namespace, &peer_id, enabled)
        .await?;
    Ok(Json(peer))
}
