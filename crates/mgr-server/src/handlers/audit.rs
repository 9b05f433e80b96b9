//! Audit read handlers.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use mgr_domain::entities::{AuditQuery, AuditStream, SortOrder};
use mgr_domain::value_objects::AuthContext;

use crate::error::ApiResult;
use crate::state::AppState;

use super::require_admin;

#[derive(Debug, Deserialize)]
pub struct AuditParams {
    #[serde(default)]
    stream: Option<AuditStream>,
    #[serde(default)]
    from: Option<DateTime<Utc>>,
    #[serde(default)]
    to: Option<DateTime<Utc>>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    resource_type: Option<String>,
    #[serde(default)]
    status_min: Option<u16>,
    #[serde(default)]
    status_max: Option<u16>,
    #[serde(default)]
    sort: Option<SortOrder>,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    page_size: Option<usize>,
}

impl From<AuditParams> for AuditQuery {
    fn from(params: AuditParams) -> Self {
        let defaults = AuditQuery::default();
        Self {
            stream: params.stream,
            from: params.from,
            to: params.to,
            username: params.username,
            operation: params.operation,
            resource_type: params.resource_type,
            status_min: params.status_min,
            status_max: params.status_max,
            sort: params.sort.unwrap_or_default(),
            page: params.page.unwrap_or(0),
            page_size: params.page_size.unwrap_or(defaults.page_size),
        }
    }
}

/// `GET /api/audit/events`
pub async fn events(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Query(params): Query<AuditParams>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let page = state.ctx.audit_service().query(&params.into()).await?;
    Ok(Json(page))
}

/// `GET /api/audit/export`
pub async fn export(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Query(params): Query<AuditParams>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&auth)?;
    let events = state.ctx.audit_service().export(&params.into()).await?;
    Ok(Json(events))
}
