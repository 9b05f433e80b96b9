//! Relevance search handler.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;

use mgr_domain::constants::search::{DEFAULT_MAX_RESULTS, DEFAULT_PER_TYPE_LIMIT};
use mgr_domain::value_objects::{AuthContext, EntityType, SearchRequest};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Free-form query text
    #[serde(default)]
    q: String,
    /// Comma-separated entity types (`server,agent`)
    #[serde(default)]
    types: Option<String>,
    #[serde(default)]
    max_results: Option<usize>,
    #[serde(default)]
    include_disabled: bool,
}

/// `GET /api/search?q=...`
pub async fn search(
    State(state): State<AppState>,
    auth: Extension<AuthContext>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let entity_types = query.types.as_deref().map(|raw| {
        raw.split(',')
            .filter_map(|t| match t.trim() {
                "server" | "servers" => Some(EntityType::Server),
                "agent" | "agents" => Some(EntityType::Agent),
                _ => None,
            })
            .collect()
    });

    let request = SearchRequest {
        query: query.q,
        entity_types,
        max_results: query.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
        per_type_limit: DEFAULT_PER_TYPE_LIMIT,
        include_disabled: query.include_disabled && auth.is_admin(),
    };

    let results = state
        .ctx
        .search_service()
        .search(&state.ctx.namespace, &request)
        .await?;
    Ok(Json(results))
}
