//! Router assembly.

use std::sync::Arc;

use axum::routing::{any, get, post};
use axum::{Extension, Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::{audit_layer, require_auth, require_federation_auth};
use crate::handlers::{agents, audit, federation, health, peers, search, servers, skills};
use crate::proxy::{self, ProxyGate};
use crate::state::AppState;

/// Build the full application router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let gate = Arc::new(ProxyGate::new(
        state.ctx.config.proxy.max_concurrent_requests,
    ));

    // Registry + admin API: every route behind ingress JWT auth.
    let api = Router::new()
        .route("/servers", get(servers::list).post(servers::register))
        .route(
            "/servers/{*path}",
            get(servers::get)
                .put(servers::update)
                .delete(servers::delete)
                .post(servers::action),
        )
        .route("/agents", get(agents::list).post(agents::register))
        .route(
            "/agents/{*path}",
            get(agents::get)
                .put(agents::update)
                .delete(agents::delete)
                .post(agents::action),
        )
        .route("/skills", get(skills::list).post(skills::register))
        .route(
            "/skills/{*path}",
            get(skills::get)
                .put(skills::update)
                .delete(skills::delete)
                .post(skills::action),
        )
        .route("/search", get(search::search))
        .route("/peers", get(peers::list).post(peers::put))
        .route("/peers/sync", post(peers::sync_all))
        .route("/peers/{peer_id}", get(peers::get).delete(peers::delete))
        .route("/peers/{peer_id}/sync", post(peers::sync))
        .route("/peers/{peer_id}/status", get(peers::status))
        .route("/peers/{peer_id}/enable", post(peers::enable))
        .route("/peers/{peer_id}/disable", post(peers::disable))
        .route(
            "/v1/federation/unified-topology",
            get(federation::topology),
        )
        .route("/v1/federation/{source}/sync", post(federation::sync_external))
        .route(
            "/v1/federation/{source}/config",
            get(federation::get_config).put(federation::put_config),
        )
        .route("/audit/events", get(audit::events))
        .route("/audit/export", get(audit::export))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Peer-facing export endpoints: federation auth, not user auth.
    let exports = Router::new()
        .route("/federation/servers", get(federation::export_servers))
        .route("/federation/agents", get(federation::export_agents))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_federation_auth,
        ));

    // Everything that is not /health or /api is gateway traffic.
    let gateway = Router::new()
        .fallback(any(proxy::gateway))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api.merge(exports))
        .fallback_service(gateway)
        .layer(Extension(gate))
        .layer(middleware::from_fn_with_state(state.clone(), audit_layer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
