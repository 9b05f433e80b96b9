//! Background workers: federation scheduler, token refresher, scan sweeper.
//!
//! Each worker is an independent task on its own cadence, checking the
//! cooperative stop signal between cycles; in-flight work completes or hits
//! its per-call timeout.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mgr_domain::entities::FederationOrigin;

use crate::state::AppState;

/// Cadence at which the federation scheduler re-evaluates peer due-ness.
const SCHEDULER_TICK_SECS: u64 = 60;

/// Spawn every configured worker; returns their handles for shutdown joins.
pub fn spawn_workers(state: AppState, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
    let mut handles = vec![tokio::spawn(federation_scheduler(
        state.clone(),
        cancel.clone(),
    ))];

    if state.ctx.config.tokens.enabled {
        handles.push(tokio::spawn(token_refresher(state.clone(), cancel.clone())));
    }
    if state.ctx.config.security.sweep_interval_minutes.is_some() {
        handles.push(tokio::spawn(scan_sweeper(state, cancel)));
    }
    handles
}

/// One cooperative task per tick: peers whose interval has elapsed are
/// synced concurrently; the per-peer lock makes overlapping ticks harmless.
async fn federation_scheduler(state: AppState, cancel: CancellationToken) {
    let ns = state.ctx.namespace.clone();

    if state.ctx.config.federation.sync_on_startup {
        startup_sync(&state).await;
    }

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                mgr_domain::info!("federation", "scheduler stopping");
                return;
            }
            () = tokio::time::sleep(Duration::from_secs(SCHEDULER_TICK_SECS)) => {}
        }

        let peers = match state.ctx.federation_service().list_peers(&ns).await {
            Ok(peers) => peers,
            Err(err) => {
                mgr_domain::warn!("federation", "scheduler cannot list peers", &err);
                continue;
            }
        };

        for peer in peers.into_iter().filter(|p| p.enabled) {
            let due = match state
                .ctx
                .federation_service()
                .peer_status(&ns, &peer.peer_id)
                .await
            {
                Ok(status) => status.last_successful_sync.is_none_or(|last| {
                    let elapsed = Utc::now() - last;
                    elapsed >= chrono::Duration::minutes(i64::from(peer.sync_interval_minutes))
                }),
                Err(_) => true,
            };
            if !due {
                continue;
            }

            let state = state.clone();
            let ns = ns.clone();
            tokio::spawn(async move {
                match state
                    .ctx
                    .federation_service()
                    .sync_peer(&ns, &peer.peer_id)
                    .await
                {
                    Ok(report) => {
                        mgr_domain::debug!(
                            "federation",
                            "scheduled sync finished",
                            &format!("{} gen={}", peer.peer_id, report.generation)
                        );
                    }
                    // Conflicts just mean an on-demand sync won the race.
                    Err(err) if !matches!(err, mgr_domain::Error::Conflict { .. }) => {
                        mgr_domain::warn!(
                            "federation",
                            "scheduled sync failed",
                            &format!("{}: {err}", peer.peer_id)
                        );
                    }
                    Err(_) => {}
                }
            });
        }
    }
}

async fn startup_sync(state: &AppState) {
    let ns = &state.ctx.namespace;
    match state.ctx.federation_service().sync_all(ns).await {
        Ok(outcomes) => {
            mgr_domain::info!(
                "federation",
                "startup peer sync finished",
                &outcomes.len()
            );
        }
        Err(err) => {
            mgr_domain::warn!("federation", "startup peer sync failed", &err);
        }
    }

    let config = match state.ctx.federation_service().get_config(ns).await {
        Ok(config) => config,
        Err(err) => {
            mgr_domain::warn!("federation", "cannot read federation config", &err);
            return;
        }
    };
    for (origin, source) in [
        (FederationOrigin::Anthropic, &config.anthropic),
        (FederationOrigin::Asor, &config.asor),
    ] {
        if source.enabled && source.sync_on_startup {
            if let Err(err) = state.ctx.federation_service().sync_external(ns, origin).await {
                mgr_domain::warn!(
                    "federation",
                    "startup external sync failed",
                    &format!("{origin}: {err}")
                );
            }
        }
    }
}

async fn token_refresher(state: AppState, cancel: CancellationToken) {
    let interval = Duration::from_secs(state.ctx.config.tokens.refresh_interval_minutes * 60);
    loop {
        match state.ctx.token_service().refresh_cycle().await {
            Ok(report) => {
                mgr_domain::debug!(
                    "tokens",
                    "refresh cycle finished",
                    &format!(
                        "refreshed={} skipped={} failed={}",
                        report.refreshed, report.skipped, report.failed
                    )
                );
            }
            Err(err) => {
                mgr_domain::error!("tokens", "refresh cycle failed", &err);
            }
        }

        tokio::select! {
            () = cancel.cancelled() => {
                mgr_domain::info!("tokens", "refresher stopping");
                return;
            }
            () = tokio::time::sleep(interval) => {}
        }
    }
}

async fn scan_sweeper(state: AppState, cancel: CancellationToken) {
    let Some(minutes) = state.ctx.config.security.sweep_interval_minutes else {
        return;
    };
    let interval = Duration::from_secs(minutes * 60);
    let ns = state.ctx.namespace.clone();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                mgr_domain::info!("scan", "sweeper stopping");
                return;
            }
            () = tokio::time::sleep(interval) => {}
        }

        match state.ctx.scan_service().scan_all(&ns).await {
            Ok(results) => {
                mgr_domain::info!("scan", "sweep finished", &results.len());
            }
            Err(err) => {
                mgr_domain::error!("scan", "sweep failed", &err);
            }
        }
    }
}
