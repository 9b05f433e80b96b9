//! Federation sync engine tests: generations, filters, orphan reclamation,
//! failure accounting.

mod support;

use std::sync::Arc;

use chrono::Utc;

use mgr_domain::entities::{
    PeerAuth, PeerRegistry, ServerExportItem, SyncMode, Visibility,
};
use mgr_domain::error::Error;
use mgr_domain::ports::services::FederationServiceInterface as _;
use mgr_domain::value_objects::{PeerId, ServerPath};

use support::{Harness, ScriptedPeerClient};

fn peer(peer_id: &str, sync_mode: SyncMode) -> PeerRegistry {
    PeerRegistry {
        peer_id: PeerId::new(peer_id).expect("peer id"),
        name: format!("Peer {peer_id}"),
        endpoint: "https://peer.example.com".to_owned(),
        enabled: true,
        sync_mode,
        whitelist_servers: vec!["/fininfo".to_owned()],
        whitelist_agents: Vec::new(),
        tag_filters: vec!["prod".to_owned()],
        sync_interval_minutes: 30,
        auth: PeerAuth::default(),
    }
}

fn export_item(path: &str, name: &str, tags: &[&str]) -> ServerExportItem {
    ServerExportItem {
        path: ServerPath::new(path).expect("path"),
        server_name: name.to_owned(),
        description: String::new(),
        proxy_pass_url: "http://remote:8000".to_owned(),
        supported_transports: Vec::new(),
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        tool_list: Vec::new(),
        visibility: Visibility::Public,
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn sync_imports_with_peer_prefix_and_generation() {
    let h = Harness::new(false).await;
    let client = Arc::new(ScriptedPeerClient::exporting(vec![
        export_item("/fininfo", "Fin", &[]),
        export_item("/weather", "Weather", &[]),
    ]));
    let federation = h.federation(client, Vec::new());

    let peer_id = PeerId::new("peer-a").expect("peer id");
    federation
        .put_peer(&h.namespace, peer(peer_id.as_str(), SyncMode::All))
        .await
        .expect("put peer");

    let report = federation
        .sync_peer(&h.namespace, &peer_id)
        .await
        .expect("sync");
    assert_eq!(report.generation, 1);
    assert_eq!(report.servers_synced, 2);
    assert_eq!(report.servers_orphaned, 0);

    let imported = h
        .servers
        .get(&h.namespace, &ServerPath::new("/peer-a/fininfo").expect("path"))
        .await
        .expect("imported copy");
    assert_eq!(imported.origin_peer, Some(peer_id.clone()));
    assert_eq!(imported.generation, Some(1));
    assert!(imported.is_enabled);

    let status = federation
        .peer_status(&h.namespace, &peer_id)
        .await
        .expect("status");
    assert_eq!(status.current_generation, 1);
    assert!(status.is_healthy);
    assert!(!status.sync_in_progress);
    assert_eq!(status.total_servers_synced, 2);
}

#[tokio::test]
async fn vanished_items_are_reclaimed_as_orphans() {
    let h = Harness::new(false).await;
    let client = Arc::new(ScriptedPeerClient::exporting(vec![
        export_item("/fininfo", "A", &[]),
        export_item("/weather", "B", &[]),
    ]));
    let federation = h.federation(Arc::clone(&client) as Arc<_>, Vec::new());

    let peer_id = PeerId::new("peer-a").expect("peer id");
    federation
        .put_peer(&h.namespace, peer(peer_id.as_str(), SyncMode::All))
        .await
        .expect("put peer");
    federation
        .sync_peer(&h.namespace, &peer_id)
        .await
        .expect("first sync");

    // The peer now exports only A.
    client.set_servers(vec![export_item("/fininfo", "A", &[])]);
    let report = federation
        .sync_peer(&h.namespace, &peer_id)
        .await
        .expect("second sync");
    assert_eq!(report.generation, 2);
    assert_eq!(report.servers_synced, 1);
    assert_eq!(report.servers_orphaned, 1);

    let err = h
        .servers
        .get(&h.namespace, &ServerPath::new("/peer-a/weather").expect("path"))
        .await
        .expect_err("orphan is gone");
    assert!(matches!(err, Error::NotFound { .. }));

    // Nothing from this peer remains below the current generation.
    let remaining = h
        .servers
        .list_by_origin(&h.namespace, &peer_id)
        .await
        .expect("list");
    assert!(remaining.iter().all(|s| s.generation == Some(2)));
}

#[tokio::test]
async fn whitelist_mode_only_accepts_listed_paths() {
    let h = Harness::new(false).await;
    let client = Arc::new(ScriptedPeerClient::exporting(vec![
        export_item("/fininfo", "Fin", &[]),
        export_item("/weather", "Weather", &[]),
    ]));
    let federation = h.federation(client, Vec::new());

    let peer_id = PeerId::new("peer-a").expect("peer id");
    federation
        .put_peer(&h.namespace, peer(peer_id.as_str(), SyncMode::Whitelist))
        .await
        .expect("put peer");

    let report = federation
        .sync_peer(&h.namespace, &peer_id)
        .await
        .expect("sync");
    assert_eq!(report.servers_synced, 1);
    assert!(
        h.servers
            .get(&h.namespace, &ServerPath::new("/peer-a/weather").expect("path"))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn tag_filter_mode_intersects_tags() {
    let h = Harness::new(false).await;
    let client = Arc::new(ScriptedPeerClient::exporting(vec![
        export_item("/fininfo", "Fin", &["prod"]),
        export_item("/weather", "Weather", &["dev"]),
    ]));
    let federation = h.federation(client, Vec::new());

    let peer_id = PeerId::new("peer-a").expect("peer id");
    federation
        .put_peer(&h.namespace, peer(peer_id.as_str(), SyncMode::TagFilter))
        .await
        .expect("put peer");

    let report = federation
        .sync_peer(&h.namespace, &peer_id)
        .await
        .expect("sync");
    assert_eq!(report.servers_synced, 1);
}

#[tokio::test]
async fn transport_failures_accumulate_until_unhealthy() {
    let h = Harness::new(false).await;
    let client = Arc::new(ScriptedPeerClient::failing("peer-a"));
    let federation = h.federation(client, Vec::new());

    let peer_id = PeerId::new("peer-a").expect("peer id");
    federation
        .put_peer(&h.namespace, peer(peer_id.as_str(), SyncMode::All))
        .await
        .expect("put peer");

    for expected_failures in 1..=3_u32 {
        let err = federation
            .sync_peer(&h.namespace, &peer_id)
            .await
            .expect_err("peer is down");
        assert!(matches!(err, Error::PeerUnreachable { .. }));

        let status = federation
            .peer_status(&h.namespace, &peer_id)
            .await
            .expect("status");
        assert_eq!(status.consecutive_failures, expected_failures);
        assert!(!status.sync_in_progress);
        // Healthy until the counter exceeds 2.
        assert_eq!(status.is_healthy, expected_failures <= 2);
        // Failures never advance the generation.
        assert_eq!(status.current_generation, 0);
    }
}

#[tokio::test]
async fn recovery_resets_failure_accounting() {
    let h = Harness::new(false).await;
    let client = Arc::new(ScriptedPeerClient::failing("peer-a"));
    let federation = h.federation(Arc::clone(&client) as Arc<_>, Vec::new());

    let peer_id = PeerId::new("peer-a").expect("peer id");
    federation
        .put_peer(&h.namespace, peer(peer_id.as_str(), SyncMode::All))
        .await
        .expect("put peer");
    for _ in 0..3 {
        let _ = federation.sync_peer(&h.namespace, &peer_id).await;
    }

    client.set_servers(vec![export_item("/fininfo", "Fin", &[])]);
    *client.agents.lock().expect("lock") = Ok(mgr_domain::entities::AgentsExport {
        total_count: 0,
        items: Vec::new(),
        generation: 1,
    });
    federation
        .sync_peer(&h.namespace, &peer_id)
        .await
        .expect("recovered sync");

    let status = federation
        .peer_status(&h.namespace, &peer_id)
        .await
        .expect("status");
    assert_eq!(status.consecutive_failures, 0);
    assert!(status.is_healthy);
    assert_eq!(status.current_generation, 1);
}

#[tokio::test]
async fn disabled_peer_rejects_on_demand_sync() {
    let h = Harness::new(false).await;
    let client = Arc::new(ScriptedPeerClient::exporting(Vec::new()));
    let federation = h.federation(client, Vec::new());

    let peer_id = PeerId::new("peer-a").expect("peer id");
    let mut disabled = peer(peer_id.as_str(), SyncMode::All);
    disabled.enabled = false;
    federation
        .put_peer(&h.namespace, disabled)
        .await
        .expect("put peer");

    let err = federation
        .sync_peer(&h.namespace, &peer_id)
        .await
        .expect_err("disabled peer");
    assert!(matches!(err, Error::BadRequest { .. }));
}

#[tokio::test]
async fn sync_interval_bounds_are_enforced_on_put() {
    let h = Harness::new(false).await;
    let client = Arc::new(ScriptedPeerClient::exporting(Vec::new()));
    let federation = h.federation(client, Vec::new());

    let mut bad = peer("peer-a", SyncMode::All);
    bad.sync_interval_minutes = 2;
    let err = federation
        .put_peer(&h.namespace, bad)
        .await
        .expect_err("interval too small");
    assert!(matches!(err, Error::BadRequest { .. }));
}

#[tokio::test]
async fn export_serves_only_public_enabled_items() {
    let h = Harness::new(false).await;
    let client = Arc::new(ScriptedPeerClient::exporting(Vec::new()));
    let federation = h.federation(client, Vec::new());

    let public = support::sample_server("/fininfo", "Fin");
    let mut private = support::sample_server("/internal", "Internal");
    private.visibility = Visibility::Private;
    h.registry
        .register_server(&h.namespace, public)
        .await
        .expect("register public");
    h.registry
        .register_server(&h.namespace, private)
        .await
        .expect("register private");

    let export = federation
        .export_servers(&h.namespace)
        .await
        .expect("export");
    assert_eq!(export.total_count, 1);
    assert_eq!(export.items[0].path.as_str(), "/fininfo");
}

#[tokio::test]
async fn topology_is_a_star_around_local() {
    let h = Harness::new(false).await;
    let client = Arc::new(ScriptedPeerClient::exporting(Vec::new()));
    let federation = h.federation(client, Vec::new());

    let peer_id = PeerId::new("peer-a").expect("peer id");
    federation
        .put_peer(&h.namespace, peer(peer_id.as_str(), SyncMode::All))
        .await
        .expect("put peer");

    let topology = federation.topology(&h.namespace).await.expect("topology");
    assert!(topology.nodes.iter().any(|n| n.node_id == "local"));
    assert!(topology.nodes.iter().any(|n| n.node_id == "peer-a"));
    assert!(
        topology
            .edges
            .iter()
            .all(|e| e.target == "local" && e.source != "local")
    );
}
