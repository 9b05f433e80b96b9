//! File backend contract tests: CRUD semantics, optimistic concurrency,
//! the enabled-state sidecar, and the search sidecar.

use chrono::Utc;
use rstest::rstest;

use mgr_domain::entities::{EmbeddingDocument, McpServer, SecurityScanResult, ToolFinding};
use mgr_domain::entities::{FindingSeverity, PeerSyncStatus};
use mgr_domain::error::Error;
use mgr_domain::ports::repositories::{
    FederationRepository as _, SearchIndexRepository as _, SecurityScanRepository as _,
    ServerRepository as _,
};
use mgr_domain::value_objects::{EntityType, Namespace, PeerId, ServerPath};
use mgr_providers::storage::file::{
    FileFederationRepository, FileScanRepository, FileSearchIndex, FileServerRepository,
};

fn path(raw: &str) -> ServerPath {
    ServerPath::new(raw).expect("valid path")
}

fn server(raw: &str) -> McpServer {
    let mut server = McpServer::new(path(raw), "Test Server", "http://upstream:8000");
    server.is_enabled = true;
    server
}

#[tokio::test]
async fn create_get_delete_round_trip() {
    let temp = tempfile::tempdir().expect("tempdir");
    let repo = FileServerRepository::new(temp.path());
    let ns = Namespace::default();

    repo.create(&ns, &server("/fininfo")).await.expect("create");
    let stored = repo.get(&ns, &path("/fininfo")).await.expect("get");
    assert_eq!(stored.server_name, "Test Server");

    repo.delete(&ns, &path("/fininfo")).await.expect("delete");
    let err = repo.get(&ns, &path("/fininfo")).await.expect_err("gone");
    assert!(matches!(err, Error::NotFound { .. }));

    // Delete is unconditional: repeating it stays successful.
    repo.delete(&ns, &path("/fininfo")).await.expect("idempotent delete");
}

#[tokio::test]
async fn create_conflicts_on_existing_path() {
    let temp = tempfile::tempdir().expect("tempdir");
    let repo = FileServerRepository::new(temp.path());
    let ns = Namespace::default();

    repo.create(&ns, &server("/fininfo")).await.expect("create");
    let err = repo
        .create(&ns, &server("/fininfo"))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, Error::Conflict { .. }));
}

#[tokio::test]
async fn update_checks_the_expected_timestamp() {
    let temp = tempfile::tempdir().expect("tempdir");
    let repo = FileServerRepository::new(temp.path());
    let ns = Namespace::default();

    let mut entity = server("/fininfo");
    repo.create(&ns, &entity).await.expect("create");

    let stale = entity.updated_at - chrono::Duration::minutes(5);
    entity.description = "new".to_owned();
    let err = repo
        .update(&ns, &entity, Some(stale))
        .await
        .expect_err("stale token");
    assert!(matches!(err, Error::Conflict { .. }));

    repo.update(&ns, &entity, Some(entity.updated_at))
        .await
        .expect("matching token");
}

#[tokio::test]
async fn enabled_state_lives_in_the_sidecar() {
    let temp = tempfile::tempdir().expect("tempdir");
    let repo = FileServerRepository::new(temp.path());
    let ns = Namespace::default();

    let mut entity = server("/fininfo");
    repo.create(&ns, &entity).await.expect("create");

    entity.is_enabled = false;
    entity.updated_at = Utc::now();
    repo.update(&ns, &entity, None).await.expect("disable");

    let sidecar = temp.path().join("default").join("servers_state.json");
    let state: std::collections::BTreeMap<String, bool> =
        serde_json::from_slice(&std::fs::read(sidecar).expect("sidecar exists")).expect("parse");
    assert_eq!(state.get("fininfo"), Some(&false));

    let stored = repo.get(&ns, &path("/fininfo")).await.expect("get");
    assert!(!stored.is_enabled);
}

#[tokio::test]
async fn list_by_origin_filters_federated_copies() {
    let temp = tempfile::tempdir().expect("tempdir");
    let repo = FileServerRepository::new(temp.path());
    let ns = Namespace::default();
    let peer = PeerId::new("peer-a").expect("peer id");

    let mut federated = server("/peer-a/fininfo");
    federated.origin_peer = Some(peer.clone());
    federated.generation = Some(3);
    repo.create(&ns, &federated).await.expect("create federated");
    repo.create(&ns, &server("/local")).await.expect("create local");

    let from_peer = repo.list_by_origin(&ns, &peer).await.expect("list");
    assert_eq!(from_peer.len(), 1);
    assert_eq!(from_peer[0].path, path("/peer-a/fininfo"));
}

#[tokio::test]
async fn scan_history_is_append_only_newest_first() {
    let temp = tempfile::tempdir().expect("tempdir");
    let repo = FileScanRepository::new(temp.path());
    let ns = Namespace::default();

    let finding = ToolFinding {
        tool_name: "t".to_owned(),
        severity: FindingSeverity::Safe,
        threat_names: Vec::new(),
        threat_summary: String::new(),
        is_safe: true,
    };
    let mut first =
        SecurityScanResult::from_findings(path("/fininfo"), &[finding.clone()], serde_json::Value::Null);
    first.scan_timestamp = Utc::now() - chrono::Duration::minutes(10);
    let second =
        SecurityScanResult::from_findings(path("/fininfo"), &[finding], serde_json::Value::Null);

    repo.append(&ns, &first).await.expect("append first");
    repo.append(&ns, &second).await.expect("append second");

    let latest = repo
        .latest(&ns, &path("/fininfo"))
        .await
        .expect("latest")
        .expect("present");
    assert_eq!(latest.scan_timestamp, second.scan_timestamp);
    assert_eq!(
        repo.history(&ns, &path("/fininfo")).await.expect("history").len(),
        2
    );
}

#[tokio::test]
async fn federation_repo_round_trips_status_and_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let repo = FileFederationRepository::new(temp.path());
    let ns = Namespace::default();
    let peer_id = PeerId::new("peer-a").expect("peer id");

    assert!(repo.get_status(&ns, &peer_id).await.expect("status").is_none());

    let mut status = PeerSyncStatus::new(peer_id.clone());
    status.current_generation = 4;
    repo.put_status(&ns, &status).await.expect("put status");
    let read = repo
        .get_status(&ns, &peer_id)
        .await
        .expect("get status")
        .expect("present");
    assert_eq!(read.current_generation, 4);

    // Missing config defaults to disabled sources.
    let config = repo.get_config(&ns).await.expect("config");
    assert!(!config.anthropic.enabled);
    assert!(!config.asor.enabled);
}

#[rstest]
#[case(vec![0.0_f32; 7], true)]
#[case(vec![0.0_f32; 384], false)]
#[tokio::test]
async fn embedding_dimension_is_enforced(#[case] vector: Vec<f32>, #[case] should_fail: bool) {
    let temp = tempfile::tempdir().expect("tempdir");
    let index = FileSearchIndex::new(temp.path());
    let ns = Namespace::default();
    index.ensure_indices(&ns, 384, false).await.expect("init");

    let mut entity = server("/fininfo");
    entity.description = "stock aggregates".to_owned();
    let doc = EmbeddingDocument::for_server(&entity, vector);

    let result = index.upsert(&ns, &doc).await;
    if should_fail {
        assert!(matches!(result, Err(Error::BackendData { .. })));
    } else {
        result.expect("matching dimension");
    }
}

#[tokio::test]
async fn knn_prefers_the_closer_vector() {
    let temp = tempfile::tempdir().expect("tempdir");
    let index = FileSearchIndex::new(temp.path());
    let ns = Namespace::default();
    index.ensure_indices(&ns, 3, false).await.expect("init");

    let mut near = EmbeddingDocument::for_server(&server("/near"), vec![1.0, 0.0, 0.0]);
    near.text_for_embedding = "near".to_owned();
    let mut far = EmbeddingDocument::for_server(&server("/far"), vec![0.0, 1.0, 0.0]);
    far.text_for_embedding = "far".to_owned();
    index.upsert(&ns, &near).await.expect("upsert near");
    index.upsert(&ns, &far).await.expect("upsert far");

    let hits = index.knn(&ns, &[0.9, 0.1, 0.0], 2).await.expect("knn");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document.path, path("/near"));
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn lexical_scores_nested_tool_matches() {
    let temp = tempfile::tempdir().expect("tempdir");
    let index = FileSearchIndex::new(temp.path());
    let ns = Namespace::default();
    index.ensure_indices(&ns, 3, false).await.expect("init");

    let mut entity = server("/fininfo");
    entity.tool_list = vec![mgr_domain::entities::ToolDef {
        name: "get_stock_aggregates".to_owned(),
        description: "Aggregate stock prices".to_owned(),
        input_schema: serde_json::Value::Null,
    }];
    let doc = EmbeddingDocument::for_server(&entity, Vec::new());
    index.upsert(&ns, &doc).await.expect("upsert");

    let hits = index.lexical(&ns, "stock", 10).await.expect("lexical");
    assert_eq!(hits.len(), 1);
    assert!(hits[0].score > 0.0);
}

#[tokio::test]
async fn dimension_change_requires_reindex() {
    let temp = tempfile::tempdir().expect("tempdir");
    let index = FileSearchIndex::new(temp.path());
    let ns = Namespace::default();
    index.ensure_indices(&ns, 384, false).await.expect("init");

    let err = index
        .ensure_indices(&ns, 1024, false)
        .await
        .expect_err("dimension change");
    assert!(matches!(err, Error::BackendData { .. }));

    // Recreate wipes and accepts the new dimension.
    index.ensure_indices(&ns, 1024, true).await.expect("recreate");
}
