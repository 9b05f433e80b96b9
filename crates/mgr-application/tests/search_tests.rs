//! Hybrid search and lexical-fallback tests.

mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use mgr_domain::value_objects::{EntityType, SearchMode, SearchRequest};

use support::{FailingEmbedder, Harness, sample_server};

#[tokio::test]
async fn empty_query_returns_empty_grouped_result() {
    let h = Harness::new(false).await;
    let results = h
        .search
        .search(&h.namespace, &SearchRequest::for_query("   "))
        .await
        .expect("search");
    assert!(results.servers.is_empty());
    assert!(results.agents.is_empty());
    assert!(results.tools.is_empty());
}

#[tokio::test]
async fn hybrid_search_ranks_matching_server_first() {
    let h = Harness::new(false).await;
    for (path, name) in [
        ("/cloudflare-docs", "Cloudflare Docs"),
        ("/fininfo", "Financial Information"),
        ("/currenttime", "Current Time"),
    ] {
        h.registry
            .register_server(&h.namespace, sample_server(path, name))
            .await
            .expect("register");
    }

    let results = h
        .search
        .search(&h.namespace, &SearchRequest::for_query("cloudflare"))
        .await
        .expect("search");
    assert_eq!(results.search_mode, SearchMode::Hybrid);
    assert!(!results.servers.is_empty());
    assert_eq!(results.servers[0].path.as_str(), "/cloudflare-docs");
    assert!(results.servers[0].relevance_score > 0.0);
    assert!(results.servers[0].relevance_score <= 1.0);
}

#[tokio::test]
async fn matching_tools_are_raised_with_input_schema() {
    let h = Harness::new(false).await;
    h.registry
        .register_server(
            &h.namespace,
            sample_server("/cloudflare-docs", "Cloudflare Docs"),
        )
        .await
        .expect("register");

    let results = h
        .search
        .search(&h.namespace, &SearchRequest::for_query("search docs"))
        .await
        .expect("search");
    assert!(!results.tools.is_empty());
    let tool = &results.tools[0];
    assert_eq!(tool.name, "search_docs");
    assert_eq!(tool.server_path.as_str(), "/cloudflare-docs");
    assert!(tool.input_schema.get("properties").is_some());
}

#[tokio::test]
async fn disabled_servers_are_hidden_unless_requested() {
    let h = Harness::new(false).await;
    let mut server = sample_server("/cloudflare-docs", "Cloudflare Docs");
    server.is_enabled = false;
    // Bypass the service so the entity stays disabled.
    h.servers
        .create(&h.namespace, &server)
        .await
        .expect("create");
    h.search
        .index_server(&h.namespace, &server)
        .await
        .expect("index");

    let results = h
        .search
        .search(&h.namespace, &SearchRequest::for_query("cloudflare"))
        .await
        .expect("search");
    assert!(results.servers.is_empty());

    let mut admin_request = SearchRequest::for_query("cloudflare");
    admin_request.include_disabled = true;
    let results = h
        .search
        .search(&h.namespace, &admin_request)
        .await
        .expect("search");
    assert_eq!(results.servers.len(), 1);
}

#[tokio::test]
async fn first_embedding_failure_latches_lexical_only_mode() {
    let embedder = Arc::new(FailingEmbedder::new());
    let h = Harness::with_embedder(false, Arc::clone(&embedder) as Arc<_>).await;

    // Indexing with a broken embedder still works lexically.
    h.registry
        .register_server(&h.namespace, sample_server("/context7", "Context Seven"))
        .await
        .expect("register");
    let calls_after_indexing = embedder.calls.load(Ordering::SeqCst);
    assert!(calls_after_indexing >= 1, "indexing attempted one embed");

    let results = h
        .search
        .search(&h.namespace, &SearchRequest::for_query("context7"))
        .await
        .expect("search");
    assert_eq!(results.search_mode, SearchMode::LexicalOnly);
    assert!(!results.servers.is_empty());
    assert!(results.servers[0].relevance_score <= 1.0);

    // The failure is cached: further searches never touch the embedder.
    let calls_before = embedder.calls.load(Ordering::SeqCst);
    let results = h
        .search
        .search(&h.namespace, &SearchRequest::for_query("context7"))
        .await
        .expect("search again");
    assert_eq!(results.search_mode, SearchMode::LexicalOnly);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn entity_type_filter_limits_groups() {
    let h = Harness::new(false).await;
    h.registry
        .register_server(&h.namespace, sample_server("/cloudflare-docs", "Docs"))
        .await
        .expect("register");

    let mut request = SearchRequest::for_query("docs");
    request.entity_types = Some(vec![EntityType::Agent]);
    let results = h.search.search(&h.namespace, &request).await.expect("search");
    assert!(results.servers.is_empty());
}

#[tokio::test]
async fn deleted_entity_leaves_the_index() {
    let h = Harness::new(false).await;
    h.registry
        .register_server(&h.namespace, sample_server("/cloudflare-docs", "Docs"))
        .await
        .expect("register");
    h.registry
        .delete_server(
            &h.namespace,
            &mgr_domain::value_objects::ServerPath::new("/cloudflare-docs").expect("path"),
            "Docs",
        )
        .await
        .expect("delete");

    let results = h
        .search
        .search(&h.namespace, &SearchRequest::for_query("cloudflare"))
        .await
        .expect("search");
    assert!(results.servers.is_empty());
}
