//! End-to-end API tests: in-process router, file backend in a temp dir,
//! HS256 tokens, and a live local upstream for gateway tests.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use mgr_domain::entities::scope::{GroupMapping, ServerAccessRule, ServerScope};
use mgr_domain::entities::ScopeDocument;
use mgr_infrastructure::config::AppConfig;
use mgr_infrastructure::di::init_app;
use mgr_server::routes::build_router;
use mgr_server::state::AppState;

const SECRET: &str = "test-secret-test-secret-test-secret";
const FEDERATION_TOKEN: &str = "fed-static-token";

struct TestApp {
    router: Router,
    state: AppState,
    _temp: TempDir,
}

async fn test_app() -> TestApp {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut config = AppConfig::default();
    config.storage.root_dir = temp.path().join("data");
    config.audit.dir = temp.path().join("audit");
    config.auth.shared_secret = Some(SECRET.to_owned());
    config.auth.federation_token = Some(FEDERATION_TOKEN.to_owned());
    config.security.scan_on_registration = false;

    let ctx = std::sync::Arc::new(init_app(config).await.expect("init app"));

    // Group mappings and one FGAC scope, as a scope file would load them.
    let scopes = ctx.scopes();
    for doc in [
        ScopeDocument::GroupMapping(GroupMapping {
            group_name: "registry-admins".to_owned(),
            group_mappings: vec!["mcp-registry-admin".to_owned()],
        }),
        ScopeDocument::GroupMapping(GroupMapping {
            group_name: "finance_team".to_owned(),
            group_mappings: vec!["finance_read".to_owned()],
        }),
        ScopeDocument::ServerScope(ServerScope {
            scope_name: "finance_read".to_owned(),
            server_access: vec![ServerAccessRule {
                server: "/fininfo".to_owned(),
                methods: vec!["tools/list".to_owned(), "tools/call".to_owned()],
                tools: vec!["get_stock_aggregates".to_owned()],
            }],
        }),
    ] {
        scopes.put(&ctx.namespace, &doc).await.expect("seed scope");
    }

    let state = AppState::new(ctx).expect("state");
    TestApp {
        router: build_router(state.clone()),
        state,
        _temp: temp,
    }
}

fn mint_token(subject: &str, groups: &[&str]) -> String {
    let claims = json!({
        "sub": subject,
        "preferred_username": subject,
        "groups": groups,
        "exp": (Utc::now() + chrono::Duration::hours(1)).timestamp(),
    });
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("mint token")
}

fn authed(request: axum::http::request::Builder, token: &str) -> axum::http::request::Builder {
    request.header("x-authorization", format!("Bearer {token}"))
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn register_body(path: &str, name: &str) -> Value {
    json!({
        "path": path,
        "server_name": name,
        "description": "A test backend",
        "proxy_pass_url": "http://upstream:8000",
        "tags": ["test"],
        "tool_list": [
            {"name": "get_stock_aggregates", "description": "Aggregate stocks", "input_schema": {"type": "object"}}
        ]
    })
}

async fn register_server(app: &TestApp, token: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        authed(Request::post("/api/servers"), token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
    )
    .await
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;
    let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_ingress_token() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Request::get("/api/servers").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn register_then_fetch_round_trips() {
    let app = test_app().await;
    let token = mint_token("alice", &["finance_team"]);

    let (status, body) = register_server(&app, &token, register_body("/fininfo", "Fin")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["entity"]["server_name"], "Fin");
    assert_eq!(body["entity"]["is_enabled"], true);

    let (status, body) = send(
        &app,
        authed(Request::get("/api/servers/fininfo"), &token)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["path"], "/fininfo");

    let (status, body) = send(
        &app,
        authed(Request::get("/api/servers"), &token)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = test_app().await;
    let token = mint_token("alice", &[]);
    register_server(&app, &token, register_body("/fininfo", "Fin")).await;

    let (status, body) = register_server(&app, &token, register_body("/fininfo", "Again")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn toggle_action_flips_enablement() {
    let app = test_app().await;
    let token = mint_token("admin", &["registry-admins"]);
    register_server(&app, &token, register_body("/fininfo", "Fin")).await;

    let (status, body) = send(
        &app,
        authed(Request::post("/api/servers/fininfo/toggle"), &token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"enabled": false}).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_enabled"], false);
}

#[tokio::test]
async fn delete_requires_admin_and_name_echo() {
    let app = test_app().await;
    let admin = mint_token("admin", &["registry-admins"]);
    let user = mint_token("bob", &["finance_team"]);
    register_server(&app, &admin, register_body("/fininfo", "Fin")).await;

    let (status, _) = send(
        &app,
        authed(
            Request::delete("/api/servers/fininfo?confirm_name=Fin"),
            &user,
        )
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        authed(
            Request::delete("/api/servers/fininfo?confirm_name=Wrong"),
            &admin,
        )
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = send(
        &app,
        authed(
            Request::delete("/api/servers/fininfo?confirm_name=Fin"),
            &admin,
        )
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

async fn spawn_upstream(reply: &'static str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upstream");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().fallback(axum::routing::any(move || async move {
        axum::Json(json!({"jsonrpc": "2.0", "id": 1, "result": {"from": reply}}))
    }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn gateway_enforces_tool_level_access() {
    let app = test_app().await;
    let admin = mint_token("admin", &["registry-admins"]);
    let finance = mint_token("carol", &["finance_team"]);

    let upstream = spawn_upstream("fininfo").await;
    let mut body = register_body("/fininfo", "Fin");
    body["proxy_pass_url"] = json!(upstream);
    register_server(&app, &admin, body).await;

    // Listed tool passes and the upstream answers.
    let (status, body) = send(
        &app,
        authed(Request::post("/fininfo/mcp"), &finance)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "tools/call",
                    "params": {"name": "get_stock_aggregates"}
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["from"], "fininfo");

    // Unlisted tool is denied, naming the missing permission.
    let (status, body) = send(
        &app,
        authed(Request::post("/fininfo/mcp"), &finance)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "jsonrpc": "2.0",
                    "id": 2,
                    "method": "tools/call",
                    "params": {"name": "delete_portfolio"}
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert!(
        body["required_permission"]
            .as_str()
            .expect("required_permission present")
            .contains("delete_portfolio")
    );
}

#[tokio::test]
async fn gateway_honors_version_pinning() {
    let app = test_app().await;
    let admin = mint_token("admin", &["registry-admins"]);

    let upstream_v1 = spawn_upstream("v1").await;
    let upstream_v2 = spawn_upstream("v2").await;
    let mut body = register_body("/fininfo", "Fin");
    body["proxy_pass_url"] = json!(upstream_v2);
    body["versions"] = json!([
        {
            "version": "v1",
            "proxy_pass_url": upstream_v1,
            "status": "deprecated",
            "is_default": false,
            "released": Utc::now(),
        },
        {
            "version": "v2",
            "proxy_pass_url": upstream_v2,
            "status": "stable",
            "is_default": true,
            "released": Utc::now(),
        }
    ]);
    register_server(&app, &admin, body).await;

    let call = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}).to_string();

    // No header → default version.
    let (status, body) = send(
        &app,
        authed(Request::post("/fininfo/mcp"), &admin)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(call.clone()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["from"], "v2");

    // Pinned header → that version.
    let (status, body) = send(
        &app,
        authed(Request::post("/fininfo/mcp"), &admin)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-mcp-server-version", "v1")
            .body(Body::from(call.clone()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["from"], "v1");

    // Unknown pinned version → 404.
    let (status, _) = send(
        &app,
        authed(Request::post("/fininfo/mcp"), &admin)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-mcp-server-version", "v9")
            .body(Body::from(call))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn federation_export_accepts_the_static_token() {
    let app = test_app().await;
    let admin = mint_token("admin", &["registry-admins"]);
    register_server(&app, &admin, register_body("/fininfo", "Fin")).await;

    let (status, body) = send(
        &app,
        Request::get("/api/federation/servers")
            .header("authorization", format!("Bearer {FEDERATION_TOKEN}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["path"], "/fininfo");
    assert!(body["generation"].is_u64());

    let (status, _) = send(
        &app,
        Request::get("/api/federation/servers")
            .header("authorization", "Bearer wrong-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn requests_leave_audit_events_behind() {
    let app = test_app().await;
    let admin = mint_token("admin", &["registry-admins"]);
    register_server(&app, &admin, register_body("/fininfo", "Fin")).await;

    // Emission is fire-and-forget within the audit middleware; the awaited
    // response means the event was already appended.
    let (status, body) = send(
        &app,
        authed(Request::get("/api/audit/events?stream=registry_api"), &admin)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["total"].as_u64().expect("total") >= 1);
    let first = &body["events"][0];
    assert_eq!(first["log_type"], "registry_api");
    assert_eq!(first["identity"]["username"], "admin");
    assert!(first["request_id"].is_string());

    // Audit reads are admin-only.
    let user = mint_token("bob", &[]);
    let (status, _) = send(
        &app,
        authed(Request::get("/api/audit/events"), &user)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn search_endpoint_returns_grouped_results() {
    let app = test_app().await;
    let token = mint_token("alice", &[]);
    register_server(&app, &token, register_body("/cloudflare-docs", "Cloudflare Docs")).await;

    let (status, body) = send(
        &app,
        authed(Request::get("/api/search?q=cloudflare"), &token)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["servers"].as_array().is_some());
    assert_eq!(body["servers"][0]["path"], "/cloudflare-docs");
    assert_eq!(body["search_mode"], "hybrid");
}
