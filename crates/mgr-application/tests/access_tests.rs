//! Scope expansion and FGAC enforcement tests.

mod support;

use mgr_domain::entities::ScopeFile;
use mgr_domain::error::Error;
use mgr_domain::ports::services::AccessServiceInterface as _;
use mgr_domain::value_objects::{RequestedAccess, ServerPath};

use support::{Harness, admin_ctx, user_ctx};

const SCOPE_YAML: &str = r#"
scopes:
  finance_read:
    - server: /fininfo
      methods: [tools/list, tools/call]
      tools: [get_stock_aggregates]
  time_all:
    - server: /currenttime
      methods: [initialize, tools/list, tools/call]
      tools: []
group_mappings:
  finance_team: [finance_read]
  everyone: [time_all]
"#;

async fn loaded_harness() -> Harness {
    let h = Harness::new(false).await;
    let file: ScopeFile = serde_yaml::from_str(SCOPE_YAML).expect("parse scope file");
    let count = h
        .scopes
        .load_file(&h.namespace, file)
        .await
        .expect("load scopes");
    assert_eq!(count, 4);
    h
}

fn access(server: &str, method: &str, tool: Option<&str>) -> RequestedAccess {
    RequestedAccess {
        server_path: ServerPath::new(server).expect("path"),
        method: method.to_owned(),
        tool: tool.map(str::to_owned),
    }
}

#[tokio::test]
async fn groups_expand_to_scope_names() {
    let h = loaded_harness().await;
    let scopes = h
        .access
        .resolve_scopes(
            &h.namespace,
            &["finance_team".to_owned(), "everyone".to_owned()],
        )
        .await
        .expect("resolve");
    assert_eq!(scopes, vec!["finance_read".to_owned(), "time_all".to_owned()]);
}

#[tokio::test]
async fn unknown_groups_expand_to_nothing() {
    let h = loaded_harness().await;
    let scopes = h
        .access
        .resolve_scopes(&h.namespace, &["strangers".to_owned()])
        .await
        .expect("resolve");
    assert!(scopes.is_empty());
}

#[tokio::test]
async fn listed_tool_is_allowed() {
    let h = loaded_harness().await;
    let ctx = user_ctx(&["finance_read"]);
    let decision = h
        .access
        .evaluate(
            &h.namespace,
            &ctx,
            &access("/fininfo", "tools/call", Some("get_stock_aggregates")),
        )
        .await
        .expect("evaluate");
    assert!(decision.allowed);
    assert_eq!(decision.evaluated_scopes, vec!["finance_read"]);
}

#[tokio::test]
async fn unlisted_tool_is_denied_with_required_permission() {
    let h = loaded_harness().await;
    let ctx = user_ctx(&["finance_read"]);
    let decision = h
        .access
        .evaluate(
            &h.namespace,
            &ctx,
            &access("/fininfo", "tools/call", Some("delete_portfolio")),
        )
        .await
        .expect("evaluate");
    assert!(!decision.allowed);
    let permission = decision.required_permission.expect("names the gap");
    assert!(permission.contains("delete_portfolio"));

    // `require` turns the deny into a typed Forbidden.
    let err = h
        .access
        .require(
            &h.namespace,
            &ctx,
            &access("/fininfo", "tools/call", Some("delete_portfolio")),
        )
        .await
        .expect_err("forbidden");
    assert!(matches!(err, Error::Forbidden { .. }));
}

#[tokio::test]
async fn empty_tools_means_every_tool_of_the_server() {
    let h = loaded_harness().await;
    let ctx = user_ctx(&["time_all"]);
    let decision = h
        .access
        .evaluate(
            &h.namespace,
            &ctx,
            &access("/currenttime", "tools/call", Some("anything_at_all")),
        )
        .await
        .expect("evaluate");
    assert!(decision.allowed);
}

#[tokio::test]
async fn method_outside_rule_is_denied() {
    let h = loaded_harness().await;
    let ctx = user_ctx(&["finance_read"]);
    let decision = h
        .access
        .evaluate(
            &h.namespace,
            &ctx,
            &access("/fininfo", "resources/read", None),
        )
        .await
        .expect("evaluate");
    assert!(!decision.allowed);
}

#[tokio::test]
async fn admin_scope_short_circuits_all_rules() {
    let h = loaded_harness().await;
    let decision = h
        .access
        .evaluate(
            &h.namespace,
            &admin_ctx(),
            &access("/anything", "tools/call", Some("whatever")),
        )
        .await
        .expect("evaluate");
    assert!(decision.allowed);
}

#[tokio::test]
async fn scope_outside_holder_set_does_not_leak() {
    let h = loaded_harness().await;
    let ctx = user_ctx(&["time_all"]);
    let decision = h
        .access
        .evaluate(
            &h.namespace,
            &ctx,
            &access("/fininfo", "tools/list", None),
        )
        .await
        .expect("evaluate");
    assert!(!decision.allowed);
}
