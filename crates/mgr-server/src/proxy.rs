//! Gateway edge: the `/{server_path}/mcp/**` data path.
//!
//! Authorizes the JSON-RPC request against the FGAC kernel, resolves the
//! target version, strips ingress and registry-internal headers, and
//! streams the exchange both directions. The upstream payload passes
//! through untouched; egress credentials in `Authorization` are preserved.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use serde_json::Value;
use tokio::sync::Semaphore;

use mgr_domain::constants::auth::{
    CLIENT_ID_HEADER, INGRESS_AUTH_HEADER, KEYCLOAK_REALM_HEADER, KEYCLOAK_URL_HEADER,
    METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, REGION_HEADER, SERVER_VERSION_HEADER,
    USER_POOL_ID_HEADER,
};
use mgr_domain::entities::{McpRequestInfo, McpResponseInfo, McpServerRef, McpServer};
use mgr_domain::error::Error;
use mgr_domain::value_objects::{AuthContext, RequestedAccess, ServerPath};

use crate::error::ApiError;
use crate::state::AppState;

/// Maximum buffered request body; MCP payloads are small JSON-RPC frames.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers never forwarded upstream: ingress credentials, identity-provider
/// context, version pinning, and hop-by-hop headers.
const STRIPPED_HEADERS: &[&str] = &[
    INGRESS_AUTH_HEADER,
    CLIENT_ID_HEADER,
    KEYCLOAK_REALM_HEADER,
    KEYCLOAK_URL_HEADER,
    USER_POOL_ID_HEADER,
    REGION_HEADER,
    SERVER_VERSION_HEADER,
    "host",
    "content-length",
    "connection",
    "transfer-encoding",
];

/// Process-wide bound on in-flight proxied requests.
pub struct ProxyGate {
    semaphore: Arc<Semaphore>,
}

impl ProxyGate {
    /// Gate admitting up to `limit` concurrent requests.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit.max(1))),
        }
    }
}

/// Parsed shape of one proxied JSON-RPC request.
struct ParsedRpc {
    method: String,
    tool: Option<String>,
    jsonrpc_id: Option<String>,
}

fn parse_rpc(body: &[u8]) -> ParsedRpc {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        // Connection setup (SSE handshakes, empty bodies) is gated by the
        // initialize permission.
        return ParsedRpc {
            method: "initialize".to_owned(),
            tool: None,
            jsonrpc_id: None,
        };
    };

    let method = value
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("initialize")
        .to_owned();
    let tool = (method == METHOD_TOOLS_CALL)
        .then(|| {
            value
                .pointer("/params/name")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .flatten();
    let jsonrpc_id = value.get("id").map(ToString::to_string);

    ParsedRpc {
        method,
        tool,
        jsonrpc_id,
    }
}

/// Split `/{server_path}/mcp{rest}` into the entity path and the upstream
/// suffix.
fn split_gateway_path(path: &str) -> Option<(ServerPath, String)> {
    let (prefix, rest) = if let Some(prefix) = path.strip_suffix("/mcp") {
        (prefix, String::new())
    } else {
        let boundary = path.find("/mcp/")?;
        (&path[..boundary], path[boundary + 4..].to_owned())
    };
    ServerPath::new(prefix).ok().map(|p| (p, rest))
}

fn local_tools_list(server: &McpServer, tools: Vec<Value>, id: Option<&str>) -> Response {
    let id_value: Value = id
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or(Value::Null);
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": id_value,
        "result": {"tools": tools},
    });
    let mut response = axum::Json(body).into_response();
    response.extensions_mut().insert(McpServerRef {
        name: server.server_name.clone(),
        path: server.path.to_string(),
    });
    response
}

/// Fallback handler for `/{server_path}/mcp/**`.
pub async fn gateway(
    State(state): State<AppState>,
    Extension(gate): Extension<Arc<ProxyGate>>,
    Extension(auth): Extension<AuthContext>,
    request: Request,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let path = request.uri().path().to_owned();
    let Some((server_path, rest)) = split_gateway_path(&path) else {
        return Err(Error::not_found(format!("route {path}")).into());
    };

    let _permit = gate
        .semaphore
        .clone()
        .try_acquire_owned()
        .map_err(|_| Error::backpressure("gateway connection pool exhausted"))?;

    let pinned_version = request
        .headers()
        .get(SERVER_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let method = request.method().clone();
    let headers = request.headers().clone();

    let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| Error::bad_request(format!("unreadable request body: {e}")))?;
    let rpc = parse_rpc(&body);

    // authenticated → scopes_resolved happened in middleware; the next
    // transitions are method_allowed → tool_allowed → forwarded.
    let ns = &state.ctx.namespace;
    let server = state.ctx.registry_service().get_server(ns, &server_path).await?;
    if !server.is_enabled {
        return Err(Error::not_found(format!("server {server_path}")).into());
    }

    state
        .ctx
        .access_service()
        .require(
            ns,
            &auth,
            &RequestedAccess {
                server_path: server_path.clone(),
                method: rpc.method.clone(),
                tool: rpc.tool.clone(),
            },
        )
        .await?;

    // Virtual servers answer tools/list locally and route tools/call per
    // the composed backends.
    let target = if server.is_virtual() {
        match rpc.method.as_str() {
            METHOD_TOOLS_LIST => {
                let mut tools = Vec::new();
                for backend_path in &server.backend_paths {
                    if let Ok(backend) =
                        state.ctx.registry_service().get_server(ns, backend_path).await
                    {
                        for tool in &backend.tool_list {
                            tools.push(serde_json::json!({
                                "name": tool.name,
                                "description": tool.description,
                                "inputSchema": tool.input_schema,
                            }));
                        }
                    }
                }
                return Ok(local_tools_list(&server, tools, rpc.jsonrpc_id.as_deref()));
            }
            METHOD_TOOLS_CALL => {
                let tool = rpc.tool.clone().ok_or_else(|| {
                    Error::bad_request("tools/call without params.name")
                })?;
                let backend = state
                    .ctx
                    .registry_service()
                    .resolve_virtual_backend(ns, &server, &tool)
                    .await?;
                backend.resolve_proxy_url(pinned_version.as_deref())?.to_owned()
            }
            other => {
                return Err(Error::not_found(format!(
                    "method '{other}' on virtual server {server_path}"
                ))
                .into());
            }
        }
    } else {
        server.resolve_proxy_url(pinned_version.as_deref())?.to_owned()
    };

    let url = format!("{}{rest}", target.trim_end_matches('/'));
    let upstream_headers = forwardable_headers(&headers);

    let upstream = state
        .proxy_client
        .request(method, &url)
        .headers(upstream_headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            let detail = if e.is_timeout() {
                format!(
                    "upstream timed out after {}s",
                    state.ctx.config.proxy.timeout_secs
                )
            } else {
                format!("upstream error: {e}")
            };
            Error::peer_unreachable(server_path.as_str(), detail)
        })?;

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        let keep = !matches!(
            name.as_str(),
            "connection" | "transfer-encoding" | "content-length"
        );
        if keep {
            if let (Ok(name), Ok(value)) = (
                axum::http::HeaderName::try_from(name.as_str()),
                axum::http::HeaderValue::from_bytes(value.as_bytes()),
            ) {
                response_headers.insert(name, value);
            }
        }
    }

    let stream = upstream.bytes_stream();
    let mut response = Response::builder()
        .status(status)
        .body(Body::from_stream(stream))
        .map_err(|e| Error::internal(format!("failed to build proxy response: {e}")))?;
    *response.headers_mut() = response_headers;

    response.extensions_mut().insert(McpServerRef {
        name: server.server_name.clone(),
        path: server_path.to_string(),
    });
    response.extensions_mut().insert(McpRequestInfo {
        method: rpc.method,
        tool_name: rpc.tool,
        resource_uri: None,
        transport: "streamable-http".to_owned(),
        jsonrpc_id: rpc.jsonrpc_id,
    });
    response.extensions_mut().insert(McpResponseInfo {
        status: if status.is_success() {
            "ok".to_owned()
        } else {
            "error".to_owned()
        },
        duration_ms: started.elapsed().as_millis() as u64,
        error_code: None,
    });
    Ok(response)
}

fn forwardable_headers(headers: &HeaderMap) -> reqwest::header::HeaderMap {
    let mut forwarded = reqwest::header::HeaderMap::new();
    for (name, value) in headers {
        if STRIPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::try_from(name.as_str()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            forwarded.insert(name, value);
        }
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_gateway_path() {
        let (path, rest) = split_gateway_path("/fininfo/mcp").expect("split");
        assert_eq!(path.as_str(), "/fininfo");
        assert_eq!(rest, "");
    }

    #[test]
    fn splits_federated_gateway_path_with_suffix() {
        let (path, rest) = split_gateway_path("/peer-a/fininfo/mcp/messages").expect("split");
        assert_eq!(path.as_str(), "/peer-a/fininfo");
        assert_eq!(rest, "/messages");
    }

    #[test]
    fn rejects_paths_without_mcp_segment() {
        assert!(split_gateway_path("/fininfo").is_none());
    }

    #[test]
    fn parses_tools_call_tool_name() {
        let body = br#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"get_stock_aggregates"}}"#;
        let rpc = parse_rpc(body);
        assert_eq!(rpc.method, "tools/call");
        assert_eq!(rpc.tool.as_deref(), Some("get_stock_aggregates"));
        assert_eq!(rpc.jsonrpc_id.as_deref(), Some("7"));
    }

    #[test]
    fn empty_body_gates_on_initialize() {
        let rpc = parse_rpc(b"");
        assert_eq!(rpc.method, "initialize");
        assert!(rpc.tool.is_none());
    }
}
