//! Authorization constants: header names, admin scopes, MCP method names.

/// Ingress credential header (consumed by the registry, stripped before proxy).
pub const INGRESS_AUTH_HEADER: &str = "x-authorization";

/// Egress credential header (passed through to the upstream server untouched).
pub const EGRESS_AUTH_HEADER: &str = "authorization";

/// Client id hint accompanying the ingress token.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Keycloak realm context header.
pub const KEYCLOAK_REALM_HEADER: &str = "x-keycloak-realm";

/// Keycloak base URL context header.
pub const KEYCLOAK_URL_HEADER: &str = "x-keycloak-url";

/// Cognito user pool context header.
pub const USER_POOL_ID_HEADER: &str = "x-user-pool-id";

/// Cognito region context header.
pub const REGION_HEADER: &str = "x-region";

/// Version-pinning header honored by the gateway edge.
pub const SERVER_VERSION_HEADER: &str = "x-mcp-server-version";

/// Scope names that grant unconditional access, recognized by name.
pub const ADMIN_SCOPES: &[&str] = &["mcp-registry-admin", "mcp-registry-operator"];

/// MCP protocol method invoking a named tool; the only method with
/// per-tool enforcement.
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// MCP protocol method listing tools.
pub const METHOD_TOOLS_LIST: &str = "tools/list";

/// MCP protocol handshake method.
pub const METHOD_INITIALIZE: &str = "initialize";
