//! Storage backend constants: index base names and file layout.

/// Base name of the servers index (namespace suffix appended).
pub const INDEX_SERVERS: &str = "mcp-servers";

/// Base name of the agents index.
pub const INDEX_AGENTS: &str = "mcp-agents";

/// Base name of the scopes index.
pub const INDEX_SCOPES: &str = "mcp-scopes";

/// Base name of the embeddings index.
pub const INDEX_EMBEDDINGS: &str = "mcp-embeddings";

/// Base name of the security-scans index.
pub const INDEX_SECURITY_SCANS: &str = "mcp-security-scans";

/// Base name of the federation-config index.
pub const INDEX_FEDERATION_CONFIG: &str = "mcp-federation-config";

/// All index base names, in creation order.
pub const ALL_INDEX_BASES: &[&str] = &[
    INDEX_SERVERS,
    INDEX_AGENTS,
    INDEX_SCOPES,
    INDEX_EMBEDDINGS,
    INDEX_SECURITY_SCANS,
    INDEX_FEDERATION_CONFIG,
];

/// Retry schedule for transient backend failures: initial delay.
pub const RETRY_INITIAL_DELAY_MS: u64 = 100;

/// Retry schedule: multiplier applied per attempt.
pub const RETRY_BACKOFF_FACTOR: f64 = 2.0;

/// Retry schedule: maximum attempts including the first.
pub const RETRY_MAX_ATTEMPTS: u32 = 5;

/// Retry schedule: jitter fraction applied to each delay.
pub const RETRY_JITTER: f64 = 0.1;
