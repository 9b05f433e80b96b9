//! Federation constants.

/// Lower bound for a peer's sync interval, in minutes.
pub const MIN_SYNC_INTERVAL_MINUTES: u32 = 5;

/// Upper bound for a peer's sync interval, in minutes.
pub const MAX_SYNC_INTERVAL_MINUTES: u32 = 1440;

/// A peer is marked unhealthy once `consecutive_failures` exceeds this.
pub const UNHEALTHY_AFTER_FAILURES: u32 = 2;

/// Well-known id of the singleton federation config document.
pub const FEDERATION_CONFIG_ID: &str = "federation-config";

/// Node id of the local registry in the unified topology.
pub const LOCAL_NODE_ID: &str = "local";

/// Default timeout for a peer export fetch, in seconds.
pub const PEER_FETCH_TIMEOUT_SECS: u64 = 30;
