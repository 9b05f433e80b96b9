//! Error handling types
//!
//! One error enum for the whole system. Every variant carries a stable kind
//! string (surfaced to API clients and matched against audit events) and the
//! service layer uses [`Error::is_transient`] to decide what is retryable.

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the MCP Gateway Registry
#[derive(Error, Debug)]
pub enum Error {
    /// Input failed shape or constraint validation
    #[error("Bad request: {message}")]
    BadRequest {
        /// Description of the violated constraint
        message: String,
        /// Offending field, when known
        field: Option<String>,
    },

    /// Missing or invalid ingress credentials
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Why authentication failed
        message: String,
    },

    /// Fine-grained access control denied the request
    #[error("Forbidden: missing permission {required_permission}")]
    Forbidden {
        /// The permission that would have allowed the request
        required_permission: String,
    },

    /// Entity absent
    #[error("Not found: {resource}")]
    NotFound {
        /// The resource that was not found
        resource: String,
    },

    /// Uniqueness or optimistic-version violation
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflicting state
        message: String,
    },

    /// I/O or 5xx from a storage/network dependency; retryable
    #[error("Transient backend error: {message}")]
    TransientBackend {
        /// Description of the transient failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Stored document violates the expected schema; fatal for the request
    #[error("Backend data error: {message}")]
    BackendData {
        /// Description of the schema violation
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Security analyzer exceeded its wall-clock deadline
    #[error("Security scan timed out after {seconds}s")]
    ScanTimeout {
        /// The deadline that was exceeded
        seconds: u64,
    },

    /// Transport or auth failure talking to a federation peer
    #[error("Peer '{peer_id}' unreachable: {message}")]
    PeerUnreachable {
        /// The peer that could not be reached
        peer_id: String,
        /// Transport-level detail
        message: String,
    },

    /// Proxy connection pool exhausted
    #[error("Backpressure: {message}")]
    Backpressure {
        /// Description of the saturated resource
        message: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding provider operation error
    #[error("Embedding provider error: {message}")]
    Embedding {
        /// Description of the embedding failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },

    /// I/O operation error
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// JSON parsing or serialization error
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    /// Stable kind string, matched by API clients and audit records.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::TransientBackend { .. } => "transient_backend_error",
            Self::BackendData { .. } => "backend_data_error",
            Self::ScanTimeout { .. } => "scan_timeout",
            Self::PeerUnreachable { .. } => "peer_unreachable",
            Self::Backpressure { .. } => "backpressure",
            Self::Config { .. } => "configuration_error",
            Self::Embedding { .. } => "embedding_error",
            Self::Internal { .. } => "internal_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }

    /// Whether the service layer may retry the failed operation.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientBackend { .. })
    }
}

// Request-surface error creation methods
impl Error {
    /// Create a bad request error
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest {
            message: message.into(),
            field: None,
        }
    }

    /// Create a bad request error naming the offending field
    pub fn bad_request_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::BadRequest {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an unauthenticated error
    pub fn unauthenticated<S: Into<String>>(message: S) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Create a forbidden error naming the missing permission
    pub fn forbidden<S: Into<String>>(required_permission: S) -> Self {
        Self::Forbidden {
            required_permission: required_permission.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

// Backend error creation methods
impl Error {
    /// Create a transient backend error
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::TransientBackend {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transient backend error with source
    pub fn transient_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::TransientBackend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a backend data error
    pub fn backend_data<S: Into<String>>(message: S) -> Self {
        Self::BackendData {
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend data error with source
    pub fn backend_data_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::BackendData {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Federation / scan / proxy error creation methods
impl Error {
    /// Create a peer unreachable error
    pub fn peer_unreachable<P: Into<String>, S: Into<String>>(peer_id: P, message: S) -> Self {
        Self::PeerUnreachable {
            peer_id: peer_id.into(),
            message: message.into(),
        }
    }

    /// Create a scan timeout error
    #[must_use]
    pub fn scan_timeout(seconds: u64) -> Self {
        Self::ScanTimeout { seconds }
    }

    /// Create a backpressure error
    pub fn backpressure<S: Into<String>>(message: S) -> Self {
        Self::Backpressure {
            message: message.into(),
        }
    }
}

// Configuration / internal error creation methods
impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an embedding provider error
    pub fn embedding<S: Into<String>>(message: S) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// Note: HTTP status mapping lives in the server layer; the domain only knows
// error kinds.
