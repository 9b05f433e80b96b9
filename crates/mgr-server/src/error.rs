//! Domain error → HTTP response mapping.
//!
//! Every error response carries the stable error kind, a message, and an
//! opaque request id that matches the audit event for the request.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

use mgr_domain::error::Error;

/// Result alias for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Wrapper turning a domain error into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self(Error::from(err))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_permission: Option<&'a str>,
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
        Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
        Error::Forbidden { .. } => StatusCode::FORBIDDEN,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Conflict { .. } => StatusCode::CONFLICT,
        Error::Backpressure { .. } | Error::TransientBackend { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        Error::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
        Error::ScanTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let request_id = Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(request_id, error = %self.0, "request failed");
        }

        let field = match &self.0 {
            Error::BadRequest { field, .. } => field.as_deref(),
            _ => None,
        };
        let required_permission = match &self.0 {
            Error::Forbidden {
                required_permission,
            } => Some(required_permission.as_str()),
            _ => None,
        };

        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
            request_id,
            field,
            required_permission,
        };
        (status, Json(body)).into_response()
    }
}
