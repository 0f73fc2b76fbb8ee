//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use defdrive_core::error::{AppError, ErrorKind};
use defdrive_service::DenyReason;

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Handler error: an `AppError` on its way out as a response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, error_code) = match err.kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            ErrorKind::QuotaExceeded => (StatusCode::PAYLOAD_TOO_LARGE, "QUOTA_EXCEEDED"),
            ErrorKind::ServiceUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ErrorKind::Internal
            | ErrorKind::Database
            | ErrorKind::Storage
            | ErrorKind::Configuration
            | ErrorKind::Serialization => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        // Only client errors carry their own message; everything else is
        // logged and replaced so paths and SQL never reach the caller.
        let message = if err.is_client_error() {
            err.message.clone()
        } else {
            tracing::error!(kind = %err.kind, error = %err, source = ?err.source, "Request failed");
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        };

        let body = ApiErrorResponse {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Response for a refused link request: the deny reason code and its status.
pub fn deny_response(reason: DenyReason) -> Response {
    let status =
        StatusCode::from_u16(reason.status_code()).unwrap_or(StatusCode::FORBIDDEN);
    let body = ApiErrorResponse {
        error: reason.code().to_string(),
        message: reason.message().to_string(),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_keeps_message() {
        let response = ApiError(AppError::forbidden("You do not own this file")).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_store_failures_map_to_server_errors() {
        let response = ApiError(AppError::database("relation does not exist")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError(AppError::service_unavailable("timed out")).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_deny_statuses() {
        assert_eq!(deny_response(DenyReason::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(deny_response(DenyReason::TtlExhausted).status(), StatusCode::FORBIDDEN);
        assert_eq!(deny_response(DenyReason::Conflict).status(), StatusCode::FORBIDDEN);
    }
}
