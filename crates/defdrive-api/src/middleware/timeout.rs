//! Error handler for the request timeout on JSON endpoints.

use axum::BoxError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use defdrive_core::error::AppError;

use crate::error::{ApiError, ApiErrorResponse};

/// Turns a `tower::timeout` failure into a 408; anything else is a 500.
pub async fn handle_timeout_error(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        let body = ApiErrorResponse {
            error: "REQUEST_TIMEOUT".to_string(),
            message: "Request timed out".to_string(),
        };
        return (StatusCode::REQUEST_TIMEOUT, Json(body)).into_response();
    }
    ApiError(AppError::internal(format!("Unhandled middleware error: {err}"))).into_response()
}
