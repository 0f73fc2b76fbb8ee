//! Access record handlers for file owners.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use defdrive_entity::access::AccessRecord;
use defdrive_service::CreatedAccess;

use crate::dto::request::AccessSettingsRequest;
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// POST /api/files/{file_id}/accesses
pub async fn create_access(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(file_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AccessSettingsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedAccess>>), ApiError> {
    let created = state
        .access_service
        .create_access(&auth, file_id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

/// GET /api/files/{file_id}/accesses
pub async fn list_accesses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(file_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<AccessRecord>>>, ApiError> {
    let accesses = state.access_service.list_accesses(&auth, file_id).await?;
    Ok(Json(ApiResponse::ok(accesses)))
}

/// GET /api/accesses/{access_id}
pub async fn get_access(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(access_id): Path<Uuid>,
) -> Result<Json<ApiResponse<AccessRecord>>, ApiError> {
    let access = state.access_service.get_access(&auth, access_id).await?;
    Ok(Json(ApiResponse::ok(access)))
}

/// PUT /api/accesses/{access_id}
pub async fn update_access(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(access_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AccessSettingsRequest>,
) -> Result<Json<ApiResponse<AccessRecord>>, ApiError> {
    let access = state
        .access_service
        .update_access(&auth, access_id, req.into())
        .await?;
    Ok(Json(ApiResponse::ok(access)))
}

/// DELETE /api/accesses/{access_id}
pub async fn delete_access(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(access_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.access_service.delete_access(&auth, access_id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Access deleted"))))
}
