//! File handlers: upload, list, visibility, delete.

use std::io;

use axum::Json;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

use defdrive_core::error::AppError;
use defdrive_entity::file::File;
use defdrive_service::UploadRequest;

use crate::dto::request::SetFileAccessRequest;
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// Chunks buffered between the multipart reader and the storage writer.
const UPLOAD_CHANNEL_DEPTH: usize = 8;

/// POST /api/upload
///
/// Multipart form with a `file` part. A `public` part must come before
/// `file` to take effect. The part is streamed to storage without being
/// buffered in memory.
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<File>>), ApiError> {
    let mut public = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let part = field.name().unwrap_or("").to_string();
        match part.as_str() {
            "public" => {
                let text = field.text().await.map_err(multipart_error)?;
                public = parse_bool(&text)?;
            }
            "file" => {
                let name = field
                    .file_name()
                    .map(String::from)
                    .ok_or_else(|| AppError::validation("file part needs a filename"))?;
                let content_type = field.content_type().map(String::from);

                let (tx, rx) = mpsc::channel(UPLOAD_CHANNEL_DEPTH);
                let stream = futures::stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|chunk| (chunk, rx))
                });
                let req = UploadRequest {
                    name,
                    public,
                    content_type,
                    stream: Box::pin(stream),
                };

                let (pumped, uploaded) =
                    tokio::join!(pump_field(field, tx), state.file_service.upload(&auth, req));
                pumped.map_err(multipart_error)?;
                let file = uploaded?;

                return Ok((StatusCode::CREATED, Json(ApiResponse::ok(file))));
            }
            _ => {}
        }
    }

    Err(AppError::validation("file is required").into())
}

/// Forward a multipart field into the upload channel until it ends or the
/// writer stops listening (e.g. the upload went over quota).
async fn pump_field(
    mut field: Field<'_>,
    tx: mpsc::Sender<Result<Bytes, io::Error>>,
) -> Result<(), MultipartError> {
    loop {
        match field.chunk().await {
            Ok(Some(bytes)) => {
                if tx.send(Ok(bytes)).await.is_err() {
                    return Ok(());
                }
            }
            Ok(None) => return Ok(()),
            Err(e) => {
                let _ = tx.send(Err(io::Error::other(e.body_text()))).await;
                return Err(e);
            }
        }
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::validation(format!("Multipart error: {}", e.body_text()))
}

fn parse_bool(text: &str) -> Result<bool, AppError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(AppError::validation(format!("Invalid boolean for public: {other}"))),
    }
}

/// GET /api/files
pub async fn list_files(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<File>>>, ApiError> {
    let files = state.file_service.list_files(&auth).await?;
    Ok(Json(ApiResponse::ok(files)))
}

/// PUT /api/files/{file_id}/access
pub async fn set_file_access(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(file_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<SetFileAccessRequest>,
) -> Result<Json<ApiResponse<File>>, ApiError> {
    let file = state
        .file_service
        .set_public(&auth, file_id, req.public)
        .await?;
    Ok(Json(ApiResponse::ok(file)))
}

/// DELETE /api/files/{file_id}
pub async fn delete_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(file_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.file_service.delete_file(&auth, file_id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("File deleted"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool(" ON ").unwrap());
        assert!(!parse_bool("").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
