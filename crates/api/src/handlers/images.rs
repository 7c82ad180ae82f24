//! Note image upload and cleanup.
//!
//! Endpoints:
//! - POST /upload - Multipart upload (field `file`), stored as `{millis}-{filename}`
//! - DELETE /delete-images - Best-effort batch delete by key

use axum::{
    Json, Router, debug_handler,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, post},
};
use chrono::Utc;
use garde::Validate;
use shared::api::{
    DeleteImagesPayload, DeleteImagesResponse, FailedDeletion, UploadResponse, UploadedFile,
};

use crate::{error::AppError, state::AppState};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_image))
        .route("/delete-images", delete(delete_images))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

fn upload_failed(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(UploadResponse {
            success: 0,
            file: None,
            error: Some(error.into()),
        }),
    )
        .into_response()
}

#[debug_handler]
async fn upload_image(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => return upload_failed(StatusCode::BAD_REQUEST, "No file uploaded"),
            Err(e) => return upload_failed(StatusCode::BAD_REQUEST, e.body_text()),
        }
    };

    let file_name = field.file_name().unwrap_or("upload").replace('/', "_");
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return upload_failed(StatusCode::BAD_REQUEST, e.body_text()),
    };

    let key = format!("{}-{}", Utc::now().timestamp_millis(), file_name);

    match state
        .storage
        .put_object(&key, bytes.to_vec(), &content_type)
        .await
    {
        Ok(url) => {
            tracing::info!(%key, size = bytes.len(), "image uploaded");
            Json(UploadResponse {
                success: 1,
                file: Some(UploadedFile { url, key }),
                error: None,
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(%key, "image upload failed: {:?}", e);
            upload_failed(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Each key is deleted independently; one failure never aborts the batch.
#[debug_handler]
async fn delete_images(
    State(state): State<AppState>,
    Json(payload): Json<DeleteImagesPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::validation)?;

    let mut result = DeleteImagesResponse::default();
    for key in payload.file_names {
        match state.storage.delete_object(&key).await {
            Ok(()) => result.deleted.push(key),
            Err(e) => {
                tracing::warn!(%key, error = %e, "image delete failed");
                result.failed.push(FailedDeletion {
                    key,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Json(result))
}
