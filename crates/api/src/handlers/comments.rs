//! Comments on notes. Only the author may edit or delete a comment.
//!
//! Endpoints (mounted under /notes):
//! - GET /notes/{id}/comments
//! - POST /notes/{id}/comments
//! - PATCH /notes/{id}/comments/{comment_id}
//! - DELETE /notes/{id}/comments/{comment_id}

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use garde::Validate;
use shared::api::{CommentPayload, CommentResponse, MessageResponse};
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::AuthUser, models::Comment, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/comments", get(list_comments).post(add_comment))
        .route(
            "/{id}/comments/{comment_id}",
            patch(edit_comment).delete(delete_comment),
        )
}

#[debug_handler]
async fn list_comments(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let comments = state.repos.comments.list_by_note(note_id).await?;
    let result: Vec<CommentResponse> = comments.into_iter().map(Into::into).collect();
    Ok(Json(result))
}

#[debug_handler]
async fn add_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::validation)?;

    if state.repos.notes.find_by_id(note_id).await?.is_none() {
        return Err(AppError::not_found("Note not found"));
    }

    let comment = state
        .repos
        .comments
        .create(note_id, &user.username, &payload.text)
        .await?;

    tracing::info!(%note_id, comment_id = %comment.id, username = %user.username, "comment added");

    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

/// The comment, if it exists on this note and `user` wrote it.
async fn own_comment(
    state: &AppState,
    user: &AuthUser,
    note_id: Uuid,
    comment_id: Uuid,
) -> Result<Comment, AppError> {
    let comment = state
        .repos
        .comments
        .find(comment_id, note_id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;

    if comment.username != user.username {
        return Err(AppError::forbidden("You can only modify your own comments"));
    }

    Ok(comment)
}

#[debug_handler]
async fn edit_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((note_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::validation)?;

    let comment = own_comment(&state, &user, note_id, comment_id).await?;
    let comment = state
        .repos
        .comments
        .update_text(comment.id, &payload.text)
        .await?;

    Ok(Json(CommentResponse::from(comment)))
}

#[debug_handler]
async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path((note_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let comment = own_comment(&state, &user, note_id, comment_id).await?;
    state.repos.comments.delete(comment.id).await?;

    tracing::info!(%note_id, %comment_id, "comment deleted");

    Ok(Json(MessageResponse::new("Comment deleted")))
}
