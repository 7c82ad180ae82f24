//! User administration, profiles and the follow graph.
//!
//! Endpoints:
//! - GET /users - List users
//! - POST /users - Create a local user
//! - PATCH /users - Update username, roles, active flag and optionally password
//! - DELETE /users - Delete a user that owns no notes
//! - GET /users/{username}/profile - User plus follower/following names and note ids
//! - GET /users/username/{username} - Single user
//! - POST /users/{username}/following - Follow a user
//! - POST /users/{username}/unfollowing - Stop following a user

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use garde::Validate;
use shared::api::{
    CreateUserPayload, DEFAULT_ROLE, DeleteByIdPayload, MessageResponse, ProfileResponse,
    UpdateUserPayload, UserSummary,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthUser,
    models::{AuthMethod, NewUser, User},
    repos::is_unique_violation,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_users)
                .post(create_user)
                .patch(update_user)
                .delete(delete_user),
        )
        .route("/{username}/profile", get(get_profile))
        .route("/username/{username}", get(get_by_username))
        .route("/{username}/following", post(follow_user))
        .route("/{username}/unfollowing", post(unfollow_user))
}

fn duplicate_username(err: anyhow::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::conflict("Duplicate username")
    } else {
        AppError::Internal(err)
    }
}

async fn find_named(state: &AppState, username: &str) -> Result<User, AppError> {
    state
        .repos
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

async fn usernames(state: &AppState, ids: &[Uuid]) -> Result<Vec<String>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let users = state.repos.users.find_by_ids(ids.to_vec()).await?;
    Ok(users.into_iter().filter_map(|u| u.username).collect())
}

#[debug_handler]
async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.repos.users.list().await?;
    if users.is_empty() {
        return Err(AppError::bad_request("No users found"));
    }

    let result: Vec<UserSummary> = users.iter().map(User::summary).collect();
    Ok(Json(result))
}

#[debug_handler]
async fn create_user(
    admin: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::validation)?;

    if state
        .repos
        .users
        .username_taken(&payload.username, None)
        .await?
    {
        return Err(AppError::conflict("Duplicate username"));
    }

    let user = state
        .repos
        .users
        .create(NewUser {
            username: Some(payload.username),
            password_hash: state.hasher.hash(&payload.password)?,
            email: payload.email,
            name: None,
            roles: payload
                .roles
                .unwrap_or_else(|| vec![DEFAULT_ROLE.to_string()]),
            auth_method: AuthMethod::Local,
            is_temporary: false,
        })
        .await
        .map_err(duplicate_username)?;

    tracing::info!(user_id = %user.id, by = %admin.username, roles = ?admin.roles, "user created");

    let username = user.username.unwrap_or_default();
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!("New user {username} created"))),
    ))
}

#[debug_handler]
async fn update_user(
    admin: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::validation)?;

    let (Some(id), Some(active)) = (payload.id, payload.active) else {
        return Err(AppError::bad_request("All fields except password are required"));
    };

    let mut user = state
        .repos
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::bad_request("User not found"))?;

    if state
        .repos
        .users
        .username_taken(&payload.username, Some(id))
        .await?
    {
        return Err(AppError::conflict("Duplicate username"));
    }

    user.username = Some(payload.username);
    user.roles = payload.roles;
    user.active = active;
    if let Some(password) = payload.password.filter(|p| !p.is_empty()) {
        user.password_hash = state.hasher.hash(&password)?;
    }

    let user = state
        .repos
        .users
        .update(&user)
        .await
        .map_err(duplicate_username)?;

    tracing::info!(user_id = %user.id, by = %admin.username, "user updated");

    Ok(Json(MessageResponse::new(format!(
        "{} updated",
        user.username.unwrap_or_default()
    ))))
}

#[debug_handler]
async fn delete_user(
    admin: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<DeleteByIdPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::validation)?;
    let id = payload
        .id
        .ok_or_else(|| AppError::bad_request("User ID required"))?;

    let user = state
        .repos
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::bad_request("User not found"))?;

    if state.repos.notes.has_notes(id).await? {
        return Err(AppError::bad_request("User has assigned notes"));
    }

    if !state.repos.users.delete(id).await? {
        return Err(AppError::bad_request("User not found"));
    }

    tracing::info!(user_id = %id, by = %admin.username, "user deleted");

    Ok(Json(MessageResponse::new(format!(
        "Username {} with ID {} deleted",
        user.username.unwrap_or_default(),
        id
    ))))
}

#[debug_handler]
async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_named(&state, &username).await?;

    let followers = usernames(&state, &user.followers).await?;
    let following = usernames(&state, &user.following).await?;
    let notes = state
        .repos
        .notes
        .list_by_user(user.id)
        .await?
        .into_iter()
        .map(|n| n.id)
        .collect();

    Ok(Json(ProfileResponse {
        user: user.details(),
        followers,
        following,
        notes,
    }))
}

#[debug_handler]
async fn get_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_named(&state, &username).await?;
    Ok(Json(user.details()))
}

/// The caller's own account. A token for a deleted account is refused.
async fn current_user(state: &AppState, auth: &AuthUser) -> Result<User, AppError> {
    state
        .repos
        .users
        .find_by_username(&auth.username)
        .await?
        .ok_or_else(|| AppError::unauthorized("Unauthorized"))
}

#[debug_handler]
async fn follow_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let me = current_user(&state, &auth).await?;
    let target = find_named(&state, &username).await?;

    if me.id == target.id {
        return Err(AppError::bad_request("You cannot follow yourself"));
    }
    if me.following.contains(&target.id) {
        return Err(AppError::bad_request("You are already following this user"));
    }

    state.repos.users.follow(me.id, target.id).await?;

    tracing::info!(user_id = %me.id, followee = %target.id, "follow");

    Ok(Json(MessageResponse::new(format!(
        "You are now following {username}"
    ))))
}

#[debug_handler]
async fn unfollow_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let me = current_user(&state, &auth).await?;
    let target = find_named(&state, &username).await?;

    if !me.following.contains(&target.id) {
        return Err(AppError::bad_request("You are not following this user"));
    }

    state.repos.users.unfollow(me.id, target.id).await?;

    tracing::info!(user_id = %me.id, followee = %target.id, "unfollow");

    Ok(Json(MessageResponse::new(format!(
        "You have unfollowed {username}"
    ))))
}
