//! Shared API request/response types used by the API server and its clients.
//!
//! Field names are camelCase on the wire. Required request fields default to
//! empty values so that a missing field is reported by validation as a
//! 400 rather than rejected by the JSON extractor.

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles a user may hold. Anything else is rejected by validation.
pub const ROLES: [&str; 3] = ["Employee", "Manager", "Admin"];

/// Role assigned to new accounts when none is given.
pub const DEFAULT_ROLE: &str = "Employee";

fn validate_roles(value: &Vec<String>, _ctx: &()) -> garde::Result {
    if value.is_empty() {
        return Err(garde::Error::new("at least one role is required"));
    }
    if let Some(role) = value.iter().find(|r| !ROLES.contains(&r.as_str())) {
        return Err(garde::Error::new(format!("unknown role '{role}'")));
    }
    Ok(())
}

fn validate_optional_roles(value: &Option<Vec<String>>, ctx: &()) -> garde::Result {
    match value {
        Some(roles) => validate_roles(roles, ctx),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Local username/password login.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginPayload {
    #[garde(length(min = 1))]
    #[serde(default)]
    pub username: String,
    #[garde(length(min = 1))]
    #[serde(default)]
    pub password: String,
}

/// Returned by login, refresh and username setup. The refresh token travels
/// separately as a cookie.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Login with an identity asserted by the external provider.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ExternalLoginPayload {
    #[garde(length(min = 1))]
    #[serde(default)]
    pub name: String,
    #[garde(email)]
    #[serde(default)]
    pub email: String,
}

/// Returned instead of a token pair when an external account still needs a username.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstTimeUserResponse {
    pub is_first_time_user: bool,
    pub setup_token: String,
}

/// Completes onboarding of an external account.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetUsernamePayload {
    #[garde(length(min = 1, max = 64))]
    #[serde(default)]
    pub username: String,
    #[garde(length(min = 1))]
    #[serde(default)]
    pub setup_token: String,
}

/// Generic `{ "message": ... }` reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// A note as returned to clients, with the owner's username resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub username: String,
    pub title: String,
    pub text: String,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    pub completed: bool,
    pub likes: i64,
    pub views: i64,
    pub liked_by: Vec<Uuid>,
    pub disliked_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of the note listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePage {
    pub notes: Vec<NoteResponse>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_notes: i64,
}

/// Query string of `GET /notes`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateNotePayload {
    /// Owner of the note.
    #[garde(required)]
    pub user: Option<Uuid>,
    #[garde(length(min = 1, max = 200))]
    #[serde(default)]
    pub title: String,
    #[garde(length(min = 1))]
    #[serde(default)]
    pub text: String,
    #[garde(skip)]
    #[serde(default, rename = "imageURL")]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateNotePayload {
    #[garde(required)]
    pub id: Option<Uuid>,
    #[garde(required)]
    pub user: Option<Uuid>,
    #[garde(length(min = 1, max = 200))]
    #[serde(default)]
    pub title: String,
    #[garde(length(min = 1))]
    #[serde(default)]
    pub text: String,
    #[garde(required)]
    pub completed: Option<bool>,
    #[garde(skip)]
    #[serde(default, rename = "imageURL")]
    pub image_url: Option<String>,
}

/// Body of the `DELETE` endpoints that take an id.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DeleteByIdPayload {
    #[garde(required)]
    pub id: Option<Uuid>,
}

/// Result of a like or dislike toggle.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub message: String,
    pub user_id: Uuid,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewResponse {
    pub views: i64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Public view of a user: no password hash, no email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: Option<String>,
    pub roles: Vec<String>,
    pub active: bool,
    pub auth_method: String,
    pub following: Vec<Uuid>,
    pub followers: Vec<Uuid>,
}

/// A user as seen by authenticated clients: everything but the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(flatten)]
    pub summary: UserSummary,
    pub email: Option<String>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserDetails,
    /// Usernames of the accounts following this user.
    pub followers: Vec<String>,
    /// Usernames of the accounts this user follows.
    pub following: Vec<String>,
    /// Ids of the notes owned by this user.
    pub notes: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateUserPayload {
    #[garde(length(min = 1, max = 64))]
    #[serde(default)]
    pub username: String,
    #[garde(length(min = 1))]
    #[serde(default)]
    pub password: String,
    #[garde(custom(validate_optional_roles))]
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[garde(email)]
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateUserPayload {
    #[garde(required)]
    pub id: Option<Uuid>,
    #[garde(length(min = 1, max = 64))]
    #[serde(default)]
    pub username: String,
    #[garde(custom(validate_roles))]
    #[serde(default)]
    pub roles: Vec<String>,
    #[garde(required)]
    pub active: Option<bool>,
    #[garde(skip)]
    #[serde(default)]
    pub password: Option<String>,
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CommentPayload {
    #[garde(length(min = 1, max = 2000))]
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub note_id: Uuid,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadedFile {
    pub url: String,
    pub key: String,
}

/// `success` is 1 on success and 0 on failure, as the web client expects.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<UploadedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImagesPayload {
    #[garde(length(min = 1), inner(length(min = 1)))]
    #[serde(default)]
    pub file_names: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailedDeletion {
    pub key: String,
    pub error: String,
}

/// Outcome of a batch delete: every key ends up in exactly one list.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DeleteImagesResponse {
    pub deleted: Vec<String>,
    pub failed: Vec<FailedDeletion>,
}
