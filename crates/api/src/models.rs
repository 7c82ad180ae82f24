use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::api::{CommentResponse, NoteResponse, UserDetails, UserSummary};
use sqlx::FromRow;
use uuid::Uuid;

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "auth_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Local,
    Google,
}

impl AuthMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthMethod::Local => "local",
            AuthMethod::Google => "google",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// `None` while an external account is still onboarding.
    pub username: Option<String>,
    pub password_hash: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub active: bool,
    pub auth_method: AuthMethod,
    /// Set for external accounts until a username has been chosen.
    pub is_temporary: bool,
    pub following: Vec<Uuid>,
    pub followers: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether this account may receive long-lived tokens.
    pub fn is_onboarded(&self) -> bool {
        !self.is_temporary && self.username.is_some()
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            roles: self.roles.clone(),
            active: self.active,
            auth_method: self.auth_method.as_str().to_string(),
            following: self.following.clone(),
            followers: self.followers.clone(),
        }
    }

    pub fn details(&self) -> UserDetails {
        UserDetails {
            summary: self.summary(),
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

/// Fields needed to insert a user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: Option<String>,
    pub password_hash: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub auth_method: AuthMethod,
    pub is_temporary: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub text: String,
    pub image_url: Option<String>,
    pub completed: bool,
    /// Projection of `liked_by.len() - disliked_by.len()`, refreshed on every vote.
    pub likes: i64,
    pub views: i64,
    pub liked_by: Vec<Uuid>,
    pub disliked_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn into_view(self, username: String) -> NoteResponse {
        NoteResponse {
            id: self.id,
            user: self.user_id,
            username,
            title: self.title,
            text: self.text,
            image_url: self.image_url,
            completed: self.completed,
            likes: self.likes,
            views: self.views,
            liked_by: self.liked_by,
            disliked_by: self.disliked_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fields needed to insert a note.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub user_id: Uuid,
    pub title: String,
    pub text: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub note_id: Uuid,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        CommentResponse {
            id: c.id,
            note_id: c.note_id,
            username: c.username,
            text: c.text,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
