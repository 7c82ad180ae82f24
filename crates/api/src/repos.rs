//! Database repositories (PostgreSQL).
//!
//! This module contains traits and implementations for database access.
//! Each repository is abstracted behind a trait to enable mocking in tests.
//!
//! ## Repositories
//!
//! - **users** - Accounts, credentials and the follow graph
//! - **notes** - Notes, vote membership sets and view counters
//! - **comments** - Comments attached to notes
//! - **status** - Database health check
//!
//! ## Usage in Handlers
//!
//! Repositories are accessed via `state.repos`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let user = state.repos.users.find_by_username(&username).await?;
//!     let comments = state.repos.comments.list_by_note(note_id).await?;
//! }
//! ```

mod comments;
mod notes;
mod status;
mod users;

pub use comments::{CommentRepo, PgCommentRepo};
pub use notes::{NoteRepo, PgNoteRepo};
pub use status::{PgStatusRepo, StatusRepo};
pub use users::{PgUserRepo, UserRepo};

#[cfg(test)]
pub use comments::MockCommentRepo;
#[cfg(test)]
pub use notes::MockNoteRepo;
#[cfg(test)]
pub use status::MockStatusRepo;
#[cfg(test)]
pub use users::MockUserRepo;

use std::sync::Arc;

/// Collection of all database repositories.
#[derive(Clone)]
pub struct Repos {
    pub users: Arc<dyn UserRepo>,
    pub notes: Arc<dyn NoteRepo>,
    pub comments: Arc<dyn CommentRepo>,
    pub status: Arc<dyn StatusRepo>,
}

/// True when `err` wraps a unique-constraint violation reported by Postgres.
///
/// Uniqueness of usernames and note titles is checked before writing, but two
/// concurrent writers can both pass the check; the index has the final say.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|e| e.is_unique_violation())
}
