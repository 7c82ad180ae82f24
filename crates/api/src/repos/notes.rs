//! Note repository for PostgreSQL.
//!
//! Title uniqueness is case- and accent-insensitive: `lower(f_unaccent(title))`
//! backs both the lookup below and the unique index created by the migrations.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{NewNote, Note};

/// Repository for note operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NoteRepo: Send + Sync {
    /// Find a note by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Note>>;

    /// Find a note whose title matches ignoring case and diacritics.
    async fn find_by_title(&self, title: &str) -> Result<Option<Note>>;

    /// Newest-first slice of all notes.
    async fn list_page(&self, skip: i64, limit: i64) -> Result<Vec<Note>>;

    /// Total number of notes.
    async fn count(&self) -> Result<i64>;

    /// Notes created at or after `since`, best first (likes, views, recency).
    async fn trending(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<Note>>;

    /// Newest-first notes owned by `user_id`.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Note>>;

    /// Newest-first notes owned by any of `user_ids`.
    async fn list_by_users(&self, user_ids: Vec<Uuid>) -> Result<Vec<Note>>;

    /// True if `user_id` owns at least one note.
    async fn has_notes(&self, user_id: Uuid) -> Result<bool>;

    /// Insert a new note.
    async fn create(&self, note: NewNote) -> Result<Note>;

    /// Persist owner, title, text, completion and image of `note`.
    async fn update(&self, note: &Note) -> Result<Note>;

    /// Delete a note (returns true if a note was deleted).
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Overwrite the vote sets and the likes projection. Last write wins.
    async fn save_votes(
        &self,
        id: Uuid,
        liked_by: Vec<Uuid>,
        disliked_by: Vec<Uuid>,
        likes: i64,
    ) -> Result<()>;

    /// Add one view; returns the new count, or `None` if the note does not exist.
    async fn increment_views(&self, id: Uuid) -> Result<Option<i64>>;
}

/// PostgreSQL implementation of NoteRepo.
#[derive(Clone)]
pub struct PgNoteRepo {
    pool: Pool<Postgres>,
}

impl PgNoteRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepo for PgNoteRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(note)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE lower(f_unaccent(title)) = lower(f_unaccent($1)) LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn list_page(&self, skip: i64, limit: i64) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes ORDER BY created_at DESC, id OFFSET $1 LIMIT $2",
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn trending(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes
             WHERE created_at >= $1
             ORDER BY likes DESC, views DESC, created_at DESC
             LIMIT $2",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    async fn list_by_users(&self, user_ids: Vec<Uuid>) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE user_id = ANY($1) ORDER BY created_at DESC",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    async fn has_notes(&self, user_id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM notes WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create(&self, note: NewNote) -> Result<Note> {
        let note = sqlx::query_as::<_, Note>(
            "INSERT INTO notes (user_id, title, text, image_url)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(note.user_id)
        .bind(note.title)
        .bind(note.text)
        .bind(note.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(note)
    }

    async fn update(&self, note: &Note) -> Result<Note> {
        let note = sqlx::query_as::<_, Note>(
            "UPDATE notes
             SET user_id = $2, title = $3, text = $4, completed = $5, image_url = $6,
                 updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(note.id)
        .bind(note.user_id)
        .bind(&note.title)
        .bind(&note.text)
        .bind(note.completed)
        .bind(&note.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(note)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_votes(
        &self,
        id: Uuid,
        liked_by: Vec<Uuid>,
        disliked_by: Vec<Uuid>,
        likes: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE notes SET liked_by = $2, disliked_by = $3, likes = $4, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(liked_by)
        .bind(disliked_by)
        .bind(likes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_views(&self, id: Uuid) -> Result<Option<i64>> {
        let views: Option<i64> =
            sqlx::query_scalar("UPDATE notes SET views = views + 1 WHERE id = $1 RETURNING views")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(views)
    }
}
