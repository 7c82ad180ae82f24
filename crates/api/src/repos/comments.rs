//! Comment repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::Comment;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Oldest-first comments of a note.
    async fn list_by_note(&self, note_id: Uuid) -> Result<Vec<Comment>>;

    /// Find a comment by ID, scoped to its note.
    async fn find(&self, id: Uuid, note_id: Uuid) -> Result<Option<Comment>>;

    async fn create(&self, note_id: Uuid, username: &str, text: &str) -> Result<Comment>;

    async fn update_text(&self, id: Uuid, text: &str) -> Result<Comment>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[derive(Clone)]
pub struct PgCommentRepo {
    pool: Pool<Postgres>,
}

impl PgCommentRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepo for PgCommentRepo {
    async fn list_by_note(&self, note_id: Uuid) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE note_id = $1 ORDER BY created_at",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn find(&self, id: Uuid, note_id: Uuid) -> Result<Option<Comment>> {
        let comment =
            sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1 AND note_id = $2")
                .bind(id)
                .bind(note_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(comment)
    }

    async fn create(&self, note_id: Uuid, username: &str, text: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (note_id, username, text) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(note_id)
        .bind(username)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn update_text(&self, id: Uuid, text: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            "UPDATE comments SET text = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
