//! User repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{NewUser, User};

/// Repository for user operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Find a user by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Find all users whose ID is in `ids`. Unknown IDs are skipped.
    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<User>>;

    /// Find a user by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Find a user by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List every user.
    async fn list(&self) -> Result<Vec<User>>;

    /// True if another user (ignoring `exclude`) holds `username`, compared case-insensitively.
    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool>;

    /// Insert a new user.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Persist the mutable profile fields of `user` (not the follow graph).
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user (returns true if a user was deleted).
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Record that `follower` follows `followee`, on both sides.
    async fn follow(&self, follower: Uuid, followee: Uuid) -> Result<()>;

    /// Remove `follower` -> `followee` on both sides.
    async fn unfollow(&self, follower: Uuid, followee: Uuid) -> Result<()>;
}

/// PostgreSQL implementation of UserRepo.
#[derive(Clone)]
pub struct PgUserRepo {
    pool: Pool<Postgres>,
}

impl PgUserRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM users
                WHERE lower(username) = lower($1) AND ($2::uuid IS NULL OR id <> $2)
            )",
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash, email, name, roles, auth_method, is_temporary)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.email)
        .bind(user.name)
        .bind(user.roles)
        .bind(user.auth_method)
        .bind(user.is_temporary)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users
             SET username = $2, password_hash = $3, email = $4, name = $5,
                 roles = $6, active = $7, is_temporary = $8
             WHERE id = $1
             RETURNING *",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.roles)
        .bind(user.active)
        .bind(user.is_temporary)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn follow(&self, follower: Uuid, followee: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE users SET following = array_append(following, $2)
             WHERE id = $1 AND NOT ($2 = ANY(following))",
        )
        .bind(follower)
        .bind(followee)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET followers = array_append(followers, $1)
             WHERE id = $2 AND NOT ($1 = ANY(followers))",
        )
        .bind(follower)
        .bind(followee)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn unfollow(&self, follower: Uuid, followee: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET following = array_remove(following, $2) WHERE id = $1")
            .bind(follower)
            .bind(followee)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET followers = array_remove(followers, $1) WHERE id = $2")
            .bind(follower)
            .bind(followee)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
