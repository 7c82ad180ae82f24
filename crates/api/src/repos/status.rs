//! Database health probe.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};

/// Tables every request path depends on.
const REQUIRED_TABLES: [&str; 3] = ["public.users", "public.notes", "public.comments"];

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusRepo: Send + Sync {
    /// True when the database answers and the notes schema has been migrated.
    async fn health_check(&self) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgStatusRepo {
    pool: Pool<Postgres>,
}

impl PgStatusRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusRepo for PgStatusRepo {
    async fn health_check(&self) -> Result<bool> {
        let missing: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM unnest($1::text[]) AS t(name) WHERE to_regclass(t.name) IS NULL",
        )
        .bind(&REQUIRED_TABLES[..])
        .fetch_one(&self.pool)
        .await?;

        if missing > 0 {
            tracing::warn!(missing, "notes schema incomplete; run with --migrate");
        }

        Ok(missing == 0)
    }
}
