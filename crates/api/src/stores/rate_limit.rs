//! Fixed-window rate limiting backed by Redis counters.

use anyhow::Result;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one hit against `key`. The window starts at the first hit and
    /// lasts `window_secs`; more than `limit` hits inside it are refused.
    async fn check_simple(&self, key: &str, limit: i64, window_secs: u64)
    -> Result<RateLimitResult>;
}

/// Result of a rate limit check, with the hit count of the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed(i64),
    Exceeded(i64),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }

    fn from_count(count: i64, limit: i64) -> Self {
        if count > limit {
            RateLimitResult::Exceeded(count)
        } else {
            RateLimitResult::Allowed(count)
        }
    }
}

#[derive(Clone)]
pub struct RedisRateLimiter {
    client: redis::Client,
}

impl RedisRateLimiter {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check_simple(
        &self,
        key: &str,
        limit: i64,
        window_secs: u64,
    ) -> Result<RateLimitResult> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let count: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;

        if count == 1 {
            let _: () = redis::cmd("EXPIRE")
                .arg(key)
                .arg(window_secs)
                .query_async(&mut conn)
                .await?;
        }

        Ok(RateLimitResult::from_count(count, limit))
    }
}
