//! Redis health probe.

use anyhow::Result;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// True when Redis answers PING.
    async fn health_check(&self) -> Result<bool>;
}

#[derive(Clone)]
pub struct RedisStatusStore {
    client: redis::Client,
}

impl RedisStatusStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}
