//! In-process read-through cache for expensive note listings.
//!
//! Entries are opaque JSON payloads keyed by string. A read serves the cached
//! payload while it is younger than the caller's TTL; otherwise the producer
//! runs and its result replaces the entry. Writes never go through the cache:
//! mutations drop whole key families instead.
//!
//! ## Keys
//!
//! ```text
//! notes:page:{page}:limit:{limit}   → NotePage        (listing TTL)
//! notes:trending                    → Vec<NoteResponse> (trending TTL)
//! ```
//!
//! The lock is never held across the producer, so two concurrent misses for
//! the same key both compute and the later store wins. Results are
//! recomputations of the same data, so this only costs work.

use std::{collections::HashMap, future::Future, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};

/// Prefix shared by every paginated-listing key.
pub const LISTING_FAMILY: &str = "notes:page:";

/// The single trending key.
pub const TRENDING_KEY: &str = "notes:trending";

pub fn listing_key(page: i64, limit: i64) -> String {
    format!("{LISTING_FAMILY}{page}:limit:{limit}")
}

/// Source of "now" for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

struct CacheEntry {
    payload: serde_json::Value,
    stored_at: DateTime<Utc>,
}

pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Serve `key` from cache if younger than `ttl`, otherwise run `producer`
    /// and cache its result. Producer errors are returned and nothing is stored.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<(T, CacheStatus), E>
    where
        T: Serialize + DeserializeOwned,
        E: From<serde_json::Error>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(payload) = self.fresh(key, ttl) {
            tracing::debug!(key, "cache hit");
            return Ok((serde_json::from_value(payload)?, CacheStatus::Hit));
        }

        tracing::debug!(key, "cache miss");
        let value = producer().await?;
        let payload = serde_json::to_value(&value)?;

        self.entries.lock().insert(
            key.to_string(),
            CacheEntry {
                payload,
                stored_at: self.clock.now(),
            },
        );

        Ok((value, CacheStatus::Miss))
    }

    /// Payload of `key` if still fresh. An expired entry is removed.
    fn fresh(&self, key: &str, ttl: Duration) -> Option<serde_json::Value> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if now - entry.stored_at < ttl => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Drop one key.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Drop every key starting with `prefix`. Returns how many were removed.
    pub fn invalidate_family(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Drop every cached note listing: all pages plus trending.
    pub fn invalidate_notes(&self) {
        let pages = self.invalidate_family(LISTING_FAMILY);
        let trending = self.invalidate(TRENDING_KEY);
        tracing::debug!(pages, trending, "note cache invalidated");
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
