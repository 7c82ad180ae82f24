//! Ephemeral stores (Redis).
//!
//! Everything kept here expires on its own via TTL.
//!
//! ## Stores
//!
//! - **rate_limit** - Fixed-window counters (login attempts)
//! - **status** - Redis health check
//!
//! ## Redis Key Patterns
//!
//! ```text
//! ratelimit:login:{username}   → Login attempts in the current window
//! ```

mod rate_limit;
mod status;

pub use rate_limit::{RateLimitResult, RateLimiter, RedisRateLimiter};
pub use status::{RedisStatusStore, StatusStore};

#[cfg(test)]
pub use rate_limit::MockRateLimiter;
#[cfg(test)]
pub use status::MockStatusStore;

use std::sync::Arc;

/// Collection of all ephemeral stores.
#[derive(Clone)]
pub struct Stores {
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub status: Arc<dyn StatusStore>,
}
