//! Heartbeat-based terminal liveness.
//!
//! A terminal is alive while a presence flag keyed by its ID exists in a
//! shared expiring cache. Gateways refresh the flag on every heartbeat; a
//! crashed gateway simply stops refreshing and drops to offline once the TTL
//! runs out.

mod memory;
#[cfg(feature = "redis")]
mod redis_cache;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;

/// Default lifetime of a heartbeat.
pub const DEFAULT_ALIVE_TTL: Duration = Duration::from_secs(120);

const ALIVE_KEY_PREFIX: &str = "TERMINAL_ALIVE_";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Key/value store with per-key expiry.
///
/// Writes are last-writer-wins per key. An expired key reads as absent; no
/// cleanup call is needed for correctness.
#[async_trait]
pub trait ExpiringCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Fetch several keys at once, in order. Backends with a native
    /// multi-get should override this.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }
}

/// Reads and writes terminal presence flags.
#[derive(Clone)]
pub struct LivenessTracker {
    cache: Arc<dyn ExpiringCache>,
    ttl: Duration,
}

impl LivenessTracker {
    pub fn new(cache: Arc<dyn ExpiringCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// TTL applied by [`Self::set_alive`].
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn alive_key(terminal_id: &str) -> String {
        format!("{ALIVE_KEY_PREFIX}{terminal_id}")
    }

    /// Mark a terminal alive for the tracker's default TTL.
    pub async fn set_alive(&self, terminal_id: &str) -> Result<(), CacheError> {
        self.set_alive_for(terminal_id, self.ttl).await
    }

    /// Mark a terminal alive for an explicit TTL.
    pub async fn set_alive_for(&self, terminal_id: &str, ttl: Duration) -> Result<(), CacheError> {
        self.cache
            .set(&Self::alive_key(terminal_id), "1", ttl)
            .await?;
        debug!(terminal_id, ttl_secs = ttl.as_secs(), "Terminal heartbeat recorded");
        Ok(())
    }

    pub async fn is_alive(&self, terminal_id: &str) -> Result<bool, CacheError> {
        Ok(self
            .cache
            .get(&Self::alive_key(terminal_id))
            .await?
            .is_some())
    }

    /// The subset of `terminal_ids` that are alive, in one cache round trip.
    pub async fn alive_among(&self, terminal_ids: &[String]) -> Result<HashSet<String>, CacheError> {
        if terminal_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let keys: Vec<String> = terminal_ids.iter().map(|id| Self::alive_key(id)).collect();
        let values = self.cache.get_many(&keys).await?;

        Ok(terminal_ids
            .iter()
            .zip(values)
            .filter(|(_, value)| value.is_some())
            .map(|(id, _)| id.clone())
            .collect())
    }
}
