use std::time::Duration;

use async_trait::async_trait;

/// Small key-value cache for derived data (today only the genre menu).
/// The ranking lists are never cached: Trending must re-randomize per
/// request and Latest carries a persistence side effect.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }
    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) {}
}

// No-op: no cachea nada
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {}

#[cfg(feature = "redis-cache")]
pub mod redis;
