use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

use super::Cache;

pub struct RedisCache {
    manager: Arc<ConnectionManager>,
}

impl RedisCache {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        // requiere el feature "connection-manager" en redis
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager: Arc::new(manager) })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = (*self.manager).clone();
        match conn.get::<_, Vec<u8>>(key).await {
            Ok(v) => Some(v),
            Err(_) => None,
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) {
        let mut conn = (*self.manager).clone();
        let _: redis::RedisResult<()> = match ttl {
            Some(d) => conn.set_ex(key, value, d.as_secs()).await,
            None => conn.set(key, value).await,
        };
    }
}
