use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use tracing::{info, warn};

use super::{CacheStore, CacheTtl};
use crate::errors::CacheError;

/// Redis-backed cache store. Values are JSON strings written with `SET .. EX`.
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
    default_ttl: CacheTtl,
}

impl RedisCacheStore {
    pub async fn connect(url: &str, default_ttl: CacheTtl) -> Result<Self, CacheError> {
        info!("Connecting to Redis...");

        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        info!("✅ Successfully connected to Redis");

        Ok(Self {
            connection,
            default_ttl,
        })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(key).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Option<CacheTtl>) -> Result<(), CacheError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_disabled() {
            return Ok(());
        }
        // Redis expiry has whole-second resolution
        let seconds = ttl.as_duration().as_secs().max(1);
        let json = serde_json::to_string(value)?;

        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, json, seconds).await?;
        Ok(())
    }

    fn default_ttl(&self) -> CacheTtl {
        self.default_ttl
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Unavailable(format!("unexpected PING reply: {}", reply)))
        }
    }
}

/// Stand-in used when the backing store could not be reached at startup.
///
/// Every operation fails with `CacheError::Unavailable`, so requests keep
/// flowing straight to the suppliers.
#[derive(Clone)]
pub struct UnavailableCacheStore {
    reason: String,
    default_ttl: CacheTtl,
}

impl UnavailableCacheStore {
    pub fn new(reason: impl Into<String>, default_ttl: CacheTtl) -> Self {
        let reason = reason.into();
        warn!("Cache store unavailable, running without cache: {}", reason);
        Self { reason, default_ttl }
    }
}

#[async_trait]
impl CacheStore for UnavailableCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        Err(CacheError::Unavailable(self.reason.clone()))
    }

    async fn set(&self, _key: &str, _value: &Value, _ttl: Option<CacheTtl>) -> Result<(), CacheError> {
        Err(CacheError::Unavailable(self.reason.clone()))
    }

    fn default_ttl(&self) -> CacheTtl {
        self.default_ttl
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unavailable_store_fails_every_operation() {
        let store = UnavailableCacheStore::new("connection refused", CacheTtl::from_minutes(15));

        assert!(matches!(store.get("k").await, Err(CacheError::Unavailable(_))));
        assert!(matches!(
            store.set("k", &json!(1), None).await,
            Err(CacheError::Unavailable(_))
        ));
        assert!(store.ping().await.is_err());
    }
}
