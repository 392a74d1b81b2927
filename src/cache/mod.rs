//! Key/value cache stores with per-entry expiration.
//!
//! Values are structured JSON. A read at or after an entry's expiration
//! behaves exactly like a miss, and a zero TTL turns `set` into a no-op.

mod key;
mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::CacheError;

pub use key::CacheKey;
pub use memory::MemoryCacheStore;
pub use redis_store::{RedisCacheStore, UnavailableCacheStore};

/// Time-to-live applied to cache writes.
///
/// Built from signed configuration values: anything `<= 0` means "do not cache".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl(Duration);

impl CacheTtl {
    pub fn from_seconds(seconds: i64) -> Self {
        if seconds <= 0 {
            Self(Duration::ZERO)
        } else {
            Self(Duration::from_secs(seconds as u64))
        }
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::from_seconds(minutes.saturating_mul(60))
    }

    pub fn disabled() -> Self {
        Self(Duration::ZERO)
    }

    pub fn is_disabled(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for CacheTtl {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

/// Contract for a shared cache backend.
///
/// Missing keys are `Ok(None)`; only communication failures are errors.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Overwrites any prior value. `ttl` of `None` uses the store default.
    async fn set(&self, key: &str, value: &Value, ttl: Option<CacheTtl>) -> Result<(), CacheError>;

    fn default_ttl(&self) -> CacheTtl;

    /// Cheap reachability probe used by the health route.
    async fn ping(&self) -> Result<(), CacheError>;
}
