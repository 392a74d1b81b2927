//! Cache-first wrapper around expensive or rate-limited external calls.
//!
//! Lookup order is cache, then supplier. Cache failures are logged and
//! bypassed; supplier failures are returned to the caller untouched. A value
//! is written back only once the supplier has fully succeeded, so a dropped
//! future (client disconnect, request deadline) never leaves a partial entry.
//! Concurrent misses for the same key are not coalesced; the last write wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheStore, CacheTtl};
use crate::errors::CacheError;

/// How a single orchestrated call was satisfied.
#[derive(Debug)]
pub enum ExternalCallOutcome<T, E> {
    /// Served from cache; the supplier was not invoked.
    Hit(T),
    /// Produced by the supplier.
    Fetched(T),
    /// The supplier failed.
    Failed(E),
}

impl<T, E> ExternalCallOutcome<T, E> {
    pub fn is_hit(&self) -> bool {
        matches!(self, ExternalCallOutcome::Hit(_))
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            ExternalCallOutcome::Hit(value) | ExternalCallOutcome::Fetched(value) => Ok(value),
            ExternalCallOutcome::Failed(err) => Err(err),
        }
    }
}

#[derive(Clone)]
pub struct CachedFetcher {
    store: Arc<dyn CacheStore>,
    ttl: CacheTtl,
    op_timeout: Duration,
}

impl CachedFetcher {
    pub fn new(store: Arc<dyn CacheStore>, ttl: CacheTtl, op_timeout: Duration) -> Self {
        Self {
            store,
            ttl,
            op_timeout,
        }
    }

    /// Returns the cached value for `key`, or runs `supplier` and caches its result.
    pub async fn fetch<T, E, F, Fut>(&self, key: &CacheKey, supplier: F) -> ExternalCallOutcome<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.fetch_if(key, supplier, |_| true).await
    }

    /// Like [`fetch`](Self::fetch), but only successes accepted by `cacheable`
    /// are written back.
    pub async fn fetch_if<T, E, F, Fut, P>(
        &self,
        key: &CacheKey,
        supplier: F,
        cacheable: P,
    ) -> ExternalCallOutcome<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnOnce(&T) -> bool,
    {
        let key = key.build();

        match self.read(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                Ok(hit) => {
                    debug!("Cache hit for {}", key);
                    return ExternalCallOutcome::Hit(hit);
                }
                Err(e) => warn!("Cached value for {} no longer deserializes, refetching: {}", key, e),
            },
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("Cache read failed for {}, bypassing cache: {}", key, e),
        }

        let value = match supplier().await {
            Ok(value) => value,
            Err(err) => return ExternalCallOutcome::Failed(err),
        };

        if cacheable(&value) {
            if let Err(e) = self.write(&key, &value).await {
                warn!("Cache write failed for {}, returning fresh value: {}", key, e);
            }
        } else {
            debug!("Skipping cache write for {}", key);
        }

        ExternalCallOutcome::Fetched(value)
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, CacheError> {
        tokio::time::timeout(self.op_timeout, self.store.get(key))
            .await
            .map_err(|_| CacheError::Timeout)?
    }

    async fn write<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize + DeserializeOwned,
    {
        if self.ttl.is_disabled() {
            return Ok(());
        }

        let json = serde_json::to_value(value)?;
        // Only write what can be read back
        serde_json::from_value::<T>(json.clone())?;

        tokio::time::timeout(self.op_timeout, self.store.set(key, &json, Some(self.ttl)))
            .await
            .map_err(|_| CacheError::Timeout)?
    }
}
