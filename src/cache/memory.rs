use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::{CacheStore, CacheTtl};
use crate::errors::CacheError;

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-process cache store. Used for local development and tests.
#[derive(Clone)]
pub struct MemoryCacheStore {
    entries: Arc<DashMap<String, StoredEntry>>,
    default_ttl: CacheTtl,
}

impl MemoryCacheStore {
    pub fn new(default_ttl: CacheTtl) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
            drop(entry); // Release the read lock before removing
            self.entries.remove(key);
            debug!("Evicted expired cache entry {}", key);
        }
        None
    }

    fn set_at(&self, key: &str, value: &Value, ttl: CacheTtl, now: DateTime<Utc>) {
        if ttl.is_disabled() {
            return;
        }
        let ttl = Duration::from_std(ttl.as_duration()).unwrap_or_else(|_| Duration::days(36_500));
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.clone(),
                expires_at,
            },
        );
    }

    pub fn purge_expired(&self) {
        let now = Utc::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.get_at(key, Utc::now()))
    }

    async fn set(&self, key: &str, value: &Value, ttl: Option<CacheTtl>) -> Result<(), CacheError> {
        self.set_at(key, value, ttl.unwrap_or(self.default_ttl), Utc::now());
        Ok(())
    }

    fn default_ttl(&self) -> CacheTtl {
        self.default_ttl
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
