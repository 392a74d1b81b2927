use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::CacheKey;
use crate::errors::MarketDataError;
use crate::external::market_data::{Fundamentals, MarketDataProvider, Quote};
use crate::services::cached_fetch::CachedFetcher;

/// Market data provider that answers from the shared cache before calling upstream.
///
/// Provider errors, including unknown symbols, are never cached.
pub struct CachedMarketData {
    inner: Arc<dyn MarketDataProvider>,
    fetcher: CachedFetcher,
}

impl CachedMarketData {
    pub fn new(inner: Arc<dyn MarketDataProvider>, fetcher: CachedFetcher) -> Self {
        Self { inner, fetcher }
    }
}

#[async_trait]
impl MarketDataProvider for CachedMarketData {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let key = CacheKey::new("market:quote").symbol(symbol);
        self.fetcher
            .fetch(&key, || self.inner.fetch_quote(symbol))
            .await
            .into_result()
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError> {
        let key = CacheKey::new("market:fundamentals").symbol(symbol);
        self.fetcher
            .fetch(&key, || self.inner.fetch_fundamentals(symbol))
            .await
            .into_result()
    }

    async fn fetch_daily_closes(&self, symbol: &str, days: u32) -> Result<Vec<f64>, MarketDataError> {
        let key = CacheKey::new("market:history").symbol(symbol).part("days", days);
        self.fetcher
            .fetch(&key, || self.inner.fetch_daily_closes(symbol, days))
            .await
            .into_result()
    }
}
