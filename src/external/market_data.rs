use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub currency: Option<String>,
    pub previous_close: Option<f64>,
}

/// Descriptive fundamentals. Every field except the symbol may be missing upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError>;

    /// Daily closing prices, oldest first.
    async fn fetch_daily_closes(&self, symbol: &str, days: u32) -> Result<Vec<f64>, MarketDataError>;
}
