use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::errors::MarketDataError;
use crate::external::market_data::{Fundamentals, MarketDataProvider, Quote};

/// Yahoo Finance provider. No API key required.
pub struct YahooFinanceProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl YahooFinanceProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; FinGenius/1.0)")
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| MarketDataError::Network(format!("invalid base URL {}: {}", base_url, e)))?;

        Ok(Self { client, base_url })
    }

    /// Appends `segments` and then `symbol` as percent-encoded path segments.
    fn endpoint(&self, segments: &[&str], symbol: &str) -> Result<Url, MarketDataError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MarketDataError::Network(format!("base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments)
            .push(symbol);
        Ok(url)
    }

    async fn fetch_chart(&self, symbol: &str, range: &str) -> Result<YahooChartResult, MarketDataError> {
        let url = self.endpoint(&["v8", "finance", "chart"], symbol)?;
        debug!("Fetching Yahoo chart for {} (range {})", symbol, range);

        let resp = self
            .client
            .get(url)
            .query(&[("interval", "1d"), ("range", range)])
            .send()
            .await
            .map_err(map_transport_error)?;

        check_status(resp.status(), symbol)?;

        let body: YahooChartResponse = resp
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        if let Some(error) = body.chart.error {
            return Err(classify_api_error(error, symbol));
        }

        body.chart
            .result
            .and_then(|mut results| if results.is_empty() { None } else { Some(results.remove(0)) })
            .ok_or_else(|| MarketDataError::NotFound(symbol.to_string()))
    }
}

fn map_transport_error(err: reqwest::Error) -> MarketDataError {
    if err.is_timeout() {
        MarketDataError::Network("request timed out".to_string())
    } else {
        MarketDataError::Network(err.to_string())
    }
}

fn check_status(status: StatusCode, symbol: &str) -> Result<(), MarketDataError> {
    if status == StatusCode::NOT_FOUND {
        return Err(MarketDataError::NotFound(symbol.to_string()));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MarketDataError::RateLimited);
    }
    if !status.is_success() {
        return Err(MarketDataError::BadResponse(format!("HTTP {}", status)));
    }
    Ok(())
}

fn classify_api_error(error: YahooError, symbol: &str) -> MarketDataError {
    let code = error.code.unwrap_or_default();
    let description = error.description.unwrap_or_default();
    if code.eq_ignore_ascii_case("Not Found")
        || description.contains("No data found")
        || description.contains("not found")
    {
        MarketDataError::NotFound(symbol.to_string())
    } else {
        MarketDataError::BadResponse(format!("{} {}", code, description).trim().to_string())
    }
}

/// Maps a day count onto the coarse ranges Yahoo accepts.
fn range_for_days(days: u32) -> &'static str {
    match days {
        0..=5 => "5d",
        6..=30 => "1mo",
        31..=90 => "3mo",
        91..=180 => "6mo",
        181..=365 => "1y",
        366..=730 => "2y",
        _ => "5y",
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooChartResult {
    meta: YahooChartMeta,
    #[serde(default)]
    indicators: Option<YahooIndicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooChartMeta {
    currency: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    #[serde(default)]
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    asset_profile: Option<AssetProfile>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
    price: Option<PriceModule>,
}

#[derive(Debug, Deserialize)]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    dividend_yield: Option<RawValue>,
    market_cap: Option<RawValue>,
    beta: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    price_to_book: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`, or `{}` when absent.
#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw).filter(|v| v.is_finite())
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let result = self.fetch_chart(symbol, "5d").await?;
        let meta = result.meta;

        let price = meta
            .regular_market_price
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| MarketDataError::BadResponse(format!("missing market price for {}", symbol)))?;

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            currency: meta.currency,
            previous_close: meta.previous_close.or(meta.chart_previous_close),
        })
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError> {
        let url = self.endpoint(&["v10", "finance", "quoteSummary"], symbol)?;

        let resp = self
            .client
            .get(url)
            .query(&[("modules", "assetProfile,summaryDetail,defaultKeyStatistics,price")])
            .send()
            .await
            .map_err(map_transport_error)?;

        check_status(resp.status(), symbol)?;

        let body: QuoteSummaryResponse = resp
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        if let Some(error) = body.quote_summary.error {
            return Err(classify_api_error(error, symbol));
        }

        let result = body
            .quote_summary
            .result
            .and_then(|mut results| if results.is_empty() { None } else { Some(results.remove(0)) })
            .ok_or_else(|| MarketDataError::NotFound(symbol.to_string()))?;

        let (sector, industry) = result
            .asset_profile
            .map(|p| (p.sector, p.industry))
            .unwrap_or((None, None));
        let name = result.price.and_then(|p| p.long_name.or(p.short_name));
        let price_to_book = result.default_key_statistics.and_then(|s| raw(s.price_to_book));

        let mut fundamentals = Fundamentals {
            symbol: symbol.to_string(),
            name,
            sector: sector.filter(|s| !s.trim().is_empty()),
            industry,
            price_to_book,
            ..Fundamentals::default()
        };

        if let Some(detail) = result.summary_detail {
            fundamentals.pe_ratio = raw(detail.trailing_pe);
            fundamentals.forward_pe = raw(detail.forward_pe);
            fundamentals.dividend_yield = raw(detail.dividend_yield);
            fundamentals.market_cap = raw(detail.market_cap);
            fundamentals.beta = raw(detail.beta);
        }

        Ok(fundamentals)
    }

    async fn fetch_daily_closes(&self, symbol: &str, days: u32) -> Result<Vec<f64>, MarketDataError> {
        let result = self.fetch_chart(symbol, range_for_days(days)).await?;

        // Skip null closes (market holidays, halts)
        let closes: Vec<f64> = result
            .indicators
            .and_then(|i| i.quote.into_iter().next())
            .map(|q| q.close.into_iter().flatten().filter(|c| c.is_finite()).collect())
            .unwrap_or_default();

        Ok(closes)
    }
}
