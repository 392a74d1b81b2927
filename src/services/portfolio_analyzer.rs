use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{info, warn};

use crate::errors::{AppError, MarketDataError};
use crate::external::market_data::{Fundamentals, MarketDataProvider};
use crate::models::{
    AnalysisParams, CustomAnalysisRequest, ItemAnalysis, MacroIndicators, MacroOverrides, Portfolio,
    PortfolioAnalysis, PortfolioItem, RiskLevel, RiskTolerance, SectorBreakdownResponse, SymbolAnalysis,
    SymbolAnalysisRequest, UNKNOWN_SECTOR,
};
use crate::services::advice_service::AdviceService;
use crate::services::portfolio_metrics;

/// Roughly three months of trading days.
const VOLATILITY_HISTORY_DAYS: u32 = 90;

#[derive(Debug, Clone)]
struct SymbolSnapshot {
    price: f64,
    sector: String,
    volatility: Option<f64>,
}

pub struct PortfolioAnalyzer {
    market_data: Arc<dyn MarketDataProvider>,
    advice: Arc<AdviceService>,
    risk_free_rate: f64,
    macro_defaults: MacroIndicators,
}

impl PortfolioAnalyzer {
    pub fn new(
        market_data: Arc<dyn MarketDataProvider>,
        advice: Arc<AdviceService>,
        risk_free_rate: f64,
        macro_defaults: MacroIndicators,
    ) -> Self {
        Self {
            market_data,
            advice,
            risk_free_rate,
            macro_defaults,
        }
    }

    pub fn default_params(&self, risk_tolerance: RiskTolerance) -> AnalysisParams {
        AnalysisParams {
            risk_tolerance,
            risk_free_rate: self.risk_free_rate,
            macro_data: self.macro_defaults,
        }
    }

    /// Parameters for the custom route: unset overrides keep the configured defaults.
    pub fn custom_params(&self, request: &CustomAnalysisRequest) -> Result<AnalysisParams, AppError> {
        let risk_tolerance = match &request.risk_tolerance {
            Some(raw) => raw.parse()?,
            None => RiskTolerance::default(),
        };

        for (name, value) in [
            ("risk_free_rate", request.risk_free_rate),
            ("macro_inflation", request.macro_inflation),
            ("macro_interest_rate", request.macro_interest_rate),
        ] {
            if matches!(value, Some(v) if !v.is_finite()) {
                return Err(AppError::InvalidInput(format!("{} must be a finite number", name)));
            }
        }

        Ok(AnalysisParams {
            risk_tolerance,
            risk_free_rate: request.risk_free_rate.unwrap_or(self.risk_free_rate),
            macro_data: self.macro_defaults.with_overrides(MacroOverrides {
                interest_rate: request.macro_interest_rate,
                inflation: request.macro_inflation,
            }),
        })
    }

    /// Full analysis: metrics, sector breakdown, volatility and AI advice.
    pub async fn analyze_portfolio(
        &self,
        portfolio: &Portfolio,
        params: AnalysisParams,
    ) -> Result<PortfolioAnalysis, AppError> {
        portfolio.validate()?;
        info!(
            "Analyzing portfolio of {} item(s) with {} risk tolerance",
            portfolio.items.len(),
            params.risk_tolerance
        );

        let snapshots = self.snapshots(portfolio, true).await?;
        let mut items = build_items(&portfolio.items, &snapshots);
        portfolio_metrics::assign_weights(&mut items);

        let totals = portfolio_metrics::portfolio_totals(&items);
        let volatility = portfolio_metrics::portfolio_volatility(&items);
        let sharpe_ratio = portfolio_metrics::sharpe_ratio(totals.roi_percent, params.risk_free_rate, volatility);
        let sector_breakdown = portfolio_metrics::sector_breakdown(&items);
        let local_recommendation =
            portfolio_metrics::local_recommendation(totals.roi_percent, volatility, params.risk_tolerance);

        let ai_advice = self
            .advice
            .portfolio_advice(&items, totals.roi_percent, volatility, &params)
            .await?;

        Ok(PortfolioAnalysis {
            total_invested: totals.total_invested,
            total_current_value: totals.total_current_value,
            roi_percent: totals.roi_percent,
            volatility,
            sharpe_ratio,
            risk_level: RiskLevel::from_volatility(volatility),
            risk_tolerance: params.risk_tolerance,
            risk_free_rate: params.risk_free_rate,
            items,
            sector_breakdown,
            macro_data: params.macro_data,
            local_recommendation,
            ai_advice,
        })
    }

    /// Sector allocation only; no history or advice calls.
    pub async fn sector_breakdown(&self, portfolio: &Portfolio) -> Result<SectorBreakdownResponse, AppError> {
        portfolio.validate()?;

        let snapshots = self.snapshots(portfolio, false).await?;
        let items = build_items(&portfolio.items, &snapshots);

        Ok(SectorBreakdownResponse {
            sector_breakdown: portfolio_metrics::sector_breakdown(&items),
        })
    }

    pub async fn analyze_symbol(&self, request: &SymbolAnalysisRequest) -> Result<SymbolAnalysis, AppError> {
        let item = request.as_item();
        item.validate()?;
        let risk_tolerance = match &request.risk_tolerance {
            Some(raw) => raw.parse()?,
            None => RiskTolerance::default(),
        };

        let symbol = item.normalized_symbol();
        info!("Analyzing symbol {} with {} risk tolerance", symbol, risk_tolerance);

        let (quote, fundamentals) = tokio::try_join!(
            async { self.market_data.fetch_quote(&symbol).await.map_err(AppError::from) },
            self.fundamentals_or_default(&symbol),
        )?;

        let invested_amount = item.invested_amount();
        let current_value = quote.price * item.quantity;
        let roi_percent = portfolio_metrics::roi_percent(invested_amount, current_value);
        let local_recommendation = portfolio_metrics::local_recommendation(roi_percent, None, risk_tolerance);

        let ai_recommendation = self
            .advice
            .symbol_advice(&symbol, roi_percent, &fundamentals, risk_tolerance)
            .await?;

        Ok(SymbolAnalysis {
            symbol,
            quantity: item.quantity,
            invested_amount,
            current_price: quote.price,
            current_value,
            roi_percent,
            local_recommendation,
            ai_recommendation,
            fundamentals,
        })
    }

    /// Unknown tickers have no fundamentals but may still have a price.
    async fn fundamentals_or_default(&self, symbol: &str) -> Result<Fundamentals, AppError> {
        match self.market_data.fetch_fundamentals(symbol).await {
            Ok(fundamentals) => Ok(fundamentals),
            Err(MarketDataError::NotFound(_)) => {
                warn!("No fundamentals for {}, sector will be {}", symbol, UNKNOWN_SECTOR);
                Ok(Fundamentals {
                    symbol: symbol.to_string(),
                    ..Fundamentals::default()
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn volatility(&self, symbol: &str) -> Result<Option<f64>, AppError> {
        match self.market_data.fetch_daily_closes(symbol, VOLATILITY_HISTORY_DAYS).await {
            Ok(closes) => Ok(portfolio_metrics::annualized_volatility(&closes)),
            Err(MarketDataError::NotFound(_)) => {
                warn!("No price history for {}, volatility unavailable", symbol);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn snapshot(&self, symbol: String, with_history: bool) -> Result<(String, SymbolSnapshot), AppError> {
        let (quote, fundamentals, volatility) = tokio::try_join!(
            async { self.market_data.fetch_quote(&symbol).await.map_err(AppError::from) },
            self.fundamentals_or_default(&symbol),
            async {
                if with_history {
                    self.volatility(&symbol).await
                } else {
                    Ok(None)
                }
            },
        )?;

        let sector = fundamentals
            .sector
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_SECTOR.to_string());

        Ok((
            symbol,
            SymbolSnapshot {
                price: quote.price,
                sector,
                volatility,
            },
        ))
    }

    /// One lookup per distinct symbol, all in flight at once.
    async fn snapshots(
        &self,
        portfolio: &Portfolio,
        with_history: bool,
    ) -> Result<HashMap<String, SymbolSnapshot>, AppError> {
        let lookups = portfolio
            .symbols()
            .into_iter()
            .map(|symbol| self.snapshot(symbol, with_history));

        Ok(try_join_all(lookups).await?.into_iter().collect())
    }
}

fn build_items(items: &[PortfolioItem], snapshots: &HashMap<String, SymbolSnapshot>) -> Vec<ItemAnalysis> {
    items
        .iter()
        .filter_map(|item| {
            let symbol = item.normalized_symbol();
            let snapshot = snapshots.get(&symbol)?;
            let invested_amount = item.invested_amount();
            let current_value = snapshot.price * item.quantity;

            Some(ItemAnalysis {
                symbol,
                quantity: item.quantity,
                purchase_price: item.purchase_price,
                current_price: snapshot.price,
                invested_amount,
                current_value,
                roi_percent: portfolio_metrics::roi_percent(invested_amount, current_value),
                sector: snapshot.sector.clone(),
                weight_percent: None,
                volatility: snapshot.volatility,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheTtl, MemoryCacheStore};
    use crate::external::llm::{CompletionRequest, LlmProvider};
    use crate::external::market_data::Quote;
    use crate::errors::LlmError;
    use crate::services::cached_fetch::CachedFetcher;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedMarket;

    #[async_trait]
    impl MarketDataProvider for FixedMarket {
        async fn fetch_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
            let price = match symbol {
                "AAPL" => 110.0,
                "TSLA" => 50.0,
                "NOSECTOR" => 10.0,
                "DOWN" => return Err(MarketDataError::Network("connection refused".to_string())),
                _ => return Err(MarketDataError::NotFound(symbol.to_string())),
            };
            Ok(Quote {
                symbol: symbol.to_string(),
                price,
                currency: Some("USD".to_string()),
                previous_close: None,
            })
        }

        async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketDataError> {
            let sector = match symbol {
                "AAPL" => "Technology",
                "TSLA" => "Automotive",
                _ => return Err(MarketDataError::NotFound(symbol.to_string())),
            };
            Ok(Fundamentals {
                symbol: symbol.to_string(),
                sector: Some(sector.to_string()),
                ..Fundamentals::default()
            })
        }

        async fn fetch_daily_closes(&self, _symbol: &str, _days: u32) -> Result<Vec<f64>, MarketDataError> {
            Ok(vec![100.0, 101.0, 99.5, 102.0, 101.5])
        }
    }

    struct EchoLlm;

    #[async_trait]
    impl LlmProvider for EchoLlm {
        async fn generate_completion(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            Ok(r#"{"summary": "Concentrated in tech.", "recommendations": ["Diversify"], "risk_assessment": "Moderate",
                   "outlook": "Positive", "recommendation": "Hold", "key_risks": ["Valuation"]}"#
                .to_string())
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    fn analyzer() -> PortfolioAnalyzer {
        let ttl = CacheTtl::from_minutes(15);
        let fetcher = CachedFetcher::new(Arc::new(MemoryCacheStore::new(ttl)), ttl, Duration::from_millis(200));
        let advice = Arc::new(AdviceService::new(Some(Arc::new(EchoLlm)), fetcher));
        PortfolioAnalyzer::new(Arc::new(FixedMarket), advice, 2.0, MacroIndicators::default())
    }

    fn item(symbol: &str, quantity: f64, purchase_price: f64) -> PortfolioItem {
        PortfolioItem {
            symbol: symbol.to_string(),
            quantity,
            purchase_price,
        }
    }

    #[tokio::test]
    async fn test_single_item_roi() {
        let analyzer = analyzer();
        let portfolio = Portfolio {
            items: vec![item("aapl", 10.0, 100.0)],
        };

        let analysis = analyzer
            .analyze_portfolio(&portfolio, analyzer.default_params(RiskTolerance::Moderate))
            .await
            .unwrap();

        assert_eq!(analysis.total_invested, 1000.0);
        assert_eq!(analysis.total_current_value, 1100.0);
        assert!((analysis.roi_percent.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(analysis.items[0].symbol, "AAPL");
        assert!(analysis.volatility.is_some());
        assert!(!analysis.ai_advice.is_fallback());
    }

    #[tokio::test]
    async fn test_sector_breakdown_buckets_unknown() {
        let analyzer = analyzer();
        let portfolio = Portfolio {
            items: vec![item("AAPL", 5.0, 100.0), item("NOSECTOR", 5.0, 10.0)],
        };

        let response = analyzer.sector_breakdown(&portfolio).await.unwrap();
        let breakdown = response.sector_breakdown;
        // 550 vs 50
        assert_eq!(breakdown.get("Technology"), Some(&91.67));
        assert_eq!(breakdown.get("Unknown"), Some(&8.33));
    }

    #[tokio::test]
    async fn test_zero_invested_item_has_null_roi() {
        let analyzer = analyzer();
        let portfolio = Portfolio {
            items: vec![item("TSLA", 4.0, 0.0)],
        };

        let analysis = analyzer
            .analyze_portfolio(&portfolio, analyzer.default_params(RiskTolerance::Aggressive))
            .await
            .unwrap();
        assert_eq!(analysis.items[0].roi_percent, None);
        assert_eq!(analysis.roi_percent, None);
        assert_eq!(analysis.sharpe_ratio, None);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_not_found() {
        let analyzer = analyzer();
        let portfolio = Portfolio {
            items: vec![item("AAPL", 1.0, 1.0), item("ZZZZ", 1.0, 1.0)],
        };

        let result = analyzer.sector_breakdown(&portfolio).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_transport_failure_is_distinct_from_not_found() {
        let analyzer = analyzer();
        let portfolio = Portfolio {
            items: vec![item("DOWN", 1.0, 1.0)],
        };

        let result = analyzer.sector_breakdown(&portfolio).await;
        assert!(matches!(result, Err(AppError::ExternalTransport(_))));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let analyzer = analyzer();
        let portfolio = Portfolio {
            items: vec![item("AAPL", -1.0, 100.0)],
        };
        let result = analyzer
            .analyze_portfolio(&portfolio, analyzer.default_params(RiskTolerance::Moderate))
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_custom_params_apply_overrides() {
        let analyzer = analyzer();
        let request = CustomAnalysisRequest {
            portfolio: Portfolio { items: vec![] },
            risk_free_rate: Some(4.5),
            macro_inflation: Some(2.4),
            macro_interest_rate: None,
            risk_tolerance: Some("conservative".to_string()),
        };

        let params = analyzer.custom_params(&request).unwrap();
        assert_eq!(params.risk_tolerance, RiskTolerance::Conservative);
        assert_eq!(params.risk_free_rate, 4.5);
        assert_eq!(params.macro_data.inflation, 2.4);
        assert_eq!(params.macro_data.interest_rate, 5.0);
        assert_eq!(params.macro_data.gdp_growth, 2.1);
    }

    #[tokio::test]
    async fn test_symbol_analysis_with_missing_fundamentals() {
        let analyzer = analyzer();
        let request = SymbolAnalysisRequest {
            symbol: "nosector".to_string(),
            purchase_price: 5.0,
            quantity: 2.0,
            risk_tolerance: None,
        };

        let analysis = analyzer.analyze_symbol(&request).await.unwrap();
        assert_eq!(analysis.symbol, "NOSECTOR");
        assert_eq!(analysis.current_value, 20.0);
        assert_eq!(analysis.roi_percent, Some(100.0));
        assert_eq!(analysis.fundamentals.sector, None);
        assert_eq!(analysis.ai_recommendation.advice().recommendation, "Hold");
    }
}
