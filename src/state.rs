use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::AppConfig;
use crate::external::llm::LlmProvider;
use crate::external::market_data::MarketDataProvider;
use crate::services::advice_service::AdviceService;
use crate::services::cached_fetch::CachedFetcher;
use crate::services::macro_data::MacroDataService;
use crate::services::market_data_service::CachedMarketData;
use crate::services::portfolio_analyzer::PortfolioAnalyzer;

/// Clients built once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn CacheStore>,
    pub advice: Arc<AdviceService>,
    pub analyzer: Arc<PortfolioAnalyzer>,
    pub macro_data: Arc<MacroDataService>,
}

impl AppState {
    /// Wires the providers behind one shared cache. `llm` is `None` when advice is disabled.
    pub fn new(
        config: &AppConfig,
        cache: Arc<dyn CacheStore>,
        market_data: Arc<dyn MarketDataProvider>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        let fetcher = CachedFetcher::new(cache.clone(), config.cache_ttl, config.cache_op_timeout);

        let market_data: Arc<dyn MarketDataProvider> = Arc::new(CachedMarketData::new(market_data, fetcher.clone()));
        let advice = Arc::new(AdviceService::new(llm, fetcher));
        let analyzer = Arc::new(PortfolioAnalyzer::new(
            market_data,
            advice.clone(),
            config.risk_free_rate,
            config.macro_defaults,
        ));
        let macro_data = Arc::new(MacroDataService::new(config.macro_defaults, advice.clone()));

        Self {
            cache,
            advice,
            analyzer,
            macro_data,
        }
    }
}
