use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::CacheKey;
use crate::errors::{AppError, LlmError};
use crate::external::llm::{CompletionRequest, LlmConfig, LlmProvider, OpenAiProvider};
use crate::external::market_data::Fundamentals;
use crate::models::{
    AdviceOutcome, AdviceShape, AnalysisParams, ItemAnalysis, MacroIndicators, MacroNarrative,
    PortfolioAdvice, RiskTolerance, SymbolAdvice, Transaction, TransactionAdvice,
};
use crate::services::advice_parser::parse_advice;
use crate::services::advice_prompts;
use crate::services::cached_fetch::CachedFetcher;

/// Advice generation backed by a language model, with response caching.
///
/// Transport failures are surfaced; replies that do not match the expected
/// shape become tagged fallbacks and are not cached.
pub struct AdviceService {
    provider: Option<Arc<dyn LlmProvider>>,
    fetcher: CachedFetcher,
}

impl AdviceService {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, fetcher: CachedFetcher) -> Self {
        Self { provider, fetcher }
    }

    /// Builds the OpenAI provider when an API key is configured.
    pub fn from_config(config: &LlmConfig, fetcher: CachedFetcher) -> Self {
        Self::new(provider_from_config(config), fetcher)
    }

    #[cfg(test)]
    fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    async fn generate<T: AdviceShape>(
        &self,
        key: CacheKey,
        request: CompletionRequest,
    ) -> Result<AdviceOutcome<T>, AppError> {
        let provider = self.provider.as_ref().ok_or(LlmError::Disabled)?;

        let key = key
            .part("model", provider.model())
            .text("prompt", &format!("{}\n{}", request.system, request.prompt));

        let outcome = self
            .fetcher
            .fetch_if(
                &key,
                || async move {
                    let reply = provider.generate_completion(request).await?;
                    Ok::<_, LlmError>(parse_advice::<T>(&reply))
                },
                |outcome: &AdviceOutcome<T>| !outcome.is_fallback(),
            )
            .await
            .into_result()?;

        if let AdviceOutcome::Fallback { reason, .. } = &outcome {
            warn!("Advice reply for {} did not parse, using fallback: {}", key, reason);
        }

        Ok(outcome)
    }

    pub async fn analyze_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<AdviceOutcome<TransactionAdvice>, AppError> {
        let key = CacheKey::new("advice:transaction")
            .text("description", &transaction.description)
            .float("amount", transaction.amount)
            .part("date", transaction.date.format("%Y-%m-%dT%H:%M:%S"));

        self.generate(key, advice_prompts::transaction_prompt(transaction)).await
    }

    pub async fn portfolio_advice(
        &self,
        items: &[ItemAnalysis],
        roi_percent: Option<f64>,
        volatility: Option<f64>,
        params: &AnalysisParams,
    ) -> Result<AdviceOutcome<PortfolioAdvice>, AppError> {
        let mut key = CacheKey::new("advice:portfolio")
            .part("risk", params.risk_tolerance)
            .float("rf", params.risk_free_rate)
            .float("interest", params.macro_data.interest_rate)
            .float("inflation", params.macro_data.inflation)
            .float("gdp", params.macro_data.gdp_growth);
        for item in items {
            key = key
                .symbol(&item.symbol)
                .float("qty", item.quantity)
                .float("cost", item.purchase_price);
        }

        let request = advice_prompts::portfolio_prompt(items, roi_percent, volatility, params);
        self.generate(key, request).await
    }

    pub async fn symbol_advice(
        &self,
        symbol: &str,
        roi_percent: Option<f64>,
        fundamentals: &Fundamentals,
        tolerance: RiskTolerance,
    ) -> Result<AdviceOutcome<SymbolAdvice>, AppError> {
        let key = CacheKey::new("advice:symbol").symbol(symbol).part("risk", tolerance);
        let request = advice_prompts::symbol_prompt(symbol, roi_percent, fundamentals, tolerance);
        self.generate(key, request).await
    }

    pub async fn macro_outlook(
        &self,
        macro_data: &MacroIndicators,
    ) -> Result<AdviceOutcome<MacroNarrative>, AppError> {
        let key = CacheKey::new("advice:macro")
            .float("interest", macro_data.interest_rate)
            .float("inflation", macro_data.inflation)
            .float("gdp", macro_data.gdp_growth);

        self.generate(key, advice_prompts::macro_prompt(macro_data)).await
    }
}

/// The configured completion provider, or `None` when no API key is set.
pub fn provider_from_config(config: &LlmConfig) -> Option<Arc<dyn LlmProvider>> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => match OpenAiProvider::new(key.to_string(), config) {
            Ok(provider) => {
                info!("Initializing advice generation with model: {}", config.model);
                Some(Arc::new(provider))
            }
            Err(e) => {
                warn!("Failed to build LLM client: {}. Advice generation disabled.", e);
                None
            }
        },
        Some(_) => {
            warn!("LLM API key is empty. Advice generation disabled.");
            None
        }
        None => {
            warn!("LLM API key not configured. Advice generation disabled.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheTtl, MemoryCacheStore, UnavailableCacheStore};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedLlm {
        replies: Mutex<Vec<Result<String, LlmError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn generate_completion(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(LlmError::NetworkError("no scripted reply".to_string()));
            }
            replies.remove(0)
        }

        fn model(&self) -> &str {
            "test-model"
        }
    }

    fn fetcher() -> CachedFetcher {
        let ttl = CacheTtl::from_minutes(15);
        CachedFetcher::new(Arc::new(MemoryCacheStore::new(ttl)), ttl, Duration::from_millis(200))
    }

    fn transaction() -> Transaction {
        Transaction {
            description: "Grocery store".to_string(),
            amount: 82.15,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    const GOOD_REPLY: &str =
        r#"{"category": "Groceries", "budget_recommendation": "Plan meals", "savings_potential": "$15"}"#;

    #[tokio::test]
    async fn test_parsed_advice_is_cached() {
        let llm = ScriptedLlm::new(vec![Ok(GOOD_REPLY.to_string())]);
        let service = AdviceService::new(Some(llm.clone()), fetcher());

        let first = service.analyze_transaction(&transaction()).await.unwrap();
        let second = service.analyze_transaction(&transaction()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.advice().category, "Groceries");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_reply_returns_fallback_and_is_not_cached() {
        let llm = ScriptedLlm::new(vec![
            Ok("Sorry, I can't help with that.".to_string()),
            Ok(GOOD_REPLY.to_string()),
        ]);
        let service = AdviceService::new(Some(llm.clone()), fetcher());

        let first = service.analyze_transaction(&transaction()).await.unwrap();
        assert!(first.is_fallback());
        assert_eq!(first.advice().category, "Uncategorized");
        assert_eq!(first.advice().savings_potential, "None");

        let second = service.analyze_transaction(&transaction()).await.unwrap();
        assert!(!second.is_fallback());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_surfaced() {
        let llm = ScriptedLlm::new(vec![Err(LlmError::Timeout)]);
        let service = AdviceService::new(Some(llm), fetcher());

        let result = service.analyze_transaction(&transaction()).await;
        assert!(matches!(result, Err(AppError::ExternalTransport(_))));
    }

    #[tokio::test]
    async fn test_disabled_service_reports_disabled() {
        let service = AdviceService::new(None, fetcher());
        assert!(!service.is_enabled());

        let result = service.macro_outlook(&MacroIndicators::default()).await;
        assert!(matches!(result, Err(AppError::AdviceDisabled)));
    }

    #[test]
    fn test_from_config_without_key_is_disabled() {
        let service = AdviceService::from_config(&LlmConfig::default(), fetcher());
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn test_cache_outage_does_not_fail_advice() {
        let ttl = CacheTtl::from_minutes(15);
        let fetcher = CachedFetcher::new(
            Arc::new(UnavailableCacheStore::new("down", ttl)),
            ttl,
            Duration::from_millis(200),
        );
        let llm = ScriptedLlm::new(vec![Ok(r#"{"outlook": "Rates are restrictive."}"#.to_string())]);
        let service = AdviceService::new(Some(llm), fetcher);

        let outcome = service.macro_outlook(&MacroIndicators::default()).await.unwrap();
        assert_eq!(outcome.advice().outlook, "Rates are restrictive.");
    }

    #[tokio::test]
    async fn test_different_risk_tolerance_is_a_different_key() {
        let reply = r#"{"outlook": "Positive", "recommendation": "Hold", "key_risks": []}"#;
        let llm = ScriptedLlm::new(vec![Ok(reply.to_string()), Ok(reply.to_string())]);
        let service = AdviceService::new(Some(llm.clone()), fetcher());
        let fundamentals = Fundamentals {
            symbol: "AAPL".to_string(),
            ..Fundamentals::default()
        };

        service
            .symbol_advice("AAPL", Some(10.0), &fundamentals, RiskTolerance::Moderate)
            .await
            .unwrap();
        service
            .symbol_advice("AAPL", Some(10.0), &fundamentals, RiskTolerance::Aggressive)
            .await
            .unwrap();
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }
}
