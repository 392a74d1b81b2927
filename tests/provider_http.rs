use std::time::Duration;

use serde_json::json;
use tracing::info;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fingenius_backend::errors::{LlmError, MarketDataError};
use fingenius_backend::external::llm::{CompletionRequest, LlmConfig, LlmProvider, OpenAiProvider};
use fingenius_backend::external::market_data::MarketDataProvider;
use fingenius_backend::external::yahoo::YahooFinanceProvider;

mod test_utils {
    use super::*;

    pub async fn mount_json(server: &MockServer, url_path: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(url_path))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    pub fn yahoo(server: &MockServer) -> YahooFinanceProvider {
        YahooFinanceProvider::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    pub fn openai(server: &MockServer) -> OpenAiProvider {
        let config = LlmConfig {
            base_url: format!("{}/v1", server.uri()),
            timeout: Duration::from_secs(5),
            ..LlmConfig::default()
        };
        OpenAiProvider::new("sk-test".to_string(), &config).unwrap()
    }

    pub fn request() -> CompletionRequest {
        CompletionRequest {
            system: "You are a financial expert AI.".to_string(),
            prompt: "Categorize: Coffee, 4.50".to_string(),
            max_tokens: Some(200),
        }
    }
}

use test_utils::*;

#[test_log::test(tokio::test)]
async fn test_yahoo_quote_from_chart_meta() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/v8/finance/chart/AAPL",
        200,
        json!({
            "chart": {
                "result": [{
                    "meta": {"currency": "USD", "symbol": "AAPL", "regularMarketPrice": 189.84, "chartPreviousClose": 187.0},
                    "indicators": {"quote": [{"close": [187.0, null, 189.84]}]}
                }],
                "error": null
            }
        }),
    )
    .await;

    let quote = yahoo(&server).fetch_quote("AAPL").await.unwrap();
    info!(?quote, "Received quote");
    assert_eq!(quote.price, 189.84);
    assert_eq!(quote.currency.as_deref(), Some("USD"));
    assert_eq!(quote.previous_close, Some(187.0));
}

#[test_log::test(tokio::test)]
async fn test_yahoo_symbol_is_a_single_encoded_path_segment() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/v8/finance/chart/BRK%2FB%3Fx",
        200,
        json!({
            "chart": {
                "result": [{"meta": {"regularMarketPrice": 412.5}, "indicators": {"quote": [{"close": [412.5]}]}}],
                "error": null
            }
        }),
    )
    .await;

    let quote = yahoo(&server).fetch_quote("BRK/B?x").await.unwrap();
    assert_eq!(quote.price, 412.5);
}

#[test]
fn test_yahoo_rejects_unparsable_base_url() {
    let result = YahooFinanceProvider::new("not a url", Duration::from_secs(5));
    assert!(matches!(result, Err(MarketDataError::Network(_))));
}

#[test_log::test(tokio::test)]
async fn test_yahoo_history_skips_null_closes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/MSFT"))
        .and(query_param("range", "3mo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {
                "result": [{
                    "meta": {"regularMarketPrice": 410.0},
                    "indicators": {"quote": [{"close": [400.0, null, 405.5, 410.0]}]}
                }],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let closes = yahoo(&server).fetch_daily_closes("MSFT", 90).await.unwrap();
    assert_eq!(closes, vec![400.0, 405.5, 410.0]);
}

#[test_log::test(tokio::test)]
async fn test_yahoo_unknown_symbol_is_not_found() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/v8/finance/chart/ZZZZ",
        404,
        json!({"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}),
    )
    .await;
    mount_json(
        &server,
        "/v10/finance/quoteSummary/ZZZZ",
        200,
        json!({"quoteSummary": {"result": null, "error": {"code": "Not Found", "description": "Quote not found for ticker symbol: ZZZZ"}}}),
    )
    .await;

    let provider = yahoo(&server);
    assert!(matches!(provider.fetch_quote("ZZZZ").await, Err(MarketDataError::NotFound(_))));
    assert!(matches!(provider.fetch_fundamentals("ZZZZ").await, Err(MarketDataError::NotFound(_))));
}

#[test_log::test(tokio::test)]
async fn test_yahoo_rate_limit_and_server_errors_are_distinct() {
    let server = MockServer::start().await;
    mount_json(&server, "/v8/finance/chart/AAPL", 429, json!({})).await;
    mount_json(&server, "/v8/finance/chart/MSFT", 500, json!({})).await;

    let provider = yahoo(&server);
    assert!(matches!(provider.fetch_quote("AAPL").await, Err(MarketDataError::RateLimited)));
    assert!(matches!(provider.fetch_quote("MSFT").await, Err(MarketDataError::BadResponse(_))));
}

#[test_log::test(tokio::test)]
async fn test_yahoo_fundamentals() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/v10/finance/quoteSummary/AAPL",
        200,
        json!({
            "quoteSummary": {
                "result": [{
                    "assetProfile": {"sector": "Technology", "industry": "Consumer Electronics"},
                    "summaryDetail": {
                        "trailingPE": {"raw": 29.5, "fmt": "29.50"},
                        "forwardPE": {},
                        "dividendYield": {"raw": 0.005, "fmt": "0.50%"},
                        "marketCap": {"raw": 2.9e12, "fmt": "2.9T"},
                        "beta": {"raw": 1.25, "fmt": "1.25"}
                    },
                    "defaultKeyStatistics": {"priceToBook": {"raw": 45.1, "fmt": "45.10"}},
                    "price": {"longName": "Apple Inc.", "shortName": "Apple"}
                }],
                "error": null
            }
        }),
    )
    .await;

    let fundamentals = yahoo(&server).fetch_fundamentals("AAPL").await.unwrap();
    assert_eq!(fundamentals.sector.as_deref(), Some("Technology"));
    assert_eq!(fundamentals.name.as_deref(), Some("Apple Inc."));
    assert_eq!(fundamentals.pe_ratio, Some(29.5));
    assert_eq!(fundamentals.forward_pe, None);
    assert_eq!(fundamentals.price_to_book, Some(45.1));
    assert_eq!(fundamentals.beta, Some(1.25));
}

#[test_log::test(tokio::test)]
async fn test_openai_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"category\": \"Dining\"}"}}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = openai(&server).generate_completion(request()).await.unwrap();
    assert_eq!(reply, "{\"category\": \"Dining\"}");
}

#[test_log::test(tokio::test)]
async fn test_openai_rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(1)
        .mount(&server)
        .await;

    let result = openai(&server).generate_completion(request()).await;
    assert!(matches!(result, Err(LlmError::RateLimited)));
}

#[test_log::test(tokio::test)]
async fn test_openai_server_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    match openai(&server).generate_completion(request()).await {
        Err(LlmError::ApiError(message)) => assert!(message.contains("upstream exploded")),
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn test_openai_empty_choices_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let result = openai(&server).generate_completion(request()).await;
    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}
