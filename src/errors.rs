use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Request-level failures surfaced to HTTP callers.
///
/// Cache failures and malformed advice replies never appear here: both are
/// absorbed below this layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rate limited by external provider")]
    RateLimited,
    #[error("External service failure: {0}")]
    ExternalTransport(String),
    #[error("Advice generation is disabled")]
    AdviceDisabled,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::RateLimited | AppError::ExternalTransport(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let retryable = self.is_retryable();
        let body = |detail: String| Json(json!({ "detail": detail, "retryable": retryable }));

        match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, body(msg)).into_response(),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, body(msg)).into_response(),
            AppError::RateLimited => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from_static("60"));
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    headers,
                    body("Rate limited by external provider".to_string()),
                )
                    .into_response()
            }
            AppError::ExternalTransport(msg) => (StatusCode::BAD_GATEWAY, body(msg)).into_response(),
            AppError::AdviceDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                body("Advice generation is not configured".to_string()),
            )
                .into_response(),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                body("Internal server error".to_string()),
            )
                .into_response(),
        }
    }
}

/// Failures talking to the cache store. Always recovered by bypassing the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation timed out")]
    Timeout,

    #[error("cache serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited")]
    RateLimited,

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<MarketDataError> for AppError {
    fn from(err: MarketDataError) -> Self {
        match err {
            MarketDataError::NotFound(symbol) => {
                AppError::NotFound(format!("Symbol {} was not found by the market data provider", symbol))
            }
            MarketDataError::RateLimited => AppError::RateLimited,
            other => AppError::ExternalTransport(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM features are disabled")]
    Disabled,

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM provider rate limited")]
    RateLimited,

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Disabled => AppError::AdviceDisabled,
            LlmError::RateLimited => AppError::RateLimited,
            other => AppError::ExternalTransport(other.to_string()),
        }
    }
}
