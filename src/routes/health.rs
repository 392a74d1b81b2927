use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::CacheError;
use crate::state::AppState;

const CACHE_PING_TIMEOUT: Duration = Duration::from_secs(2);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/cache", get(cache_health))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to FinGenius API" }))
}

async fn health() -> &'static str {
    info!("GET /health - Health check");
    "OK"
}

/// Reports cache reachability. The service keeps answering either way.
async fn cache_health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    info!("GET /health/cache - Cache health check");
    let ping = tokio::time::timeout(CACHE_PING_TIMEOUT, state.cache.ping())
        .await
        .unwrap_or(Err(CacheError::Timeout));

    match ping {
        Ok(()) => (StatusCode::OK, Json(json!({ "cache": "ok" }))),
        Err(e) => {
            warn!("Cache health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "cache": "unavailable", "detail": e.to_string() })),
            )
        }
    }
}
