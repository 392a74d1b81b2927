use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{MacroOutlook, SymbolAnalysis, SymbolAnalysisRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze-symbol", post(analyze_symbol))
        .route("/macro-outlook", get(macro_outlook))
}

pub async fn analyze_symbol(
    State(state): State<AppState>,
    Json(request): Json<SymbolAnalysisRequest>,
) -> Result<Json<SymbolAnalysis>, AppError> {
    info!("POST /analyze-symbol - Analyzing {}", request.symbol.trim());

    let analysis = state.analyzer.analyze_symbol(&request).await.map_err(|e| {
        error!("Failed to analyze symbol {}: {}", request.symbol.trim(), e);
        e
    })?;
    Ok(Json(analysis))
}

pub async fn macro_outlook(State(state): State<AppState>) -> Result<Json<MacroOutlook>, AppError> {
    info!("GET /macro-outlook - Generating macro outlook");

    let outlook = state.macro_data.outlook().await.map_err(|e| {
        error!("Failed to generate macro outlook: {}", e);
        e
    })?;
    Ok(Json(outlook))
}
