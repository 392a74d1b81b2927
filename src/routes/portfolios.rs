use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{
    CustomAnalysisRequest, Portfolio, PortfolioAnalysis, RiskTolerance, RiskToleranceQuery,
    SectorBreakdownResponse,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze-portfolio", post(analyze_portfolio))
        .route("/analyze-portfolio-advanced", post(analyze_portfolio_advanced))
        .route("/analyze-portfolio-custom", post(analyze_portfolio_custom))
        .route("/portfolio-sector-breakdown", post(sector_breakdown))
}

fn log_failure(route: &str) -> impl Fn(AppError) -> AppError + '_ {
    move |e| {
        error!("{} failed: {}", route, e);
        e
    }
}

#[axum::debug_handler]
pub async fn analyze_portfolio(
    State(state): State<AppState>,
    Json(portfolio): Json<Portfolio>,
) -> Result<Json<PortfolioAnalysis>, AppError> {
    info!("POST /analyze-portfolio - Analyzing {} item(s)", portfolio.items.len());

    let params = state.analyzer.default_params(RiskTolerance::Moderate);
    let analysis = state
        .analyzer
        .analyze_portfolio(&portfolio, params)
        .await
        .map_err(log_failure("POST /analyze-portfolio"))?;
    Ok(Json(analysis))
}

pub async fn analyze_portfolio_advanced(
    State(state): State<AppState>,
    Query(query): Query<RiskToleranceQuery>,
    Json(portfolio): Json<Portfolio>,
) -> Result<Json<PortfolioAnalysis>, AppError> {
    let risk_tolerance = match query.risk_tolerance.as_deref() {
        Some(raw) => raw.parse()?,
        None => RiskTolerance::default(),
    };
    info!(
        "POST /analyze-portfolio-advanced - Analyzing {} item(s) with {} risk tolerance",
        portfolio.items.len(),
        risk_tolerance
    );

    let params = state.analyzer.default_params(risk_tolerance);
    let analysis = state
        .analyzer
        .analyze_portfolio(&portfolio, params)
        .await
        .map_err(log_failure("POST /analyze-portfolio-advanced"))?;
    Ok(Json(analysis))
}

pub async fn analyze_portfolio_custom(
    State(state): State<AppState>,
    Json(request): Json<CustomAnalysisRequest>,
) -> Result<Json<PortfolioAnalysis>, AppError> {
    info!(
        "POST /analyze-portfolio-custom - Analyzing {} item(s) with custom parameters",
        request.portfolio.items.len()
    );

    let params = state.analyzer.custom_params(&request)?;
    let analysis = state
        .analyzer
        .analyze_portfolio(&request.portfolio, params)
        .await
        .map_err(log_failure("POST /analyze-portfolio-custom"))?;
    Ok(Json(analysis))
}

pub async fn sector_breakdown(
    State(state): State<AppState>,
    Json(portfolio): Json<Portfolio>,
) -> Result<Json<SectorBreakdownResponse>, AppError> {
    info!("POST /portfolio-sector-breakdown - {} item(s)", portfolio.items.len());

    let breakdown = state
        .analyzer
        .sector_breakdown(&portfolio)
        .await
        .map_err(log_failure("POST /portfolio-sector-breakdown"))?;
    Ok(Json(breakdown))
}
