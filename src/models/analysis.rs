use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::external::market_data::Fundamentals;
use crate::models::advice::{AdviceOutcome, PortfolioAdvice, SymbolAdvice};
use crate::models::macro_data::MacroIndicators;
use crate::models::portfolio::{Portfolio, PortfolioItem};
use crate::models::risk::{RiskLevel, RiskTolerance};

pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Per-holding metrics.
///
/// `roi_percent` is `None` when nothing was invested (purchase price or
/// quantity of zero).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemAnalysis {
    pub symbol: String,
    pub quantity: f64,
    pub purchase_price: f64,
    pub current_price: f64,
    pub invested_amount: f64,
    pub current_value: f64,
    pub roi_percent: Option<f64>,
    pub sector: String,
    pub weight_percent: Option<f64>,
    /// Annualized volatility of daily returns, in percent
    pub volatility: Option<f64>,
}

/// Sector name to percent of total current value.
pub type SectorBreakdown = BTreeMap<String, f64>;

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioAnalysis {
    pub total_invested: f64,
    pub total_current_value: f64,
    pub roi_percent: Option<f64>,
    pub volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub risk_level: RiskLevel,
    pub risk_tolerance: RiskTolerance,
    pub risk_free_rate: f64,
    pub items: Vec<ItemAnalysis>,
    pub sector_breakdown: SectorBreakdown,
    pub macro_data: MacroIndicators,
    pub local_recommendation: String,
    pub ai_advice: AdviceOutcome<PortfolioAdvice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectorBreakdownResponse {
    pub sector_breakdown: SectorBreakdown,
}

/// Everything that changes the outcome of a portfolio analysis besides the holdings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisParams {
    pub risk_tolerance: RiskTolerance,
    pub risk_free_rate: f64,
    pub macro_data: MacroIndicators,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskToleranceQuery {
    pub risk_tolerance: Option<String>,
}

/// Body of the custom analysis route.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomAnalysisRequest {
    pub portfolio: Portfolio,
    pub risk_free_rate: Option<f64>,
    pub macro_inflation: Option<f64>,
    pub macro_interest_rate: Option<f64>,
    pub risk_tolerance: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolAnalysisRequest {
    pub symbol: String,
    pub purchase_price: f64,
    pub quantity: f64,
    pub risk_tolerance: Option<String>,
}

impl SymbolAnalysisRequest {
    pub fn as_item(&self) -> PortfolioItem {
        PortfolioItem {
            symbol: self.symbol.clone(),
            quantity: self.quantity,
            purchase_price: self.purchase_price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub quantity: f64,
    pub invested_amount: f64,
    pub current_price: f64,
    pub current_value: f64,
    pub roi_percent: Option<f64>,
    pub local_recommendation: String,
    pub ai_recommendation: AdviceOutcome<SymbolAdvice>,
    pub fundamentals: Fundamentals,
}
