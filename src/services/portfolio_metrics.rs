//! Portfolio arithmetic. Pure functions, no I/O.
//!
//! All percentages are expressed in percent (10.0 means 10%).

use crate::models::{ItemAnalysis, RiskTolerance, SectorBreakdown, UNKNOWN_SECTOR};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// `(current - invested) / invested * 100`, undefined when nothing was invested.
pub fn roi_percent(invested: f64, current: f64) -> Option<f64> {
    if invested > 0.0 {
        Some((current - invested) / invested * 100.0)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioTotals {
    pub total_invested: f64,
    pub total_current_value: f64,
    pub roi_percent: Option<f64>,
}

/// Aggregates totals before dividing, so ROI is value-weighted.
pub fn portfolio_totals(items: &[ItemAnalysis]) -> PortfolioTotals {
    let total_invested: f64 = items.iter().map(|i| i.invested_amount).sum();
    let total_current_value: f64 = items.iter().map(|i| i.current_value).sum();

    PortfolioTotals {
        total_invested,
        total_current_value,
        roi_percent: roi_percent(total_invested, total_current_value),
    }
}

/// Percentage of total current value per sector. Blank sectors are bucketed
/// under "Unknown". Empty when the portfolio has no current value.
pub fn sector_breakdown(items: &[ItemAnalysis]) -> SectorBreakdown {
    let total: f64 = items.iter().map(|i| i.current_value).sum();
    let mut breakdown = SectorBreakdown::new();

    if total <= 0.0 || !total.is_finite() {
        return breakdown;
    }

    for item in items {
        let sector = if item.sector.trim().is_empty() {
            UNKNOWN_SECTOR.to_string()
        } else {
            item.sector.clone()
        };
        *breakdown.entry(sector).or_insert(0.0) += item.current_value;
    }

    for value in breakdown.values_mut() {
        *value = round2(*value / total * 100.0);
    }

    breakdown
}

/// Fills `weight_percent` on every item from its share of current value.
pub fn assign_weights(items: &mut [ItemAnalysis]) {
    let total: f64 = items.iter().map(|i| i.current_value).sum();
    for item in items.iter_mut() {
        item.weight_percent = if total > 0.0 {
            Some(item.current_value / total * 100.0)
        } else {
            None
        };
    }
}

/// Annualized volatility of simple daily returns, in percent.
///
/// Needs at least three closes (two returns) for a sample variance.
pub fn annualized_volatility(closes: &[f64]) -> Option<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();

    if returns.len() < 2 {
        return None;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() as f64 - 1.0);
    let volatility = variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;

    volatility.is_finite().then_some(volatility)
}

/// Value-weighted average of the per-item volatilities that are known.
///
/// Ignores correlation between holdings.
pub fn portfolio_volatility(items: &[ItemAnalysis]) -> Option<f64> {
    let (weighted, weight) = items
        .iter()
        .filter_map(|i| i.volatility.map(|v| (v * i.current_value, i.current_value)))
        .fold((0.0, 0.0), |(acc_v, acc_w), (v, w)| (acc_v + v, acc_w + w));

    if weight > 0.0 {
        Some(weighted / weight)
    } else {
        None
    }
}

/// `(roi - risk_free_rate) / volatility`, undefined without a positive volatility.
pub fn sharpe_ratio(roi_percent: Option<f64>, risk_free_rate: f64, volatility: Option<f64>) -> Option<f64> {
    match (roi_percent, volatility) {
        (Some(roi), Some(vol)) if vol > f64::EPSILON => Some((roi - risk_free_rate) / vol),
        _ => None,
    }
}

/// Rule-based guidance computed locally, independent of the language model.
pub fn local_recommendation(roi_percent: Option<f64>, volatility: Option<f64>, tolerance: RiskTolerance) -> String {
    let Some(roi) = roi_percent else {
        return "Not enough invested capital to compute a return. Add purchase prices to get guidance.".to_string();
    };

    let high_volatility = volatility.map(|v| v >= 20.0).unwrap_or(false);

    let base = if roi < 0.0 {
        "Your returns are negative. Consider rebalancing or diversifying."
    } else if roi < 5.0 {
        "Low positive ROI. Explore higher yield assets if risk tolerance allows."
    } else {
        "Looking good! Keep an eye on volatility."
    };

    let tolerance_note = match (tolerance, high_volatility) {
        (RiskTolerance::Conservative, true) => {
            " Volatility is high for a conservative profile; shifting toward bonds or dividend stocks may help."
        }
        (RiskTolerance::Conservative, false) => " Volatility is within a conservative range.",
        (RiskTolerance::Moderate, true) => " Volatility is elevated; review position sizes.",
        (RiskTolerance::Moderate, false) => "",
        (RiskTolerance::Aggressive, true) => " High volatility is consistent with an aggressive profile.",
        (RiskTolerance::Aggressive, false) => {
            " There is room for more growth exposure given an aggressive profile."
        }
    };

    format!("{}{}", base, tolerance_note)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(symbol: &str, invested: f64, current: f64, sector: &str) -> ItemAnalysis {
        ItemAnalysis {
            symbol: symbol.to_string(),
            quantity: 1.0,
            purchase_price: invested,
            current_price: current,
            invested_amount: invested,
            current_value: current,
            roi_percent: roi_percent(invested, current),
            sector: sector.to_string(),
            weight_percent: None,
            volatility: None,
        }
    }

    #[test]
    fn test_single_item_roi() {
        let invested = 100.0 * 10.0;
        let current = 110.0 * 10.0;
        assert_eq!(invested, 1000.0);
        assert_eq!(current, 1100.0);
        let roi = roi_percent(invested, current).unwrap();
        assert!((roi - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_invested_roi_is_undefined() {
        assert_eq!(roi_percent(0.0, 500.0), None);
    }

    #[test]
    fn test_portfolio_roi_is_weighted_not_averaged() {
        let items = vec![item("A", 1000.0, 1100.0, "Tech"), item("B", 100.0, 50.0, "Energy")];
        let totals = portfolio_totals(&items);
        assert_eq!(totals.total_invested, 1100.0);
        assert_eq!(totals.total_current_value, 1150.0);
        // Per-item average would be (10 - 50) / 2 = -20
        let roi = totals.roi_percent.unwrap();
        assert!((roi - 4.545454).abs() < 1e-4);
    }

    #[test]
    fn test_sector_breakdown_sums_to_100() {
        let items = vec![
            item("TSLA", 500.0, 250.0, "Automotive"),
            item("AAPL", 500.0, 750.0, "Technology"),
        ];
        let breakdown = sector_breakdown(&items);
        assert_eq!(breakdown.get("Technology"), Some(&75.0));
        assert_eq!(breakdown.get("Automotive"), Some(&25.0));
        assert_eq!(breakdown.values().sum::<f64>(), 100.0);
    }

    #[test]
    fn test_blank_sector_goes_to_unknown() {
        let items = vec![item("X", 1.0, 300.0, ""), item("Y", 1.0, 700.0, "Energy")];
        let breakdown = sector_breakdown(&items);
        assert_eq!(breakdown.get("Unknown"), Some(&30.0));
        assert!((breakdown.values().sum::<f64>() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_sector_breakdown_empty_when_no_value() {
        let items = vec![item("X", 1.0, 0.0, "Energy")];
        assert!(sector_breakdown(&items).is_empty());
    }

    #[test]
    fn test_assign_weights() {
        let mut items = vec![item("A", 1.0, 750.0, "T"), item("B", 1.0, 250.0, "A")];
        assign_weights(&mut items);
        assert_eq!(items[0].weight_percent, Some(75.0));
        assert_eq!(items[1].weight_percent, Some(25.0));
    }

    #[test]
    fn test_volatility_requires_enough_history() {
        assert_eq!(annualized_volatility(&[]), None);
        assert_eq!(annualized_volatility(&[100.0, 101.0]), None);
        assert_eq!(annualized_volatility(&[100.0, 100.0, 100.0]), Some(0.0));
    }

    #[test]
    fn test_volatility_is_positive_for_moving_prices() {
        let vol = annualized_volatility(&[100.0, 102.0, 99.0, 101.0, 103.0]).unwrap();
        assert!(vol > 0.0);
    }

    #[test]
    fn test_sharpe_ratio() {
        assert_eq!(sharpe_ratio(Some(12.0), 2.0, Some(20.0)), Some(0.5));
        assert_eq!(sharpe_ratio(Some(12.0), 2.0, Some(0.0)), None);
        assert_eq!(sharpe_ratio(None, 2.0, Some(20.0)), None);
    }

    #[test]
    fn test_portfolio_volatility_weighted() {
        let mut a = item("A", 1.0, 750.0, "T");
        a.volatility = Some(20.0);
        let mut b = item("B", 1.0, 250.0, "T");
        b.volatility = Some(40.0);
        let c = item("C", 1.0, 1000.0, "T");
        assert_eq!(portfolio_volatility(&[a, b, c]), Some(25.0));
        assert_eq!(portfolio_volatility(&[item("D", 1.0, 1.0, "T")]), None);
    }

    #[test]
    fn test_local_recommendation_bands() {
        assert!(local_recommendation(Some(-3.0), None, RiskTolerance::Moderate).contains("negative"));
        assert!(local_recommendation(Some(2.0), None, RiskTolerance::Moderate).contains("Low positive ROI"));
        assert!(local_recommendation(Some(12.0), Some(30.0), RiskTolerance::Conservative)
            .contains("conservative profile"));
        assert!(local_recommendation(None, None, RiskTolerance::Moderate).contains("Not enough"));
    }
}
