use serde::{Deserialize, Serialize};

use crate::errors::AppError;

// A single holding as submitted by the caller. Lives for one request only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioItem {
    pub symbol: String,
    pub quantity: f64,
    pub purchase_price: f64,
}

impl PortfolioItem {
    /// Upper-cased, trimmed symbol used for lookups and keys.
    pub fn normalized_symbol(&self) -> String {
        self.symbol.trim().to_uppercase()
    }

    pub fn invested_amount(&self) -> f64 {
        self.purchase_price * self.quantity
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.symbol.trim().is_empty() {
            return Err(AppError::InvalidInput("symbol must not be empty".to_string()));
        }
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "quantity for {} must be a non-negative number",
                self.symbol.trim()
            )));
        }
        if !self.purchase_price.is_finite() || self.purchase_price < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "purchase_price for {} must be a non-negative number",
                self.symbol.trim()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub items: Vec<PortfolioItem>,
}

impl Portfolio {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.items.is_empty() {
            return Err(AppError::InvalidInput("portfolio must contain at least one item".to_string()));
        }
        self.items.iter().try_for_each(PortfolioItem::validate)
    }

    /// Distinct normalized symbols, in first-seen order.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for item in &self.items {
            let symbol = item.normalized_symbol();
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(symbol: &str, quantity: f64, purchase_price: f64) -> PortfolioItem {
        PortfolioItem {
            symbol: symbol.to_string(),
            quantity,
            purchase_price,
        }
    }

    #[test]
    fn test_rejects_empty_symbol() {
        assert!(matches!(item("  ", 1.0, 1.0).validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_negative_quantity_and_price() {
        assert!(item("AAPL", -1.0, 10.0).validate().is_err());
        assert!(item("AAPL", 1.0, -10.0).validate().is_err());
        assert!(item("AAPL", f64::NAN, 10.0).validate().is_err());
    }

    #[test]
    fn test_accepts_zero_quantity() {
        assert!(item("AAPL", 0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_empty_portfolio_is_invalid() {
        let portfolio = Portfolio { items: vec![] };
        assert!(portfolio.validate().is_err());
    }

    #[test]
    fn test_symbols_are_distinct_and_normalized() {
        let portfolio = Portfolio {
            items: vec![item("aapl", 1.0, 1.0), item("MSFT", 1.0, 1.0), item(" AAPL", 2.0, 1.0)],
        };
        assert_eq!(portfolio.symbols(), vec!["AAPL".to_string(), "MSFT".to_string()]);
    }
}
