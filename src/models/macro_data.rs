use serde::{Deserialize, Serialize};

use crate::models::advice::{AdviceOutcome, MacroNarrative};

/// Macroeconomic indicators, all in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroIndicators {
    pub interest_rate: f64,
    pub inflation: f64,
    pub gdp_growth: f64,
}

impl Default for MacroIndicators {
    fn default() -> Self {
        Self {
            interest_rate: 5.0,
            inflation: 3.0,
            gdp_growth: 2.1,
        }
    }
}

/// Per-request overrides; unset fields keep the configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroOverrides {
    pub interest_rate: Option<f64>,
    pub inflation: Option<f64>,
}

impl MacroIndicators {
    pub fn with_overrides(self, overrides: MacroOverrides) -> Self {
        Self {
            interest_rate: overrides.interest_rate.unwrap_or(self.interest_rate),
            inflation: overrides.inflation.unwrap_or(self.inflation),
            gdp_growth: self.gdp_growth,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MacroOutlook {
    pub macro_data: MacroIndicators,
    pub macro_outlook: AdviceOutcome<MacroNarrative>,
}
