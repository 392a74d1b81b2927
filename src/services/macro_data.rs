use std::sync::Arc;

use tracing::info;

use crate::errors::AppError;
use crate::models::{MacroIndicators, MacroOutlook};
use crate::services::advice_service::AdviceService;

/// Macro indicators come from configuration; there is no live feed.
pub struct MacroDataService {
    defaults: MacroIndicators,
    advice: Arc<AdviceService>,
}

impl MacroDataService {
    pub fn new(defaults: MacroIndicators, advice: Arc<AdviceService>) -> Self {
        Self { defaults, advice }
    }

    pub fn indicators(&self) -> MacroIndicators {
        self.defaults
    }

    pub async fn outlook(&self) -> Result<MacroOutlook, AppError> {
        let macro_data = self.indicators();
        info!(
            "Generating macro outlook (interest {:.2}%, inflation {:.2}%, gdp {:.2}%)",
            macro_data.interest_rate, macro_data.inflation, macro_data.gdp_growth
        );

        let macro_outlook = self.advice.macro_outlook(&macro_data).await?;

        Ok(MacroOutlook {
            macro_data,
            macro_outlook,
        })
    }
}
