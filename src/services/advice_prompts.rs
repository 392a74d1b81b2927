use crate::external::llm::CompletionRequest;
use crate::external::market_data::Fundamentals;
use crate::models::{AnalysisParams, ItemAnalysis, MacroIndicators, RiskTolerance, Transaction};

const FINANCIAL_EXPERT_ROLE: &str = "You are a financial expert AI. Always answer with a single valid JSON object and nothing else.";

const PORTFOLIO_ROLE: &str = "You are a helpful portfolio analysis assistant. Provide educational insights about \
portfolio performance and risk, tailored to the investor's risk tolerance. Always answer with a single valid JSON object and nothing else.";

const MACRO_ROLE: &str = "You are a macroeconomic expert. Always answer with a single valid JSON object and nothing else.";

pub fn transaction_prompt(transaction: &Transaction) -> CompletionRequest {
    let prompt = format!(
        r#"Categorize the following transaction, suggest a budget recommendation,
and indicate any savings potential. The output format should be JSON with keys:
"category", "budget_recommendation", and "savings_potential".

Transaction:
  Description: {}
  Amount: {:.2}
  Date: {}"#,
        transaction.description,
        transaction.amount,
        transaction.date.format("%Y-%m-%d %H:%M:%S"),
    );

    CompletionRequest {
        system: FINANCIAL_EXPERT_ROLE.to_string(),
        prompt,
        max_tokens: Some(200),
    }
}

fn format_optional(value: Option<f64>, suffix: &str) -> String {
    value
        .map(|v| format!("{:.2}{}", v, suffix))
        .unwrap_or_else(|| "n/a".to_string())
}

fn tolerance_guidance(tolerance: RiskTolerance) -> &'static str {
    match tolerance {
        RiskTolerance::Conservative => "capital preservation and low volatility matter most",
        RiskTolerance::Moderate => "a balance between growth and stability is preferred",
        RiskTolerance::Aggressive => "higher volatility is acceptable in exchange for growth",
    }
}

pub fn portfolio_prompt(
    items: &[ItemAnalysis],
    roi_percent: Option<f64>,
    volatility: Option<f64>,
    params: &AnalysisParams,
) -> CompletionRequest {
    let holdings: Vec<String> = items
        .iter()
        .map(|i| {
            format!(
                "- {} ({}): {} shares, bought at ${:.2}, now ${:.2}, ROI {}",
                i.symbol,
                i.sector,
                i.quantity,
                i.purchase_price,
                i.current_price,
                format_optional(i.roi_percent, "%"),
            )
        })
        .collect();

    let prompt = format!(
        r#"Analyze this investment portfolio for an investor with a {} risk tolerance ({}).

HOLDINGS:
{}

PORTFOLIO METRICS:
- Overall ROI: {}
- Annualized volatility: {}
- Risk-free rate: {:.2}%

MACRO ENVIRONMENT:
- Interest rate: {:.2}%
- Inflation: {:.2}%
- GDP growth: {:.2}%

Respond with JSON using exactly these keys:
{{
  "summary": "2-3 sentence overview of the portfolio",
  "recommendations": ["...", "..."],
  "risk_assessment": "one sentence on how the risk fits the stated tolerance"
}}"#,
        params.risk_tolerance,
        tolerance_guidance(params.risk_tolerance),
        holdings.join("\n"),
        format_optional(roi_percent, "%"),
        format_optional(volatility, "%"),
        params.risk_free_rate,
        params.macro_data.interest_rate,
        params.macro_data.inflation,
        params.macro_data.gdp_growth,
    );

    CompletionRequest {
        system: PORTFOLIO_ROLE.to_string(),
        prompt,
        max_tokens: None,
    }
}

pub fn symbol_prompt(
    symbol: &str,
    roi_percent: Option<f64>,
    fundamentals: &Fundamentals,
    tolerance: RiskTolerance,
) -> CompletionRequest {
    let prompt = format!(
        r#"Give a short assessment of the stock {} for an investor with a {} risk tolerance ({}).

Position ROI so far: {}
Sector: {}
Industry: {}
Trailing P/E: {}
Forward P/E: {}
Price/Book: {}
Beta: {}

Respond with JSON using exactly these keys:
{{
  "outlook": "Positive, Neutral or Negative",
  "recommendation": "one or two sentences",
  "key_risks": ["...", "..."]
}}"#,
        symbol,
        tolerance,
        tolerance_guidance(tolerance),
        format_optional(roi_percent, "%"),
        fundamentals.sector.as_deref().unwrap_or("Unknown"),
        fundamentals.industry.as_deref().unwrap_or("Unknown"),
        format_optional(fundamentals.pe_ratio, ""),
        format_optional(fundamentals.forward_pe, ""),
        format_optional(fundamentals.price_to_book, ""),
        format_optional(fundamentals.beta, ""),
    );

    CompletionRequest {
        system: PORTFOLIO_ROLE.to_string(),
        prompt,
        max_tokens: Some(300),
    }
}

pub fn macro_prompt(macro_data: &MacroIndicators) -> CompletionRequest {
    let prompt = format!(
        r#"The current environment has:
Interest rate = {:.2}%
Inflation = {:.2}%
GDP Growth = {:.2}%

Provide a brief 1-2 sentence outlook on this macro situation for a typical investor.
Respond with JSON: {{"outlook": "..."}}"#,
        macro_data.interest_rate, macro_data.inflation, macro_data.gdp_growth,
    );

    CompletionRequest {
        system: MACRO_ROLE.to_string(),
        prompt,
        max_tokens: Some(120),
    }
}
