use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A fixed-shape advice payload the language model is asked to produce.
pub trait AdviceShape: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Field names the model is instructed to return.
    const FIELDS: &'static [&'static str];

    /// Neutral defaults used when a reply does not match the shape.
    fn fallback() -> Self;
}

/// Result of parsing a model reply: genuine advice, or neutral defaults plus
/// the reason the reply was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum AdviceOutcome<T> {
    Parsed(T),
    Fallback { advice: T, reason: String },
}

impl<T> AdviceOutcome<T> {
    pub fn advice(&self) -> &T {
        match self {
            AdviceOutcome::Parsed(advice) | AdviceOutcome::Fallback { advice, .. } => advice,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, AdviceOutcome::Fallback { .. })
    }
}

#[derive(Serialize)]
struct AdviceReport<'a, T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback_reason: Option<&'a str>,
    #[serde(flatten)]
    advice: &'a T,
}

impl<T: Serialize> Serialize for AdviceOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let report = match self {
            AdviceOutcome::Parsed(advice) => AdviceReport {
                status: "parsed",
                fallback_reason: None,
                advice,
            },
            AdviceOutcome::Fallback { advice, reason } => AdviceReport {
                status: "fallback",
                fallback_reason: Some(reason.as_str()),
                advice,
            },
        };
        report.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for AdviceOutcome<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        let status = match map.remove("status") {
            Some(Value::String(status)) => status,
            _ => return Err(D::Error::missing_field("status")),
        };
        let reason = match map.remove("fallback_reason") {
            Some(Value::String(reason)) => reason,
            _ => String::new(),
        };
        let advice = T::deserialize(Value::Object(map)).map_err(D::Error::custom)?;

        match status.as_str() {
            "parsed" => Ok(AdviceOutcome::Parsed(advice)),
            "fallback" => Ok(AdviceOutcome::Fallback { advice, reason }),
            other => Err(D::Error::unknown_variant(other, &["parsed", "fallback"])),
        }
    }
}

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const NO_RECOMMENDATION: &str = "No recommendation";
pub const NO_SAVINGS: &str = "None";
pub const NO_SUMMARY: &str = "No summary available";
pub const UNKNOWN_RISK: &str = "Unknown";
pub const NEUTRAL_OUTLOOK: &str = "Neutral";
pub const NO_OUTLOOK: &str = "No outlook available";

/// Categorisation of a single bank/card transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAdvice {
    pub category: String,
    pub budget_recommendation: String,
    pub savings_potential: String,
}

impl AdviceShape for TransactionAdvice {
    const FIELDS: &'static [&'static str] = &["category", "budget_recommendation", "savings_potential"];

    fn fallback() -> Self {
        Self {
            category: UNCATEGORIZED.to_string(),
            budget_recommendation: NO_RECOMMENDATION.to_string(),
            savings_potential: NO_SAVINGS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAdvice {
    pub summary: String,
    pub recommendations: Vec<String>,
    pub risk_assessment: String,
}

impl AdviceShape for PortfolioAdvice {
    const FIELDS: &'static [&'static str] = &["summary", "recommendations", "risk_assessment"];

    fn fallback() -> Self {
        Self {
            summary: NO_SUMMARY.to_string(),
            recommendations: Vec::new(),
            risk_assessment: UNKNOWN_RISK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAdvice {
    pub outlook: String,
    pub recommendation: String,
    pub key_risks: Vec<String>,
}

impl AdviceShape for SymbolAdvice {
    const FIELDS: &'static [&'static str] = &["outlook", "recommendation", "key_risks"];

    fn fallback() -> Self {
        Self {
            outlook: NEUTRAL_OUTLOOK.to_string(),
            recommendation: NO_RECOMMENDATION.to_string(),
            key_risks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroNarrative {
    pub outlook: String,
}

impl AdviceShape for MacroNarrative {
    const FIELDS: &'static [&'static str] = &["outlook"];

    fn fallback() -> Self {
        Self {
            outlook: NO_OUTLOOK.to_string(),
        }
    }
}
