use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::advice::{AdviceOutcome, TransactionAdvice};

// A spending/income line from an uploaded statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub description: String,
    pub amount: f64,
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(flatten)]
    pub advice: AdviceOutcome<TransactionAdvice>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<AnalyzedTransaction>,
}
