use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::info;

use crate::errors::AppError;
use crate::models::{AnalyzedTransaction, Transaction};
use crate::services::advice_service::AdviceService;

/// Advice calls in flight at once for a single upload.
const ADVICE_CONCURRENCY: usize = 4;

const REQUIRED_COLUMNS: [&str; 3] = ["description", "amount", "date"];

fn parse_amount(raw: &str) -> Result<f64> {
    let cleaned = raw.replace(['$', ','], "");
    let cleaned = cleaned.trim();

    // Accounting style negatives: (12.50)
    let (cleaned, negative) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (cleaned, false),
    };

    let amount: f64 = cleaned
        .parse()
        .with_context(|| format!("Failed to parse amount: {}", raw))?;
    if !amount.is_finite() {
        bail!("Amount is not a finite number: {}", raw);
    }

    Ok(if negative { -amount } else { amount })
}

fn parse_date(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", raw))?;
    date.and_hms_opt(0, 0, 0)
        .with_context(|| format!("Invalid date: {}", raw))
}

fn column_indexes(headers: &StringRecord) -> Result<[usize; 3]> {
    let mut indexes = [0usize; 3];
    for (slot, column) in indexes.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(column))
            .with_context(|| format!("Missing required column: {}", column))?;
    }
    Ok(indexes)
}

/// Parses an uploaded statement. Header names are matched case-insensitively
/// and extra columns are ignored.
pub fn parse_transactions(content: &[u8]) -> Result<Vec<Transaction>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let [description_idx, amount_idx, date_idx] = column_indexes(&headers)?;

    let mut transactions = Vec::new();
    for (row, record) in reader.records().enumerate() {
        // Header is line 1
        let line = row + 2;
        let record = record.with_context(|| format!("Malformed CSV at line {}", line))?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        if record.iter().all(|f| f.is_empty()) {
            continue;
        }

        let description = field(description_idx).to_string();
        if description.is_empty() {
            bail!("Empty description at line {}", line);
        }

        transactions.push(Transaction {
            description,
            amount: parse_amount(field(amount_idx)).with_context(|| format!("Line {}", line))?,
            date: parse_date(field(date_idx)).with_context(|| format!("Line {}", line))?,
        });
    }

    Ok(transactions)
}

/// Runs advice for every transaction, a few at a time. Results keep file order.
pub async fn analyze_transactions(
    advice: &AdviceService,
    transactions: Vec<Transaction>,
) -> Result<Vec<AnalyzedTransaction>, AppError> {
    info!("Analyzing {} transaction(s)", transactions.len());

    stream::iter(transactions)
        .map(|transaction| async move {
            let outcome = advice.analyze_transaction(&transaction).await?;
            Ok::<_, AppError>(AnalyzedTransaction {
                transaction,
                advice: outcome,
            })
        })
        .buffered(ADVICE_CONCURRENCY)
        .try_collect()
        .await
}
