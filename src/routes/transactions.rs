use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::TransactionsResponse;
use crate::services::transaction_import;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/upload-transactions", post(upload_transactions))
}

async fn read_csv_upload(mut multipart: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !filename.to_lowercase().ends_with(".csv") {
            return Err(AppError::InvalidInput("Only CSV files are allowed".to_string()));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read uploaded file: {}", e)))?;
        return Ok(bytes.to_vec());
    }

    Err(AppError::InvalidInput("Missing 'file' field in upload".to_string()))
}

pub async fn upload_transactions(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TransactionsResponse>, AppError> {
    info!("POST /upload-transactions - Analyzing uploaded transactions");

    let content = read_csv_upload(multipart).await?;
    let transactions = transaction_import::parse_transactions(&content).map_err(|e| {
        error!("Failed to parse transaction CSV: {:#}", e);
        AppError::InvalidInput(format!("{:#}", e))
    })?;

    let transactions = transaction_import::analyze_transactions(&state.advice, transactions)
        .await
        .map_err(|e| {
            error!("Failed to analyze transactions: {}", e);
            e
        })?;

    Ok(Json(TransactionsResponse { transactions }))
}
