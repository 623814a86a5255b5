//! Sale API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::models::{AccountReceivable, Sale, SalePayment};
use shared::util::now_millis;

use crate::api::{Operator, run_blocking};
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppError, AppResult};

/// Request body for creating a receivable
#[derive(Debug, Default, Deserialize)]
pub struct CreateReceivableRequest {
    /// Overrides the sale's credit terms and the configured default
    #[serde(default)]
    pub credit_days: Option<i64>,
}

/// Upsert a sale; path ids must match the body
pub async fn ingest(
    State(state): State<ServerState>,
    Path((store_id, order_id)): Path<(String, String)>,
    Json(sale): Json<Sale>,
) -> AppResult<Json<ApiResponse<Sale>>> {
    if sale.id != order_id || sale.store_id != store_id {
        return Err(AppError::validation(format!(
            "Body ids ({}, {}) do not match path ({}, {})",
            sale.store_id, sale.id, store_id, order_id
        )));
    }

    let sync = state.sync.clone();
    let sale = run_blocking(move || sync.ingest_sale(sale)).await?;
    Ok(Json(ApiResponse::success(sale)))
}

/// Create the receivable for a credit sale (returns the existing one on repeat)
pub async fn create_receivable(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
    operator: Operator,
    body: Option<Json<CreateReceivableRequest>>,
) -> AppResult<Json<ApiResponse<AccountReceivable>>> {
    let credit_days = body.and_then(|Json(req)| req.credit_days);
    let sync = state.sync.clone();
    let ledger = run_blocking(move || {
        sync.create_from_order(&order_id, &operator.0, credit_days, now_millis())
    })
    .await?;
    Ok(Json(ApiResponse::success(ledger)))
}

/// Mirror a sale-side payment onto the receivable
pub async fn sync_payment(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
    Json(payment): Json<SalePayment>,
) -> AppResult<Json<ApiResponse<AccountReceivable>>> {
    let sync = state.sync.clone();
    let ledger = run_blocking(move || {
        sync.sync_payment_to_ledger(&order_id, &payment, now_millis())
    })
    .await?;
    Ok(Json(ApiResponse::success(ledger)))
}
