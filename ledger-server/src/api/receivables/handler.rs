//! Receivable API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{
    AccountReceivable, MigrationResult, PaymentInput, ReceivableSummary, RepairReport,
    ValidationPage,
};
use shared::util::now_millis;

use crate::api::{Operator, run_blocking};
use crate::core::ServerState;
use crate::credit::{PaymentReceipt, ReceivableFilter};
use crate::utils::{ApiResponse, AppResult};

/// Query params for a consistency page
#[derive(Debug, Default, Deserialize)]
pub struct ValidateQuery {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

/// Request body for a repair run
#[derive(Debug, Default, Deserialize)]
pub struct RepairRequest {
    #[serde(default)]
    pub auto_fix: bool,
}

/// GET /api/receivables/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<AccountReceivable>>> {
    let query = state.query.clone();
    let ledger = run_blocking(move || query.get(&id, now_millis())).await?;
    Ok(Json(ApiResponse::success(ledger)))
}

/// POST /api/receivables/:id/payments
pub async fn record_payment(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    operator: Operator,
    Json(input): Json<PaymentInput>,
) -> AppResult<Json<ApiResponse<PaymentReceipt>>> {
    let sync = state.sync.clone();
    let receipt =
        run_blocking(move || sync.record_payment(&id, input, &operator.0, now_millis())).await?;
    Ok(Json(ApiResponse::success(receipt)))
}

/// GET /api/stores/:store_id/receivables
pub async fn list(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
    Query(filter): Query<ReceivableFilter>,
) -> AppResult<Json<ApiResponse<Vec<AccountReceivable>>>> {
    let query = state.query.clone();
    let ledgers = run_blocking(move || query.list(&store_id, &filter, now_millis())).await?;
    Ok(Json(ApiResponse::success(ledgers)))
}

/// GET /api/stores/:store_id/receivables/summary
pub async fn summary(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
) -> AppResult<Json<ApiResponse<ReceivableSummary>>> {
    let query = state.query.clone();
    let summary = run_blocking(move || query.summary(&store_id, now_millis())).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// GET /api/stores/:store_id/receivables/consistency
pub async fn validate(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
    Query(params): Query<ValidateQuery>,
) -> AppResult<Json<ApiResponse<ValidationPage>>> {
    let checker = state.checker.clone();
    let page = run_blocking(move || {
        checker.validate_page(&store_id, params.cursor.as_deref(), params.limit)
    })
    .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// POST /api/stores/:store_id/receivables/repair
pub async fn repair(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
    operator: Operator,
    Json(req): Json<RepairRequest>,
) -> AppResult<Json<ApiResponse<RepairReport>>> {
    let checker = state.checker.clone();
    let report = run_blocking(move || {
        checker.repair(&store_id, req.auto_fix, &operator.0, now_millis())
    })
    .await?;

    tracing::info!(
        inconsistencies = report.inconsistencies.len(),
        repairs = report.repairs.len(),
        "Repair run finished"
    );
    Ok(Json(ApiResponse::success(report)))
}

/// POST /api/stores/:store_id/receivables/migrate
pub async fn migrate(
    State(state): State<ServerState>,
    Path(store_id): Path<String>,
    operator: Operator,
) -> AppResult<Json<ApiResponse<Vec<MigrationResult>>>> {
    let sync = state.sync.clone();
    let results =
        run_blocking(move || sync.migrate_existing(&store_id, &operator.0, now_millis())).await?;
    Ok(Json(ApiResponse::success(results)))
}
