//! Receivable API Module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Receivable router
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/receivables/{id}", get(handler::get_by_id))
        .route("/api/receivables/{id}/payments", post(handler::record_payment))
        .route("/api/stores/{store_id}/receivables", get(handler::list))
        .route("/api/stores/{store_id}/receivables/summary", get(handler::summary))
        // 对账 / 修复 / 迁移
        .route(
            "/api/stores/{store_id}/receivables/consistency",
            get(handler::validate),
        )
        .route("/api/stores/{store_id}/receivables/repair", post(handler::repair))
        .route("/api/stores/{store_id}/receivables/migrate", post(handler::migrate))
}
