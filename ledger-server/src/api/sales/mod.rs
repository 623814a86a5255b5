//! Sale API Module
//!
//! POS 侧接入点：推送销售单、为赊账销售建档、同步销售侧付款。

mod handler;

use axum::{
    Router,
    routing::{post, put},
};

use crate::core::ServerState;

/// Sale router
pub fn router() -> Router<ServerState> {
    Router::new()
        // Upsert order record pushed by the POS
        .route("/api/stores/{store_id}/sales/{order_id}", put(handler::ingest))
        // Create receivable (idempotent)
        .route("/api/sales/{order_id}/receivable", post(handler::create_receivable))
        // Mirror sale-side payment onto the receivable
        .route("/api/sales/{order_id}/payments/sync", post(handler::sync_payment))
}
