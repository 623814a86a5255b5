//! Health check endpoint

use axum::{Json, Router, routing::get};

use crate::core::ServerState;

/// 健康检查路由 - 公共路由
pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health_check))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "ledger-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
