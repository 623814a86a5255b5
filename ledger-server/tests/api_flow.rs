//! HTTP 接口端到端测试
//!
//! 使用临时目录中的真实 redb 文件，通过 `tower::ServiceExt::oneshot` 直接驱动路由。

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use ledger_server::{Config, LedgerStorage, ServerState, api};
use serde_json::{Value, json};
use shared::util::{DAY_MS, now_millis};
use tempfile::TempDir;
use tower::ServiceExt;

const STORE: &str = "store-1";

fn setup() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let config = Config::with_overrides(dir.path().to_string_lossy(), 0);
    let storage = LedgerStorage::open(dir.path().join("ledger.redb")).unwrap();
    let state = ServerState::with_storage(&config, storage);
    (dir, api::build_app().with_state(state))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-operator-id", "alice");
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn credit_sale(id: &str, total: f64) -> Value {
    json!({
        "id": id,
        "store_id": STORE,
        "customer_id": "cust-1",
        "customer_name": "张三",
        "total": total,
        "paid_amount": 0.0,
        "status": "unpaid",
        "transaction_type": "credit",
        "date": now_millis() - DAY_MS,
    })
}

async fn put_sale(app: &Router, sale: Value) {
    let id = sale["id"].as_str().unwrap().to_string();
    let (status, _) = send(
        app,
        Method::PUT,
        &format!("/api/stores/{STORE}/sales/{id}"),
        Some(sale),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let (_dir, app) = setup();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_receivable_without_body() {
    let (_dir, app) = setup();
    put_sale(&app, credit_sale("order-1", 80.0)).await;

    let (status, body) = send(&app, Method::POST, "/api/sales/order-1/receivable", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order_id"], "order-1");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["remaining_balance"], 80.0);
    assert_eq!(body["data"]["created_by"], "alice");
}

#[tokio::test]
async fn test_credit_sale_payment_flow() {
    let (_dir, app) = setup();
    put_sale(&app, credit_sale("order-1", 100.0)).await;

    // 建档
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sales/order-1/receivable",
        Some(json!({ "credit_days": 15 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ledger = &body["data"];
    let ledger_id = ledger["id"].as_str().unwrap().to_string();
    assert_eq!(ledger["status"], "pending");
    assert_eq!(ledger["remaining_balance"], 100.0);
    assert_eq!(ledger["credit_days"], 15);
    assert_eq!(ledger["created_by"], "alice");

    // 重复建档返回同一台账
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sales/order-1/receivable",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], ledger_id.as_str());

    // 记账
    let payment = json!({ "id": "pay-1", "amount": 40.0, "payment_method": "cash" });
    let uri = format!("/api/receivables/{ledger_id}/payments");
    let (status, body) = send(&app, Method::POST, &uri, Some(payment.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ledger"]["status"], "partial");
    assert_eq!(body["data"]["ledger"]["remaining_balance"], 60.0);
    assert_eq!(body["data"]["order"]["paid_amount"], 40.0);
    assert_eq!(body["data"]["order"]["status"], "unpaid");

    // 同一付款重放不重复记账
    let (status, body) = send(&app, Method::POST, &uri, Some(payment)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ledger"]["payments"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["ledger"]["paid_amount"], 40.0);

    // 付清
    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "id": "pay-2", "amount": 60.0, "payment_method": "transfer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ledger"]["status"], "paid");
    assert_eq!(body["data"]["order"]["status"], "paid");

    let (status, body) = send(&app, Method::GET, &format!("/api/receivables/{ledger_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["remaining_balance"], 0.0);
    assert_eq!(body["data"]["updated_by"], "alice");
}

#[tokio::test]
async fn test_list_and_summary() {
    let (_dir, app) = setup();
    put_sale(&app, credit_sale("order-1", 100.0)).await;
    put_sale(&app, credit_sale("order-2", 50.0)).await;
    for order in ["order-1", "order-2"] {
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/sales/{order}/receivable"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/stores/{STORE}/receivables?status=pending"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/stores/{STORE}/receivables?status=paid"),
        None,
    )
    .await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/stores/{STORE}/receivables/summary"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let summary = &body["data"];
    assert_eq!(summary["store_id"], STORE);
    assert_eq!(summary["totals"]["count"], 2);
    assert_eq!(summary["totals"]["remaining_balance"], 150.0);
    assert_eq!(summary["top_debtors"][0]["customer_id"], "cust-1");
    assert_eq!(summary["top_debtors"][0]["account_count"], 2);
}

#[tokio::test]
async fn test_consistency_repair_and_migrate() {
    let (_dir, app) = setup();
    put_sale(&app, credit_sale("order-1", 80.0)).await;
    put_sale(&app, credit_sale("order-2", 20.0)).await;

    // order-1 有台账，但销售单的已付金额漂移
    let (_, body) = send(
        &app,
        Method::POST,
        "/api/sales/order-1/receivable",
        Some(json!({})),
    )
    .await;
    let ledger_id = body["data"]["id"].as_str().unwrap().to_string();
    let mut drifted = credit_sale("order-1", 80.0);
    drifted["paid_amount"] = json!(30.0);
    put_sale(&app, drifted).await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/stores/{STORE}/receivables/consistency?limit=10"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["scanned"], 2);
    assert!(body["data"].get("next_cursor").is_none());
    let kinds: Vec<&str> = body["data"]["inconsistencies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"payment_mismatch"));
    assert!(kinds.contains(&"missing_account"));

    // 只校验不修复
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/stores/{STORE}/receivables/repair"),
        Some(json!({ "auto_fix": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["repairs"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/stores/{STORE}/receivables/repair"),
        Some(json!({ "auto_fix": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = body["data"]["repairs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"order_synced"));
    assert!(actions.contains(&"created_account"));

    // 修复后再次校验为空
    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/stores/{STORE}/receivables/consistency"),
        None,
    )
    .await;
    assert!(body["data"]["inconsistencies"].as_array().unwrap().is_empty());

    let (_, body) = send(&app, Method::GET, &format!("/api/receivables/{ledger_id}"), None).await;
    assert_eq!(body["data"]["paid_amount"], 0.0);

    // 迁移：只处理还没有台账的赊账销售
    put_sale(&app, credit_sale("order-3", 10.0)).await;
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/stores/{STORE}/receivables/migrate"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["order_id"], "order-3");
    assert_eq!(results[0]["success"], true);
}

#[tokio::test]
async fn test_error_statuses() {
    let (_dir, app) = setup();

    let (status, body) = send(&app, Method::GET, "/api/receivables/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 6001);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/sales/missing/receivable",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut cash = credit_sale("order-cash", 12.0);
    cash["transaction_type"] = json!("cash");
    put_sale(&app, cash).await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/sales/order-cash/receivable",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // 路径与请求体不一致
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/stores/{STORE}/sales/other-id"),
        Some(credit_sale("order-1", 5.0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    put_sale(&app, credit_sale("order-1", 5.0)).await;
    let (_, body) = send(
        &app,
        Method::POST,
        "/api/sales/order-1/receivable",
        Some(json!({})),
    )
    .await;
    let ledger_id = body["data"]["id"].as_str().unwrap().to_string();
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/receivables/{ledger_id}/payments"),
        Some(json!({ "amount": -1.0, "payment_method": "cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
