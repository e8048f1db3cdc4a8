use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use topup_engine::{db_types::OrderStatusType, test_utils::scripted_gateway::ScriptedGateway};

use super::helpers::{admin_post, json_post, parse, TestServer, ACCOUNT, ADMIN_TOKEN};
use crate::middleware::ADMIN_TOKEN_HEADER;

#[actix_web::test]
async fn admin_routes_are_disabled_without_a_token() {
    let server = TestServer::new().await.without_admin_token();
    let (status, body) = server.request(ScriptedGateway::new(), admin_post("/trigger-deduction", "")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Admin routes are disabled on this server."}"#);
    let (status, _) = server.request(ScriptedGateway::new(), admin_post("/trigger-polling", "anything")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    server.cleanup().await;
}

#[actix_web::test]
async fn admin_routes_need_the_right_token() {
    let server = TestServer::new().await;
    let (status, _) = server.request(ScriptedGateway::new(), admin_post("/trigger-deduction", "let-me-out")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = server.request(ScriptedGateway::new(), TestRequest::post().uri("/trigger-polling")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let req = TestRequest::get().uri("/orders/review");
    let (status, _) = server.request(ScriptedGateway::new(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    server.cleanup().await;
}

#[actix_web::test]
async fn trigger_deduction() {
    let server = TestServer::new().await;
    server.seed_order("ORD1", "100", "monthly", 1).await;
    let gateway = ScriptedGateway::new();
    gateway.with_payments("ORD1", &["SUCCESS"]);
    let verify = json_post("/verify", json!({"orderId": "ORD1", "accountId": ACCOUNT}));
    let (status, _) = server.request(gateway.clone(), verify).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.balance().await, 100);
    let (status, body) = server.request(gateway, admin_post("/trigger-deduction", ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let summary = parse(&body);
    assert_eq!(summary["accounts_scanned"], 1);
    assert_eq!(summary["accounts_debited"], 1);
    assert_eq!(summary["total_debited"], 12);
    assert_eq!(server.balance().await, 88);
    server.cleanup().await;
}

#[actix_web::test]
async fn trigger_polling() {
    let server = TestServer::new().await;
    server.seed_order("OLD1", "100", "monthly", 10).await;
    server.seed_order("OLD2", "100", "monthly", 10).await;
    server.seed_order("FRESH", "100", "monthly", 1).await;
    let gateway = ScriptedGateway::new();
    gateway.with_payments("OLD1", &["SUCCESS"]).with_payments("OLD2", &["PENDING"]).with_payments("FRESH", &["SUCCESS"]);
    let (status, body) = server.request(gateway.clone(), admin_post("/trigger-polling", ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let summary = parse(&body);
    assert_eq!(summary["checked"], 2);
    assert_eq!(summary["credited"], 1);
    assert_eq!(summary["pending"], 1);
    assert_eq!(gateway.fetch_count(), 2);
    assert_eq!(server.balance().await, 100);
    assert_eq!(server.order("FRESH").await.unwrap().status, OrderStatusType::Initiated);
    server.cleanup().await;
}

#[actix_web::test]
async fn review_and_release() {
    let server = TestServer::new().await;
    server.seed_order("ODD", "100", "monthly", 1).await;
    let gateway = ScriptedGateway::new();
    gateway.with_payments("ODD", &["VOID"]);
    let verify = || json_post("/verify", json!({"orderId": "ODD", "accountId": ACCOUNT}));
    let (status, _) = server.request(gateway.clone(), verify()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.order("ODD").await.unwrap().status, OrderStatusType::Unhandled);

    let review = || TestRequest::get().uri("/orders/review").insert_header((ADMIN_TOKEN_HEADER, ADMIN_TOKEN));
    let (status, body) = server.request(gateway.clone(), review()).await;
    assert_eq!(status, StatusCode::OK);
    let orders = parse(&body);
    assert_eq!(orders.as_array().map(|a| a.len()), Some(1));
    assert_eq!(orders[0]["order_id"], "ODD");
    assert_eq!(orders[0]["status"], "Unhandled");

    let release = || admin_post("/orders/review/release", ADMIN_TOKEN).set_json(json!({"orderId": "ODD", "accountId": ACCOUNT}));
    let (status, body) = server.request(gateway.clone(), release()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["status"], "Pending");
    let (_, body) = server.request(gateway.clone(), review()).await;
    assert_eq!(body, "[]");
    // Only orders under review can be released
    let (status, _) = server.request(gateway, release()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    server.cleanup().await;
}
