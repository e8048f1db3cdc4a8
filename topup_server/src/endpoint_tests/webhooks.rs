use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use topup_engine::{db_types::OrderStatusType, test_utils::scripted_gateway::ScriptedGateway};

use super::{
    helpers::{parse, signed_webhook, TestServer, ACCOUNT},
    mocks::MockGateway,
};
use crate::middleware::{SIGNATURE_HEADER, TIMESTAMP_HEADER};

fn payment_webhook(order_id: &str, status: &str) -> String {
    json!({
        "data": {
            "order": {"order_id": order_id, "order_amount": 100.00, "order_currency": "INR"},
            "payment": {
                "cf_payment_id": 5114910641010u64,
                "payment_status": status,
                "payment_amount": 100.00,
                "payment_currency": "INR",
                "payment_group": "upi"
            },
            "customer_details": {"customer_id": "corner-shop", "customer_phone": ACCOUNT}
        },
        "event_time": "2024-06-01T10:16:13+05:30",
        "type": "PAYMENT_SUCCESS_WEBHOOK"
    })
    .to_string()
}

/// The webhook never needs to ask the gateway anything.
fn silent_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().never();
    gateway.expect_fetch_payments().never();
    gateway
}

#[actix_web::test]
async fn successful_payment_is_credited() {
    let server = TestServer::new().await;
    server.seed_order("ORD1", "100", "monthly", 1).await;
    let body = payment_webhook("ORD1", "SUCCESS");
    let (status, res) = server.request(silent_gateway(), signed_webhook("/webhook", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&res)["success"], true);
    assert_eq!(server.balance().await, 100);
    assert!(server.order("ORD1").await.is_none());
    // Redelivery is acknowledged, but changes nothing
    let (status, _) = server.request(silent_gateway(), signed_webhook("/webhook", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.balance().await, 100);
    server.cleanup().await;
}

#[actix_web::test]
async fn both_webhook_paths_are_served() {
    let server = TestServer::new().await;
    server.seed_order("ORD2", "500", "yearly", 1).await;
    let body = payment_webhook("ORD2", "SUCCESS");
    let (status, _) = server.request(silent_gateway(), signed_webhook("/cashfree-webhook", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.balance().await, 1220);
    server.cleanup().await;
}

#[actix_web::test]
async fn failed_payment_is_recorded() {
    let server = TestServer::new().await;
    server.seed_order("ORD3", "100", "monthly", 1).await;
    let body = payment_webhook("ORD3", "FAILED");
    let (status, _) = server.request(ScriptedGateway::new(), signed_webhook("/webhook", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.order("ORD3").await.unwrap().status, OrderStatusType::Failed);
    assert_eq!(server.balance().await, 0);
    server.cleanup().await;
}

#[actix_web::test]
async fn invalid_signature_is_rejected_without_side_effects() {
    let server = TestServer::new().await;
    server.seed_order("ORD4", "100", "monthly", 1).await;
    let body = payment_webhook("ORD4", "SUCCESS");
    let req = TestRequest::post()
        .uri("/webhook")
        .insert_header((TIMESTAMP_HEADER, "1717216573"))
        .insert_header((SIGNATURE_HEADER, "c2lnbmVkIGJ5IHNvbWVvbmUgZWxzZQ=="))
        .set_payload(body.clone());
    let (status, res) = server.request(silent_gateway(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(res, r#"{"error":"The webhook signature is invalid."}"#);
    let req = TestRequest::post().uri("/webhook").set_payload(body);
    let (status, _) = server.request(silent_gateway(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(server.order("ORD4").await.unwrap().status, OrderStatusType::Initiated);
    assert_eq!(server.balance().await, 0);
    server.cleanup().await;
}

#[actix_web::test]
async fn signature_covers_the_body() {
    let server = TestServer::new().await;
    server.seed_order("ORD5", "100", "monthly", 1).await;
    let signed = signed_webhook("/webhook", &payment_webhook("ORD5", "FAILED"));
    // Swap the body for another, keeping the original signature
    let req = signed.set_payload(payment_webhook("ORD5", "SUCCESS"));
    let (status, _) = server.request(silent_gateway(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(server.balance().await, 0);
    server.cleanup().await;
}

#[actix_web::test]
async fn malformed_payloads() {
    let server = TestServer::new().await;
    let (status, _) = server.request(silent_gateway(), signed_webhook("/webhook", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let no_phone = json!({
        "data": {"order": {"order_id": "ORD6"}, "payment": {"payment_status": "SUCCESS"}},
        "type": "PAYMENT_SUCCESS_WEBHOOK"
    })
    .to_string();
    let (status, res) = server.request(silent_gateway(), signed_webhook("/webhook", &no_phone)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res.contains("Missing order id or customer phone"));
    server.cleanup().await;
}

#[actix_web::test]
async fn notifications_for_unknown_orders_are_acknowledged() {
    let server = TestServer::new().await;
    let body = payment_webhook("GHOST", "SUCCESS");
    let (status, res) = server.request(silent_gateway(), signed_webhook("/webhook", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&res)["success"], true);
    assert_eq!(server.balance().await, 0);
    server.cleanup().await;
}

#[actix_web::test]
async fn processing_errors_are_still_acknowledged() {
    let server = TestServer::new().await;
    server.seed_order("ORD7", "abc", "monthly", 1).await;
    let body = payment_webhook("ORD7", "SUCCESS");
    let (status, res) = server.request(silent_gateway(), signed_webhook("/webhook", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&res)["success"], false);
    assert_eq!(server.order("ORD7").await.unwrap().status, OrderStatusType::ReconcileFailed);
    assert_eq!(server.balance().await, 0);
    server.cleanup().await;
}
