use actix_web::http::StatusCode;
use serde_json::{json, Value};
use topup_engine::{
    db_types::OrderStatusType,
    test_utils::scripted_gateway::ScriptedGateway,
    traits::GatewayError,
};

use super::{
    helpers::{json_post, parse, TestServer, ACCOUNT},
    mocks::MockGateway,
};

fn new_order(order_id: &str, amount: Value) -> Value {
    json!({
        "plan": "monthly",
        "amount": amount,
        "planDetails": {"days": 30, "name": "Monthly"},
        "mobileNumber": ACCOUNT,
        "shopName": "corner-shop",
        "orderId": order_id,
    })
}

#[actix_web::test]
async fn create_order_returns_the_payment_session() {
    let server = TestServer::new().await;
    let gateway = ScriptedGateway::new();
    let req = json_post("/create-order", new_order("ORD1", json!("100")));
    let (status, body) = server.request(gateway.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    let session = parse(&body);
    assert_eq!(session["payment_session_id"], "session_ORD1");
    let order = server.order("ORD1").await.expect("Order was not written");
    assert_eq!(order.status, OrderStatusType::Initiated);
    assert_eq!(order.shop_name, "corner-shop");
    assert_eq!(order.plan_details["days"], 30);
    let created = gateway.created_orders();
    assert_eq!(created.len(), 1);
    assert!(created[0].return_url.contains("order_id=ORD1"));
    assert!(created[0].return_url.contains(&format!("mobileNumber={ACCOUNT}")));
    server.cleanup().await;
}

#[actix_web::test]
async fn create_order_twice() {
    let server = TestServer::new().await;
    let gateway = ScriptedGateway::new();
    let (status, _) = server.request(gateway.clone(), json_post("/create-order", new_order("ORD1", json!(100)))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = server.request(gateway.clone(), json_post("/create-order", new_order("ORD1", json!(100)))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already exists"));
    assert_eq!(gateway.created_orders().len(), 1);
    server.cleanup().await;
}

#[actix_web::test]
async fn create_order_with_missing_fields() {
    let server = TestServer::new().await;
    let mut order = new_order("ORD1", json!("100"));
    order.as_object_mut().unwrap().remove("shopName");
    let (status, body) = server.request(ScriptedGateway::new(), json_post("/create-order", order)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Missing field: shopName"}"#);
    assert!(server.order("ORD1").await.is_none());
    server.cleanup().await;
}

#[actix_web::test]
async fn create_order_with_invalid_amount() {
    let server = TestServer::new().await;
    let gateway = ScriptedGateway::new();
    for (i, amount) in [json!("abc"), json!(0), json!("-50")].into_iter().enumerate() {
        let order_id = format!("BAD{i}");
        let (status, body) = server.request(gateway.clone(), json_post("/create-order", new_order(&order_id, amount))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(server.order(&order_id).await.is_none());
    }
    assert!(gateway.created_orders().is_empty());
    server.cleanup().await;
}

#[actix_web::test]
async fn create_order_when_the_gateway_is_down() {
    let server = TestServer::new().await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().times(1).returning(|_| Err(GatewayError::Unavailable("connection refused".into())));
    gateway.expect_fetch_payments().never();
    let (status, body) = server.request(gateway, json_post("/create-order", new_order("ORD1", json!(100)))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("connection refused"));
    assert!(server.order("ORD1").await.is_none(), "The order should have been removed again");
    server.cleanup().await;
}

#[actix_web::test]
async fn verify_credits_a_successful_payment_once() {
    let server = TestServer::new().await;
    server.seed_order("ORD2", "100", "monthly", 1).await;
    let gateway = ScriptedGateway::new();
    gateway.with_payments("ORD2", &["SUCCESS"]);
    let verify = || json_post("/verify", json!({"orderId": "ORD2", "mobileNumber": ACCOUNT}));
    let (status, body) = server.request(gateway.clone(), verify()).await;
    assert_eq!(status, StatusCode::OK);
    let outcome = parse(&body);
    assert_eq!(outcome["outcome"], "credited");
    assert_eq!(outcome["order_id"], "ORD2");
    assert_eq!(server.balance().await, 100);
    assert!(server.order("ORD2").await.is_none());
    let (status, body) = server.request(gateway, verify()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["outcome"], "already_processed");
    assert_eq!(server.balance().await, 100);
    server.cleanup().await;
}

#[actix_web::test]
async fn verify_a_failed_payment() {
    let server = TestServer::new().await;
    server.seed_order("ORD3", "100", "monthly", 1).await;
    let gateway = ScriptedGateway::new();
    gateway.with_payments("ORD3", &["FAILED"]);
    let req = json_post("/verify", json!({"orderId": "ORD3", "accountId": ACCOUNT}));
    let (status, body) = server.request(gateway, req).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body.contains("Failed"));
    assert_eq!(server.order("ORD3").await.unwrap().status, OrderStatusType::Failed);
    assert_eq!(server.balance().await, 0);
    server.cleanup().await;
}

#[actix_web::test]
async fn verify_a_pending_payment() {
    let server = TestServer::new().await;
    server.seed_order("ORD4", "100", "monthly", 1).await;
    let gateway = ScriptedGateway::new();
    gateway.with_payments("ORD4", &["PENDING"]);
    let req = json_post("/verify", json!({"orderId": "ORD4", "accountId": ACCOUNT}));
    let (status, body) = server.request(gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    let outcome = parse(&body);
    assert_eq!(outcome["outcome"], "status_changed");
    assert_eq!(outcome["status"], "Pending");
    server.cleanup().await;
}

#[actix_web::test]
async fn verify_unknown_and_incomplete_orders() {
    let server = TestServer::new().await;
    let gateway = ScriptedGateway::new();
    let req = json_post("/verify", json!({"orderId": "NOPE", "accountId": ACCOUNT}));
    let (status, _) = server.request(gateway.clone(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let req = json_post("/verify", json!({"orderId": "NOPE"}));
    let (status, _) = server.request(gateway.clone(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(gateway.fetch_count(), 0);
    server.cleanup().await;
}

#[actix_web::test]
async fn verify_when_the_gateway_is_down() {
    let server = TestServer::new().await;
    server.seed_order("ORD5", "100", "monthly", 1).await;
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payments().times(1).returning(|_| Err(GatewayError::Timeout("no answer".into())));
    let req = json_post("/verify", json!({"orderId": "ORD5", "accountId": ACCOUNT}));
    let (status, _) = server.request(gateway, req).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(server.order("ORD5").await.unwrap().status, OrderStatusType::Initiated);
    server.cleanup().await;
}
