use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use topup_engine::test_utils::scripted_gateway::ScriptedGateway;

use super::helpers::{json_post, parse, TestServer, ACCOUNT};

#[actix_web::test]
async fn unknown_account() {
    let server = TestServer::new().await;
    let req = TestRequest::get().uri("/account/9990000404");
    let (status, body) = server.request(ScriptedGateway::new(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("9990000404"));
    server.cleanup().await;
}

#[actix_web::test]
async fn account_overview() {
    let server = TestServer::new().await;
    server.seed_order("ORD1", "500", "yearly", 1).await;
    server.seed_order("ORD2", "100", "monthly", 1).await;
    let gateway = ScriptedGateway::new();
    gateway.with_payments("ORD1", &["SUCCESS"]);
    let verify = json_post("/verify", json!({"orderId": "ORD1", "accountId": ACCOUNT}));
    let (status, _) = server.request(gateway.clone(), verify).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::get().uri(&format!("/account/{ACCOUNT}"));
    let (status, body) = server.request(gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    let overview = parse(&body);
    assert_eq!(overview["account"]["account_id"], ACCOUNT);
    assert_eq!(overview["account"]["balance"], 1220);
    let recharges = overview["recharges"].as_array().unwrap();
    assert_eq!(recharges.len(), 1);
    assert_eq!(recharges[0]["order_id"], "ORD1");
    assert_eq!(recharges[0]["bonus"], 720);
    let orders = overview["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["order_id"], "ORD2");
    assert!(overview["deductions"].as_array().unwrap().is_empty());
    server.cleanup().await;
}
