use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use cashfree_tools::calculate_webhook_signature;
use chrono::{Duration, Utc};
use log::debug;
use serde_json::Value;
use topup_common::Secret;
use topup_engine::{
    db_types::{AccountId, NewOrder, Order, OrderId},
    events::EventProducers,
    test_utils::prepare_env::{drop_database, new_test_database},
    traits::{AccountManagement, LedgerDatabase, PaymentGateway},
    AccountApi,
    DeductionApi,
    DeductionPolicy,
    OrderFlowApi,
    PollPolicy,
    ReconcilePolicy,
    SqliteDatabase,
};

use crate::{
    config::{AdminToken, ServerOptions, WebhookSecret, DEFAULT_RETURN_URL},
    middleware::{ADMIN_TOKEN_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER},
    routes::{
        health,
        AccountRoute,
        CashfreeWebhookRoute,
        CreateOrderRoute,
        OrdersForReviewRoute,
        ReleaseOrderRoute,
        TriggerDeductionRoute,
        TriggerPollingRoute,
        VerifyRoute,
        WebhookRoute,
    },
};

pub const WEBHOOK_SECRET: &str = "whsec_test_only";
pub const ADMIN_TOKEN: &str = "let-me-in";
pub const ACCOUNT: &str = "9990000001";

/// A migrated, throw-away database and the settings every test app is built with.
pub struct TestServer {
    pub url: String,
    pub db: SqliteDatabase,
    pub admin_token: String,
}

impl TestServer {
    pub async fn new() -> Self {
        let (url, db) = new_test_database(5).await;
        Self { url, db, admin_token: ADMIN_TOKEN.to_string() }
    }

    pub fn without_admin_token(mut self) -> Self {
        self.admin_token = String::default();
        self
    }

    /// Builds an app with every route around `gateway` and sends it the request. Errors raised in middleware are
    /// turned into the response the client would have seen.
    pub async fn request<G: PaymentGateway + 'static>(&self, gateway: G, req: TestRequest) -> (StatusCode, String) {
        let orders_api = OrderFlowApi::new(
            self.db.clone(),
            gateway,
            ReconcilePolicy::default(),
            PollPolicy::default(),
            EventProducers::default(),
        );
        let deduction_api = DeductionApi::new(self.db.clone(), DeductionPolicy::default());
        let accounts_api = AccountApi::new(self.db.clone());
        let options = ServerOptions { return_url_template: DEFAULT_RETURN_URL.to_string() };
        let app = App::new()
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(deduction_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(WebhookSecret(Secret::new(WEBHOOK_SECRET.to_string()))))
            .app_data(web::Data::new(AdminToken(Secret::new(self.admin_token.clone()))))
            .service(health)
            .service(CreateOrderRoute::<SqliteDatabase, G>::new())
            .service(VerifyRoute::<SqliteDatabase, G>::new())
            .service(WebhookRoute::<SqliteDatabase, G>::new())
            .service(CashfreeWebhookRoute::<SqliteDatabase, G>::new())
            .service(AccountRoute::<SqliteDatabase>::new())
            .service(TriggerDeductionRoute::<SqliteDatabase>::new())
            .service(TriggerPollingRoute::<SqliteDatabase, G>::new())
            .service(OrdersForReviewRoute::<SqliteDatabase>::new())
            .service(ReleaseOrderRoute::<SqliteDatabase, G>::new());
        let service = test::init_service(app).await;
        debug!("Making request");
        match test::try_call_service(&service, req.to_request()).await {
            Ok(res) => {
                let status = res.status();
                let body = test::read_body(res).await;
                (status, String::from_utf8_lossy(&body).into_owned())
            },
            Err(e) => {
                let res = e.error_response();
                let status = res.status();
                let body = res.into_body().try_into_bytes().unwrap();
                (status, String::from_utf8_lossy(&body).into_owned())
            },
        }
    }

    /// Writes a live order directly, as if `create_order` had been called `age_minutes` ago.
    pub async fn seed_order(&self, order_id: &str, amount: &str, plan: &str, age_minutes: i64) -> Order {
        let order = NewOrder::new(AccountId::from(ACCOUNT), OrderId::from(order_id), amount.into(), plan)
            .with_shop_name("corner-shop")
            .with_created_at(Utc::now() - Duration::minutes(age_minutes));
        self.db.insert_order(order).await.expect("Failed to seed order")
    }

    pub async fn order(&self, order_id: &str) -> Option<Order> {
        self.db.fetch_order(&AccountId::from(ACCOUNT), &OrderId::from(order_id)).await.expect("Failed to fetch order")
    }

    pub async fn balance(&self) -> i64 {
        self.db
            .fetch_account(&AccountId::from(ACCOUNT))
            .await
            .expect("Failed to fetch account")
            .map(|a| a.balance.value())
            .unwrap_or_default()
    }

    pub async fn cleanup(mut self) {
        self.db.close().await.expect("Failed to close database");
        drop_database(&self.url).await;
    }
}

pub fn json_post(path: &str, body: Value) -> TestRequest {
    TestRequest::post().uri(path).set_json(body)
}

pub fn admin_post(path: &str, token: &str) -> TestRequest {
    TestRequest::post().uri(path).insert_header((ADMIN_TOKEN_HEADER, token))
}

/// A webhook delivery signed with the test secret.
pub fn signed_webhook(path: &str, body: &str) -> TestRequest {
    let timestamp = "1717216573";
    let signature = calculate_webhook_signature(WEBHOOK_SECRET, timestamp, body.as_bytes());
    TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/json"))
        .insert_header((TIMESTAMP_HEADER, timestamp))
        .insert_header((SIGNATURE_HEADER, signature))
        .set_payload(body.to_string())
}

pub fn parse(body: &str) -> Value {
    serde_json::from_str(body).expect("Response is not JSON")
}
