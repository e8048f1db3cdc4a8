use mockall::mock;
use serde_json::Value;
use topup_engine::{
    db_types::OrderId,
    traits::{GatewayError, GatewayOrderRequest, PaymentAttempt, PaymentGateway},
};

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_order(&self, request: GatewayOrderRequest) -> Result<Value, GatewayError>;
        async fn fetch_payments(&self, order_id: &OrderId) -> Result<Vec<PaymentAttempt>, GatewayError>;
    }
}
