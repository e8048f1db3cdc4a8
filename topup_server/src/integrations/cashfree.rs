//! Glue between the Cashfree client and the engine's [`PaymentGateway`] trait.
use cashfree_tools::{
    CashfreeApi,
    CashfreeApiError,
    CashfreePayment,
    CreateOrderRequest,
    CustomerDetails,
    OrderMeta,
    WebhookPayload,
};
use log::*;
use serde_json::{Map, Value};
use topup_common::CURRENCY_CODE;
use topup_engine::{
    db_types::OrderId,
    GatewayError,
    GatewayOrderRequest,
    GatewayPaymentStatus,
    PaymentAttempt,
    PaymentGateway,
};

#[derive(Clone)]
pub struct CashfreeGateway {
    api: CashfreeApi,
}

impl CashfreeGateway {
    pub fn new(api: CashfreeApi) -> Self {
        Self { api }
    }
}

impl PaymentGateway for CashfreeGateway {
    async fn create_order(&self, request: GatewayOrderRequest) -> Result<Value, GatewayError> {
        let request = new_cashfree_order(request);
        self.api.create_order(&request).await.map_err(|e| {
            warn!("💳️ Cashfree could not create order {}. {e}", request.order_id);
            gateway_error(e)
        })
    }

    async fn fetch_payments(&self, order_id: &OrderId) -> Result<Vec<PaymentAttempt>, GatewayError> {
        let payments = self.api.fetch_payments(order_id.as_str()).await.map_err(gateway_error)?;
        Ok(payments.iter().map(payment_attempt).collect())
    }
}

pub fn new_cashfree_order(request: GatewayOrderRequest) -> CreateOrderRequest {
    let mut tags = Map::new();
    tags.insert("plan".into(), Value::String(request.plan.clone()));
    tags.insert("shop_name".into(), Value::String(request.shop_name.clone()));
    if !request.plan_details.is_null() {
        // Tag values must be strings
        tags.insert("plan_details".into(), Value::String(request.plan_details.to_string()));
    }
    CreateOrderRequest {
        order_amount: request.amount.value(),
        order_currency: CURRENCY_CODE.to_string(),
        order_id: request.order_id.as_str().to_string(),
        customer_details: CustomerDetails {
            customer_id: request.shop_name,
            customer_phone: request.account_id.as_str().to_string(),
        },
        order_meta: OrderMeta { return_url: request.return_url },
        order_note: Some(request.plan),
        order_tags: Some(tags),
    }
}

pub fn gateway_error(e: CashfreeApiError) -> GatewayError {
    match e {
        CashfreeApiError::Timeout(s) => GatewayError::Timeout(s),
        CashfreeApiError::Initialization(s) | CashfreeApiError::RestRequestError(s) => GatewayError::Unavailable(s),
        CashfreeApiError::QueryError { status, message } => GatewayError::Rejected { status, message },
        CashfreeApiError::RestResponseError(s) | CashfreeApiError::JsonError(s) => GatewayError::InvalidResponse(s),
    }
}

pub fn payment_attempt(payment: &CashfreePayment) -> PaymentAttempt {
    PaymentAttempt::new(GatewayPaymentStatus::from(payment.status()), payment.to_json())
}

/// Turns a webhook delivery into the payment attempt it reports.
///
/// Deliveries normally carry the payment record. If it is missing, the status is inferred from the event type, and
/// the whole payload is kept as the payment snapshot.
pub fn webhook_attempt(payload: &WebhookPayload) -> PaymentAttempt {
    if let Some(payment) = payload.data.payment.as_ref().filter(|p| p.payment_status.is_some()) {
        return payment_attempt(payment);
    }
    let event = payload.event_type.as_deref().unwrap_or_default();
    let status = match event {
        "PAYMENT_SUCCESS_WEBHOOK" => GatewayPaymentStatus::Success,
        "PAYMENT_FAILED_WEBHOOK" => GatewayPaymentStatus::Failed,
        "PAYMENT_USER_DROPPED_WEBHOOK" => GatewayPaymentStatus::UserDropped,
        other => GatewayPaymentStatus::Unrecognized(other.to_string()),
    };
    PaymentAttempt::new(status, serde_json::to_value(payload).unwrap_or(Value::Null))
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use topup_common::Rupees;

    use super::*;

    #[test]
    fn order_requests() {
        let request = GatewayOrderRequest {
            account_id: "9990000001".into(),
            order_id: "ORD1".into(),
            amount: Rupees::from(100),
            plan: "monthly".into(),
            plan_details: json!({"days": 30}),
            shop_name: "corner-shop".into(),
            return_url: "https://shop.example/ORD1".into(),
        };
        let order = new_cashfree_order(request);
        assert_eq!(order.order_amount, 100);
        assert_eq!(order.order_currency, "INR");
        assert_eq!(order.customer_details.customer_id, "corner-shop");
        assert_eq!(order.customer_details.customer_phone, "9990000001");
        assert_eq!(order.order_meta.return_url, "https://shop.example/ORD1");
        let tags = order.order_tags.unwrap();
        assert_eq!(tags["plan_details"], r#"{"days":30}"#);
    }

    #[test]
    fn errors() {
        let e = gateway_error(CashfreeApiError::QueryError { status: 400, message: "bad phone".into() });
        assert!(matches!(e, GatewayError::Rejected { status: 400, .. }));
        assert!(matches!(gateway_error(CashfreeApiError::Timeout("".into())), GatewayError::Timeout(_)));
    }

    #[test]
    fn webhook_attempts() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "type": "PAYMENT_SUCCESS_WEBHOOK",
            "data": {"order": {"order_id": "ORD1"}, "payment": {"payment_status": "SUCCESS", "cf_payment_id": 7}}
        }))
        .unwrap();
        let attempt = webhook_attempt(&payload);
        assert_eq!(attempt.status, GatewayPaymentStatus::Success);
        assert_eq!(attempt.details["cf_payment_id"], 7);

        let payload: WebhookPayload =
            serde_json::from_value(json!({"type": "PAYMENT_USER_DROPPED_WEBHOOK", "data": {}})).unwrap();
        assert_eq!(webhook_attempt(&payload).status, GatewayPaymentStatus::UserDropped);
        let payload: WebhookPayload = serde_json::from_value(json!({"type": "REFUND_STATUS_WEBHOOK"})).unwrap();
        assert_eq!(webhook_attempt(&payload).status, GatewayPaymentStatus::Unrecognized("REFUND_STATUS_WEBHOOK".into()));
    }
}
