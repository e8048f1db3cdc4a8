use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

//--------------------------------------   Order creation    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub order_amount: i64,
    pub order_currency: String,
    pub order_id: String,
    pub customer_details: CustomerDetails,
    pub order_meta: OrderMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_tags: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub customer_id: String,
    pub customer_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderMeta {
    pub return_url: String,
}

//--------------------------------------      Payments       ---------------------------------------------------------
/// A single payment attempt against a gateway order.
///
/// Only the fields the top-up engine reasons about are typed. Everything else the gateway sends is kept in `extra`,
/// so that the full record can be archived with the ledger entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashfreePayment {
    #[serde(default)]
    pub cf_payment_id: Option<Value>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_amount: Option<f64>,
    #[serde(default)]
    pub payment_currency: Option<String>,
    #[serde(default)]
    pub payment_time: Option<String>,
    #[serde(default)]
    pub payment_message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CashfreePayment {
    pub fn status(&self) -> &str {
        self.payment_status.as_deref().unwrap_or_default()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

//--------------------------------------      Webhooks       ---------------------------------------------------------
/// The body of a payment webhook, e.g. `PAYMENT_SUCCESS_WEBHOOK`.
///
/// Every field is optional. A payload that is missing the order id or the customer phone is malformed, and it is
/// up to the receiver to reject it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub order: Option<WebhookOrder>,
    #[serde(default)]
    pub payment: Option<CashfreePayment>,
    #[serde(default)]
    pub customer_details: Option<WebhookCustomer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookOrder {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub order_amount: Option<f64>,
    #[serde(default)]
    pub order_currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookCustomer {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

impl WebhookPayload {
    pub fn order_id(&self) -> Option<&str> {
        self.data.order.as_ref().and_then(|o| o.order_id.as_deref()).filter(|s| !s.trim().is_empty())
    }

    pub fn customer_phone(&self) -> Option<&str> {
        self.data.customer_details.as_ref().and_then(|c| c.customer_phone.as_deref()).filter(|s| !s.trim().is_empty())
    }
}
