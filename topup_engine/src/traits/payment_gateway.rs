use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db_types::{AccountId, OrderId, Rupees};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment gateway did not answer in time. {0}")]
    Timeout(String),
    #[error("The payment gateway could not be reached. {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request ({status}). {message}")]
    Rejected { status: u16, message: String },
    #[error("The payment gateway sent a response we could not understand. {0}")]
    InvalidResponse(String),
}

/// The status of a single payment attempt, as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayPaymentStatus {
    Success,
    Failed,
    Cancelled,
    UserDropped,
    Pending,
    /// Anything else. The raw value is kept for the operator.
    Unrecognized(String),
}

impl From<&str> for GatewayPaymentStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            "USER_DROPPED" => Self::UserDropped,
            "PENDING" => Self::Pending,
            _ => Self::Unrecognized(value.to_string()),
        }
    }
}

impl Display for GatewayPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Failed => f.write_str("FAILED"),
            Self::Cancelled => f.write_str("CANCELLED"),
            Self::UserDropped => f.write_str("USER_DROPPED"),
            Self::Pending => f.write_str("PENDING"),
            Self::Unrecognized(s) => write!(f, "{s}"),
        }
    }
}

/// One payment attempt against a gateway order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub status: GatewayPaymentStatus,
    /// The full record the gateway sent, archived with the ledger entry
    pub details: Value,
}

impl PaymentAttempt {
    pub fn new(status: GatewayPaymentStatus, details: Value) -> Self {
        Self { status, details }
    }
}

/// Everything the gateway needs to open a checkout session for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayOrderRequest {
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub amount: Rupees,
    pub plan: String,
    pub plan_details: Value,
    pub shop_name: String,
    pub return_url: String,
}

/// The engine's view of the payment provider.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Opens a gateway order. The gateway's response (including whatever session token the client needs to pay) is
    /// returned verbatim.
    async fn create_order(&self, request: GatewayOrderRequest) -> Result<Value, GatewayError>;

    /// Fetches every payment attempt for the order, most recent first. An order nobody tried to pay yet has none.
    async fn fetch_payments(&self, order_id: &OrderId) -> Result<Vec<PaymentAttempt>, GatewayError>;
}
