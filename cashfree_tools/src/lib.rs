//! # Cashfree tools
//!
//! A thin client for the parts of the Cashfree Payment Gateway (PG) REST API used by the top-up server:
//! * [`CashfreeApi::create_order`] creates a gateway order and returns the payment session payload.
//! * [`CashfreeApi::fetch_payments`] lists the payment attempts made against an order.
//! * [`verify_webhook_signature`] authenticates webhook deliveries.
//!
//! Configuration is supplied once, at construction, via [`CashfreeConfig`].
mod api;
mod config;
mod error;
mod signature;

pub mod data_objects;

pub use api::CashfreeApi;
pub use config::{CashfreeConfig, CashfreeEnvironment};
pub use data_objects::{
    CashfreePayment,
    CreateOrderRequest,
    CustomerDetails,
    OrderMeta,
    WebhookCustomer,
    WebhookData,
    WebhookOrder,
    WebhookPayload,
};
pub use error::CashfreeApiError;
pub use signature::{calculate_webhook_signature, verify_webhook_signature};
