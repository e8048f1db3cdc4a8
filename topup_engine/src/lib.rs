//! Top-up Engine
//!
//! The top-up engine lets customers top up a prepaid balance through a payment gateway, and debits a flat daily fee
//! from every account. This library contains the core logic. It is gateway-agnostic: the gateway is anything that
//! implements [`PaymentGateway`].
//!
//! The library is divided into these main sections:
//! 1. The ledger store ([`mod@traits`], [`mod@sqlite`]). The traits define what a backend must provide. SQLite is the
//!    supported backend. The data types used in the store are defined in [`mod@db_types`] and are public.
//! 2. The order state machine ([`mod@order_state`]), which decides what an observed payment status means for an order.
//! 3. The public API ([`mod@topup_api`]). Reconciliation, the three reconciliation drivers, the daily deduction and
//!    read-only account queries live here.
//!
//! The engine also emits events (see [`mod@events`]) when a payment is credited or an order needs manual review.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod order_state;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod topup_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use topup_api::{
    accounts_api::AccountApi,
    api_objects::{AccountOverview, PollSummary, TransitionOutcome},
    deduction_api::{DeductionApi, DeductionPolicy},
    errors::RechargeError,
    order_flow_api::OrderFlowApi,
    policy::{PlanBonuses, PollPolicy, ReconcilePolicy},
    reconciliation_api::ReconciliationApi,
};
pub use traits::{
    AccountManagement,
    DeductionSummary,
    GatewayError,
    GatewayOrderRequest,
    GatewayPaymentStatus,
    LedgerDatabase,
    LedgerError,
    PaymentAttempt,
    PaymentGateway,
    ReconcileOutcome,
};
