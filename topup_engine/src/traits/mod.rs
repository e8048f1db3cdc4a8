//! # Backend and collaborator contracts.
//!
//! This module defines the interfaces the top-up engine needs from the outside world.
//!
//! ## Ledger store
//! The ledger store holds accounts, live orders, the recharge history (ledger entries) and the deduction history.
//!
//! * [`LedgerDatabase`] defines the mutating behaviour: inserting and annotating orders, the atomic reconciliation
//!   transaction and the all-or-nothing daily deduction.
//! * [`AccountManagement`] provides read-only queries over accounts, orders and their histories.
//!
//! ## Payment gateway
//! [`PaymentGateway`] is the engine's view of the payment provider: it creates gateway orders and reports the payment
//! attempts made against them. The engine never assumes anything about the provider beyond this trait.
mod account_management;
mod data_objects;
mod ledger_database;
mod payment_gateway;

pub use account_management::AccountManagement;
pub use data_objects::{DeductionSummary, ReconcileOutcome};
pub use ledger_database::{LedgerDatabase, LedgerError};
pub use payment_gateway::{GatewayError, GatewayOrderRequest, GatewayPaymentStatus, PaymentAttempt, PaymentGateway};
