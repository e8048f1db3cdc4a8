//! # Top-up engine public API
//!
//! The `topup_api` module exposes the programmatic API for the top-up engine.
//! The API is modular, so that clients of the API can pick and choose the functionality they want.
//!
//! * [`order_flow_api`] creates orders and hosts the three reconciliation drivers (push, scheduled poll and
//!   on-demand verification).
//! * [`reconciliation_api`] applies confirmed payments to the ledger. It is the only code that credits balances.
//! * [`deduction_api`] runs the daily deduction sweep, the only code that debits balances.
//! * [`accounts_api`] provides read-only queries over accounts and orders awaiting review.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits required by the
//! API, along with its policy.
//!
//! ```rust,ignore
//! use topup_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements AccountManagement
//! let api = AccountApi::new(db);
//! let overview = api.account_overview(&"9990000001".into()).await?;
//! ```
pub mod accounts_api;
pub mod api_objects;
pub mod deduction_api;
pub mod errors;
pub mod order_flow_api;
pub mod policy;
pub mod reconciliation_api;
