//! # Top-up server
//! This crate hosts the HTTP front end of the top-up gateway. It is responsible for:
//! * Opening gateway orders for customers who want to top up their balance.
//! * Receiving signed payment webhooks from the gateway and crediting confirmed payments.
//! * Answering clients that ask about the state of a single order.
//! * Running the background workers: the scheduled payment checker and the daily deduction.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /create-order`: Creates an order and returns the gateway's payment session.
//! * `POST /verify`: Checks a single order with the gateway and applies the result.
//! * `POST /webhook`, `POST /cashfree-webhook`: Signed payment webhooks from the gateway.
//! * `GET /account/{account_id}`: Balance, recharge history and live orders for an account.
//! * `POST /trigger-deduction` (admin): Runs the daily deduction now.
//! * `POST /trigger-polling` (admin): Runs one sweep of the payment checker now.
//! * `GET /orders/review` (admin): Lists orders that need manual review.
//! * `POST /orders/review/release` (admin): Returns an order under review to the checker.
//!
//! Admin routes require the `x-admin-token` header.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod workers;

#[cfg(test)]
mod endpoint_tests;
