//! Helpers for tests in this crate and in crates that depend on it. Enabled with the `test_utils` feature.
pub mod prepare_env;
pub mod scripted_gateway;
