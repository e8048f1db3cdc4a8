//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Timestamps are stored as unix milliseconds, so that range queries compare integers.
use std::{env, str::FromStr, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use log::info;
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
    Error as SqlxError,
    Row,
    SqlitePool,
};

pub mod accounts;
pub mod deductions;
pub mod ledger;
pub mod orders;

const SQLITE_DB_URL: &str = "sqlite://data/topup_store.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn db_url() -> String {
    let result = env::var("TOPUP_DATABASE_URL").unwrap_or_else(|_| {
        info!("TOPUP_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn decode_error<E: std::error::Error + Send + Sync + 'static>(column: &str, e: E) -> SqlxError {
    SqlxError::ColumnDecode { index: column.to_string(), source: Box::new(e) }
}

#[derive(Debug, thiserror::Error)]
#[error("{0} is not a valid timestamp")]
struct InvalidTimestamp(i64);

pub(crate) fn millis_column(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, SqlxError> {
    let millis: i64 = row.try_get(column)?;
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| decode_error(column, InvalidTimestamp(millis)))
}

pub(crate) fn optional_millis_column(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, SqlxError> {
    let millis: Option<i64> = row.try_get(column)?;
    millis
        .map(|m| Utc.timestamp_millis_opt(m).single().ok_or_else(|| decode_error(column, InvalidTimestamp(m))))
        .transpose()
}

pub(crate) fn json_column(row: &SqliteRow, column: &str) -> Result<Value, SqlxError> {
    let text: String = row.try_get(column)?;
    serde_json::from_str(&text).map_err(|e| decode_error(column, e))
}
