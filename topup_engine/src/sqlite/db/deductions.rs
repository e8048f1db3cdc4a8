use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use super::{millis_column, to_millis};
use crate::{
    db_types::{AccountId, DeductionEntry, Rupees},
    traits::LedgerError,
};

impl<'r> FromRow<'r, SqliteRow> for DeductionEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            amount: row.try_get("amount")?,
            previous_balance: row.try_get("previous_balance")?,
            new_balance: row.try_get("new_balance")?,
            kind: row.try_get("kind")?,
            created_at: millis_column(row, "created_at")?,
        })
    }
}

pub async fn insert_deduction(
    account_id: &AccountId,
    amount: Rupees,
    new_balance: Rupees,
    kind: &str,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<DeductionEntry, LedgerError> {
    let entry = sqlx::query_as(
        r#"
    INSERT INTO deductions (account_id, amount, previous_balance, new_balance, kind, created_at)
    VALUES ($1, $2, $3, $4, $5, $6)
    RETURNING *
    "#,
    )
    .bind(account_id.as_str())
    .bind(amount)
    .bind(new_balance + amount)
    .bind(new_balance)
    .bind(kind)
    .bind(to_millis(at))
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn fetch_deductions_for_account(
    account_id: &AccountId,
    conn: &mut SqliteConnection,
) -> Result<Vec<DeductionEntry>, LedgerError> {
    let entries = sqlx::query_as("SELECT * FROM deductions WHERE account_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(account_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
