use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use super::{millis_column, optional_millis_column, to_millis};
use crate::{
    db_types::{Account, AccountId, Rupees},
    traits::LedgerError,
};

impl<'r> FromRow<'r, SqliteRow> for Account {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            account_id: row.try_get("account_id")?,
            balance: row.try_get("balance")?,
            last_recharge_at: optional_millis_column(row, "last_recharge_at")?,
            last_deduction_at: optional_millis_column(row, "last_deduction_at")?,
            created_at: millis_column(row, "created_at")?,
        })
    }
}

pub async fn fetch_account(account_id: &AccountId, conn: &mut SqliteConnection) -> Result<Option<Account>, LedgerError> {
    let account = sqlx::query_as("SELECT * FROM accounts WHERE account_id = $1")
        .bind(account_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

pub async fn fetch_accounts(conn: &mut SqliteConnection) -> Result<Vec<Account>, LedgerError> {
    let accounts =
        sqlx::query_as("SELECT * FROM accounts ORDER BY created_at ASC, account_id ASC").fetch_all(conn).await?;
    Ok(accounts)
}

/// Creates an empty account if one does not exist yet. Returns `true` if the account was created.
pub async fn create_account_if_missing(
    account_id: &AccountId,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let result = sqlx::query("INSERT OR IGNORE INTO accounts (account_id, balance, created_at) VALUES ($1, 0, $2)")
        .bind(account_id.as_str())
        .bind(to_millis(at))
        .execute(conn)
        .await?;
    let created = result.rows_affected() == 1;
    if created {
        trace!("🗃️ Account {account_id} created");
    }
    Ok(created)
}

/// Writes the balance after a recharge. This is an absolute write: the caller must have read the old balance in the
/// same transaction.
pub async fn upsert_recharged_balance(
    account: &Account,
    new_balance: Rupees,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
    INSERT INTO accounts (account_id, balance, last_recharge_at, created_at) VALUES ($1, $2, $3, $4)
    ON CONFLICT (account_id) DO UPDATE SET balance = excluded.balance, last_recharge_at = excluded.last_recharge_at
    "#,
    )
    .bind(account.account_id.as_str())
    .bind(new_balance)
    .bind(to_millis(at))
    .bind(to_millis(account.created_at))
    .execute(conn)
    .await?;
    trace!("🗃️ Account {} balance set from {} to {new_balance}", account.account_id, account.balance);
    Ok(())
}

/// Debits `amount` from the account if, and only if, the balance covers it. Returns the new balance, or `None` if
/// the account was left alone.
pub async fn debit_if_sufficient(
    account_id: &AccountId,
    amount: Rupees,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Rupees>, LedgerError> {
    let new_balance: Option<Rupees> = sqlx::query_scalar(
        r#"
    UPDATE accounts SET balance = balance - $1, last_deduction_at = $2
    WHERE account_id = $3 AND balance >= $1
    RETURNING balance
    "#,
    )
    .bind(amount)
    .bind(to_millis(at))
    .bind(account_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(new_balance)
}
