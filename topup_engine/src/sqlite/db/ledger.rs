use log::debug;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use super::{json_column, millis_column, to_millis};
use crate::{
    db_types::{AccountId, LedgerEntry, OrderId},
    traits::LedgerError,
};

impl<'r> FromRow<'r, SqliteRow> for LedgerEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            account_id: row.try_get("account_id")?,
            order_id: row.try_get("order_id")?,
            amount: row.try_get("amount")?,
            bonus: row.try_get("bonus")?,
            plan: row.try_get("plan")?,
            plan_details: json_column(row, "plan_details")?,
            payment_details: json_column(row, "payment_details")?,
            order_created_at: millis_column(row, "order_created_at")?,
            resolved_at: millis_column(row, "resolved_at")?,
        })
    }
}

/// Appends a ledger entry. The (account, order) pair is the primary key, so a second entry for the same order is
/// rejected with [`LedgerError::AlreadyReconciled`].
pub async fn insert_entry(entry: &LedgerEntry, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let plan_details = serde_json::to_string(&entry.plan_details)?;
    let payment_details = serde_json::to_string(&entry.payment_details)?;
    let result = sqlx::query(
        r#"
    INSERT INTO ledger_entries (
        account_id,
        order_id,
        amount,
        bonus,
        plan,
        plan_details,
        payment_details,
        order_created_at,
        resolved_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
    "#,
    )
    .bind(entry.account_id.as_str())
    .bind(entry.order_id.as_str())
    .bind(entry.amount)
    .bind(entry.bonus)
    .bind(entry.plan.as_str())
    .bind(plan_details)
    .bind(payment_details)
    .bind(to_millis(entry.order_created_at))
    .bind(to_millis(entry.resolved_at))
    .execute(conn)
    .await;
    match result {
        Ok(_) => {
            debug!("🗃️ Ledger entry for order {} ({}) written", entry.order_id, entry.total_credit());
            Ok(())
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(LedgerError::AlreadyReconciled(entry.account_id.clone(), entry.order_id.clone()))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_entry(
    account_id: &AccountId,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerEntry>, LedgerError> {
    let entry = sqlx::query_as("SELECT * FROM ledger_entries WHERE account_id = $1 AND order_id = $2")
        .bind(account_id.as_str())
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

pub async fn fetch_entries_for_account(
    account_id: &AccountId,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, LedgerError> {
    let entries = sqlx::query_as("SELECT * FROM ledger_entries WHERE account_id = $1 ORDER BY resolved_at DESC")
        .bind(account_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
